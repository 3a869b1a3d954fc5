use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use clipkeeper_lib::shared::logging::init_tracing_subscriber;
use clipkeeper_lib::shared::settings::AppSettings;
use clipkeeper_lib::shared::AppResult;

/// Clipboard history manager
#[derive(Parser, Debug)]
#[command(version, about = "Keeps an in-memory history of everything you copy")]
struct Args {
    /// Settings file (defaults to the per-user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Clipboard poll interval in milliseconds
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Soft memory budget for history, in MiB
    #[arg(long)]
    memory_ceiling_mb: Option<u64>,

    /// Do not record text that looks like a credential
    #[arg(long)]
    ignore_sensitive: bool,
}

impl Args {
    fn apply_overrides(&self, settings: &mut AppSettings) {
        if let Some(ms) = self.poll_interval_ms {
            settings.clipboard.poll_interval_ms = ms;
        }
        if let Some(mb) = self.memory_ceiling_mb {
            settings.clipboard.memory_ceiling_bytes = mb.saturating_mul(1024 * 1024);
        }
        if self.ignore_sensitive {
            settings.clipboard.ignore_sensitive_content = true;
        }
    }
}

async fn load_settings(args: &Args) -> AppResult<AppSettings> {
    match &args.config {
        Some(path) => AppSettings::load_from(path).await,
        None => AppSettings::load().await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Logging needs the configured level, so load errors are reported after init
    let loaded = load_settings(&args).await;
    let mut settings = loaded.as_ref().cloned().unwrap_or_default();
    args.apply_overrides(&mut settings);

    if let Err(e) = init_tracing_subscriber(&settings.logging.level) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }
    if let Err(e) = &loaded {
        tracing::warn!("failed to load settings, using defaults: {}", e);
    }

    if let Err(e) = settings.validate() {
        tracing::error!("invalid settings: {}", e);
        return ExitCode::FAILURE;
    }

    tracing::info!(
        poll_interval_ms = settings.clipboard.poll_interval_ms,
        memory_ceiling_bytes = settings.clipboard.memory_ceiling_bytes,
        ignore_sensitive = settings.clipboard.ignore_sensitive_content,
        "starting clipkeeper"
    );

    match clipkeeper_lib::run(settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("clipkeeper failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
