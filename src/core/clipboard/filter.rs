use std::sync::OnceLock;
use regex::Regex;

static SECRET_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

/// Longer text is treated as a document and not scanned
const MAX_SCAN_LEN: usize = 10_000;

fn secret_patterns() -> &'static [Regex] {
    SECRET_PATTERNS.get_or_init(|| {
        [
            // GitHub personal access token
            r"ghp_[a-zA-Z0-9]{36}",
            // Stripe live key
            r"sk_live_[a-zA-Z0-9]{24}",
            // Slack token
            r"xox[baprs]-[a-zA-Z0-9]{10,48}",
            // AWS access key id
            r"AKIA[0-9A-Z]{16}",
            // Google API key
            r"AIza[0-9A-Za-z\-_]{35}",
            r"-----BEGIN (RSA|DSA|EC|PGP|OPENSSH) PRIVATE KEY-----",
        ]
        .iter()
        .filter_map(|pattern| match Regex::new(pattern) {
            Ok(regex) => Some(regex),
            Err(e) => {
                tracing::error!("invalid secret pattern {}: {}", pattern, e);
                None
            }
        })
        .collect()
    })
}

/// Whether copied text looks like a credential that should stay out of history
pub fn is_sensitive(content: &str) -> bool {
    if content.len() > MAX_SCAN_LEN {
        return false;
    }
    secret_patterns().iter().any(|pattern| pattern.is_match(content))
}
