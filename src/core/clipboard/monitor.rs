use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::backend::ClipboardBackend;
use super::codec::encode_data_uri;
use super::filter;
use super::history::ClipboardHistory;
use super::state::{ClipboardSnapshot, ClipboardState};
use crate::shared::emit::{emit_event, EventBus};
use crate::shared::error::AppResult;
use crate::shared::events::AppEvent;
use crate::shared::types::{ContentType, HistoryEntry};

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);
/// Log the first failure of a streak, then every Nth
const ERROR_LOG_EVERY: u32 = 10;

/// What a single poll tick did
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// New content was inserted (or promoted) in history
    Captured(HistoryEntry),
    /// New content matched the sensitive filter and was not stored
    Filtered,
    /// The clipboard was emptied outside this app
    Cleared,
    Unchanged,
    /// The read finished after `stop()`; nothing was applied
    Cancelled,
}

impl TickOutcome {
    fn label(&self) -> &'static str {
        match self {
            TickOutcome::Captured(_) => "captured",
            TickOutcome::Filtered => "filtered",
            TickOutcome::Cleared => "cleared",
            TickOutcome::Unchanged => "unchanged",
            TickOutcome::Cancelled => "cancelled",
        }
    }
}

enum Observation {
    New {
        snapshot: ClipboardSnapshot,
        image_digest: Option<md5::Digest>,
    },
    Cleared,
    Unchanged,
}

/// Read the platform clipboard and compare it with the last observed value.
/// Blocking: runs on the blocking pool.
fn observe_clipboard(
    backend: &dyn ClipboardBackend,
    last: Option<&ClipboardSnapshot>,
    last_digest: Option<md5::Digest>,
) -> AppResult<Observation> {
    let last_content = last.map(|snapshot| snapshot.content.as_str());

    if let Some(text) = backend.read_text()?.filter(|text| !text.is_empty()) {
        if last_content == Some(text.as_str()) {
            return Ok(Observation::Unchanged);
        }
        return Ok(Observation::New {
            snapshot: ClipboardSnapshot::new(text, ContentType::Text),
            image_digest: None,
        });
    }

    match backend.read_image()? {
        Some(image) => {
            let digest = image.digest();
            let last_was_image = last.is_some_and(|snapshot| snapshot.content_type == ContentType::Image);
            if last_was_image && last_digest == Some(digest) {
                return Ok(Observation::Unchanged);
            }

            let encoded = encode_data_uri(&image)?;
            if last_content == Some(encoded.as_str()) {
                return Ok(Observation::Unchanged);
            }
            Ok(Observation::New {
                snapshot: ClipboardSnapshot::new(encoded, ContentType::Image),
                image_digest: Some(digest),
            })
        }
        None if last.is_some() => Ok(Observation::Cleared),
        None => Ok(Observation::Unchanged),
    }
}

#[derive(Clone)]
struct Poller {
    backend: Arc<dyn ClipboardBackend>,
    history: ClipboardHistory,
    state: ClipboardState,
    events: EventBus,
    ignore_sensitive: bool,
    /// Held for a whole tick so loop ticks and `poll_once` never overlap
    tick_lock: Arc<tokio::sync::Mutex<()>>,
}

impl Poller {
    async fn poll_once(&self, token: &CancellationToken) -> AppResult<TickOutcome> {
        let _tick = self.tick_lock.lock().await;

        let (last, last_digest) = self.state.last_observed_with_digest();
        let backend = Arc::clone(&self.backend);
        let expected = last.clone();

        let observation = tokio::task::spawn_blocking(move || {
            observe_clipboard(backend.as_ref(), last.as_ref(), last_digest)
        })
        .await??;

        if token.is_cancelled() {
            return Ok(TickOutcome::Cancelled);
        }
        Ok(self.apply(observation, expected.as_ref()))
    }

    /// Apply an observation made against `expected`. If a command changed the
    /// clipboard state since, the observation is stale and dropped.
    fn apply(&self, observation: Observation, expected: Option<&ClipboardSnapshot>) -> TickOutcome {
        match observation {
            Observation::Unchanged => TickOutcome::Unchanged,
            Observation::Cleared => {
                if !self.state.reset_if(expected) {
                    return TickOutcome::Unchanged;
                }
                tracing::info!("clipboard cleared outside the app");
                emit_event(&self.events, AppEvent::ClipboardCleared(super::build_view(&self.history, &self.state)));
                TickOutcome::Cleared
            }
            Observation::New { snapshot, image_digest } => {
                let sensitive = self.ignore_sensitive
                    && snapshot.content_type == ContentType::Text
                    && filter::is_sensitive(&snapshot.content);

                if !self.state.observe_if(expected, snapshot.clone(), image_digest, sensitive) {
                    return TickOutcome::Unchanged;
                }

                if sensitive {
                    tracing::info!("sensitive clipboard content ignored");
                    return TickOutcome::Filtered;
                }

                let entry = self.history.insert(snapshot.content, snapshot.content_type);
                tracing::debug!(id = %entry.id, content_type = %entry.content_type, "clipboard captured: {}", entry.preview(20));
                emit_event(&self.events, AppEvent::HistoryUpdated(super::build_view(&self.history, &self.state)));
                TickOutcome::Captured(entry)
            }
        }
    }
}

async fn run_poll_loop(poller: Poller, period: Duration, token: CancellationToken) {
    let mut ticker = tokio::time::interval(period);
    // An overdue tick is dropped rather than run back to back
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut consecutive_errors = 0u32;

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        match poller.poll_once(&token).await {
            Ok(TickOutcome::Cancelled) => break,
            Ok(outcome) => {
                if consecutive_errors > 0 {
                    tracing::debug!(failed_ticks = consecutive_errors, "clipboard reads recovered");
                }
                consecutive_errors = 0;
                tracing::trace!(outcome = outcome.label(), "poll tick");
            }
            Err(e) => {
                consecutive_errors += 1;
                if consecutive_errors == 1 || consecutive_errors % ERROR_LOG_EVERY == 0 {
                    tracing::warn!(failed_ticks = consecutive_errors, "failed to read clipboard: {}", e);
                }
            }
        }
    }

    tracing::debug!("clipboard poll loop exited");
}

struct RunningPoll {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Clipboard monitor that polls for changes on a fixed interval.
///
/// `Stopped -> start() -> Running -> stop() -> Stopped`. Clones control the
/// same poll loop.
#[derive(Clone)]
pub struct ClipboardMonitor {
    poller: Poller,
    interval: Duration,
    running: Arc<Mutex<Option<RunningPoll>>>,
}

impl ClipboardMonitor {
    pub fn new(
        backend: Arc<dyn ClipboardBackend>,
        history: ClipboardHistory,
        state: ClipboardState,
        events: EventBus,
        interval: Duration,
    ) -> Self {
        Self {
            poller: Poller {
                backend,
                history,
                state,
                events,
                ignore_sensitive: false,
                tick_lock: Arc::new(tokio::sync::Mutex::new(())),
            },
            interval: interval.max(MIN_POLL_INTERVAL),
            running: Arc::new(Mutex::new(None)),
        }
    }

    /// Skip text that looks like a credential
    pub fn with_sensitive_filter(mut self, enabled: bool) -> Self {
        self.poller.ignore_sensitive = enabled;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    fn lock_running(&self) -> MutexGuard<'_, Option<RunningPoll>> {
        match self.running.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("monitor mutex poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Spawn the poll loop on the current tokio runtime.
    /// Returns `false` (and does nothing) if it is already running.
    pub fn start(&self) -> bool {
        let mut running = self.lock_running();
        if running.as_ref().is_some_and(|task| !task.handle.is_finished()) {
            tracing::warn!("clipboard monitor already running, ignoring start");
            return false;
        }

        let token = CancellationToken::new();
        let handle = tokio::spawn(run_poll_loop(self.poller.clone(), self.interval, token.clone()));
        *running = Some(RunningPoll { token, handle });
        tracing::info!(interval_ms = self.interval.as_millis() as u64, "clipboard monitoring started");
        true
    }

    /// Cancel the poll loop and wait for it to exit. No tick mutates state
    /// once this returns. Returns `false` if it was not running.
    pub async fn stop(&self) -> bool {
        let task = self.lock_running().take();
        let Some(task) = task else {
            return false;
        };

        task.token.cancel();
        if let Err(e) = task.handle.await {
            if e.is_panic() {
                tracing::error!("clipboard poll loop panicked: {}", e);
            }
        }
        tracing::info!("clipboard monitoring stopped");
        true
    }

    pub fn is_running(&self) -> bool {
        self.lock_running()
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    /// Pause or resume monitoring. Returns the new running state.
    pub async fn toggle(&self) -> bool {
        if self.is_running() {
            self.stop().await;
            false
        } else {
            self.start()
        }
    }

    /// Run one tick outside the loop. Waits for an in-flight loop tick.
    pub async fn poll_once(&self) -> AppResult<TickOutcome> {
        self.poller.poll_once(&CancellationToken::new()).await
    }
}
