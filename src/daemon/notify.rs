//! Foreground notifier bridge.
//!
//! The engine emits events; something user-visible has to react to them.
//! [`ForegroundNotifier`] is that seam: the daemon drives whichever
//! implementation is plugged in, and tests substitute a mock to observe the
//! calls. [`NotifierBridge`] is the single command surface over the one
//! shared engine instance.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

use crate::types::{SubjectRef, TimeDisplay, TimerRun};

use super::timer::{FinishedRun, TimerEngine, TimerEvent};

// ============================================================================
// ForegroundNotifier
// ============================================================================

/// Receives user-facing timer updates.
///
/// Implementations must be cheap and non-blocking; calls happen on the event
/// pump task, once per second while the timer runs.
pub trait ForegroundNotifier: Send + Sync {
    /// Shows the current elapsed time.
    fn show_elapsed(&self, display: &TimeDisplay);

    /// Removes any visible timer presence after a run ends.
    fn teardown(&self);
}

/// Notifier that writes updates to the log.
pub struct LogNotifier;

impl ForegroundNotifier for LogNotifier {
    fn show_elapsed(&self, time: &TimeDisplay) {
        info!(
            "elapsed {}:{}:{}",
            time.hours, time.minutes, time.seconds
        );
    }

    fn teardown(&self) {
        debug!("timer presence removed");
    }
}

/// Mock notifier that records calls for verification.
#[derive(Default)]
pub struct MockNotifier {
    shown: std::sync::Mutex<Vec<TimeDisplay>>,
    teardowns: std::sync::atomic::AtomicUsize,
}

impl MockNotifier {
    /// Creates an empty mock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every display passed to `show_elapsed`, in order.
    pub fn shown(&self) -> Vec<TimeDisplay> {
        self.shown.lock().unwrap().clone()
    }

    /// Returns how many times `teardown` was called.
    pub fn teardown_count(&self) -> usize {
        self.teardowns.load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl ForegroundNotifier for MockNotifier {
    fn show_elapsed(&self, display: &TimeDisplay) {
        self.shown.lock().unwrap().push(display.clone());
    }

    fn teardown(&self) {
        self.teardowns
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }
}

// ============================================================================
// Event pump
// ============================================================================

/// Forwards engine events to the notifier until the channel closes.
///
/// Ticks become elapsed-time updates; the end of a run (cancel or finish)
/// tears the presence down.
pub async fn pump_events(
    mut event_rx: mpsc::UnboundedReceiver<TimerEvent>,
    notifier: Arc<dyn ForegroundNotifier>,
) {
    while let Some(event) = event_rx.recv().await {
        match event {
            TimerEvent::Tick { display } => notifier.show_elapsed(&display),
            TimerEvent::Cancelled => notifier.teardown(),
            TimerEvent::Started { subject } => {
                debug!(
                    "timer started (subject: {})",
                    subject.as_ref().map_or("none", |s| s.name.as_str())
                );
            }
            TimerEvent::Paused => debug!("timer paused"),
            TimerEvent::Finished { elapsed_secs } => {
                debug!("timer finished at {elapsed_secs}s");
            }
        }
    }
}

// ============================================================================
// NotifierBridge
// ============================================================================

/// Command surface over the single shared timer engine.
///
/// Every mutation of the run goes through here (or through the ticker),
/// which keeps the transition table in one place.
#[derive(Clone)]
pub struct NotifierBridge {
    engine: Arc<Mutex<TimerEngine>>,
}

impl NotifierBridge {
    /// Wraps the shared engine.
    pub fn new(engine: Arc<Mutex<TimerEngine>>) -> Self {
        Self { engine }
    }

    /// Starts or resumes the timer. Returns the run state after the command.
    pub async fn request_start(&self, subject: Option<SubjectRef>) -> anyhow::Result<TimerRun> {
        let mut engine = self.engine.lock().await;
        engine.start(subject)?;
        Ok(engine.current_run().clone())
    }

    /// Pauses the timer. Returns the run state after the command.
    pub async fn request_pause(&self) -> anyhow::Result<TimerRun> {
        let mut engine = self.engine.lock().await;
        engine.pause()?;
        Ok(engine.current_run().clone())
    }

    /// Cancels the run. Returns the (reset) run state.
    pub async fn request_cancel(&self) -> anyhow::Result<TimerRun> {
        let mut engine = self.engine.lock().await;
        engine.cancel()?;
        Ok(engine.current_run().clone())
    }

    /// Finishes the run, resetting the engine, and returns the snapshot.
    pub async fn request_finish(&self) -> anyhow::Result<FinishedRun> {
        self.engine.lock().await.finish()
    }

    /// Returns the current run state without mutating it.
    pub async fn snapshot(&self) -> TimerRun {
        self.engine.lock().await.current_run().clone()
    }
}

// ============================================================================
// Tests
// ============================================================================
