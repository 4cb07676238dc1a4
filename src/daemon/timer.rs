//! Study timer engine.
//!
//! This module provides the core timer functionality:
//! - State transitions (Cancelled → Running ⇄ Paused)
//! - Count-up ticking with tokio::time::interval
//! - Event firing for the foreground notifier bridge
//!
//! There is exactly one engine instance per daemon, shared behind a mutex.
//! The ticker task locks it once per second, so IPC commands serialize
//! against ticks and a tick can never observe a half-applied transition.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, Mutex};
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::types::{SubjectRef, TimeDisplay, TimerPhase, TimerRun};

// ============================================================================
// TimerEvent
// ============================================================================

/// Timer events consumed by the foreground notifier bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    /// Timer started or resumed
    Started {
        /// Subject selected for the run (if any)
        subject: Option<SubjectRef>,
    },
    /// Timer paused, elapsed time retained
    Paused,
    /// Run cancelled, elapsed time discarded
    Cancelled,
    /// Run finished; the recorder decides whether it becomes a session
    Finished {
        /// Elapsed seconds at the moment of finishing
        elapsed_secs: u64,
    },
    /// One second elapsed
    Tick {
        /// Padded display components of the new elapsed time
        display: TimeDisplay,
    },
}

// ============================================================================
// FinishedRun
// ============================================================================

/// Snapshot taken when a run finishes, before the engine resets.
///
/// The reset is unconditional: even if recording the session later fails,
/// the timer is already back at zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedRun {
    /// Elapsed seconds of the finished run
    pub elapsed_secs: u64,
    /// Subject the run was associated with, if any
    pub subject: Option<SubjectRef>,
}

// ============================================================================
// TimerEngine
// ============================================================================

/// Timer engine that manages the single study-timer run and fires events.
pub struct TimerEngine {
    /// Current run state
    run: TimerRun,
    /// Event sender channel
    event_tx: mpsc::UnboundedSender<TimerEvent>,
}

impl TimerEngine {
    /// Creates a new TimerEngine with the given event channel.
    pub fn new(event_tx: mpsc::UnboundedSender<TimerEvent>) -> Self {
        Self {
            run: TimerRun::new(),
            event_tx,
        }
    }

    /// Runs the shared ticker loop.
    ///
    /// Ticks every second and advances the clock while the timer is running.
    /// Should be spawned as a separate tokio task; the mutex is held only for
    /// the duration of one tick.
    pub async fn run(engine: Arc<Mutex<TimerEngine>>) -> Result<()> {
        let mut ticker = interval(Duration::from_secs(1));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            engine.lock().await.on_tick()?;
        }
    }

    /// Applies one tick: advances the clock and fires a tick event.
    ///
    /// Does nothing unless the timer is running.
    pub fn on_tick(&mut self) -> Result<()> {
        if !self.run.is_running() {
            return Ok(());
        }

        self.run.clock.advance();

        self.event_tx
            .send(TimerEvent::Tick {
                display: self.run.clock.display(),
            })
            .context("Failed to send tick event")?;

        Ok(())
    }

    /// Starts a fresh run or resumes a paused one.
    ///
    /// A no-op while already running. A subject passed here replaces the
    /// current selection.
    pub fn start(&mut self, subject: Option<SubjectRef>) -> Result<()> {
        if self.run.phase == TimerPhase::Running {
            return Ok(());
        }

        self.run.start(subject);

        self.event_tx
            .send(TimerEvent::Started {
                subject: self.run.subject.clone(),
            })
            .context("Failed to send started event")?;

        Ok(())
    }

    /// Pauses the timer, retaining the elapsed time.
    ///
    /// A no-op unless running.
    pub fn pause(&mut self) -> Result<()> {
        if self.run.phase != TimerPhase::Running {
            return Ok(());
        }

        self.run.pause();

        self.event_tx
            .send(TimerEvent::Paused)
            .context("Failed to send paused event")?;

        Ok(())
    }

    /// Cancels the run, discarding the elapsed time and subject selection.
    pub fn cancel(&mut self) -> Result<()> {
        self.run.cancel();

        self.event_tx
            .send(TimerEvent::Cancelled)
            .context("Failed to send cancelled event")?;

        Ok(())
    }

    /// Finishes the run: snapshots it, then resets unconditionally.
    ///
    /// The caller hands the snapshot to the session recorder; a failed save
    /// does not restore the run.
    pub fn finish(&mut self) -> Result<FinishedRun> {
        let finished = FinishedRun {
            elapsed_secs: self.run.clock.elapsed_secs(),
            subject: self.run.subject.clone(),
        };

        self.event_tx
            .send(TimerEvent::Finished {
                elapsed_secs: finished.elapsed_secs,
            })
            .context("Failed to send finished event")?;

        self.run.cancel();

        self.event_tx
            .send(TimerEvent::Cancelled)
            .context("Failed to send cancelled event")?;

        Ok(finished)
    }

    /// Returns a reference to the current run.
    pub fn current_run(&self) -> &TimerRun {
        &self.run
    }

    /// Returns a mutable reference to the run (for testing).
    #[cfg(test)]
    pub fn current_run_mut(&mut self) -> &mut TimerRun {
        &mut self.run
    }
}

// ============================================================================
// Tests
// ============================================================================
