//! Core data types for StudySmart.
//!
//! This module defines the data structures used for:
//! - Timer state management (phase, elapsed-time clock, current run)
//! - IPC request/response serialization

use serde::{Deserialize, Serialize};

// ============================================================================
// TimerPhase
// ============================================================================

/// Represents the current phase of the study timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerPhase {
    /// No run in progress (initial state, also reached via cancel/finish)
    Cancelled,
    /// Timer is counting up
    Running,
    /// Timer is paused, elapsed time retained
    Paused,
}

impl TimerPhase {
    /// Returns the string representation of the phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerPhase::Cancelled => "cancelled",
            TimerPhase::Running => "running",
            TimerPhase::Paused => "paused",
        }
    }

    /// Returns true if the timer is actively counting.
    pub fn is_running(&self) -> bool {
        matches!(self, TimerPhase::Running)
    }
}

impl Default for TimerPhase {
    fn default() -> Self {
        TimerPhase::Cancelled
    }
}

// ============================================================================
// StudyClock
// ============================================================================

/// Elapsed-time accumulator counting whole seconds.
///
/// The clock only moves through [`StudyClock::advance`], called once per tick
/// while the timer is running, so elapsed seconds always equals the number of
/// ticks applied since the last reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StudyClock {
    elapsed_secs: u64,
}

impl StudyClock {
    /// Creates a clock at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds exactly one second.
    pub fn advance(&mut self) {
        self.elapsed_secs += 1;
    }

    /// Resets the clock to zero.
    pub fn reset(&mut self) {
        self.elapsed_secs = 0;
    }

    /// Returns the raw elapsed second count.
    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    /// Decomposes the elapsed time into (hours, minutes, seconds).
    ///
    /// Seconds and minutes wrap at 60; hours are unbounded.
    pub fn components(&self) -> (u64, u64, u64) {
        let hours = self.elapsed_secs / 3600;
        let minutes = (self.elapsed_secs / 60) % 60;
        let seconds = self.elapsed_secs % 60;
        (hours, minutes, seconds)
    }

    /// Renders the components as zero-padded display strings.
    pub fn display(&self) -> TimeDisplay {
        let (h, m, s) = self.components();
        TimeDisplay {
            hours: format!("{:02}", h),
            minutes: format!("{:02}", m),
            seconds: format!("{:02}", s),
        }
    }
}

/// Padded display components for the elapsed time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeDisplay {
    /// Hours, zero-padded to at least two digits
    pub hours: String,
    /// Minutes, "00"-"59"
    pub minutes: String,
    /// Seconds, "00"-"59"
    pub seconds: String,
}

// ============================================================================
// SubjectRef
// ============================================================================

/// The subject a timer run is associated with.
///
/// Carries the name snapshot taken when the run started so the recorded
/// session keeps its label even if the subject is renamed later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectRef {
    /// Persisted subject identifier
    pub id: i64,
    /// Subject name at the time the run started
    pub name: String,
}

// ============================================================================
// TimerRun
// ============================================================================

/// The transient state of the single study-timer run.
///
/// Never persisted; only the derived [`crate::store::Session`] is written,
/// and only when a run finishes with a valid duration.
#[derive(Debug, Clone, Default)]
pub struct TimerRun {
    /// Current phase
    pub phase: TimerPhase,
    /// Accumulated elapsed time
    pub clock: StudyClock,
    /// Subject selected for this run, if any
    pub subject: Option<SubjectRef>,
}

impl TimerRun {
    /// Creates a fresh run in the cancelled state with a zero clock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts or resumes the run.
    ///
    /// A no-op while already running. Starting from `Cancelled` counts from
    /// zero (cancel resets the clock); starting from `Paused` resumes with
    /// the retained elapsed time. A subject passed here replaces the current
    /// selection.
    pub fn start(&mut self, subject: Option<SubjectRef>) {
        if self.phase == TimerPhase::Running {
            return;
        }
        if let Some(subject) = subject {
            self.subject = Some(subject);
        }
        self.phase = TimerPhase::Running;
    }

    /// Pauses a running timer, retaining the elapsed time.
    ///
    /// A no-op unless running.
    pub fn pause(&mut self) {
        if self.phase == TimerPhase::Running {
            self.phase = TimerPhase::Paused;
        }
    }

    /// Cancels the run: stops ticking, resets the clock and clears the
    /// subject selection.
    pub fn cancel(&mut self) {
        self.phase = TimerPhase::Cancelled;
        self.clock.reset();
        self.subject = None;
    }

    /// Returns true if a tick should advance the clock.
    pub fn is_running(&self) -> bool {
        self.phase.is_running()
    }
}

// ============================================================================
// IPC Types
// ============================================================================

/// IPC request from client to daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum IpcRequest {
    /// Start or resume the timer, optionally selecting a subject
    Start {
        /// Subject to associate the run with
        #[serde(rename = "subjectId", skip_serializing_if = "Option::is_none")]
        subject_id: Option<i64>,
    },
    /// Pause the running timer
    Pause,
    /// Cancel the run, discarding the elapsed time
    Cancel,
    /// Finish the run and record a session
    Finish,
    /// Query the current timer state
    Status,
}

/// Response data for IPC responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseData {
    /// Current phase
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Elapsed seconds
    #[serde(rename = "elapsedSeconds", skip_serializing_if = "Option::is_none")]
    pub elapsed_seconds: Option<u64>,
    /// Padded hour component
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hours: Option<String>,
    /// Padded minute component
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minutes: Option<String>,
    /// Padded second component
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seconds: Option<String>,
    /// Selected subject identifier
    #[serde(rename = "subjectId", skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<i64>,
    /// Selected subject name
    #[serde(rename = "subjectName", skip_serializing_if = "Option::is_none")]
    pub subject_name: Option<String>,
}

impl ResponseData {
    /// Creates response data from the current timer run.
    pub fn from_timer_run(run: &TimerRun) -> Self {
        let display = run.clock.display();
        Self {
            state: Some(run.phase.as_str().to_string()),
            elapsed_seconds: Some(run.clock.elapsed_secs()),
            hours: Some(display.hours),
            minutes: Some(display.minutes),
            seconds: Some(display.seconds),
            subject_id: run.subject.as_ref().map(|s| s.id),
            subject_name: run.subject.as_ref().map(|s| s.name.clone()),
        }
    }
}

/// IPC response from daemon to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpcResponse {
    /// Response status ("success" or "error")
    pub status: String,
    /// Human-readable message
    pub message: String,
    /// Optional response data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

impl IpcResponse {
    /// Creates a success response.
    pub fn success(message: impl Into<String>, data: Option<ResponseData>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
            data,
        }
    }

    /// Creates an error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            data: None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
