//! Persistent entities: subjects, sessions and tasks.
//!
//! Identifiers are SQLite rowids and stay `None` until the entity has been
//! persisted. Sessions and tasks carry a denormalized subject-name snapshot
//! taken at save time.

use serde::{Deserialize, Serialize};

// ============================================================================
// Validation bounds
// ============================================================================

/// Maximum subject name length in characters.
pub const SUBJECT_NAME_MAX_CHARS: usize = 20;

/// Inclusive goal-hours range for a subject.
pub const GOAL_HOURS_RANGE: std::ops::RangeInclusive<f32> = 1.0..=1000.0;

/// Validation failures for user-supplied entity fields.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// Subject name empty or whitespace-only
    #[error("Subject name must not be blank")]
    BlankSubjectName,

    /// Subject name over the character limit
    #[error("Subject name must be at most {SUBJECT_NAME_MAX_CHARS} characters")]
    SubjectNameTooLong,

    /// Goal hours outside the accepted range
    #[error("Goal hours must be between 1 and 1000")]
    GoalHoursOutOfRange,
}

// ============================================================================
// Subject
// ============================================================================

/// A user-defined study topic with a goal-hours target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    /// Rowid, `None` until persisted
    pub id: Option<i64>,
    /// Display name (1-20 chars, non-blank)
    pub name: String,
    /// Target study hours (1-1000)
    pub goal_hours: f32,
    /// Display-only ARGB card colors
    pub colors: Vec<u32>,
}

impl Subject {
    /// Creates an unpersisted subject.
    pub fn new(name: impl Into<String>, goal_hours: f32) -> Self {
        Self {
            id: None,
            name: name.into(),
            goal_hours,
            colors: Vec::new(),
        }
    }

    /// Validates the name and goal-hour bounds.
    ///
    /// Enforced on every create/update before the store is touched.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::BlankSubjectName);
        }
        if self.name.chars().count() > SUBJECT_NAME_MAX_CHARS {
            return Err(ValidationError::SubjectNameTooLong);
        }
        if !GOAL_HOURS_RANGE.contains(&self.goal_hours) {
            return Err(ValidationError::GoalHoursOutOfRange);
        }
        Ok(())
    }
}

// ============================================================================
// Session
// ============================================================================

/// A persisted record of one completed study run.
///
/// Created only by the session recorder when a timer run finishes
/// successfully; never mutated afterwards except deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Rowid, `None` until persisted
    pub id: Option<i64>,
    /// Owning subject
    pub subject_id: i64,
    /// Subject name snapshot captured at save time
    pub subject_name: String,
    /// Creation timestamp, epoch milliseconds
    pub date: i64,
    /// Run length in whole seconds
    pub duration_secs: u64,
}

// ============================================================================
// Priority
// ============================================================================

/// Task priority level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    /// Returns the integer encoding stored in the database.
    pub fn as_i64(&self) -> i64 {
        match self {
            Priority::Low => 0,
            Priority::Medium => 1,
            Priority::High => 2,
        }
    }

    /// Decodes a stored priority value; unknown values map to `Medium`.
    pub fn from_i64(value: i64) -> Self {
        match value {
            0 => Priority::Low,
            2 => Priority::High,
            _ => Priority::Medium,
        }
    }

    /// Returns the display title.
    pub fn title(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

// ============================================================================
// Task
// ============================================================================

/// A to-do item linked to a subject. Lifecycle independent of the timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Rowid, `None` until persisted
    pub id: Option<i64>,
    pub title: String,
    pub description: String,
    /// Due date, epoch milliseconds
    pub due_date: i64,
    pub priority: Priority,
    /// Subject name snapshot
    pub subject_name: String,
    /// Owning subject
    pub subject_id: i64,
    pub complete: bool,
}

// ============================================================================
// Tests
// ============================================================================
