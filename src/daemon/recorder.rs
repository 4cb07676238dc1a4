//! Session recorder.
//!
//! Turns a finished timer run into a persisted session, enforcing the two
//! recording rules: a subject must be selected, and the run must meet the
//! minimum duration. Validation order is fixed so a short run with no
//! subject reports the missing subject first.

use anyhow::Result;
use chrono::Utc;

use crate::store::{Database, Session};
use crate::types::SubjectRef;

/// Default minimum recordable run length in seconds.
pub const DEFAULT_MIN_SESSION_SECS: u64 = 36;

// ============================================================================
// RecordError
// ============================================================================

/// Reasons a finished run cannot be recorded.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// No subject was selected for the run
    #[error("Choose Related to Subject first")]
    NoSubjectSelected,

    /// Run shorter than the configured minimum
    #[error("Session should be at least {min_secs} seconds long")]
    TooShort {
        /// Configured minimum in seconds
        min_secs: u64,
    },

    /// Store failure while saving or deleting
    #[error(transparent)]
    Persistence(#[from] anyhow::Error),
}

// ============================================================================
// SessionRecorder
// ============================================================================

/// Validates finished runs and writes them to the store.
pub struct SessionRecorder {
    store: Database,
    min_session_secs: u64,
}

impl SessionRecorder {
    /// Creates a recorder with the given minimum run length.
    pub fn new(store: Database, min_session_secs: u64) -> Self {
        Self {
            store,
            min_session_secs,
        }
    }

    /// Returns the configured minimum run length in seconds.
    pub fn min_session_secs(&self) -> u64 {
        self.min_session_secs
    }

    /// Records a finished run as a session.
    ///
    /// The subject check runs before the duration check. The session date is
    /// the wall-clock time at save, in epoch milliseconds.
    pub async fn record(
        &self,
        subject: Option<SubjectRef>,
        elapsed_secs: u64,
    ) -> Result<Session, RecordError> {
        let subject = subject.ok_or(RecordError::NoSubjectSelected)?;

        if elapsed_secs < self.min_session_secs {
            return Err(RecordError::TooShort {
                min_secs: self.min_session_secs,
            });
        }

        let mut session = Session {
            id: None,
            subject_id: subject.id,
            subject_name: subject.name,
            date: Utc::now().timestamp_millis(),
            duration_secs: elapsed_secs,
        };

        let id = self.store.upsert_session(&session).await?;
        session.id = Some(id);
        Ok(session)
    }

    /// Deletes a previously recorded session.
    pub async fn delete(&self, session_id: i64) -> Result<(), RecordError> {
        self.store.delete_session(session_id).await?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
