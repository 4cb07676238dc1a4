//! StudySmart Library
//!
//! This library provides the core functionality for the StudySmart CLI.
//! It includes:
//! - Count-up timer engine for study sessions
//! - IPC server/client for daemon-CLI communication
//! - Session recorder with minimum-duration validation
//! - SQLite-backed store for subjects, tasks and sessions
//! - Dashboard feed with live aggregate statistics
//! - CLI command parsing and display utilities

pub mod cli;
pub mod daemon;
pub mod paths;
pub mod store;
pub mod types;

// Re-export commonly used types for convenience
pub use store::{Database, Priority, Session, Subject, Task};
pub use types::{
    IpcRequest, IpcResponse, ResponseData, StudyClock, SubjectRef, TimeDisplay, TimerPhase,
    TimerRun,
};
