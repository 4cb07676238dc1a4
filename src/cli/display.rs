//! Display utilities for the StudySmart CLI.
//!
//! This module provides formatted output for:
//! - Timer command results and status
//! - Subject, task and session listings
//! - The dashboard summary
//! - Error messages

use chrono::DateTime;

use crate::store::{DashboardSnapshot, Session, Subject, Task};
use crate::types::IpcResponse;

// ============================================================================
// Display
// ============================================================================

/// Display utilities for CLI output.
pub struct Display;

impl Display {
    /// Shows the result of a timer command (start, pause, cancel, finish).
    pub fn show_timer_result(response: &IpcResponse) {
        if !response.message.is_empty() {
            println!("{}", response.message);
        }

        if let Some(data) = &response.data {
            if data.state.as_deref() == Some("cancelled") {
                return;
            }
            if let (Some(h), Some(m), Some(s)) = (&data.hours, &data.minutes, &data.seconds) {
                println!("  Elapsed: {}:{}:{}", h, m, s);
            }
            if let Some(name) = &data.subject_name {
                println!("  Subject: {}", name);
            }
        }
    }

    /// Shows the current timer status.
    pub fn show_status(response: &IpcResponse) {
        println!("Study timer status");
        println!("------------------");

        match &response.data {
            Some(data) => {
                let state = data.state.as_deref().unwrap_or("unknown");
                println!("State: {}", state);

                if state != "cancelled" {
                    if let (Some(h), Some(m), Some(s)) =
                        (&data.hours, &data.minutes, &data.seconds)
                    {
                        println!("Elapsed: {}:{}:{}", h, m, s);
                    }
                    match &data.subject_name {
                        Some(name) => println!("Subject: {}", name),
                        None => println!("Subject: (none)"),
                    }
                }
            }
            None => println!("The daemon is not reporting any state"),
        }
    }

    /// Shows a subject listing.
    pub fn show_subjects(subjects: &[Subject]) {
        if subjects.is_empty() {
            println!("No subjects yet. Add one with 'studysmart subject add <name>'");
            return;
        }

        println!("{:<6} {:<22} {:>10}", "ID", "NAME", "GOAL (h)");
        for subject in subjects {
            println!(
                "{:<6} {:<22} {:>10.1}",
                subject.id.unwrap_or_default(),
                subject.name,
                subject.goal_hours
            );
        }
    }

    /// Shows a task listing.
    pub fn show_tasks(tasks: &[Task]) {
        if tasks.is_empty() {
            println!("No tasks to show");
            return;
        }

        println!(
            "{:<6} {:<30} {:<12} {:<8} {:<20}",
            "ID", "TITLE", "DUE", "PRIO", "SUBJECT"
        );
        for task in tasks {
            println!(
                "{:<6} {:<30} {:<12} {:<8} {:<20}",
                task.id.unwrap_or_default(),
                truncate(&task.title, 30),
                format_date(task.due_date),
                task.priority.title(),
                truncate(&task.subject_name, 20)
            );
        }
    }

    /// Shows a session listing.
    pub fn show_sessions(sessions: &[Session]) {
        if sessions.is_empty() {
            println!("No sessions recorded yet");
            return;
        }

        println!(
            "{:<6} {:<20} {:<17} {:>10}",
            "ID", "SUBJECT", "DATE", "DURATION"
        );
        for session in sessions {
            println!(
                "{:<6} {:<20} {:<17} {:>10}",
                session.id.unwrap_or_default(),
                truncate(&session.subject_name, 20),
                format_datetime(session.date),
                format_duration(session.duration_secs)
            );
        }
    }

    /// Shows the dashboard summary.
    pub fn show_dashboard(snapshot: &DashboardSnapshot) {
        println!("StudySmart dashboard");
        println!("--------------------");
        println!("Subjects:          {}", snapshot.subject_count);
        println!("Total goal hours:  {:.1}", snapshot.total_goal_hours);
        println!(
            "Total studied:     {}",
            format_duration(snapshot.total_duration_secs)
        );

        if !snapshot.recent_sessions.is_empty() {
            println!();
            println!("Recent sessions:");
            Self::show_sessions(&snapshot.recent_sessions);
        }
    }

    /// Shows an error message.
    pub fn show_error(message: &str) {
        eprintln!("Error: {}", message);
    }
}

// ============================================================================
// Formatting helpers
// ============================================================================

/// Formats a duration in seconds as HH:MM:SS.
fn format_duration(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs / 60) % 60;
    let seconds = total_secs % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Formats an epoch-millisecond timestamp as a date.
fn format_date(epoch_ms: i64) -> String {
    DateTime::from_timestamp_millis(epoch_ms)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Formats an epoch-millisecond timestamp as date and time.
fn format_datetime(epoch_ms: i64) -> String {
    DateTime::from_timestamp_millis(epoch_ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Truncates a string to `max` characters, appending an ellipsis if cut.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}

// ============================================================================
// Tests
// ============================================================================
