//! Daemon module for the study timer.
//!
//! This module contains the background service:
//! - `timer`: count-up engine with state transitions and the 1 s ticker
//! - `recorder`: validation and persistence of finished runs
//! - `notify`: foreground notifier trait, event pump and command bridge
//! - `ipc`: Unix-socket server and request handler

pub mod ipc;
pub mod notify;
pub mod recorder;
pub mod timer;

pub use ipc::{IpcServer, RequestHandler};
pub use notify::{ForegroundNotifier, LogNotifier, MockNotifier, NotifierBridge};
pub use recorder::{RecordError, SessionRecorder, DEFAULT_MIN_SESSION_SECS};
pub use timer::{FinishedRun, TimerEngine, TimerEvent};

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

use crate::store::Database;
use crate::types::IpcResponse;

/// Configuration for a daemon instance.
pub struct DaemonConfig {
    /// Unix socket to serve IPC on
    pub socket_path: PathBuf,
    /// SQLite database location
    pub db_path: PathBuf,
    /// Minimum recordable run length in seconds
    pub min_session_secs: u64,
}

/// Runs the daemon until ctrl-c.
///
/// Wires the store, timer engine, notifier pump, recorder and IPC server
/// together, then serves connections one task each.
pub async fn run(config: DaemonConfig) -> Result<()> {
    let store = Database::open(config.db_path.clone())
        .with_context(|| format!("Failed to open database at {}", config.db_path.display()))?;

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let engine = Arc::new(Mutex::new(TimerEngine::new(event_tx)));

    let handler = Arc::new(RequestHandler::new(
        NotifierBridge::new(engine.clone()),
        SessionRecorder::new(store.clone(), config.min_session_secs),
        store.clone(),
    ));

    let server = IpcServer::new(&config.socket_path)?;

    let ticker = tokio::spawn(TimerEngine::run(engine));
    let notifier: Arc<dyn ForegroundNotifier> = Arc::new(LogNotifier);
    let pump = tokio::spawn(notify::pump_events(event_rx, notifier));

    info!("daemon listening on {}", config.socket_path.display());

    loop {
        tokio::select! {
            accepted = server.accept() => {
                match accepted {
                    Ok(mut stream) => {
                        let handler = Arc::clone(&handler);
                        tokio::spawn(async move {
                            let response = match IpcServer::receive_request(&mut stream).await {
                                Ok(request) => handler.handle(request).await,
                                Err(e) => IpcResponse::error(e.to_string()),
                            };
                            if let Err(e) = IpcServer::send_response(&mut stream, &response).await {
                                warn!("failed to send response: {e:#}");
                            }
                        });
                    }
                    Err(e) => warn!("failed to accept connection: {e:#}"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
        }
    }

    ticker.abort();
    pump.abort();
    Ok(())
}
