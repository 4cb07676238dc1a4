//! IPC server for the study timer daemon.
//!
//! This module provides Unix Domain Socket IPC functionality:
//! - Server that listens on a Unix socket
//! - Request/response handling for timer commands
//! - Dispatch to the notifier bridge and session recorder

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::time::{timeout, Duration};

use crate::store::Database;
use crate::types::{IpcRequest, IpcResponse, ResponseData, SubjectRef};

use super::notify::NotifierBridge;
use super::recorder::SessionRecorder;

// ============================================================================
// Constants
// ============================================================================

/// Maximum request size in bytes (4KB)
const MAX_REQUEST_SIZE: usize = 4096;

/// Read timeout in seconds
const READ_TIMEOUT_SECS: u64 = 5;

// ============================================================================
// IpcError
// ============================================================================

/// IPC-specific error types.
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    /// Socket binding error
    #[error("Failed to bind socket: {0}")]
    BindError(String),

    /// Read error
    #[error("Failed to read request: {0}")]
    ReadError(String),

    /// Timeout error
    #[error("Operation timed out")]
    Timeout,

    /// Request too large
    #[error("Request too large (max {MAX_REQUEST_SIZE} bytes)")]
    RequestTooLarge,
}

// ============================================================================
// IpcServer
// ============================================================================

/// Unix Domain Socket IPC server.
pub struct IpcServer {
    /// Unix socket listener
    listener: UnixListener,
    /// Socket path (for cleanup)
    socket_path: PathBuf,
}

impl IpcServer {
    /// Creates a new IPC server bound to the specified socket path.
    ///
    /// If the socket file already exists, it will be removed before binding.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound.
    pub fn new(socket_path: &Path) -> Result<Self> {
        // Remove existing socket file if present
        if socket_path.exists() {
            std::fs::remove_file(socket_path)
                .with_context(|| format!("Failed to remove existing socket: {:?}", socket_path))?;
        }

        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create socket directory: {:?}", parent))?;
        }

        let listener = UnixListener::bind(socket_path)
            .with_context(|| format!("Failed to bind Unix socket: {:?}", socket_path))?;

        Ok(Self {
            listener,
            socket_path: socket_path.to_path_buf(),
        })
    }

    /// Accepts an incoming client connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be accepted.
    pub async fn accept(&self) -> Result<UnixStream> {
        let (stream, _addr) = self
            .listener
            .accept()
            .await
            .context("Failed to accept connection")?;
        Ok(stream)
    }

    /// Receives and deserializes an IPC request from the stream.
    ///
    /// Applies a read timeout to prevent blocking indefinitely.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or deserialization fails.
    pub async fn receive_request(stream: &mut UnixStream) -> Result<IpcRequest> {
        let mut buffer = vec![0u8; MAX_REQUEST_SIZE];

        let read_result = timeout(
            Duration::from_secs(READ_TIMEOUT_SECS),
            stream.read(&mut buffer),
        )
        .await;

        let n = match read_result {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(IpcError::ReadError(e.to_string()).into()),
            Err(_) => return Err(IpcError::Timeout.into()),
        };

        if n == 0 {
            anyhow::bail!("Connection closed by client");
        }

        let request: IpcRequest = serde_json::from_slice(&buffer[..n])
            .with_context(|| "Failed to deserialize IPC request")?;

        Ok(request)
    }

    /// Serializes and sends an IPC response to the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub async fn send_response(stream: &mut UnixStream, response: &IpcResponse) -> Result<()> {
        let json = serde_json::to_vec(response).context("Failed to serialize IPC response")?;

        stream
            .write_all(&json)
            .await
            .context("Failed to write response")?;
        stream.flush().await.context("Failed to flush response")?;

        Ok(())
    }

    /// Returns the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        // Clean up socket file on drop
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

// ============================================================================
// RequestHandler
// ============================================================================

/// Handles IPC requests by dispatching to the bridge and recorder.
pub struct RequestHandler {
    /// Command surface over the shared timer engine
    bridge: NotifierBridge,
    /// Recorder that persists finished runs
    recorder: SessionRecorder,
    /// Store, used to resolve subject selections
    store: Database,
}

impl RequestHandler {
    /// Creates a new request handler.
    pub fn new(bridge: NotifierBridge, recorder: SessionRecorder, store: Database) -> Self {
        Self {
            bridge,
            recorder,
            store,
        }
    }

    /// Handles an IPC request and returns the appropriate response.
    pub async fn handle(&self, request: IpcRequest) -> IpcResponse {
        match request {
            IpcRequest::Start { subject_id } => self.handle_start(subject_id).await,
            IpcRequest::Pause => self.handle_pause().await,
            IpcRequest::Cancel => self.handle_cancel().await,
            IpcRequest::Finish => self.handle_finish().await,
            IpcRequest::Status => self.handle_status().await,
        }
    }

    /// Handles the start command, resolving the subject selection first.
    async fn handle_start(&self, subject_id: Option<i64>) -> IpcResponse {
        let subject = match subject_id {
            Some(id) => match self.store.get_subject_by_id(id).await {
                Ok(Some(subject)) => Some(SubjectRef {
                    // id is always set on a row read back from the store
                    id: subject.id.unwrap_or(id),
                    name: subject.name,
                }),
                Ok(None) => return IpcResponse::error("Subject not found"),
                Err(e) => return IpcResponse::error(e.to_string()),
            },
            None => None,
        };

        match self.bridge.request_start(subject).await {
            Ok(run) => {
                IpcResponse::success("Timer started", Some(ResponseData::from_timer_run(&run)))
            }
            Err(e) => IpcResponse::error(e.to_string()),
        }
    }

    /// Handles the pause command.
    async fn handle_pause(&self) -> IpcResponse {
        match self.bridge.request_pause().await {
            Ok(run) => {
                IpcResponse::success("Timer paused", Some(ResponseData::from_timer_run(&run)))
            }
            Err(e) => IpcResponse::error(e.to_string()),
        }
    }

    /// Handles the cancel command.
    async fn handle_cancel(&self) -> IpcResponse {
        match self.bridge.request_cancel().await {
            Ok(run) => {
                IpcResponse::success("Timer cancelled", Some(ResponseData::from_timer_run(&run)))
            }
            Err(e) => IpcResponse::error(e.to_string()),
        }
    }

    /// Handles the finish command.
    ///
    /// The engine resets before the recorder runs; a rejected or failed save
    /// still leaves the timer at zero.
    async fn handle_finish(&self) -> IpcResponse {
        let finished = match self.bridge.request_finish().await {
            Ok(finished) => finished,
            Err(e) => return IpcResponse::error(e.to_string()),
        };

        match self
            .recorder
            .record(finished.subject, finished.elapsed_secs)
            .await
        {
            Ok(_session) => {
                let run = self.bridge.snapshot().await;
                IpcResponse::success(
                    "Session saved successfully",
                    Some(ResponseData::from_timer_run(&run)),
                )
            }
            Err(e) => IpcResponse::error(e.to_string()),
        }
    }

    /// Handles the status command.
    async fn handle_status(&self) -> IpcResponse {
        let run = self.bridge.snapshot().await;
        IpcResponse::success("", Some(ResponseData::from_timer_run(&run)))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::{mpsc, Mutex};

    use crate::daemon::recorder::DEFAULT_MIN_SESSION_SECS;
    use crate::daemon::timer::{TimerEngine, TimerEvent};
    use crate::store::Subject;

    // ------------------------------------------------------------------------
    // Helper functions
    // ------------------------------------------------------------------------

    fn create_temp_socket_path() -> PathBuf {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.sock");
        // Keep the directory so it's not deleted
        std::mem::forget(dir);
        path
    }

    struct Fixture {
        handler: RequestHandler,
        engine: Arc<Mutex<TimerEngine>>,
        store: Database,
        _event_rx: mpsc::UnboundedReceiver<TimerEvent>,
    }

    async fn create_handler() -> Fixture {
        let (tx, rx) = mpsc::unbounded_channel();
        let engine = Arc::new(Mutex::new(TimerEngine::new(tx)));
        let store = Database::open_in_memory().unwrap();
        let handler = RequestHandler::new(
            NotifierBridge::new(engine.clone()),
            SessionRecorder::new(store.clone(), DEFAULT_MIN_SESSION_SECS),
            store.clone(),
        );
        Fixture {
            handler,
            engine,
            store,
            _event_rx: rx,
        }
    }

    async fn add_subject(store: &Database, name: &str) -> i64 {
        store.upsert_subject(&Subject::new(name, 10.0)).await.unwrap()
    }

    async fn tick(engine: &Arc<Mutex<TimerEngine>>, times: u64) {
        let mut engine = engine.lock().await;
        for _ in 0..times {
            engine.on_tick().unwrap();
        }
    }

    // ------------------------------------------------------------------------
    // IpcServer Tests
    // ------------------------------------------------------------------------

    mod ipc_server_tests {
        use super::*;

        #[tokio::test]
        async fn test_server_creation() {
            let socket_path = create_temp_socket_path();
            let server = IpcServer::new(&socket_path);

            assert!(server.is_ok());
            assert!(socket_path.exists());

            drop(server);
        }

        #[tokio::test]
        async fn test_server_removes_existing_socket() {
            let socket_path = create_temp_socket_path();

            std::fs::write(&socket_path, "dummy").unwrap();

            let server = IpcServer::new(&socket_path);
            assert!(server.is_ok());
        }

        #[tokio::test]
        async fn test_server_creates_parent_directory() {
            let dir = tempfile::tempdir().unwrap();
            let socket_path = dir.path().join("subdir").join("test.sock");

            let server = IpcServer::new(&socket_path);
            assert!(server.is_ok());
            assert!(socket_path.parent().unwrap().exists());
        }

        #[tokio::test]
        async fn test_receive_request_status() {
            let socket_path = create_temp_socket_path();
            let server = IpcServer::new(&socket_path).unwrap();

            let client_path = socket_path.clone();
            let client_handle = tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                let mut stream = UnixStream::connect(&client_path).await.unwrap();
                let request = r#"{"command":"status"}"#;
                stream.write_all(request.as_bytes()).await.unwrap();
                stream.flush().await.unwrap();
            });

            let mut stream = server.accept().await.unwrap();
            let request = IpcServer::receive_request(&mut stream).await;

            assert!(request.is_ok());
            assert!(matches!(request.unwrap(), IpcRequest::Status));

            client_handle.await.unwrap();
        }

        #[tokio::test]
        async fn test_receive_request_start_with_subject() {
            let socket_path = create_temp_socket_path();
            let server = IpcServer::new(&socket_path).unwrap();

            let client_path = socket_path.clone();
            let client_handle = tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                let mut stream = UnixStream::connect(&client_path).await.unwrap();
                let request = r#"{"command":"start","subjectId":7}"#;
                stream.write_all(request.as_bytes()).await.unwrap();
                stream.flush().await.unwrap();
            });

            let mut stream = server.accept().await.unwrap();
            let request = IpcServer::receive_request(&mut stream).await;

            assert!(request.is_ok());
            if let IpcRequest::Start { subject_id } = request.unwrap() {
                assert_eq!(subject_id, Some(7));
            } else {
                panic!("Expected Start request");
            }

            client_handle.await.unwrap();
        }

        #[tokio::test]
        async fn test_send_response() {
            let socket_path = create_temp_socket_path();
            let server = IpcServer::new(&socket_path).unwrap();

            let client_path = socket_path.clone();
            let client_handle = tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                let mut stream = UnixStream::connect(&client_path).await.unwrap();

                let mut buffer = vec![0u8; 4096];
                let n = stream.read(&mut buffer).await.unwrap();
                let response: IpcResponse = serde_json::from_slice(&buffer[..n]).unwrap();
                response
            });

            let mut stream = server.accept().await.unwrap();
            let response = IpcResponse::success("Test message", None);
            IpcServer::send_response(&mut stream, &response)
                .await
                .unwrap();

            let received = client_handle.await.unwrap();
            assert_eq!(received.status, "success");
            assert_eq!(received.message, "Test message");
        }

        #[tokio::test]
        async fn test_receive_request_invalid_json() {
            let socket_path = create_temp_socket_path();
            let server = IpcServer::new(&socket_path).unwrap();

            let client_path = socket_path.clone();
            let _client_handle = tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                let mut stream = UnixStream::connect(&client_path).await.unwrap();
                let invalid_json = "not valid json";
                stream.write_all(invalid_json.as_bytes()).await.unwrap();
                stream.flush().await.unwrap();
            });

            let mut stream = server.accept().await.unwrap();
            let request = IpcServer::receive_request(&mut stream).await;

            assert!(request.is_err());
        }

        #[tokio::test]
        async fn test_server_drop_cleanup() {
            let socket_path = create_temp_socket_path();

            {
                let _server = IpcServer::new(&socket_path).unwrap();
                assert!(socket_path.exists());
            }

            // Socket file should be removed after drop
            assert!(!socket_path.exists());
        }
    }

    // ------------------------------------------------------------------------
    // RequestHandler Tests
    // ------------------------------------------------------------------------

    mod request_handler_tests {
        use super::*;

        #[tokio::test]
        async fn test_handle_status_initial() {
            let f = create_handler().await;

            let response = f.handler.handle(IpcRequest::Status).await;

            assert_eq!(response.status, "success");
            let data = response.data.unwrap();
            assert_eq!(data.state, Some("cancelled".to_string()));
            assert_eq!(data.elapsed_seconds, Some(0));
            assert_eq!(data.hours, Some("00".to_string()));
        }

        #[tokio::test]
        async fn test_handle_start_with_known_subject() {
            let f = create_handler().await;
            let id = add_subject(&f.store, "Physics").await;

            let response = f
                .handler
                .handle(IpcRequest::Start {
                    subject_id: Some(id),
                })
                .await;

            assert_eq!(response.status, "success");
            assert_eq!(response.message, "Timer started");

            let data = response.data.unwrap();
            assert_eq!(data.state, Some("running".to_string()));
            assert_eq!(data.subject_id, Some(id));
            assert_eq!(data.subject_name, Some("Physics".to_string()));
        }

        #[tokio::test]
        async fn test_handle_start_unknown_subject() {
            let f = create_handler().await;

            let response = f
                .handler
                .handle(IpcRequest::Start {
                    subject_id: Some(999),
                })
                .await;

            assert_eq!(response.status, "error");
            assert_eq!(response.message, "Subject not found");

            // Timer untouched
            let status = f.handler.handle(IpcRequest::Status).await;
            assert_eq!(status.data.unwrap().state, Some("cancelled".to_string()));
        }

        #[tokio::test]
        async fn test_handle_start_without_subject() {
            let f = create_handler().await;

            let response = f.handler.handle(IpcRequest::Start { subject_id: None }).await;

            assert_eq!(response.status, "success");
            let data = response.data.unwrap();
            assert_eq!(data.state, Some("running".to_string()));
            assert_eq!(data.subject_id, None);
        }

        #[tokio::test]
        async fn test_handle_pause_and_resume() {
            let f = create_handler().await;

            f.handler.handle(IpcRequest::Start { subject_id: None }).await;
            tick(&f.engine, 3).await;

            let response = f.handler.handle(IpcRequest::Pause).await;
            assert_eq!(response.status, "success");
            assert_eq!(response.message, "Timer paused");
            let data = response.data.unwrap();
            assert_eq!(data.state, Some("paused".to_string()));
            assert_eq!(data.elapsed_seconds, Some(3));

            // Resuming keeps the elapsed time
            let response = f.handler.handle(IpcRequest::Start { subject_id: None }).await;
            let data = response.data.unwrap();
            assert_eq!(data.state, Some("running".to_string()));
            assert_eq!(data.elapsed_seconds, Some(3));
        }

        #[tokio::test]
        async fn test_handle_cancel() {
            let f = create_handler().await;
            let id = add_subject(&f.store, "Math").await;

            f.handler
                .handle(IpcRequest::Start {
                    subject_id: Some(id),
                })
                .await;
            tick(&f.engine, 10).await;

            let response = f.handler.handle(IpcRequest::Cancel).await;

            assert_eq!(response.status, "success");
            assert_eq!(response.message, "Timer cancelled");
            let data = response.data.unwrap();
            assert_eq!(data.state, Some("cancelled".to_string()));
            assert_eq!(data.elapsed_seconds, Some(0));
            assert_eq!(data.subject_id, None);
        }

        #[tokio::test]
        async fn test_handle_finish_saves_session() {
            let f = create_handler().await;
            let id = add_subject(&f.store, "Math").await;

            f.handler
                .handle(IpcRequest::Start {
                    subject_id: Some(id),
                })
                .await;
            tick(&f.engine, 40).await;

            let response = f.handler.handle(IpcRequest::Finish).await;

            assert_eq!(response.status, "success");
            assert_eq!(response.message, "Session saved successfully");
            assert_eq!(
                response.data.unwrap().state,
                Some("cancelled".to_string())
            );

            let sessions = f.store.get_all_sessions().await.unwrap();
            assert_eq!(sessions.len(), 1);
            assert_eq!(sessions[0].subject_id, id);
            assert_eq!(sessions[0].duration_secs, 40);
        }

        #[tokio::test]
        async fn test_handle_finish_no_subject() {
            let f = create_handler().await;

            f.handler.handle(IpcRequest::Start { subject_id: None }).await;
            tick(&f.engine, 40).await;

            let response = f.handler.handle(IpcRequest::Finish).await;

            assert_eq!(response.status, "error");
            assert_eq!(response.message, "Choose Related to Subject first");

            // Timer reset anyway
            let status = f.handler.handle(IpcRequest::Status).await;
            assert_eq!(status.data.unwrap().elapsed_seconds, Some(0));
            assert!(f.store.get_all_sessions().await.unwrap().is_empty());
        }

        #[tokio::test]
        async fn test_handle_finish_too_short() {
            let f = create_handler().await;
            let id = add_subject(&f.store, "Math").await;

            f.handler
                .handle(IpcRequest::Start {
                    subject_id: Some(id),
                })
                .await;
            tick(&f.engine, 35).await;

            let response = f.handler.handle(IpcRequest::Finish).await;

            assert_eq!(response.status, "error");
            assert_eq!(
                response.message,
                "Session should be at least 36 seconds long"
            );

            let status = f.handler.handle(IpcRequest::Status).await;
            assert_eq!(status.data.unwrap().elapsed_seconds, Some(0));
            assert!(f.store.get_all_sessions().await.unwrap().is_empty());
        }
    }

    // ------------------------------------------------------------------------
    // Integration Tests
    // ------------------------------------------------------------------------

    mod integration_tests {
        use super::*;

        #[tokio::test]
        async fn test_full_ipc_flow() {
            let socket_path = create_temp_socket_path();
            let server = IpcServer::new(&socket_path).unwrap();
            let f = create_handler().await;
            let id = add_subject(&f.store, "History").await;

            let client_path = socket_path.clone();
            let client_handle = tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                let mut stream = UnixStream::connect(&client_path).await.unwrap();

                let request = format!(r#"{{"command":"start","subjectId":{id}}}"#);
                stream.write_all(request.as_bytes()).await.unwrap();
                stream.flush().await.unwrap();

                let mut buffer = vec![0u8; 4096];
                let n = stream.read(&mut buffer).await.unwrap();
                let response: IpcResponse = serde_json::from_slice(&buffer[..n]).unwrap();
                response
            });

            let mut stream = server.accept().await.unwrap();
            let request = IpcServer::receive_request(&mut stream).await.unwrap();
            let response = f.handler.handle(request).await;
            IpcServer::send_response(&mut stream, &response)
                .await
                .unwrap();

            let client_response = client_handle.await.unwrap();
            assert_eq!(client_response.status, "success");
            assert_eq!(client_response.message, "Timer started");

            let data = client_response.data.unwrap();
            assert_eq!(data.state, Some("running".to_string()));
            assert_eq!(data.subject_name, Some("History".to_string()));
        }

        #[tokio::test]
        async fn test_all_commands_flow() {
            let f = create_handler().await;

            // start -> pause -> start (resume) -> cancel -> status
            let commands = vec![
                (r#"{"command":"start"}"#, "running"),
                (r#"{"command":"pause"}"#, "paused"),
                (r#"{"command":"start"}"#, "running"),
                (r#"{"command":"cancel"}"#, "cancelled"),
                (r#"{"command":"status"}"#, "cancelled"),
            ];

            for (cmd_json, expected_state) in commands {
                let request: IpcRequest = serde_json::from_str(cmd_json).unwrap();
                let response = f.handler.handle(request).await;

                assert_eq!(response.status, "success", "Command: {}", cmd_json);
                assert_eq!(
                    response.data.unwrap().state,
                    Some(expected_state.to_string()),
                    "Command: {}",
                    cmd_json
                );
            }
        }
    }

    // ------------------------------------------------------------------------
    // Error Handling Tests
    // ------------------------------------------------------------------------

    mod error_tests {
        use super::*;

        #[tokio::test]
        async fn test_connection_closed() {
            let socket_path = create_temp_socket_path();
            let server = IpcServer::new(&socket_path).unwrap();

            let client_path = socket_path.clone();
            let _client = tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                let stream = UnixStream::connect(&client_path).await.unwrap();
                // Close immediately without sending anything
                drop(stream);
            });

            let mut stream = server.accept().await.unwrap();
            let result = IpcServer::receive_request(&mut stream).await;

            assert!(result.is_err());
        }

        #[tokio::test]
        async fn test_ipc_error_display() {
            let err = IpcError::BindError("test error".to_string());
            assert_eq!(err.to_string(), "Failed to bind socket: test error");

            let err = IpcError::Timeout;
            assert_eq!(err.to_string(), "Operation timed out");

            let err = IpcError::RequestTooLarge;
            assert!(err.to_string().contains("4096"));
        }
    }
}
