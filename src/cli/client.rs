//! IPC client for communicating with the study timer daemon.
//!
//! This module provides:
//! - Unix Domain Socket client
//! - Request/response handling
//! - Connection retry logic
//! - Timeout handling

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::time::timeout;

use crate::types::{IpcRequest, IpcResponse};

// ============================================================================
// Constants
// ============================================================================

/// Connection timeout in seconds
const CONNECTION_TIMEOUT_SECS: u64 = 5;

/// Read/write timeout in seconds
const IO_TIMEOUT_SECS: u64 = 5;

/// Maximum response size in bytes (64KB)
const MAX_RESPONSE_SIZE: usize = 65536;

/// Maximum retry attempts
const MAX_RETRIES: u32 = 3;

/// Retry delay in milliseconds (base delay, multiplied by attempt number)
const RETRY_DELAY_MS: u64 = 500;

// ============================================================================
// IpcClient
// ============================================================================

/// IPC client for daemon communication.
pub struct IpcClient {
    /// Socket path
    socket_path: PathBuf,
    /// Connection timeout
    timeout: Duration,
}

impl IpcClient {
    /// Creates a new IPC client for the given socket path.
    pub fn new(socket_path: PathBuf) -> Self {
        Self {
            socket_path,
            timeout: Duration::from_secs(CONNECTION_TIMEOUT_SECS),
        }
    }

    /// Returns the socket path.
    pub fn socket_path(&self) -> &PathBuf {
        &self.socket_path
    }

    /// Sends a start command to the daemon.
    pub async fn start(&self, subject_id: Option<i64>) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Start { subject_id })
            .await
    }

    /// Sends a pause command to the daemon.
    pub async fn pause(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Pause).await
    }

    /// Sends a cancel command to the daemon.
    pub async fn cancel(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Cancel).await
    }

    /// Sends a finish command to the daemon.
    pub async fn finish(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Finish).await
    }

    /// Sends a status query to the daemon.
    pub async fn status(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Status).await
    }

    /// Sends a request to the daemon, retrying transport failures.
    ///
    /// Error responses from the daemon are final and never retried; resending
    /// a rejected command could hit a timer that has already moved on.
    async fn send_request_with_retry(&self, request: &IpcRequest) -> Result<IpcResponse> {
        let mut last_error = None;

        for attempt in 1..=MAX_RETRIES {
            match self.send_request(request).await {
                Ok(response) => {
                    if response.status == "error" {
                        anyhow::bail!("{}", response.message);
                    }
                    return Ok(response);
                }
                Err(e) => {
                    tracing::warn!("Request failed (attempt {}/{}): {}", attempt, MAX_RETRIES, e);
                    last_error = Some(e);

                    if attempt < MAX_RETRIES {
                        let delay = Duration::from_millis(RETRY_DELAY_MS * u64::from(attempt));
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap())
    }

    /// Sends a single request to the daemon.
    async fn send_request(&self, request: &IpcRequest) -> Result<IpcResponse> {
        // Connect with timeout
        let mut stream = timeout(self.timeout, UnixStream::connect(&self.socket_path))
            .await
            .context("Connection timed out")?
            .context("Cannot reach the daemon. Start it with 'studysmart daemon'")?;

        // Serialize request
        let request_json =
            serde_json::to_string(request).context("Failed to serialize request")?;

        // Send request with timeout
        timeout(
            Duration::from_secs(IO_TIMEOUT_SECS),
            stream.write_all(request_json.as_bytes()),
        )
        .await
        .context("Write timed out")?
        .context("Failed to send request")?;

        // Flush
        timeout(Duration::from_secs(IO_TIMEOUT_SECS), stream.flush())
            .await
            .context("Flush timed out")?
            .context("Failed to flush request")?;

        // Shutdown write side to signal end of request
        stream
            .shutdown()
            .await
            .context("Failed to shut down write side")?;

        // Read response with timeout
        let mut buffer = vec![0u8; MAX_RESPONSE_SIZE];
        let n = timeout(
            Duration::from_secs(IO_TIMEOUT_SECS),
            stream.read(&mut buffer),
        )
        .await
        .context("Read timed out")?
        .context("Failed to receive response")?;

        if n == 0 {
            anyhow::bail!("No response from daemon");
        }

        // Deserialize response
        serde_json::from_slice(&buffer[..n]).context("Failed to parse response")
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResponseData;
    use std::sync::Arc;
    use tokio::net::UnixListener;
    use tokio::sync::Mutex;

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

    async fn create_mock_server(socket_path: &PathBuf) -> UnixListener {
        let _ = std::fs::remove_file(socket_path);
        if let Some(parent) = socket_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        UnixListener::bind(socket_path).unwrap()
    }

    fn running_data(elapsed: u64) -> ResponseData {
        ResponseData {
            state: Some("running".to_string()),
            elapsed_seconds: Some(elapsed),
            hours: Some("00".to_string()),
            minutes: Some(format!("{:02}", elapsed / 60)),
            seconds: Some(format!("{:02}", elapsed % 60)),
            subject_id: None,
            subject_name: None,
        }
    }

    // ------------------------------------------------------------------------
    // IpcClient Tests
    // ------------------------------------------------------------------------

    mod client_tests {
        use super::*;

        #[test]
        fn test_socket_path() {
            let path = PathBuf::from("/tmp/test.sock");
            let client = IpcClient::new(path.clone());
            assert_eq!(client.socket_path(), &path);
        }

        #[tokio::test]
        async fn test_connection_failure() {
            let socket_path = PathBuf::from("/tmp/nonexistent_socket_12345.sock");
            let client = IpcClient::new(socket_path);

            let result = client.status().await;
            assert!(result.is_err());
        }

        #[tokio::test]
        async fn test_send_status_request() {
            let socket_path = create_temp_socket_path();
            let listener = create_mock_server(&socket_path).await;

            let server_handle = tokio::spawn(async move {
                let (mut stream, _) = listener.accept().await.unwrap();

                let mut buffer = vec![0u8; 4096];
                let n = stream.read(&mut buffer).await.unwrap();
                let request: IpcRequest = serde_json::from_slice(&buffer[..n]).unwrap();
                assert!(matches!(request, IpcRequest::Status));

                let response = IpcResponse::success("", Some(running_data(125)));
                let json = serde_json::to_vec(&response).unwrap();
                stream.write_all(&json).await.unwrap();
                stream.flush().await.unwrap();
            });

            let client = IpcClient::new(socket_path);
            let response = client.status().await.unwrap();

            assert_eq!(response.status, "success");
            let data = response.data.unwrap();
            assert_eq!(data.state, Some("running".to_string()));
            assert_eq!(data.elapsed_seconds, Some(125));

            server_handle.await.unwrap();
        }

        #[tokio::test]
        async fn test_send_start_request_carries_subject() {
            let socket_path = create_temp_socket_path();
            let listener = create_mock_server(&socket_path).await;

            let received_request = Arc::new(Mutex::new(None));
            let received_clone = received_request.clone();

            let server_handle = tokio::spawn(async move {
                let (mut stream, _) = listener.accept().await.unwrap();

                let mut buffer = vec![0u8; 4096];
                let n = stream.read(&mut buffer).await.unwrap();
                let request: IpcRequest = serde_json::from_slice(&buffer[..n]).unwrap();
                *received_clone.lock().await = Some(request);

                let response = IpcResponse::success("Timer started", Some(running_data(0)));
                let json = serde_json::to_vec(&response).unwrap();
                stream.write_all(&json).await.unwrap();
                stream.flush().await.unwrap();
            });

            let client = IpcClient::new(socket_path);
            let response = client.start(Some(7)).await.unwrap();

            assert_eq!(response.status, "success");
            assert_eq!(response.message, "Timer started");

            let received = received_request.lock().await;
            match received.as_ref() {
                Some(IpcRequest::Start { subject_id }) => assert_eq!(*subject_id, Some(7)),
                _ => panic!("Expected Start request"),
            }

            server_handle.await.unwrap();
        }

        #[tokio::test]
        async fn test_send_finish_request() {
            let socket_path = create_temp_socket_path();
            let listener = create_mock_server(&socket_path).await;

            let server_handle = tokio::spawn(async move {
                let (mut stream, _) = listener.accept().await.unwrap();

                let mut buffer = vec![0u8; 4096];
                let n = stream.read(&mut buffer).await.unwrap();
                let request: IpcRequest = serde_json::from_slice(&buffer[..n]).unwrap();
                assert!(matches!(request, IpcRequest::Finish));

                let response = IpcResponse::success("Session saved successfully", None);
                let json = serde_json::to_vec(&response).unwrap();
                stream.write_all(&json).await.unwrap();
            });

            let client = IpcClient::new(socket_path);
            let response = client.finish().await.unwrap();

            assert_eq!(response.status, "success");
            assert_eq!(response.message, "Session saved successfully");

            server_handle.await.unwrap();
        }

        #[tokio::test]
        async fn test_error_response_surfaces_message() {
            let socket_path = create_temp_socket_path();
            let listener = create_mock_server(&socket_path).await;

            // One connection is enough: error responses are final, not retried
            let server_handle = tokio::spawn(async move {
                let (mut stream, _) = listener.accept().await.unwrap();
                let mut buffer = vec![0u8; 4096];
                let _ = stream.read(&mut buffer).await;

                let response = IpcResponse::error("Session should be at least 36 seconds long");
                let json = serde_json::to_vec(&response).unwrap();
                let _ = stream.write_all(&json).await;
            });

            let client = IpcClient::new(socket_path);
            let result = client.finish().await;

            assert!(result.is_err());
            assert_eq!(
                result.unwrap_err().to_string(),
                "Session should be at least 36 seconds long"
            );

            server_handle.abort();
        }
    }
}
