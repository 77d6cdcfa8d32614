//! IPC Server for the productivity daemon.
//!
//! This module provides Unix Domain Socket IPC functionality:
//! - Server that listens on a Unix socket
//! - Request/response handling for timer commands
//! - Newline-delimited streaming for `watch` requests

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Mutex;
use tokio::time::{timeout, Duration};

use crate::types::{IpcRequest, IpcResponse, ResponseData, WatchFrame};

use super::registry::{RegistryError, TimerRegistry};
use super::timer::TimerWatch;

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
    /// Read error
    #[error("Failed to read request: {0}")]
    ReadError(String),

    /// Timeout error
    #[error("Operation timed out")]
    Timeout,

    /// Request too large
    #[error("Request too large (max {MAX_REQUEST_SIZE} bytes)")]
    RequestTooLarge,

    /// Client closed the connection without sending anything
    #[error("Connection closed by client")]
    EmptyRequest,
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
        if socket_path.exists() {
            std::fs::remove_file(socket_path)
                .with_context(|| format!("Failed to remove existing socket: {:?}", socket_path))?;
        }

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
    /// Reads one line, or up to the client's half-close, bounded by a
    /// timeout and [`MAX_REQUEST_SIZE`].
    ///
    /// # Errors
    ///
    /// Returns an error if reading or deserialization fails.
    pub async fn receive_request(stream: &mut UnixStream) -> Result<IpcRequest> {
        let mut buffer = Vec::with_capacity(256);
        let limit = (MAX_REQUEST_SIZE + 1) as u64;

        let mut reader = BufReader::new((&mut *stream).take(limit));
        let read_result = timeout(
            Duration::from_secs(READ_TIMEOUT_SECS),
            reader.read_until(b'\n', &mut buffer),
        )
        .await;

        match read_result {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(IpcError::ReadError(e.to_string()).into()),
            Err(_) => return Err(IpcError::Timeout.into()),
        }

        if buffer.last() == Some(&b'\n') {
            buffer.pop();
        }
        if buffer.is_empty() {
            return Err(IpcError::EmptyRequest.into());
        }
        if buffer.len() > MAX_REQUEST_SIZE {
            return Err(IpcError::RequestTooLarge.into());
        }

        let request: IpcRequest =
            serde_json::from_slice(&buffer).context("Failed to deserialize IPC request")?;

        Ok(request)
    }

    /// Serializes and sends an IPC response to the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub async fn send_response(stream: &mut UnixStream, response: &IpcResponse) -> Result<()> {
        let mut json = serde_json::to_vec(response).context("Failed to serialize IPC response")?;
        json.push(b'\n');

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

/// Handles IPC requests by dispatching to the timer registry.
#[derive(Clone)]
pub struct RequestHandler {
    /// Shared timer registry
    registry: Arc<Mutex<TimerRegistry>>,
}

impl RequestHandler {
    /// Creates a new request handler over the given registry.
    pub fn new(registry: Arc<Mutex<TimerRegistry>>) -> Self {
        Self { registry }
    }

    /// Serves one connection: a single request and its response, or a
    /// stream of frames for `watch`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be read or the response
    /// cannot be written.
    pub async fn serve(&self, mut stream: UnixStream) -> Result<()> {
        let request = match IpcServer::receive_request(&mut stream).await {
            Ok(request) => request,
            Err(e) => {
                let response = IpcResponse::error(format!("不正なリクエストです: {e}"));
                IpcServer::send_response(&mut stream, &response).await?;
                return Err(e);
            }
        };

        tracing::debug!(?request, "request received");

        if let IpcRequest::Watch { id } = request {
            return self.stream_watch(id, &mut stream).await;
        }

        let response = self.handle(request).await;
        IpcServer::send_response(&mut stream, &response).await
    }

    /// Handles an IPC request and returns the appropriate response.
    ///
    /// `watch` cannot be answered with a single response and is rejected
    /// here; use [`RequestHandler::serve`].
    pub async fn handle(&self, request: IpcRequest) -> IpcResponse {
        let mut registry = self.registry.lock().await;

        let result = match request {
            IpcRequest::List => registry
                .list()
                .map(|timers| ("", Some(ResponseData::timers(timers)))),
            IpcRequest::Get { id } => registry.get(id).map(|t| ("", Some(ResponseData::timer(t)))),
            IpcRequest::Create { params } => registry
                .create(&params)
                .map(|t| ("タイマーを作成しました", Some(ResponseData::timer(t)))),
            IpcRequest::Update { id, params } => registry
                .update(id, &params)
                .map(|t| ("タイマーを更新しました", Some(ResponseData::timer(t)))),
            IpcRequest::Delete { id } => registry
                .delete(id)
                .map(|()| ("タイマーを削除しました", None)),
            IpcRequest::Start { id } => registry
                .start(id)
                .map(|t| ("タイマーを開始しました", Some(ResponseData::timer(t)))),
            IpcRequest::Pause { id } => registry
                .pause(id)
                .map(|t| ("タイマーを一時停止しました", Some(ResponseData::timer(t)))),
            IpcRequest::Resume { id } => registry
                .resume(id)
                .map(|t| ("タイマーを再開しました", Some(ResponseData::timer(t)))),
            IpcRequest::Reset { id } => registry
                .reset(id)
                .map(|t| ("タイマーをリセットしました", Some(ResponseData::timer(t)))),
            IpcRequest::Watch { .. } => {
                return IpcResponse::error("watchはストリーム接続でのみ利用できます");
            }
        };

        match result {
            Ok((message, data)) => IpcResponse::success(message, data),
            Err(e) => Self::error_response(&e),
        }
    }

    fn error_response(error: &RegistryError) -> IpcResponse {
        if error.is_usage() {
            tracing::info!("{}", error);
        } else {
            tracing::warn!("request failed: {}", error);
        }
        IpcResponse::error(error.to_string())
    }

    /// Answers a `watch` request: an opening response, then one frame per
    /// emission until the timer is deleted or the client goes away.
    ///
    /// The client keeps its write side open while watching, so end of input
    /// means it disconnected.
    async fn stream_watch(&self, id: u32, stream: &mut UnixStream) -> Result<()> {
        let opened = {
            let registry = self.registry.lock().await;
            registry
                .subscribe(id)
                .and_then(|watch| registry.get(id).map(|status| (watch, status)))
        };

        let (mut watch, status) = match opened {
            Ok(opened) => opened,
            Err(e) => return IpcServer::send_response(stream, &Self::error_response(&e)).await,
        };

        let response = IpcResponse::success("監視を開始しました", Some(ResponseData::timer(status)));
        IpcServer::send_response(stream, &response).await?;

        let mut scratch = [0u8; 64];
        let mut changed = true;
        loop {
            if changed {
                if let Some(frame) = Self::frame(&mut watch) {
                    let mut line =
                        serde_json::to_vec(&frame).context("Failed to serialize frame")?;
                    line.push(b'\n');
                    if let Err(e) = stream.write_all(&line).await {
                        tracing::debug!("watch client went away: {}", e);
                        return Ok(());
                    }
                }
            }

            tokio::select! {
                next = watch.changed() => {
                    if next.is_err() {
                        tracing::debug!(id, "watched timer removed");
                        return Ok(());
                    }
                    changed = true;
                }
                read = stream.read(&mut scratch) => match read {
                    Ok(0) | Err(_) => {
                        tracing::debug!(id, "watch client disconnected");
                        return Ok(());
                    }
                    // Input after the request is ignored.
                    Ok(_) => changed = false,
                },
            }
        }
    }

    fn frame(watch: &mut TimerWatch) -> Option<WatchFrame> {
        let remaining_seconds = watch.latest()?;
        let phase = watch.phase()?;
        Some(WatchFrame {
            remaining_seconds,
            phase,
        })
    }
}

/// Accepts connections until `shutdown` completes, serving each on its own
/// task.
///
/// # Errors
///
/// Currently infallible once the server is bound; accept failures are
/// logged and skipped.
pub async fn serve_until<F>(server: IpcServer, handler: RequestHandler, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = server.accept() => match accepted {
                Ok(stream) => {
                    let handler = handler.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handler.serve(stream).await {
                            tracing::warn!("connection failed: {:#}", e);
                        }
                    });
                }
                Err(e) => tracing::warn!("{:#}", e),
            },
            () = &mut shutdown => {
                tracing::info!("shutting down IPC server");
                break;
            }
        }
    }

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
