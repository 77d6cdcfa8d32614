//! IPC Client for communicating with the productivity daemon.
//!
//! This module provides:
//! - Unix Domain Socket client
//! - Request/response handling with connection retries
//! - Line-oriented `watch` sessions

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::UnixStream;
use tokio::time::timeout;

use crate::types::{IpcRequest, IpcResponse, TimerParams, WatchFrame};

// ============================================================================
// Constants
// ============================================================================

/// Connection timeout in seconds
const CONNECTION_TIMEOUT_SECS: u64 = 5;

/// Read/write timeout in seconds
const IO_TIMEOUT_SECS: u64 = 5;

/// Maximum response size in bytes (1MB; a full timer list fits easily)
const MAX_RESPONSE_SIZE: u64 = 1024 * 1024;

/// Maximum retry attempts
const MAX_RETRIES: u32 = 3;

/// Retry delay in milliseconds (base delay, multiplied by attempt number)
const RETRY_DELAY_MS: u64 = 500;

// ============================================================================
// IpcClient
// ============================================================================

/// IPC client for daemon communication.
#[derive(Debug, Clone)]
pub struct IpcClient {
    socket_path: PathBuf,
    timeout: Duration,
}

impl IpcClient {
    /// Creates a client for the given socket.
    pub fn with_socket_path(socket_path: PathBuf) -> Self {
        Self {
            socket_path,
            timeout: Duration::from_secs(CONNECTION_TIMEOUT_SECS),
        }
    }

    /// Returns the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Lists every timer.
    pub async fn list(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::List).await
    }

    /// Fetches one timer.
    pub async fn get(&self, id: u32) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Get { id }).await
    }

    /// Creates a timer.
    pub async fn create(&self, params: TimerParams) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Create { params })
            .await
    }

    /// Applies the given fields to a timer.
    pub async fn update(&self, id: u32, params: TimerParams) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Update { id, params })
            .await
    }

    /// Deletes a timer.
    pub async fn delete(&self, id: u32) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Delete { id })
            .await
    }

    /// Starts a timer.
    pub async fn start(&self, id: u32) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Start { id }).await
    }

    /// Pauses a timer.
    pub async fn pause(&self, id: u32) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Pause { id }).await
    }

    /// Resumes a timer.
    pub async fn resume(&self, id: u32) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Resume { id })
            .await
    }

    /// Resets a timer.
    pub async fn reset(&self, id: u32) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Reset { id }).await
    }

    /// Opens a watch session on a timer.
    ///
    /// The daemon answers with one response line, then streams one
    /// [`WatchFrame`] line per emission until the timer is deleted or the
    /// daemon stops. Dropping the session closes the connection, which ends
    /// the stream on the daemon side.
    pub async fn watch(&self, id: u32) -> Result<WatchSession> {
        let stream = self.send(&IpcRequest::Watch { id }).await?;
        let mut lines = BufReader::new(stream).lines();

        let first = timeout(Duration::from_secs(IO_TIMEOUT_SECS), lines.next_line())
            .await
            .context("読み込みがタイムアウトしました")?
            .context("レスポンスの受信に失敗しました")?
            .context("Daemonからの応答がありませんでした")?;

        let response: IpcResponse =
            serde_json::from_str(&first).context("レスポンスのパースに失敗しました")?;
        if response.is_error() {
            anyhow::bail!("{}", response.message);
        }

        Ok(WatchSession { response, lines })
    }

    /// Sends a request, retrying transport failures. Error responses from
    /// the daemon are returned as errors without retrying.
    async fn send_request_with_retry(&self, request: &IpcRequest) -> Result<IpcResponse> {
        let mut attempt = 1;

        let response = loop {
            match self.send_request(request).await {
                Ok(response) => break response,
                Err(e) if attempt < MAX_RETRIES => {
                    tracing::warn!("リクエスト失敗 (試行 {}/{}): {}", attempt, MAX_RETRIES, e);
                    let delay = Duration::from_millis(RETRY_DELAY_MS * u64::from(attempt));
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::warn!("リクエスト失敗 (試行 {}/{}): {}", attempt, MAX_RETRIES, e);
                    return Err(e);
                }
            }
        };

        if response.is_error() {
            anyhow::bail!("{}", response.message);
        }
        Ok(response)
    }

    /// Sends a single request and reads the whole response.
    async fn send_request(&self, request: &IpcRequest) -> Result<IpcResponse> {
        let mut stream = self.send(request).await?;
        stream
            .shutdown()
            .await
            .context("シャットダウンに失敗しました")?;

        let mut buffer = Vec::new();
        timeout(
            Duration::from_secs(IO_TIMEOUT_SECS),
            stream.take(MAX_RESPONSE_SIZE).read_to_end(&mut buffer),
        )
        .await
        .context("読み込みがタイムアウトしました")?
        .context("レスポンスの受信に失敗しました")?;

        if buffer.iter().all(u8::is_ascii_whitespace) {
            anyhow::bail!("Daemonからの応答がありませんでした");
        }

        serde_json::from_slice(&buffer).context("レスポンスのパースに失敗しました")
    }

    /// Connects and writes a newline-terminated request.
    async fn send(&self, request: &IpcRequest) -> Result<UnixStream> {
        let mut stream = timeout(self.timeout, UnixStream::connect(&self.socket_path))
            .await
            .context("接続がタイムアウトしました")?
            .context("Daemonに接続できません。'productivity daemon' を起動してください")?;

        let mut request_json =
            serde_json::to_vec(request).context("リクエストのシリアライズに失敗しました")?;
        request_json.push(b'\n');

        timeout(
            Duration::from_secs(IO_TIMEOUT_SECS),
            stream.write_all(&request_json),
        )
        .await
        .context("書き込みがタイムアウトしました")?
        .context("リクエストの送信に失敗しました")?;

        Ok(stream)
    }
}

// ============================================================================
// WatchSession
// ============================================================================

/// An open watch stream.
#[derive(Debug)]
pub struct WatchSession {
    /// Opening response carrying the timer's current status
    pub response: IpcResponse,
    lines: Lines<BufReader<UnixStream>>,
}

impl WatchSession {
    /// Waits for the next frame. Returns `None` once the daemon closes the
    /// stream.
    pub async fn next_frame(&mut self) -> Result<Option<WatchFrame>> {
        let Some(line) = self
            .lines
            .next_line()
            .await
            .context("監視ストリームの受信に失敗しました")?
        else {
            return Ok(None);
        };

        let frame = serde_json::from_str(&line).context("監視データのパースに失敗しました")?;
        Ok(Some(frame))
    }
}

// ============================================================================
// Tests
// ============================================================================
