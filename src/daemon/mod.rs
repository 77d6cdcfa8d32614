//! Daemon module for the productivity timers.
//!
//! This module contains the core daemon functionality:
//! - `timer`: Countdown engine with the pomodoro state machine and tick task
//! - `registry`: One engine per stored timer configuration
//! - `ipc`: Unix socket server dispatching requests to the registry

pub mod ipc;
pub mod registry;
pub mod timer;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::Mutex;

use crate::store::TimerStore;

pub use ipc::{serve_until, IpcServer, RequestHandler};
pub use registry::{RegistryError, TimerRegistry};
pub use timer::{PomodoroTimer, TimerError, TimerSnapshot, TimerWatch};

/// Runs the daemon until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the stored timers cannot be loaded or the socket
/// cannot be bound.
pub async fn run(socket_path: &Path, store: Box<dyn TimerStore>) -> Result<()> {
    let registry = TimerRegistry::load(store).context("タイマーの読み込みに失敗しました")?;
    let handler = RequestHandler::new(Arc::new(Mutex::new(registry)));
    let server = IpcServer::new(socket_path)?;

    tracing::info!(socket = ?server.socket_path(), "daemon listening");

    serve_until(server, handler, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await
}
