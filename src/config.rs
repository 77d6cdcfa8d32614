//! Filesystem locations for the daemon socket and the timer data file.
//!
//! Explicit paths (CLI flags or their environment variables) win; otherwise
//! everything lives under `~/.productivity/`.

use std::path::PathBuf;

use anyhow::{Context, Result};

/// Directory under the home directory holding all runtime files.
pub const APP_DIR: &str = ".productivity";

/// Socket file name inside [`APP_DIR`].
pub const SOCKET_FILE: &str = "productivity.sock";

/// Data file name inside [`APP_DIR`].
pub const DATA_FILE: &str = "timers.json";

/// Environment variable overriding the socket path.
pub const SOCKET_ENV: &str = "PRODUCTIVITY_SOCKET";

/// Environment variable overriding the data file path.
pub const DATA_ENV: &str = "PRODUCTIVITY_DATA";

fn app_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("ホームディレクトリが見つかりません")?;
    Ok(home.join(APP_DIR))
}

/// Returns `explicit`, or the default socket path.
///
/// # Errors
///
/// Returns an error if no path is given and the home directory is unknown.
pub fn socket_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path),
        None => Ok(app_dir()?.join(SOCKET_FILE)),
    }
}

/// Returns `explicit`, or the default data file path.
///
/// # Errors
///
/// Returns an error if no path is given and the home directory is unknown.
pub fn data_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path),
        None => Ok(app_dir()?.join(DATA_FILE)),
    }
}
