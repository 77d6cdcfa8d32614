//! Timer store error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while reading or writing timer configurations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No timer with the given id.
    #[error("ID {0} のタイマーが見つかりません")]
    NotFound(u32),

    /// An update was requested for a record without an id.
    #[error("更新するタイマーのIDが指定されていません")]
    MissingId,

    /// The record failed validation.
    #[error("{0}")]
    Invalid(String),

    /// Every id has been handed out.
    #[error("タイマーIDが上限に達しました")]
    IdsExhausted,

    /// The data file could not be read or written.
    #[error("データファイル {path:?} の入出力に失敗しました: {source}")]
    Io {
        /// Data file path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The data file is not a valid timer list.
    #[error("データファイル {path:?} の形式が不正です: {source}")]
    Format {
        /// Data file path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    /// Returns true if the error is due to an unknown id.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
