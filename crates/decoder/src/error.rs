//! Error types for configuration, session construction and translation.

use nmtbench_checkpoint::CheckpointError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access model config {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed model config {}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("model config {} declares no checkpoints", path.display())]
    NoCheckpoints { path: PathBuf },
}

/// Failures while constructing a [`DecoderSession`](crate::DecoderSession).
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("compute device {index} is unavailable ({available} device(s) visible)")]
    DeviceUnavailable { index: usize, available: usize },

    #[error("failed to load checkpoint '{name}': {reason}")]
    CheckpointLoad { name: String, reason: String },

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Failures of a single translate call. None of them are retried.
#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("no checkpoint serves {source_lang} > {target_lang}")]
    UnsupportedLanguagePair {
        source_lang: String,
        target_lang: String,
    },

    #[error("input text is empty")]
    EmptyInput,

    #[error("input has {tokens} tokens, limit is {limit}")]
    InputTooLong { tokens: usize, limit: usize },

    #[error("failed to load checkpoint '{name}': {reason}")]
    CheckpointLoad { name: String, reason: String },

    #[error("decode failed: {reason}")]
    Decode { reason: String },
}
