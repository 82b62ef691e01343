//! Errors raised while registering checkpoints and building pools.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckpointError {
    /// The name is empty or the path cannot be found.
    #[error("invalid checkpoint '{name}' at {}: {reason}", path.display())]
    InvalidCheckpoint {
        name: String,
        path: PathBuf,
        reason: String,
    },

    #[error("checkpoint name '{name}' registered more than once")]
    DuplicateCheckpoint { name: String },

    #[error("checkpoint pool is empty: no checkpoints were registered")]
    EmptyPool,
}
