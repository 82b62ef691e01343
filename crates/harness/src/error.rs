use nmtbench_decoder::TranslateError;
use thiserror::Error;

/// Reasons the benchmark loop stops other than cancellation.
#[derive(Debug, Error)]
pub enum BenchError {
    #[error("translate call failed on iteration {iteration}")]
    Translate {
        iteration: u64,
        #[source]
        source: TranslateError,
    },

    #[error("failed to write iteration output")]
    Output(#[from] std::io::Error),
}

impl BenchError {
    /// Iteration number of a failed translate call.
    pub fn iteration(&self) -> Option<u64> {
        match self {
            Self::Translate { iteration, .. } => Some(*iteration),
            Self::Output(_) => None,
        }
    }
}
