//! Speed-test harness around a [`Translator`](nmtbench_decoder::Translator).
//!
//! - `bench`: the reset/translate/dump loop
//! - `cancel`: cancellation token and Ctrl-C wiring
//! - `report`: per-iteration timings and the summary report
//! - `cli`: argument parsing and startup (feature `cli`)

pub mod bench;
pub mod cancel;
pub mod error;
pub mod report;

#[cfg(feature = "cli")]
pub mod cli;

pub use bench::{BenchmarkLoop, ResetPolicy};
pub use cancel::{install_interrupt_handler, CancellationToken};
pub use error::BenchError;
pub use report::{BenchSummary, IterationRecord, TimingRecorder};
