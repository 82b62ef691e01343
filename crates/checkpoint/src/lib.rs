//! Checkpoint pools for the NMT speed-test harness.
//!
//! A pool is assembled once through [`CheckpointPoolBuilder`], validated at
//! `build()` time and never mutated afterwards. [`LanguageIndex`] maps a
//! requested translation direction onto the checkpoint that serves it.

pub mod error;
pub mod index;
pub mod lang;
pub mod pool;

pub use error::CheckpointError;
pub use index::{Direction, LanguageIndex, LanguageRule};
pub use lang::{Language, LanguagePair, ParseLanguageError};
pub use pool::{Checkpoint, CheckpointPool, CheckpointPoolBuilder};
