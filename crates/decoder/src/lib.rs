//! Decoder session for the NMT speed-test harness.
//!
//! This crate provides:
//! - `ModelConfig` loading (`model.json`: checkpoint list + decoder settings)
//! - explicit device binding instead of process-wide visibility variables
//! - checkpoint weights in safetensors format with plain-text vocabularies
//! - a reference lexical decoder used as the translation engine
//! - `DecoderSession` with a first-class `force_reset()` for cold-path timing

pub mod config;
pub mod device;
pub mod error;
pub mod kernels;
pub mod model;
pub mod session;
pub mod translator;
pub mod vocab;
pub mod weights;

pub use config::{CheckpointEntry, DecoderSettings, ModelConfig};
pub use device::{DeviceBinding, DeviceInfo, DeviceInventory, DeviceKind, DeviceVisibility};
pub use error::{ConfigError, SessionError, TranslateError};
pub use model::LexicalDecoder;
pub use session::{DecoderSession, SessionStats};
pub use translator::{DecodeTimings, Suggestion, TranslationRequest, TranslationResult, Translator};
pub use vocab::Vocabulary;
pub use weights::{CheckpointData, CheckpointWeights};
