//! Request/response types and the `Translator` seam the benchmark loop
//! drives.

use crate::error::TranslateError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A prior translation example used to bias decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub source_lang: String,
    pub target_lang: String,
    pub source_text: String,
    pub target_text: String,
    #[serde(default = "default_weight")]
    pub weight: f32,
}

fn default_weight() -> f32 {
    1.0
}

impl Suggestion {
    pub fn new(
        source_lang: impl Into<String>,
        target_lang: impl Into<String>,
        source_text: impl Into<String>,
        target_text: impl Into<String>,
        weight: f32,
    ) -> Self {
        Self {
            source_lang: source_lang.into(),
            target_lang: target_lang.into(),
            source_text: source_text.into(),
            target_text: target_text.into(),
            weight,
        }
    }

    /// The same example read in the opposite direction.
    pub fn reversed(&self) -> Self {
        Self {
            source_lang: self.target_lang.clone(),
            target_lang: self.source_lang.clone(),
            source_text: self.target_text.clone(),
            target_text: self.source_text.clone(),
            weight: self.weight,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranslationRequest {
    pub source_lang: String,
    pub target_lang: String,
    pub text: String,
    pub suggestions: Vec<Suggestion>,
}

impl TranslationRequest {
    pub fn new(
        source_lang: impl Into<String>,
        target_lang: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            source_lang: source_lang.into(),
            target_lang: target_lang.into(),
            text: text.into(),
            suggestions: Vec::new(),
        }
    }

    pub fn with_suggestions(mut self, suggestions: Vec<Suggestion>) -> Self {
        self.suggestions = suggestions;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DecodeTimings {
    /// Checkpoint load time; `None` on the warm path.
    pub load: Option<Duration>,
    pub decode: Duration,
}

impl DecodeTimings {
    pub fn is_cold(&self) -> bool {
        self.load.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranslationResult {
    pub text: String,
    /// `(source token, target token)` index pairs.
    pub alignment: Vec<(usize, usize)>,
    /// Probability of each emitted target token.
    pub scores: Vec<f32>,
    pub checkpoint: String,
    pub timings: DecodeTimings,
}

/// Anything the benchmark loop can reset and translate with.
pub trait Translator {
    /// Invalidate cached state so the next call pays the full load cost.
    fn force_reset(&mut self);

    fn translate(&mut self, request: &TranslationRequest)
        -> Result<TranslationResult, TranslateError>;
}
