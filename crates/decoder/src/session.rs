//! Decoder session: one device, one checkpoint pool, explicit cold/warm state.

use crate::config::ModelConfig;
use crate::device::{DeviceBinding, DeviceInventory};
use crate::error::{SessionError, TranslateError};
use crate::model::LexicalDecoder;
use crate::translator::{
    DecodeTimings, Suggestion, TranslationRequest, TranslationResult, Translator,
};
use crate::weights::CheckpointData;
use nmtbench_checkpoint::{Checkpoint, CheckpointPool, Direction, LanguageIndex, LanguagePair};
use std::borrow::Cow;
use std::time::Instant;
use tracing::{debug, info};

/// Counters exposed so callers can observe cold loads directly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Full checkpoint loads, including the one done at construction.
    pub reloads: u64,
    pub translations: u64,
}

pub struct DecoderSession {
    device: DeviceBinding,
    pool: CheckpointPool,
    config: ModelConfig,
    index: LanguageIndex,
    needs_reset: bool,
    last_checkpoint: Option<String>,
    decoder: Option<LexicalDecoder>,
    stats: SessionStats,
}

impl DecoderSession {
    /// Bind device `device` from `inventory` and load the pool's first
    /// checkpoint onto it.
    pub fn construct(
        inventory: &DeviceInventory,
        device: usize,
        pool: CheckpointPool,
        config: ModelConfig,
    ) -> Result<Self, SessionError> {
        let device = inventory.bind(device)?;
        info!(device = %device, visibility = %device.visibility(), "bound compute device");

        let index =
            LanguageIndex::from_pool(&pool).with_rules(config.language_rules.iter().cloned());
        let first = pool.first().clone();
        let mut session = Self {
            device,
            pool,
            config,
            index,
            needs_reset: true,
            last_checkpoint: None,
            decoder: None,
            stats: SessionStats::default(),
        };

        session
            .load(&first)
            .map_err(|reason| SessionError::CheckpointLoad {
                name: first.name().to_string(),
                reason,
            })?;
        Ok(session)
    }

    pub fn device(&self) -> &DeviceBinding {
        &self.device
    }

    pub fn pool(&self) -> &CheckpointPool {
        &self.pool
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn last_checkpoint(&self) -> Option<&str> {
        self.last_checkpoint.as_deref()
    }

    /// The checkpoint whose weights are currently loaded.
    pub fn loaded_checkpoint(&self) -> Option<&Checkpoint> {
        self.last_checkpoint
            .as_deref()
            .and_then(|name| self.pool.get(name))
    }

    pub fn needs_reset(&self) -> bool {
        self.needs_reset
    }

    /// Drop cached weights and the last-checkpoint marker; the next
    /// `translate` reloads from disk.
    pub fn force_reset(&mut self) {
        self.needs_reset = true;
        self.last_checkpoint = None;
        self.decoder = None;
        debug!("decoder state invalidated");
    }

    pub fn translate(
        &mut self,
        source_lang: &str,
        target_lang: &str,
        text: &str,
        suggestions: &[Suggestion],
    ) -> Result<TranslationResult, TranslateError> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        if tokens.is_empty() {
            return Err(TranslateError::EmptyInput);
        }

        let unsupported = || TranslateError::UnsupportedLanguagePair {
            source_lang: source_lang.to_string(),
            target_lang: target_lang.to_string(),
        };
        let pair = LanguagePair::parse(source_lang, target_lang).map_err(|_| unsupported())?;
        let position = self.index.resolve(&pair).ok_or_else(unsupported)?;

        let limit = self.config.decoder.max_input_tokens;
        if tokens.len() > limit {
            return Err(TranslateError::InputTooLong {
                tokens: tokens.len(),
                limit,
            });
        }

        let checkpoint = self
            .pool
            .get_index(position)
            .cloned()
            .ok_or_else(unsupported)?;

        let load = if self.is_warm_for(checkpoint.name()) {
            None
        } else {
            let start = Instant::now();
            self.load(&checkpoint)
                .map_err(|reason| TranslateError::CheckpointLoad {
                    name: checkpoint.name().to_string(),
                    reason,
                })?;
            Some(start.elapsed())
        };

        let relevant = self.relevant_suggestions(suggestions, position);
        let relevant: Vec<&Suggestion> = relevant.iter().map(|s| s.as_ref()).collect();

        let decoder = self.decoder.as_ref().ok_or_else(|| TranslateError::Decode {
            reason: "decoder not loaded".to_string(),
        })?;
        let start = Instant::now();
        let decoded = decoder
            .decode(&tokens, &relevant)
            .map_err(|err| TranslateError::Decode {
                reason: format!("{err:#}"),
            })?;
        let decode = start.elapsed();

        self.stats.translations += 1;
        Ok(TranslationResult {
            text: decoded.text(),
            alignment: decoded.alignment,
            scores: decoded.scores,
            checkpoint: checkpoint.name().to_string(),
            timings: DecodeTimings { load, decode },
        })
    }

    /// Suggestions served by the same checkpoint as the request, either way
    /// round. Reversed ones are flipped to the request's direction.
    fn relevant_suggestions<'s>(
        &mut self,
        suggestions: &'s [Suggestion],
        position: usize,
    ) -> Vec<Cow<'s, Suggestion>> {
        let mut relevant = Vec::new();
        for suggestion in suggestions {
            let Ok(pair) = LanguagePair::parse(&suggestion.source_lang, &suggestion.target_lang)
            else {
                debug!(
                    source = %suggestion.source_lang,
                    target = %suggestion.target_lang,
                    "ignoring suggestion with malformed language tags"
                );
                continue;
            };
            match self.index.resolve_ignoring_direction(&pair) {
                Some((p, Direction::Forward)) if p == position => {
                    relevant.push(Cow::Borrowed(suggestion))
                }
                Some((p, Direction::Reversed)) if p == position => {
                    relevant.push(Cow::Owned(suggestion.reversed()))
                }
                _ => {}
            }
        }
        relevant
    }

    fn is_warm_for(&self, name: &str) -> bool {
        !self.needs_reset
            && self.decoder.is_some()
            && self.last_checkpoint.as_deref() == Some(name)
    }

    fn load(&mut self, checkpoint: &Checkpoint) -> Result<(), String> {
        // release the previous weights before reading the next set
        self.decoder = None;
        self.last_checkpoint = None;

        let data = CheckpointData::load(checkpoint.path()).map_err(|err| format!("{err:#}"))?;
        info!(
            checkpoint = checkpoint.name(),
            device = %self.device,
            bytes = data.weights.size_bytes(),
            "loaded checkpoint weights"
        );

        self.decoder = Some(LexicalDecoder::new(data, self.config.decoder.clone()));
        self.last_checkpoint = Some(checkpoint.name().to_string());
        self.needs_reset = false;
        self.stats.reloads += 1;
        Ok(())
    }
}

impl Translator for DecoderSession {
    fn force_reset(&mut self) {
        DecoderSession::force_reset(self);
    }

    fn translate(
        &mut self,
        request: &TranslationRequest,
    ) -> Result<TranslationResult, TranslateError> {
        DecoderSession::translate(
            self,
            &request.source_lang,
            &request.target_lang,
            &request.text,
            &request.suggestions,
        )
    }
}
