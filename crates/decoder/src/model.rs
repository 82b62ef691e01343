//! Reference lexical decoder: embed → layer norm → output projection,
//! one target choice per source position.
//!
//! This is the engine the session times. It is word-for-word by
//! construction, which keeps its alignment trivially valid.

use crate::config::DecoderSettings;
use crate::kernels::{argmax, layer_norm_inplace, softmax_inplace};
use crate::translator::Suggestion;
use crate::vocab::{Vocabulary, UNK_ID};
use crate::weights::CheckpointData;
use anyhow::{ensure, Result};
use ndarray::Array2;

#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub tokens: Vec<String>,
    /// `(source position, target position)` pairs.
    pub alignment: Vec<(usize, usize)>,
    /// Probability of each emitted target token (1.0 for copied tokens).
    pub scores: Vec<f32>,
}

impl Decoded {
    pub fn text(&self) -> String {
        self.tokens.join(" ")
    }
}

pub struct LexicalDecoder {
    checkpoint: CheckpointData,
    settings: DecoderSettings,
}

impl LexicalDecoder {
    pub fn new(checkpoint: CheckpointData, settings: DecoderSettings) -> Self {
        Self {
            checkpoint,
            settings,
        }
    }

    pub fn decode(&self, source: &[&str], suggestions: &[&Suggestion]) -> Result<Decoded> {
        let weights = &self.checkpoint.weights;
        let source_vocab = &self.checkpoint.source_vocab;
        let target_vocab = &self.checkpoint.target_vocab;
        let ids = source_vocab.encode(source);

        // Embedding lookup
        let mut hidden = Array2::<f32>::zeros((ids.len(), weights.d_model()));
        for (row, &id) in ids.iter().enumerate() {
            ensure!(
                id < weights.source_vocab_size(),
                "source id {} outside embedding table of {} rows",
                id,
                weights.source_vocab_size()
            );
            hidden.row_mut(row).assign(&weights.source_embeddings.row(id));
        }

        layer_norm_inplace(
            hidden.view_mut(),
            weights.final_ln_weight.row(0),
            weights.final_ln_bias.row(0),
            self.settings.layer_norm_eps,
        )?;

        // (seq_len, d_model) @ (d_model, tgt_vocab)
        let mut logits = hidden.dot(&weights.output_projection);
        for (position, target_id, weight) in suggestion_bias(source, target_vocab, suggestions) {
            logits[[position, target_id]] += self.settings.suggestion_bias * weight;
        }
        softmax_inplace(logits.view_mut());

        let mut decoded = Decoded {
            tokens: Vec::with_capacity(source.len()),
            alignment: Vec::with_capacity(source.len()),
            scores: Vec::with_capacity(source.len()),
        };

        for (position, &id) in ids.iter().enumerate() {
            if id == UNK_ID && self.settings.copy_unknown {
                decoded.alignment.push((position, decoded.tokens.len()));
                decoded.tokens.push(source[position].to_string());
                decoded.scores.push(1.0);
                continue;
            }

            let Some((target_id, probability)) = argmax(logits.row(position)) else {
                continue;
            };
            if Vocabulary::is_reserved(target_id) {
                continue;
            }
            if let Some(word) = target_vocab.word(target_id) {
                decoded.alignment.push((position, decoded.tokens.len()));
                decoded.tokens.push(word.to_string());
                decoded.scores.push(probability);
            }
        }

        Ok(decoded)
    }
}

/// Logit boosts `(source position, target id, weight)` derived from
/// suggestions. A suggestion source word matching an input word proposes the
/// suggestion target word at the proportional position.
fn suggestion_bias(
    source: &[&str],
    target_vocab: &Vocabulary,
    suggestions: &[&Suggestion],
) -> Vec<(usize, usize, f32)> {
    let mut bias = Vec::new();

    for suggestion in suggestions {
        let sugg_source: Vec<String> = suggestion
            .source_text
            .split_whitespace()
            .map(str::to_lowercase)
            .collect();
        let sugg_target: Vec<&str> = suggestion.target_text.split_whitespace().collect();
        if sugg_source.is_empty() || sugg_target.is_empty() {
            continue;
        }

        for (position, word) in source.iter().enumerate() {
            let word = word.to_lowercase();
            for (sugg_pos, _) in sugg_source.iter().enumerate().filter(|(_, w)| **w == word) {
                let target_pos = (sugg_pos * sugg_target.len() / sugg_source.len())
                    .min(sugg_target.len() - 1);
                let target_id = target_vocab.id(sugg_target[target_pos]);
                if !Vocabulary::is_reserved(target_id) {
                    bias.push((position, target_id, suggestion.weight));
                }
            }
        }
    }

    bias
}
