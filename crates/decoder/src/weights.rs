//! Checkpoint weights (safetensors) and the on-disk checkpoint layout.
//!
//! A checkpoint directory holds:
//! - `weights.safetensors`: `source_embeddings` (src_vocab, d_model),
//!   `output_projection` (d_model, tgt_vocab), `final_ln.weight` and
//!   `final_ln.bias` (1, d_model), all little-endian f32
//! - `source.vocab` / `target.vocab`: one word per line

use crate::vocab::Vocabulary;
use anyhow::{ensure, Context, Result};
use ndarray::Array2;
use safetensors::tensor::{Dtype, TensorView};
use safetensors::SafeTensors;
use std::fs;
use std::path::Path;

pub const WEIGHTS_FILE: &str = "weights.safetensors";
pub const SOURCE_VOCAB_FILE: &str = "source.vocab";
pub const TARGET_VOCAB_FILE: &str = "target.vocab";

#[derive(Debug, Clone)]
pub struct CheckpointWeights {
    pub source_embeddings: Array2<f32>,
    pub output_projection: Array2<f32>,
    pub final_ln_weight: Array2<f32>,
    pub final_ln_bias: Array2<f32>,
}

impl CheckpointWeights {
    pub fn load_safetensors(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path)
            .with_context(|| format!("failed to read safetensors file {}", path.display()))?;
        let tensors = SafeTensors::deserialize(&data).context("failed to parse safetensors")?;

        let weights = Self {
            source_embeddings: load_tensor_2d(&tensors, "source_embeddings")?,
            output_projection: load_tensor_2d(&tensors, "output_projection")?,
            final_ln_weight: load_tensor_2d(&tensors, "final_ln.weight")?,
            final_ln_bias: load_tensor_2d(&tensors, "final_ln.bias")?,
        };
        weights.validate()?;
        Ok(weights)
    }

    pub fn save_safetensors(&self, path: impl AsRef<Path>) -> Result<()> {
        let tensors = [
            ("source_embeddings", &self.source_embeddings),
            ("output_projection", &self.output_projection),
            ("final_ln.weight", &self.final_ln_weight),
            ("final_ln.bias", &self.final_ln_bias),
        ];

        let buffers: Vec<(&str, Vec<usize>, Vec<u8>)> = tensors
            .iter()
            .map(|(name, array)| {
                let bytes = array.iter().flat_map(|v| v.to_le_bytes()).collect();
                (*name, array.shape().to_vec(), bytes)
            })
            .collect();

        let mut views = Vec::with_capacity(buffers.len());
        for (name, shape, bytes) in &buffers {
            let view = TensorView::new(Dtype::F32, shape.clone(), bytes)
                .with_context(|| format!("invalid tensor '{}'", name))?;
            views.push((*name, view));
        }

        let blob = safetensors::serialize(views.iter().map(|(name, view)| (*name, view)), &None)
            .context("failed to serialize safetensors")?;
        fs::write(path.as_ref(), blob)
            .with_context(|| format!("failed to write {}", path.as_ref().display()))
    }

    /// Word-for-word weights: each `(source, target)` pair gets its own
    /// one-hot embedding dimension projecting onto the target word.
    pub fn lexicon(
        source_vocab: &Vocabulary,
        target_vocab: &Vocabulary,
        pairs: &[(&str, &str)],
    ) -> Self {
        // one spare dimension keeps a single-pair lexicon from normalising to zero
        let d_model = pairs.len() + 1;
        let mut source_embeddings = Array2::zeros((source_vocab.len(), d_model));
        let mut output_projection = Array2::zeros((d_model, target_vocab.len()));

        for (dim, (source, target)) in pairs.iter().enumerate() {
            source_embeddings[[source_vocab.id(source), dim]] = 1.0;
            output_projection[[dim, target_vocab.id(target)]] = 1.0;
        }

        Self {
            source_embeddings,
            output_projection,
            final_ln_weight: Array2::ones((1, d_model)),
            final_ln_bias: Array2::zeros((1, d_model)),
        }
    }

    pub fn d_model(&self) -> usize {
        self.source_embeddings.ncols()
    }

    pub fn source_vocab_size(&self) -> usize {
        self.source_embeddings.nrows()
    }

    pub fn target_vocab_size(&self) -> usize {
        self.output_projection.ncols()
    }

    pub fn size_bytes(&self) -> usize {
        (self.source_embeddings.len()
            + self.output_projection.len()
            + self.final_ln_weight.len()
            + self.final_ln_bias.len())
            * std::mem::size_of::<f32>()
    }

    fn validate(&self) -> Result<()> {
        let d_model = self.d_model();
        ensure!(
            self.output_projection.nrows() == d_model,
            "output_projection has {} rows, expected d_model {}",
            self.output_projection.nrows(),
            d_model
        );
        for (name, norm) in [
            ("final_ln.weight", &self.final_ln_weight),
            ("final_ln.bias", &self.final_ln_bias),
        ] {
            ensure!(
                norm.dim() == (1, d_model),
                "{} has shape {:?}, expected (1, {})",
                name,
                norm.dim(),
                d_model
            );
        }
        Ok(())
    }
}

fn load_tensor_2d(tensors: &SafeTensors, name: &str) -> Result<Array2<f32>> {
    let view = tensors
        .tensor(name)
        .with_context(|| format!("tensor '{}' not found", name))?;

    ensure!(view.dtype() == Dtype::F32, "expected f32 tensor for {}", name);
    let shape = view.shape();
    ensure!(shape.len() == 2, "expected 2D tensor for {}", name);

    let floats: Vec<f32> = view
        .data()
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();

    Array2::from_shape_vec((shape[0], shape[1]), floats).context("failed to reshape tensor")
}

/// Everything one checkpoint directory holds, loaded into memory.
#[derive(Debug, Clone)]
pub struct CheckpointData {
    pub weights: CheckpointWeights,
    pub source_vocab: Vocabulary,
    pub target_vocab: Vocabulary,
}

impl CheckpointData {
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let weights = CheckpointWeights::load_safetensors(dir.join(WEIGHTS_FILE))?;
        let source_vocab = Vocabulary::load(dir.join(SOURCE_VOCAB_FILE))?;
        let target_vocab = Vocabulary::load(dir.join(TARGET_VOCAB_FILE))?;

        ensure!(
            weights.source_vocab_size() == source_vocab.len(),
            "source_embeddings has {} rows but source vocabulary has {} entries",
            weights.source_vocab_size(),
            source_vocab.len()
        );
        ensure!(
            weights.target_vocab_size() == target_vocab.len(),
            "output_projection has {} columns but target vocabulary has {} entries",
            weights.target_vocab_size(),
            target_vocab.len()
        );

        Ok(Self {
            weights,
            source_vocab,
            target_vocab,
        })
    }

    pub fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create checkpoint dir {}", dir.display()))?;
        self.weights.save_safetensors(dir.join(WEIGHTS_FILE))?;
        self.source_vocab.save(dir.join(SOURCE_VOCAB_FILE))?;
        self.target_vocab.save(dir.join(TARGET_VOCAB_FILE))
    }

    /// A word-for-word checkpoint translating each `(source, target)` pair.
    pub fn lexicon(pairs: &[(&str, &str)]) -> Self {
        let source_vocab = Vocabulary::new(pairs.iter().map(|(source, _)| *source));
        let target_vocab = Vocabulary::new(pairs.iter().map(|(_, target)| *target));
        let weights = CheckpointWeights::lexicon(&source_vocab, &target_vocab, pairs);
        Self {
            weights,
            source_vocab,
            target_vocab,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safetensors_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(WEIGHTS_FILE);
        let source = Vocabulary::new(["and", "cat"]);
        let target = Vocabulary::new(["e", "gatto", "il"]);
        let pairs = [("and", "e"), ("cat", "gatto")];
        let weights = CheckpointWeights::lexicon(&source, &target, &pairs);
        weights.save_safetensors(&path).unwrap();

        let loaded = CheckpointWeights::load_safetensors(&path).unwrap();
        assert_eq!(loaded.source_embeddings, weights.source_embeddings);
        assert_eq!(loaded.output_projection, weights.output_projection);
        assert_eq!(loaded.d_model(), 3);
        assert_eq!(loaded.size_bytes(), (5 * 3 + 3 * 6 + 2 * 3) * 4);
    }

    #[test]
    fn load_rejects_missing_tensor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(WEIGHTS_FILE);
        let bytes: Vec<u8> = [1.0f32, 2.0].iter().flat_map(|v| v.to_le_bytes()).collect();
        let view = TensorView::new(Dtype::F32, vec![1, 2], &bytes).unwrap();
        let blob = safetensors::serialize([("source_embeddings", &view)], &None).unwrap();
        fs::write(&path, blob).unwrap();

        let err = CheckpointWeights::load_safetensors(&path).unwrap_err();
        assert!(format!("{err:#}").contains("output_projection"));
    }

    #[test]
    fn checkpoint_dir_rejects_vocab_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let mut data = CheckpointData::lexicon(&[("and", "e"), ("cat", "gatto")]);
        data.save(dir.path()).unwrap();
        assert!(CheckpointData::load(dir.path()).is_ok());

        data.source_vocab = Vocabulary::new(["and"]);
        data.source_vocab.save(dir.path().join(SOURCE_VOCAB_FILE)).unwrap();
        let err = CheckpointData::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("source vocabulary"));
    }
}
