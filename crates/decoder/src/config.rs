//! Model configuration: which checkpoints make up a model, plus decoder
//! hyperparameters.

use crate::error::ConfigError;
use nmtbench_checkpoint::{CheckpointError, CheckpointPool, CheckpointPoolBuilder, LanguageRule};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File name looked up when `ModelConfig::load` is given a directory.
pub const MODEL_CONFIG_FILE: &str = "model.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointEntry {
    pub name: String,
    pub path: PathBuf,
}

impl CheckpointEntry {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderSettings {
    pub layer_norm_eps: f32,
    /// Logit boost per unit of suggestion weight.
    pub suggestion_bias: f32,
    pub max_input_tokens: usize,
    /// Emit out-of-vocabulary source tokens verbatim.
    pub copy_unknown: bool,
}

impl Default for DecoderSettings {
    fn default() -> Self {
        Self {
            layer_norm_eps: 1e-5,
            suggestion_bias: 4.0,
            max_input_tokens: 512,
            copy_unknown: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub checkpoints: Vec<CheckpointEntry>,
    #[serde(default)]
    pub decoder: DecoderSettings,
    /// Rewrites applied to requested languages before checkpoint lookup.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub language_rules: Vec<LanguageRule>,
    /// Directory relative checkpoint paths resolve against.
    #[serde(skip)]
    root: PathBuf,
}

impl ModelConfig {
    pub fn new(checkpoints: Vec<CheckpointEntry>, decoder: DecoderSettings) -> Self {
        Self {
            checkpoints,
            decoder,
            language_rules: Vec::new(),
            root: PathBuf::new(),
        }
    }

    pub fn with_language_rules(mut self, rules: Vec<LanguageRule>) -> Self {
        self.language_rules = rules;
        self
    }

    /// Load from a model directory (reads `model.json`) or a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file = if path.is_dir() {
            path.join(MODEL_CONFIG_FILE)
        } else {
            path.to_path_buf()
        };

        let blob = fs::read(&file).map_err(|source| ConfigError::Io {
            path: file.clone(),
            source,
        })?;
        let mut config: ModelConfig =
            serde_json::from_slice(&blob).map_err(|source| ConfigError::Json {
                path: file.clone(),
                source,
            })?;

        if config.checkpoints.is_empty() {
            return Err(ConfigError::NoCheckpoints { path: file });
        }

        config.root = file.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let json = serde_json::to_vec_pretty(self).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Checkpoint entries with relative paths resolved against the config
    /// file's directory.
    pub fn resolved_checkpoints(&self) -> impl Iterator<Item = (&str, PathBuf)> + '_ {
        self.checkpoints.iter().map(|entry| {
            let path = if entry.path.is_relative() {
                self.root.join(&entry.path)
            } else {
                entry.path.clone()
            };
            (entry.name.as_str(), path)
        })
    }

    /// Register every declared checkpoint and build the pool.
    pub fn checkpoint_pool(&self) -> Result<CheckpointPool, CheckpointError> {
        let mut builder = CheckpointPoolBuilder::new();
        for (name, path) in self.resolved_checkpoints() {
            builder.register(name, path)?;
        }
        builder.build()
    }
}
