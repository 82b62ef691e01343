//! Checkpoint registration and the immutable pool it produces.

use crate::error::CheckpointError;
use crate::lang::LanguagePair;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A named snapshot of trained model parameters on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    name: String,
    path: PathBuf,
}

impl Checkpoint {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Translation direction declared by the name, if it has the
    /// `<source>__<target>` form.
    pub fn language_pair(&self) -> Option<LanguagePair> {
        LanguagePair::from_checkpoint_name(&self.name)
    }
}

/// Accumulates candidate checkpoints; validation happens in [`build`](Self::build).
#[derive(Debug, Default)]
pub struct CheckpointPoolBuilder {
    pending: Vec<Checkpoint>,
}

impl CheckpointPoolBuilder {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Record a checkpoint. Only checks that the name is non-empty and that
    /// the path exists.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Result<&mut Self, CheckpointError> {
        let name = name.into();
        let path = path.into();

        if name.trim().is_empty() {
            return Err(CheckpointError::InvalidCheckpoint {
                name,
                path,
                reason: "checkpoint name is empty".to_string(),
            });
        }
        if !path.exists() {
            return Err(CheckpointError::InvalidCheckpoint {
                name,
                path,
                reason: "path does not exist".to_string(),
            });
        }

        debug!(name = %name, path = %path.display(), "registered checkpoint");
        self.pending.push(Checkpoint { name, path });
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Validate the registrations and freeze them into a pool.
    ///
    /// Duplicate names are rejected rather than overwritten.
    pub fn build(self) -> Result<CheckpointPool, CheckpointError> {
        if self.pending.is_empty() {
            return Err(CheckpointError::EmptyPool);
        }

        let mut by_name = HashMap::with_capacity(self.pending.len());
        for (position, checkpoint) in self.pending.iter().enumerate() {
            if by_name.insert(checkpoint.name.clone(), position).is_some() {
                return Err(CheckpointError::DuplicateCheckpoint {
                    name: checkpoint.name.clone(),
                });
            }
        }

        Ok(CheckpointPool {
            checkpoints: self.pending,
            by_name,
        })
    }
}

/// Ordered, immutable set of checkpoints with unique names.
#[derive(Debug, Clone)]
pub struct CheckpointPool {
    checkpoints: Vec<Checkpoint>,
    by_name: HashMap<String, usize>,
}

impl CheckpointPool {
    pub fn builder() -> CheckpointPoolBuilder {
        CheckpointPoolBuilder::new()
    }

    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    /// Always false: `build()` refuses to produce an empty pool.
    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Checkpoint> {
        self.by_name.get(name).map(|&idx| &self.checkpoints[idx])
    }

    pub fn get_index(&self, position: usize) -> Option<&Checkpoint> {
        self.checkpoints.get(position)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// The checkpoint a freshly constructed decoder loads first.
    pub fn first(&self) -> &Checkpoint {
        &self.checkpoints[0]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Checkpoint> {
        self.checkpoints.iter()
    }

    pub fn names(&self) -> HashSet<&str> {
        self.by_name.keys().map(String::as_str).collect()
    }
}

impl<'a> IntoIterator for &'a CheckpointPool {
    type Item = &'a Checkpoint;
    type IntoIter = std::slice::Iter<'a, Checkpoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture_dirs(names: &[&str]) -> TempDir {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in names {
            std::fs::create_dir(dir.path().join(name)).expect("checkpoint dir");
        }
        dir
    }

    #[test]
    fn build_preserves_registration_order() {
        let dir = fixture_dirs(&["en__it", "it__en", "en__de"]);
        let mut builder = CheckpointPool::builder();
        for name in ["en__it", "it__en", "en__de"] {
            builder.register(name, dir.path().join(name)).unwrap();
        }
        let pool = builder.build().unwrap();

        assert_eq!(pool.len(), 3);
        assert_eq!(pool.first().name(), "en__it");
        assert_eq!(pool.position("en__de"), Some(2));
        let order: Vec<_> = pool.iter().map(Checkpoint::name).collect();
        assert_eq!(order, ["en__it", "it__en", "en__de"]);
    }

    #[test]
    fn empty_builder_fails() {
        let err = CheckpointPoolBuilder::new().build().unwrap_err();
        assert!(matches!(err, CheckpointError::EmptyPool));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let dir = fixture_dirs(&["a", "b"]);
        let mut builder = CheckpointPool::builder();
        builder
            .register("en__it", dir.path().join("a"))
            .unwrap()
            .register("en__it", dir.path().join("b"))
            .unwrap();

        match builder.build() {
            Err(CheckpointError::DuplicateCheckpoint { name }) => assert_eq!(name, "en__it"),
            other => panic!("expected duplicate error, got {other:?}"),
        }
    }

    #[test]
    fn register_validates_name_and_path() {
        let dir = fixture_dirs(&["ok"]);
        let mut builder = CheckpointPool::builder();

        let err = builder.register("  ", dir.path().join("ok")).unwrap_err();
        assert!(matches!(err, CheckpointError::InvalidCheckpoint { .. }));

        let err = builder
            .register("en__it", dir.path().join("missing"))
            .unwrap_err();
        assert!(err.to_string().contains("does not exist"));

        assert!(builder.is_empty());
    }
}
