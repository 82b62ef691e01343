//! Word-level vocabularies stored one token per line.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub const PAD_ID: usize = 0;
pub const UNK_ID: usize = 1;
pub const EOS_ID: usize = 2;
const RESERVED: [&str; 3] = ["<pad>", "<unk>", "<eos>"];

#[derive(Debug, Clone, PartialEq)]
pub struct Vocabulary {
    ids: HashMap<String, usize>,
    words: Vec<String>,
}

impl Vocabulary {
    /// Build from words; reserved tokens always occupy ids 0..3 and
    /// duplicates keep their first id.
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut vocab = Self {
            ids: HashMap::new(),
            words: Vec::new(),
        };
        for token in RESERVED {
            vocab.push(token.to_string());
        }
        for word in words {
            vocab.push(word.into());
        }
        vocab
    }

    fn push(&mut self, word: String) {
        if word.is_empty() || self.ids.contains_key(&word) {
            return;
        }
        self.ids.insert(word.clone(), self.words.len());
        self.words.push(word);
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read vocabulary {}", path.display()))?;
        Ok(Self::new(text.lines().map(str::trim)))
    }

    /// Write the non-reserved words, one per line.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut text = self.words[RESERVED.len()..].join("\n");
        text.push('\n');
        fs::write(path.as_ref(), text)
            .with_context(|| format!("failed to write vocabulary {}", path.as_ref().display()))
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Never true: reserved tokens are always present.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Exact lookup first, then lowercase; unknown words map to `<unk>`.
    pub fn id(&self, word: &str) -> usize {
        self.ids
            .get(word)
            .or_else(|| self.ids.get(&word.to_lowercase()))
            .copied()
            .unwrap_or(UNK_ID)
    }

    pub fn word(&self, id: usize) -> Option<&str> {
        self.words.get(id).map(String::as_str)
    }

    pub fn encode(&self, tokens: &[&str]) -> Vec<usize> {
        tokens.iter().map(|token| self.id(token)).collect()
    }

    pub fn is_reserved(id: usize) -> bool {
        id < RESERVED.len()
    }
}
