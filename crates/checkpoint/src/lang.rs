//! Language tags and translation directions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Separator between source and target in a checkpoint name (`en__it`).
pub const DIRECTION_SEPARATOR: &str = "__";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid language tag '{tag}': {reason}")]
pub struct ParseLanguageError {
    pub tag: String,
    pub reason: &'static str,
}

/// A language tag with an optional region, e.g. `en` or `en-US`.
///
/// The language subtag is stored lowercase and the region uppercase, so
/// `EN_us` and `en-US` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Language {
    language: String,
    region: Option<String>,
}

impl Language {
    pub fn new(language: &str) -> Result<Self, ParseLanguageError> {
        language.parse()
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }
}

impl FromStr for Language {
    type Err = ParseLanguageError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        let err = |reason| ParseLanguageError {
            tag: tag.to_string(),
            reason,
        };

        let mut parts = tag.trim().split(['-', '_']);
        let language = parts.next().unwrap_or_default();
        if language.is_empty() {
            return Err(err("missing language subtag"));
        }
        if language.len() > 8 || !language.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(err("language subtag must be 1-8 ASCII letters"));
        }

        let region = match parts.next() {
            None => None,
            Some(region)
                if !region.is_empty() && region.chars().all(|c| c.is_ascii_alphanumeric()) =>
            {
                Some(region.to_ascii_uppercase())
            }
            Some(_) => return Err(err("region subtag must be ASCII alphanumeric")),
        };

        if parts.next().is_some() {
            return Err(err("only language and region subtags are supported"));
        }

        Ok(Self {
            language: language.to_ascii_lowercase(),
            region,
        })
    }
}

impl TryFrom<String> for Language {
    type Error = ParseLanguageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Language> for String {
    fn from(value: Language) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.region {
            Some(region) => write!(f, "{}-{}", self.language, region),
            None => f.write_str(&self.language),
        }
    }
}

/// Source → target translation direction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LanguagePair {
    pub source: Language,
    pub target: Language,
}

impl LanguagePair {
    pub fn new(source: Language, target: Language) -> Self {
        Self { source, target }
    }

    pub fn parse(source: &str, target: &str) -> Result<Self, ParseLanguageError> {
        Ok(Self::new(source.parse()?, target.parse()?))
    }

    /// Parse a direction from a checkpoint name such as `en__it`.
    pub fn from_checkpoint_name(name: &str) -> Option<Self> {
        let (source, target) = name.split_once(DIRECTION_SEPARATOR)?;
        Self::parse(source, target).ok()
    }

    pub fn reversed(&self) -> Self {
        Self::new(self.target.clone(), self.source.clone())
    }
}

impl fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} > {}", self.source, self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_language_and_region() {
        let lang: Language = "EN_us".parse().unwrap();
        assert_eq!(lang.language(), "en");
        assert_eq!(lang.region(), Some("US"));
        assert_eq!(lang.to_string(), "en-US");
        assert_eq!(lang, "en-US".parse().unwrap());
    }

    #[test]
    fn rejects_malformed_tags() {
        assert!("".parse::<Language>().is_err());
        assert!("e1".parse::<Language>().is_err());
        assert!("en-".parse::<Language>().is_err());
        assert!("zh-Hant-TW".parse::<Language>().is_err());
    }

    #[test]
    fn direction_from_checkpoint_name() {
        let pair = LanguagePair::from_checkpoint_name("en__it").unwrap();
        assert_eq!(pair.source.to_string(), "en");
        assert_eq!(pair.target.to_string(), "it");

        let pair = LanguagePair::from_checkpoint_name("en-GB__pt-BR").unwrap();
        assert_eq!(pair.target.region(), Some("BR"));
        assert_eq!(pair.reversed().source.to_string(), "pt-BR");

        assert!(LanguagePair::from_checkpoint_name("general").is_none());
        assert!(LanguagePair::from_checkpoint_name("en_it").is_none());
    }

    #[test]
    fn language_serde_uses_tag_string() {
        let lang: Language = serde_json::from_str("\"it-ch\"").unwrap();
        assert_eq!(lang.region(), Some("CH"));
        assert_eq!(serde_json::to_string(&lang).unwrap(), "\"it-CH\"");
    }
}
