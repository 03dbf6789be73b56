//! Unigram word list used to flag out-of-vocabulary words and partial words.

use crate::error::ConfigError;
use std::collections::BTreeSet;
use std::ops::Bound;
use std::path::Path;

/// Case-folded set of known words.
#[derive(Clone, Debug, Default)]
pub struct Lexicon {
    words: BTreeSet<String>,
}

impl Lexicon {
    /// Read one word per line, lowercasing each and skipping blank lines.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

        let lexicon = Self::from_words(text.lines());
        tracing::debug!(path = ?path.display(), words = lexicon.len(), "lexicon loaded");

        Ok(lexicon)
    }

    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();

        Self { words }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    /// Whether some known word starts with `partial`.
    pub fn is_prefix(&self, partial: &str) -> bool {
        self.words
            .range::<str, _>((Bound::Included(partial), Bound::Unbounded))
            .next()
            .is_some_and(|w| w.starts_with(partial))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn folds_case_and_skips_blank_lines() {
        let lexicon = Lexicon::from_words(["Hello", "", "  WORLD  ", "hello"]);

        assert_eq!(lexicon.len(), 2);
        assert!(lexicon.contains("hello"));
        assert!(lexicon.contains("world"));
        assert!(!lexicon.contains("Hello"));
    }

    #[test]
    fn detects_prefixes() {
        let lexicon = Lexicon::from_words(["cat", "catalog", "dog"]);

        assert!(lexicon.is_prefix("ca"));
        assert!(lexicon.is_prefix("cata"));
        assert!(lexicon.is_prefix("dog"));
        assert!(lexicon.is_prefix(""));
        assert!(!lexicon.is_prefix("cb"));
        assert!(!lexicon.is_prefix("dogs"));
    }

    #[test]
    fn prefix_past_last_word() {
        let lexicon = Lexicon::from_words(["apple", "zoo"]);

        assert!(lexicon.is_prefix("zo"));
        assert!(!lexicon.is_prefix("zz"));
        assert!(!Lexicon::default().is_prefix("a"));
    }

    #[test]
    fn reads_word_list_file() {
        let dir = TempDir::new("lexicon").unwrap();
        let path = dir.path().join("vocab.txt");
        std::fs::write(&path, "THE\nCat\n\nsat\n").unwrap();

        let lexicon = Lexicon::from_file(&path).unwrap();

        assert_eq!(lexicon.len(), 3);
        assert!(lexicon.contains("cat"));
    }

    #[test]
    fn missing_file_is_unreadable() {
        let err = Lexicon::from_file("/nonexistent/vocab.txt").unwrap_err();

        assert!(matches!(err, ConfigError::Unreadable { .. }));
    }
}
