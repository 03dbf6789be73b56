//! Vocabularies mapping CTC label indices to tokens and back.
//!
//! Two construction modes share one [`Vocabulary`] interface:
//!
//! - [`CharVocabulary`]: blank plus a fixed character alphabet, blank at index 0
//! - [`SubwordVocabulary`]: tokens of an external sub-word tokenizer, in the
//!   tokenizer's own index order, with the blank located by name
//!
//! The mode is picked once through [`VocabularySource::build`], so decoders
//! never branch on it.

pub mod character;
pub mod subword;

pub use self::character::CharVocabulary;
pub use self::subword::SubwordVocabulary;

use crate::error::{ConfigError, DecodeError, EncodingError};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Token reserved for the CTC blank in character mode.
pub const EMPTY_TOKEN: &str = "";

/// Role of a label index when assembling text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Label {
    /// CTC blank, renders as nothing
    Blank,
    /// Word separator (the space character or a bare `▁`)
    Boundary,
    /// Surface text of a token
    Piece {
        /// Text appended to the current word
        text: String,
        /// Whether this token opens a new word
        starts_word: bool,
    },
}

impl Label {
    /// Append the surface form of this label to `out`.
    pub fn render_into(&self, out: &mut String) {
        match self {
            Label::Blank => {}
            Label::Boundary => out.push(' '),
            Label::Piece { text, starts_word } => {
                if *starts_word && !out.is_empty() && !out.ends_with(' ') {
                    out.push(' ');
                }
                out.push_str(text);
            }
        }
    }
}

/// Index-to-token bijection shared by all vocabulary modes.
pub trait Vocabulary: Send + Sync + std::fmt::Debug {
    /// Number of labels, i.e. the expected log-probability column count.
    fn len(&self) -> usize;

    /// Whether the vocabulary holds no labels.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index of the CTC blank label.
    fn blank_index(&self) -> u32;

    /// Token stored at `index`.
    fn token(&self, index: u32) -> Option<&str>;

    /// Index of `token`.
    fn index_of(&self, token: &str) -> Option<u32>;

    /// Text role of the label at `index`.
    fn label(&self, index: u32) -> Option<&Label>;

    /// Split already normalized text into label indices.
    ///
    /// Collects every unit missing from the vocabulary before failing.
    fn tokens_of(&self, text: &str) -> Result<Vec<u32>, EncodingError>;

    /// Concatenate the labels at `indices` without collapsing anything.
    fn text_of(&self, indices: &[u32]) -> Result<String, DecodeError> {
        let mut text = String::new();

        for &index in indices {
            self.label(index)
                .ok_or(DecodeError::IndexOutOfRange {
                    index,
                    size: self.len(),
                })?
                .render_into(&mut text);
        }

        Ok(text)
    }
}

/// Exact inverse maps between indices and tokens.
#[derive(Clone, Debug)]
pub struct TokenTable {
    index_to_token: Vec<String>,
    token_to_index: HashMap<String, u32>,
}

impl TokenTable {
    /// Build the table from tokens listed in index order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateToken`] if two indices share a token.
    pub fn from_tokens<I>(tokens: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = String>,
    {
        let index_to_token: Vec<String> = tokens.into_iter().collect();
        let mut token_to_index = HashMap::with_capacity(index_to_token.len());

        for (index, token) in (0u32..).zip(&index_to_token) {
            if let Some(first) = token_to_index.insert(token.clone(), index) {
                return Err(ConfigError::DuplicateToken {
                    token: token.clone(),
                    first,
                    second: index,
                });
            }
        }

        Ok(Self {
            index_to_token,
            token_to_index,
        })
    }

    pub fn len(&self) -> usize {
        self.index_to_token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index_to_token.is_empty()
    }

    pub fn token(&self, index: u32) -> Option<&str> {
        self.index_to_token.get(index as usize).map(String::as_str)
    }

    pub fn index_of(&self, token: &str) -> Option<u32> {
        self.token_to_index.get(token).copied()
    }

    /// Tokens in index order.
    pub fn tokens(&self) -> &[String] {
        &self.index_to_token
    }
}

/// Where the vocabulary comes from.
#[derive(Clone, Debug, Default)]
pub enum VocabularySource {
    /// Blank, `a`-`z`, space
    #[default]
    Characters,
    /// Blank followed by the characters of an alphabet file
    Alphabet(PathBuf),
    /// Tokens of a serialized sub-word tokenizer
    Subword {
        tokenizer: PathBuf,
        /// Blank token name; common names are tried when unset
        blank: Option<String>,
    },
}

impl VocabularySource {
    /// Construct the vocabulary once for the process lifetime.
    pub fn build(&self) -> Result<Arc<dyn Vocabulary>, ConfigError> {
        let vocabulary: Arc<dyn Vocabulary> = match self {
            VocabularySource::Characters => Arc::new(CharVocabulary::english()),
            VocabularySource::Alphabet(path) => Arc::new(CharVocabulary::from_alphabet_file(path)?),
            VocabularySource::Subword { tokenizer, blank } => {
                Arc::new(SubwordVocabulary::from_file(tokenizer, blank.as_deref())?)
            }
        };

        tracing::debug!(
            source = ?self,
            size = vocabulary.len(),
            blank = vocabulary.blank_index(),
            "vocabulary built"
        );

        Ok(vocabulary)
    }
}

/// Collect units in first-appearance order without repeats.
pub(crate) fn push_unique(units: &mut Vec<String>, unit: &str) {
    if !units.iter().any(|u| u == unit) {
        units.push(unit.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(list: &[&str]) -> Vec<String> {
        list.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn table_maps_are_inverse() {
        let table = TokenTable::from_tokens(tokens(&["", "a", "b", " "])).unwrap();

        for index in 0..table.len() as u32 {
            let token = table.token(index).unwrap();
            assert_eq!(table.index_of(token), Some(index));
        }
        assert_eq!(table.token(4), None);
    }

    #[test]
    fn table_rejects_duplicates() {
        let err = TokenTable::from_tokens(tokens(&["", "a", "b", "a"])).unwrap_err();

        assert!(matches!(
            err,
            ConfigError::DuplicateToken { ref token, first: 1, second: 3 } if token == "a"
        ));
    }

    #[test]
    fn piece_starting_word_inserts_space() {
        let mut out = String::new();
        let hello = Label::Piece {
            text: "hel".to_string(),
            starts_word: true,
        };
        let lo = Label::Piece {
            text: "lo".to_string(),
            starts_word: false,
        };
        let world = Label::Piece {
            text: "world".to_string(),
            starts_word: true,
        };

        for label in [&hello, &Label::Blank, &lo, &world] {
            label.render_into(&mut out);
        }

        assert_eq!(out, "hello world");
    }

    #[test]
    fn boundary_does_not_double_space() {
        let mut out = String::new();
        Label::Piece {
            text: "a".to_string(),
            starts_word: false,
        }
        .render_into(&mut out);
        Label::Boundary.render_into(&mut out);
        Label::Piece {
            text: "b".to_string(),
            starts_word: true,
        }
        .render_into(&mut out);

        assert_eq!(out, "a b");
    }

    #[test]
    fn characters_source_builds_english() {
        let vocabulary = VocabularySource::Characters.build().unwrap();

        assert_eq!(vocabulary.len(), 28);
        assert_eq!(vocabulary.blank_index(), 0);
    }
}
