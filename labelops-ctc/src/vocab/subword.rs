//! Sub-word vocabulary backed by a serialized `tokenizers` definition.
//!
//! Tokens are case folded and keep the tokenizer's native index order. The
//! blank is looked up by name and may sit at any index; decoders read it from
//! [`Vocabulary::blank_index`].

use crate::error::{ConfigError, EncodingError};
use crate::vocab::{Label, TokenTable, Vocabulary, push_unique};
use std::path::Path;
use tokenizers::Tokenizer;

/// Blank token names tried in order when none is configured.
pub const BLANK_CANDIDATES: &[&str] = &["<blank>", "[pad]", "<pad>", ""];

/// Unknown token names recognized in tokenizer output.
const UNK_CANDIDATES: &[&str] = &["[unk]", "<unk>"];

/// SentencePiece word-start marker.
const SP_MARKER: char = '▁';

/// WordPiece continuation prefix.
const WP_PREFIX: &str = "##";

/// How tokens mark word boundaries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundaryScheme {
    /// `▁` prefix opens a word
    SentencePiece,
    /// `##` prefix continues a word, anything else opens one
    WordPiece,
    /// Only a literal space token separates words
    Plain,
}

impl BoundaryScheme {
    fn detect(tokens: &[String]) -> Self {
        if tokens.iter().any(|t| t.starts_with(SP_MARKER)) {
            BoundaryScheme::SentencePiece
        } else if tokens.iter().any(|t| t.starts_with(WP_PREFIX)) {
            BoundaryScheme::WordPiece
        } else {
            BoundaryScheme::Plain
        }
    }

    fn label(self, token: &str) -> Label {
        if token == " " {
            return Label::Boundary;
        }

        let piece = |text: &str, starts_word| Label::Piece {
            text: text.to_string(),
            starts_word,
        };

        match self {
            BoundaryScheme::SentencePiece => match token.strip_prefix(SP_MARKER) {
                Some("") => Label::Boundary,
                Some(rest) => piece(rest, true),
                None => piece(token, false),
            },
            BoundaryScheme::WordPiece => match token.strip_prefix(WP_PREFIX) {
                Some(rest) => piece(rest, false),
                None => piece(token, true),
            },
            BoundaryScheme::Plain => piece(token, false),
        }
    }
}

/// Vocabulary of a sub-word tokenizer.
#[derive(Debug)]
pub struct SubwordVocabulary {
    tokenizer: Tokenizer,
    table: TokenTable,
    labels: Vec<Label>,
    blank: u32,
    unk: Option<u32>,
    scheme: BoundaryScheme,
}

impl SubwordVocabulary {
    /// Load a `tokenizer.json` file.
    ///
    /// # Arguments
    ///
    /// * `path` - Serialized tokenizer definition
    /// * `blank` - Blank token name; [`BLANK_CANDIDATES`] are tried when `None`
    pub fn from_file<P: AsRef<Path>>(path: P, blank: Option<&str>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if let Err(source) = std::fs::metadata(path) {
            return Err(ConfigError::Unreadable {
                path: path.to_path_buf(),
                source,
            });
        }

        let tokenizer = Tokenizer::from_file(path).map_err(ConfigError::Tokenizer)?;

        tracing::debug!(path = ?path.display(), "tokenizer loaded");

        Self::from_tokenizer(tokenizer, blank)
    }

    /// Build from an already loaded tokenizer.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::IndexGap`] if some index below the vocabulary size has no token
    /// - [`ConfigError::DuplicateToken`] if case folding merges two tokens
    /// - [`ConfigError::MissingBlank`] if no blank token can be found
    pub fn from_tokenizer(tokenizer: Tokenizer, blank: Option<&str>) -> Result<Self, ConfigError> {
        let vocab = tokenizer.get_vocab(true);
        let size = vocab.len();

        let mut slots: Vec<Option<String>> = vec![None; size];
        for (token, index) in vocab {
            match slots.get_mut(index as usize) {
                Some(slot) => *slot = Some(token.to_lowercase()),
                None => return Err(ConfigError::IndexGap { index, size }),
            }
        }

        let tokens = (0u32..)
            .zip(slots)
            .map(|(index, slot)| slot.ok_or(ConfigError::IndexGap { index, size }))
            .collect::<Result<Vec<_>, _>>()?;

        let table = TokenTable::from_tokens(tokens)?;

        let candidates: Vec<String> = match blank {
            Some(name) => vec![name.to_lowercase()],
            None => BLANK_CANDIDATES.iter().map(|c| c.to_string()).collect(),
        };

        let blank = candidates
            .iter()
            .find_map(|c| table.index_of(c))
            .ok_or_else(|| ConfigError::MissingBlank {
                candidates: candidates.clone(),
            })?;

        if blank != 0 {
            tracing::warn!(blank, "blank token is not at index 0");
        }

        let unk = UNK_CANDIDATES.iter().find_map(|c| table.index_of(c));

        let scheme = BoundaryScheme::detect(table.tokens());
        let labels = (0u32..)
            .zip(table.tokens())
            .map(|(index, token)| {
                if index == blank {
                    Label::Blank
                } else {
                    scheme.label(token)
                }
            })
            .collect();

        tracing::debug!(size, blank, ?scheme, "sub-word vocabulary built");

        Ok(Self {
            tokenizer,
            table,
            labels,
            blank,
            unk,
            scheme,
        })
    }

    /// Word-boundary convention detected from the tokens.
    pub fn scheme(&self) -> BoundaryScheme {
        self.scheme
    }
}

impl Vocabulary for SubwordVocabulary {
    fn len(&self) -> usize {
        self.table.len()
    }

    fn blank_index(&self) -> u32 {
        self.blank
    }

    fn token(&self, index: u32) -> Option<&str> {
        self.table.token(index)
    }

    fn index_of(&self, token: &str) -> Option<u32> {
        self.table.index_of(token)
    }

    fn label(&self, index: u32) -> Option<&Label> {
        self.labels.get(index as usize)
    }

    fn tokens_of(&self, text: &str) -> Result<Vec<u32>, EncodingError> {
        let encoding =
            self.tokenizer
                .encode(text, false)
                .map_err(|error| EncodingError::Tokenizer {
                    text: text.to_string(),
                    error,
                })?;

        let mut unknown = Vec::new();

        for ((&id, token), &(start, end)) in encoding
            .get_ids()
            .iter()
            .zip(encoding.get_tokens())
            .zip(encoding.get_offsets())
        {
            let known = id != self.blank && Some(id) != self.unk && self.table.token(id).is_some();
            if !known {
                push_unique(&mut unknown, text.get(start..end).unwrap_or(token));
            }
        }

        if unknown.is_empty() {
            Ok(encoding.get_ids().to_vec())
        } else {
            Err(EncodingError::UnknownUnits {
                text: text.to_string(),
                units: unknown,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    /// Word-level tokenizer splitting on whitespace.
    fn word_level(vocab: &[&str]) -> Tokenizer {
        let entries = vocab
            .iter()
            .enumerate()
            .map(|(i, t)| format!("{t:?}: {i}"))
            .collect::<Vec<_>>()
            .join(", ");

        let json = format!(
            r#"{{
                "version": "1.0",
                "truncation": null,
                "padding": null,
                "added_tokens": [],
                "normalizer": null,
                "pre_tokenizer": {{ "type": "Whitespace" }},
                "post_processor": null,
                "decoder": null,
                "model": {{ "type": "WordLevel", "vocab": {{ {entries} }}, "unk_token": "[UNK]" }}
            }}"#
        );

        Tokenizer::from_bytes(json.as_bytes()).unwrap()
    }

    #[test]
    fn keeps_native_order_and_folds_case() {
        let vocab =
            SubwordVocabulary::from_tokenizer(word_level(&["[PAD]", "[UNK]", "Hello", "world"]), None)
                .unwrap();

        assert_eq!(vocab.len(), 4);
        assert_eq!(vocab.blank_index(), 0);
        assert_eq!(vocab.token(2), Some("hello"));
        assert_eq!(vocab.index_of("world"), Some(3));
        assert_eq!(vocab.scheme(), BoundaryScheme::Plain);
    }

    #[test]
    fn finds_blank_away_from_zero() {
        let vocab = SubwordVocabulary::from_tokenizer(
            word_level(&["[UNK]", "hello", "world", "<blank>"]),
            None,
        )
        .unwrap();

        assert_eq!(vocab.blank_index(), 3);
        assert_eq!(vocab.label(3), Some(&Label::Blank));
        assert_eq!(vocab.text_of(&[1, 3, 3]).unwrap(), "hello");
    }

    #[test]
    fn missing_blank_is_config_error() {
        let err = SubwordVocabulary::from_tokenizer(word_level(&["[UNK]", "hello"]), None)
            .unwrap_err();

        assert!(matches!(err, ConfigError::MissingBlank { .. }));
    }

    #[test]
    fn explicit_blank_name_is_used() {
        let vocab =
            SubwordVocabulary::from_tokenizer(word_level(&["[UNK]", "hello", "<eps>"]), Some("<EPS>"))
                .unwrap();

        assert_eq!(vocab.blank_index(), 2);
    }

    #[test]
    fn case_folding_collision_is_rejected() {
        let err = SubwordVocabulary::from_tokenizer(
            word_level(&["[PAD]", "[UNK]", "Hello", "hello"]),
            None,
        )
        .unwrap_err();

        assert!(matches!(
            err,
            ConfigError::DuplicateToken {
                first: 2,
                second: 3,
                ..
            }
        ));
    }

    #[test]
    fn encodes_with_tokenizer_ids() {
        let vocab =
            SubwordVocabulary::from_tokenizer(word_level(&["[PAD]", "[UNK]", "hello", "world"]), None)
                .unwrap();

        assert_eq!(vocab.tokens_of("hello world hello").unwrap(), vec![2, 3, 2]);
    }

    #[test]
    fn reports_words_mapped_to_unknown() {
        let vocab =
            SubwordVocabulary::from_tokenizer(word_level(&["[PAD]", "[UNK]", "hello", "world"]), None)
                .unwrap();

        let err = vocab.tokens_of("hello zebra yak zebra").unwrap_err();

        match err {
            EncodingError::UnknownUnits { units, .. } => assert_eq!(units, vec!["zebra", "yak"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn sentencepiece_markers_drive_labels() {
        let vocab = SubwordVocabulary::from_tokenizer(
            word_level(&["<blank>", "[UNK]", "▁the", "▁ca", "t", "▁"]),
            None,
        )
        .unwrap();

        assert_eq!(vocab.scheme(), BoundaryScheme::SentencePiece);
        assert_eq!(vocab.label(5), Some(&Label::Boundary));
        assert_eq!(vocab.text_of(&[2, 0, 3, 4]).unwrap(), "the cat");
    }

    #[test]
    fn wordpiece_prefixes_drive_labels() {
        let vocab = SubwordVocabulary::from_tokenizer(
            word_level(&["[PAD]", "[UNK]", "the", "ca", "##t"]),
            None,
        )
        .unwrap();

        assert_eq!(vocab.scheme(), BoundaryScheme::WordPiece);
        assert_eq!(vocab.text_of(&[2, 3, 4]).unwrap(), "the cat");
    }

    #[test]
    fn loads_from_file() {
        let dir = TempDir::new("labelops-tokenizer").unwrap();
        let path = dir.path().join("tokenizer.json");
        word_level(&["[PAD]", "[UNK]", "hi"]).save(&path, false).unwrap();

        let vocab = SubwordVocabulary::from_file(&path, None).unwrap();

        assert_eq!(vocab.len(), 3);
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = SubwordVocabulary::from_file("/nonexistent/tokenizer.json", None).unwrap_err();

        assert!(matches!(err, ConfigError::Unreadable { .. }));
    }
}
