//! Character-level vocabulary: blank at index 0 followed by an alphabet.

use crate::error::{ConfigError, EncodingError};
use crate::vocab::{EMPTY_TOKEN, Label, TokenTable, Vocabulary, push_unique};
use std::path::Path;

/// Lowercase English letters followed by the space character.
pub const ENGLISH_ALPHABET: &str = "abcdefghijklmnopqrstuvwxyz ";

/// Vocabulary with one token per character.
#[derive(Clone, Debug)]
pub struct CharVocabulary {
    table: TokenTable,
    labels: Vec<Label>,
}

impl CharVocabulary {
    /// Blank, `a`-`z`, space: 28 labels.
    pub fn english() -> Self {
        let tokens = std::iter::once(EMPTY_TOKEN.to_string())
            .chain(ENGLISH_ALPHABET.chars().map(String::from))
            .collect::<Vec<_>>();

        // Letters of a fixed alphabet are distinct.
        let labels = tokens.iter().map(|t| char_label(t)).collect();
        let table = TokenTable {
            token_to_index: (0u32..).zip(&tokens).map(|(i, t)| (t.clone(), i)).collect(),
            index_to_token: tokens,
        };

        Self { table, labels }
    }

    /// Blank followed by `alphabet` in the given order, case folded.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyAlphabet`] for an empty alphabet and
    /// [`ConfigError::DuplicateToken`] if case folding makes two symbols equal.
    pub fn from_alphabet<I>(alphabet: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = char>,
    {
        let symbols: Vec<String> = alphabet
            .into_iter()
            .map(|c| c.to_lowercase().collect())
            .collect();

        if symbols.is_empty() {
            return Err(ConfigError::EmptyAlphabet);
        }

        let table = TokenTable::from_tokens(std::iter::once(EMPTY_TOKEN.to_string()).chain(symbols))?;
        let labels = table.tokens().iter().map(|t| char_label(t)).collect();

        Ok(Self { table, labels })
    }

    /// Read the alphabet from a file; line breaks are ignored.
    pub fn from_alphabet_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_alphabet(contents.chars().filter(|c| !matches!(c, '\n' | '\r')))
    }
}

fn char_label(token: &str) -> Label {
    match token {
        EMPTY_TOKEN => Label::Blank,
        " " => Label::Boundary,
        _ => Label::Piece {
            text: token.to_string(),
            starts_word: false,
        },
    }
}

impl Vocabulary for CharVocabulary {
    fn len(&self) -> usize {
        self.table.len()
    }

    fn blank_index(&self) -> u32 {
        0
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
        let mut indices = Vec::with_capacity(text.len());
        let mut unknown = Vec::new();
        let mut buf = [0u8; 4];

        for c in text.chars() {
            let unit: &str = c.encode_utf8(&mut buf);
            match self.table.index_of(unit) {
                Some(index) => indices.push(index),
                None => push_unique(&mut unknown, unit),
            }
        }

        if unknown.is_empty() {
            Ok(indices)
        } else {
            Err(EncodingError::UnknownUnits {
                text: text.to_string(),
                units: unknown,
            })
        }
    }
}
