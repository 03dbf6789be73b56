//! Error types for labelops-ctc organized by processing stage.

use ndarray_stats::errors::MinMaxError;
use std::path::PathBuf;
use thiserror::Error;

/// Decoding pipeline error variants organized by processing stage.
#[derive(Debug, Error)]
pub enum Error {
    /// Startup configuration stage error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Label encoding stage error
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    /// Decoding stage error
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Result persistence error
    #[error(transparent)]
    Output(#[from] OutputError),
}

/// Configuration errors (vocabulary, language model, lexicon, search settings).
///
/// These are fatal at startup and never retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Resource file could not be read
    #[error("failed to read {path:?}: {source}")]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Tokenizer definition could not be loaded
    #[error("failed to load tokenizer: {0}")]
    Tokenizer(tokenizers::Error),

    /// Two indices map to the same token after case folding
    #[error("duplicate token {token:?} at indices {first} and {second}")]
    DuplicateToken {
        token: String,
        first: u32,
        second: u32,
    },

    /// Tokenizer vocabulary does not cover a contiguous index range
    #[error("vocabulary has no token at index {index} (size {size})")]
    IndexGap { index: u32, size: usize },

    /// Blank token is absent from a sub-word vocabulary
    #[error("blank token not found in vocabulary (tried {candidates:?})")]
    MissingBlank { candidates: Vec<String> },

    /// Alphabet source produced no symbols
    #[error("alphabet is empty")]
    EmptyAlphabet,

    /// Language model file is malformed
    #[error("invalid language model at line {line}: {reason}")]
    InvalidLanguageModel { line: usize, reason: String },

    /// Beam width must be positive
    #[error("invalid beam width: {0} (minimum 1)")]
    InvalidBeamWidth(usize),
}

/// Text could not be mapped to vocabulary indices.
///
/// Recoverable at the call site: the caller may skip the utterance.
#[derive(Debug, Error)]
pub enum EncodingError {
    /// Every unit absent from the vocabulary, in order of first appearance
    #[error("can't encode text {text:?}: unknown units: '{}'", .units.join(" "))]
    UnknownUnits { text: String, units: Vec<String> },

    /// Tokenizer failed while splitting text
    #[error("tokenizer failed on {text:?}: {error}")]
    Tokenizer {
        text: String,
        error: tokenizers::Error,
    },
}

/// Errors raised while turning indices or log-probabilities into text.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Log-probability columns disagree with the vocabulary size
    #[error("log-probability matrix has {got} columns, vocabulary has {expected} tokens")]
    ShapeMismatch { expected: usize, got: usize },

    /// Index has no token in the vocabulary
    #[error("index {index} out of range for vocabulary of size {size}")]
    IndexOutOfRange { index: u32, size: usize },

    /// Valid length exceeds the padded frame count
    #[error("valid length {length} exceeds {frames} frames")]
    LengthOutOfRange { length: usize, frames: usize },

    /// Batch fields have inconsistent sizes
    #[error("batch has {log_probs} log-probability rows but {field} has {got} entries")]
    BatchMismatch {
        field: &'static str,
        log_probs: usize,
        got: usize,
    },

    /// ndarray-stats min/max error (NaN frame)
    #[error(transparent)]
    MinMax(#[from] MinMaxError),
}

/// Result table persistence errors.
#[derive(Debug, Error)]
pub enum OutputError {
    /// IO error while writing results
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// CSV serialization error
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// Result type alias for labelops-ctc operations.
pub type Result<T> = std::result::Result<T, Error>;

// Nested From implementations for automatic error conversion chains

// MinMaxError → DecodeError → Error
impl From<MinMaxError> for Error {
    fn from(e: MinMaxError) -> Self {
        Error::Decode(DecodeError::MinMax(e))
    }
}

// csv::Error → OutputError → Error
impl From<csv::Error> for Error {
    fn from(e: csv::Error) -> Self {
        Error::Output(OutputError::Csv(e))
    }
}

// std::io::Error → OutputError → Error
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Output(OutputError::Io(e))
    }
}
