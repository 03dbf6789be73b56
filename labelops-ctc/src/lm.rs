//! N-gram language model oracle and unigram lexicon used by beam search.
//!
//! The model and lexicon are loaded once at startup and shared read-only
//! across decode calls through [`LanguageModelScorer`].

pub mod arpa;
pub mod lexicon;
pub mod scorer;

pub use arpa::ArpaModel;
pub use lexicon::Lexicon;
pub use scorer::{LanguageModelScorer, LmWeights};

/// Sentence start token.
pub const BOS: &str = "<s>";

/// Sentence end token.
pub const EOS: &str = "</s>";

/// Unknown word token.
pub const UNK: &str = "<unk>";

/// Opaque n-gram scoring oracle.
///
/// Scores are base-10 log-probabilities, the convention of ARPA files.
pub trait LanguageModel: Send + Sync + std::fmt::Debug {
    /// Longest n-gram the model scores.
    fn order(&self) -> usize;

    /// `log10 p(word | context)`; `context` is oldest first and may be longer
    /// than the model order.
    fn log10_prob(&self, context: &[&str], word: &str) -> f32;
}
