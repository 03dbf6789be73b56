//! Fuses the n-gram oracle and the lexicon into beam-search score terms.
//!
//! All terms are natural-log scores so they add directly to CTC
//! log-probabilities.

use crate::lm::{BOS, EOS, LanguageModel, Lexicon};
use std::sync::Arc;

/// Converts base-10 log-probabilities to natural log.
pub const LOG_BASE_CHANGE: f32 = std::f32::consts::LN_10;

/// Weights of the language-model term.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LmWeights {
    /// LM weight
    pub alpha: f32,
    /// Word insertion bonus
    pub beta: f32,
    /// Added for out-of-lexicon words and dead-end partial words
    pub unk_score_offset: f32,
    /// Score `<s>` context and `</s>` at the end of a hypothesis
    pub score_boundary: bool,
}

impl Default for LmWeights {
    fn default() -> Self {
        Self {
            alpha: 0.5,
            beta: 1.5,
            unk_score_offset: -10.0,
            score_boundary: true,
        }
    }
}

/// Shared, read-only language-model scorer for beam search.
#[derive(Clone, Debug)]
pub struct LanguageModelScorer {
    model: Arc<dyn LanguageModel>,
    lexicon: Arc<Lexicon>,
    weights: LmWeights,
}

impl LanguageModelScorer {
    pub fn new(model: Arc<dyn LanguageModel>, lexicon: Arc<Lexicon>, weights: LmWeights) -> Self {
        Self {
            model,
            lexicon,
            weights,
        }
    }

    /// Score of appending `word` after the completed words `history`.
    pub fn score_word(&self, history: &[String], word: &str) -> f32 {
        let context = self.context(history);
        let mut score = self.weights.alpha * LOG_BASE_CHANGE * self.model.log10_prob(&context, word)
            + self.weights.beta;

        if !self.lexicon.is_empty() && !self.lexicon.contains(word) {
            score += self.weights.unk_score_offset;
        }

        score
    }

    /// Penalty for an unfinished word that no lexicon word starts with.
    ///
    /// An empty lexicon constrains nothing.
    pub fn score_partial(&self, partial: &str) -> f32 {
        if partial.is_empty() || self.lexicon.is_empty() || self.lexicon.is_prefix(partial) {
            0.0
        } else {
            self.weights.unk_score_offset
        }
    }

    /// Sentence-end score of a finished hypothesis.
    pub fn score_end(&self, history: &[String]) -> f32 {
        if !self.weights.score_boundary {
            return 0.0;
        }

        let context = self.context(history);
        self.weights.alpha * LOG_BASE_CHANGE * self.model.log10_prob(&context, EOS)
    }

    /// Last `order - 1` words, led by `<s>` when the history is short.
    fn context<'a>(&self, history: &'a [String]) -> Vec<&'a str> {
        let keep = self.model.order().saturating_sub(1);
        let start = history.len().saturating_sub(keep);

        let mut context = Vec::with_capacity(keep + 1);
        if self.weights.score_boundary && start == 0 {
            context.push(BOS);
        }
        context.extend(history[start..].iter().map(String::as_str));

        context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lm::ArpaModel;

    const ARPA: &str = "\
\\data\\
ngram 1=4
ngram 2=2

\\1-grams:
-1.0\t<s>\t0.0
-0.5\thi\t0.0
-1.0\t</s>
-3.0\t<unk>

\\2-grams:
-0.1\t<s> hi
-0.2\thi </s>

\\end\\
";

    fn scorer(weights: LmWeights) -> LanguageModelScorer {
        let model = ArpaModel::from_reader(ARPA.as_bytes()).unwrap();
        let lexicon = Lexicon::from_words(["hi", "hello"]);

        LanguageModelScorer::new(Arc::new(model), Arc::new(lexicon), weights)
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn word_score_uses_sentence_start_context() {
        let scorer = scorer(LmWeights::default());

        let expected = 0.5 * LOG_BASE_CHANGE * -0.1 + 1.5;

        assert!(close(scorer.score_word(&[], "hi"), expected));
    }

    #[test]
    fn word_score_without_boundary_uses_unigram() {
        let scorer = scorer(LmWeights {
            score_boundary: false,
            ..LmWeights::default()
        });

        let expected = 0.5 * LOG_BASE_CHANGE * -0.5 + 1.5;

        assert!(close(scorer.score_word(&[], "hi"), expected));
        assert_eq!(scorer.score_end(&["hi".to_string()]), 0.0);
    }

    #[test]
    fn out_of_lexicon_word_gets_offset() {
        let scorer = scorer(LmWeights::default());

        let known = scorer.score_word(&[], "hello");
        let unknown = scorer.score_word(&[], "xyz");

        // both fall to the <unk> unigram; only the lexicon differs
        assert!(close(known - unknown, 10.0));
    }

    #[test]
    fn partial_words_are_checked_against_lexicon() {
        let scorer = scorer(LmWeights::default());

        assert_eq!(scorer.score_partial(""), 0.0);
        assert_eq!(scorer.score_partial("hel"), 0.0);
        assert_eq!(scorer.score_partial("hx"), -10.0);
    }

    #[test]
    fn end_score_follows_last_word() {
        let scorer = scorer(LmWeights::default());

        let expected = 0.5 * LOG_BASE_CHANGE * -0.2;

        assert!(close(scorer.score_end(&["hi".to_string()]), expected));
    }
}
