//! CTC prefix beam search with optional n-gram language model fusion.
//!
//! Hypotheses are collapsed label prefixes. Each keeps two natural-log
//! probabilities, ending in blank and ending in a non-blank label, so that
//! repeats are merged the way CTC collapsing merges them. The language
//! model term is added whenever a word completes and as a penalty on partial
//! words that no lexicon word starts with.

use crate::ctc::check_columns;
use crate::error::{ConfigError, Result};
use crate::lm::{LanguageModelScorer, LmWeights};
use crate::text::normalize_text;
use crate::vocab::{Label, Vocabulary};
use ndarray::{ArrayView1, ArrayView2, Axis};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

pub const DEFAULT_BEAM_WIDTH: usize = 50;
pub const DEFAULT_BEAM_PRUNE_LOGP: f32 = -10.0;
pub const DEFAULT_TOKEN_MIN_LOGP: f32 = -5.0;

/// Scored search over per-frame log-probabilities.
pub trait BeamSearch: Send + Sync {
    /// Best hypothesis text for one utterance.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidBeamWidth`] when `beam_width` is zero and
    /// [`DecodeError::ShapeMismatch`](crate::DecodeError::ShapeMismatch) when
    /// the column count differs from the vocabulary size.
    fn search(&self, log_probs: ArrayView2<f32>, beam_width: usize) -> Result<String>;
}

/// Scoring and pruning configuration for beam search decoding.
///
/// The beam width is not part of it; callers pass it to every
/// [`BeamSearch::search`].
#[derive(clap::Args, Clone, Copy, Debug)]
pub struct BeamSearchConfig {
    /// Language model weight
    #[arg(long, default_value_t = 0.5, allow_negative_numbers = true)]
    pub alpha: f32,

    /// Word insertion bonus
    #[arg(long, default_value_t = 1.5, allow_negative_numbers = true)]
    pub beta: f32,

    /// Score added for words outside the lexicon
    #[arg(long, default_value_t = -10.0, allow_negative_numbers = true)]
    pub unk_score_offset: f32,

    /// Drop hypotheses this far below the best one
    #[arg(long, default_value_t = DEFAULT_BEAM_PRUNE_LOGP, allow_negative_numbers = true)]
    pub beam_prune_logp: f32,

    /// Skip labels less likely than this within a frame
    #[arg(long, default_value_t = DEFAULT_TOKEN_MIN_LOGP, allow_negative_numbers = true)]
    pub token_min_logp: f32,

    /// Do not score sentence start and end
    #[arg(long)]
    pub no_score_boundary: bool,
}

impl Default for BeamSearchConfig {
    fn default() -> Self {
        let weights = LmWeights::default();

        Self {
            alpha: weights.alpha,
            beta: weights.beta,
            unk_score_offset: weights.unk_score_offset,
            beam_prune_logp: DEFAULT_BEAM_PRUNE_LOGP,
            token_min_logp: DEFAULT_TOKEN_MIN_LOGP,
            no_score_boundary: !weights.score_boundary,
        }
    }
}

impl BeamSearchConfig {
    /// Language model weights carried by this configuration.
    pub fn lm_weights(&self) -> LmWeights {
        LmWeights {
            alpha: self.alpha,
            beta: self.beta,
            unk_score_offset: self.unk_score_offset,
            score_boundary: !self.no_score_boundary,
        }
    }
}

/// # Errors
///
/// [`ConfigError::InvalidBeamWidth`] for a zero beam width.
pub fn check_beam_width(beam_width: usize) -> std::result::Result<(), ConfigError> {
    if beam_width < 1 {
        return Err(ConfigError::InvalidBeamWidth(beam_width));
    }
    Ok(())
}

/// Numerically stable `ln(exp(a) + exp(b))`.
fn log_sum_exp(a: f32, b: f32) -> f32 {
    if a == f32::NEG_INFINITY {
        return b;
    }
    if b == f32::NEG_INFINITY {
        return a;
    }

    let max = a.max(b);
    max + ((a - max).exp() + (b - max).exp()).ln()
}

#[derive(Clone, Debug)]
struct Beam {
    /// Collapsed label prefix, the beam identity
    labels: Vec<u32>,
    text: String,
    words: Vec<String>,
    partial: String,
    p_blank: f32,
    p_nonblank: f32,
    /// LM score of completed words
    lm_score: f32,
    /// Penalty of the unfinished word
    partial_score: f32,
}

impl Beam {
    fn root() -> Self {
        Self {
            labels: Vec::new(),
            text: String::new(),
            words: Vec::new(),
            partial: String::new(),
            p_blank: 0.0,
            p_nonblank: f32::NEG_INFINITY,
            lm_score: 0.0,
            partial_score: 0.0,
        }
    }

    /// Same hypothesis with no probability mass yet.
    fn emptied(&self) -> Self {
        Self {
            p_blank: f32::NEG_INFINITY,
            p_nonblank: f32::NEG_INFINITY,
            ..self.clone()
        }
    }

    fn last(&self) -> Option<u32> {
        self.labels.last().copied()
    }

    fn acoustic(&self) -> f32 {
        log_sum_exp(self.p_blank, self.p_nonblank)
    }

    fn score(&self) -> f32 {
        self.acoustic() + self.lm_score + self.partial_score
    }
}

/// Total order: score descending, then text, then labels ascending.
fn rank(a: &(f32, Beam), b: &(f32, Beam)) -> Ordering {
    b.0.total_cmp(&a.0)
        .then_with(|| a.1.text.cmp(&b.1.text))
        .then_with(|| a.1.labels.cmp(&b.1.labels))
}

/// Prefix beam search over a fixed vocabulary.
#[derive(Clone, Debug)]
pub struct PrefixBeamSearch {
    vocabulary: Arc<dyn Vocabulary>,
    scorer: Option<LanguageModelScorer>,
    config: BeamSearchConfig,
}

impl PrefixBeamSearch {
    /// Without a scorer the search ranks by acoustic score alone.
    pub fn new(
        vocabulary: Arc<dyn Vocabulary>,
        scorer: Option<LanguageModelScorer>,
        config: BeamSearchConfig,
    ) -> Self {
        Self {
            vocabulary,
            scorer,
            config,
        }
    }

    /// Labels worth extending with in one frame; blank excluded.
    fn candidates(&self, frame: ArrayView1<f32>, blank: u32) -> Vec<u32> {
        let mut best: Option<(u32, f32)> = None;
        let mut candidates = Vec::new();

        for (index, &lp) in (0u32..).zip(frame.iter()) {
            if best.is_none_or(|(_, b)| lp > b) {
                best = Some((index, lp));
            }
            if index != blank && lp >= self.config.token_min_logp {
                candidates.push(index);
            }
        }

        if let Some((index, _)) = best
            && index != blank
            && !candidates.contains(&index)
        {
            candidates.push(index);
        }

        candidates
    }

    /// Move the unfinished word into the completed words.
    fn complete_word(&self, beam: &mut Beam) {
        if beam.partial.is_empty() {
            return;
        }

        let word = std::mem::take(&mut beam.partial);
        if let Some(scorer) = &self.scorer {
            beam.lm_score += scorer.score_word(&beam.words, &word);
        }
        beam.words.push(word);
        beam.partial_score = 0.0;
    }

    fn extend(&self, parent: &Beam, index: u32, label: &Label) -> Beam {
        let mut child = parent.emptied();
        child.labels.push(index);
        label.render_into(&mut child.text);

        match label {
            Label::Blank => {}
            Label::Boundary => self.complete_word(&mut child),
            Label::Piece { text, starts_word } => {
                if *starts_word {
                    self.complete_word(&mut child);
                }
                child.partial.push_str(text);
                if let Some(scorer) = &self.scorer {
                    child.partial_score = scorer.score_partial(&child.partial);
                }
            }
        }

        child
    }

    /// Advance every beam by one frame.
    fn step(&self, beams: &[Beam], frame: ArrayView1<f32>, blank: u32) -> Vec<Beam> {
        let candidates = self.candidates(frame, blank);
        let blank_lp = frame[blank as usize];

        let mut order: Vec<Vec<u32>> = Vec::new();
        let mut next: HashMap<Vec<u32>, Beam> = HashMap::new();

        for beam in beams {
            let total = beam.acoustic();

            let same = next.entry(beam.labels.clone()).or_insert_with(|| {
                order.push(beam.labels.clone());
                beam.emptied()
            });
            same.p_blank = log_sum_exp(same.p_blank, total + blank_lp);

            for &index in &candidates {
                let lp = frame[index as usize];
                let Some(label) = self.vocabulary.label(index) else {
                    continue;
                };

                if beam.last() == Some(index) {
                    // repeat without a blank in between stays collapsed
                    if let Some(same) = next.get_mut(&beam.labels) {
                        same.p_nonblank = log_sum_exp(same.p_nonblank, beam.p_nonblank + lp);
                    }
                }

                let from = if beam.last() == Some(index) {
                    beam.p_blank
                } else {
                    total
                };

                let mut labels = beam.labels.clone();
                labels.push(index);

                let child = next.entry(labels).or_insert_with_key(|key| {
                    order.push(key.clone());
                    self.extend(beam, index, label)
                });
                child.p_nonblank = log_sum_exp(child.p_nonblank, from + lp);
            }
        }

        let mut scored: Vec<(f32, Beam)> = order
            .into_iter()
            .filter_map(|key| next.remove(&key))
            .map(|beam| (beam.score(), beam))
            .collect();

        scored.sort_by(rank);
        self.prune(scored)
    }

    /// Drop beams scoring below `best + beam_prune_logp`; input is ranked.
    fn prune(&self, scored: Vec<(f32, Beam)>) -> Vec<Beam> {
        let Some(best) = scored.first().map(|(s, _)| *s) else {
            return Vec::new();
        };
        let threshold = best + self.config.beam_prune_logp;

        scored
            .into_iter()
            .filter(|(s, _)| *s >= threshold)
            .map(|(_, beam)| beam)
            .collect()
    }

    /// Final score of a beam: completes the trailing word and adds the
    /// sentence end.
    fn finalize(&self, mut beam: Beam) -> (f32, Beam) {
        self.complete_word(&mut beam);

        if let Some(scorer) = &self.scorer {
            beam.lm_score += scorer.score_end(&beam.words);
        }

        (beam.score(), beam)
    }
}

impl BeamSearch for PrefixBeamSearch {
    fn search(&self, log_probs: ArrayView2<f32>, beam_width: usize) -> Result<String> {
        check_beam_width(beam_width)?;
        check_columns(log_probs, self.vocabulary.len())?;

        let blank = self.vocabulary.blank_index();
        let mut beams = vec![Beam::root()];

        for (t, frame) in log_probs.axis_iter(Axis(0)).enumerate() {
            beams = self.step(&beams, frame, blank);
            beams.truncate(beam_width);

            tracing::trace!(
                frame = t,
                beams = beams.len(),
                best = beams.first().map(|b| b.text.as_str()),
                "beam step"
            );
        }

        let best = beams
            .into_iter()
            .map(|beam| self.finalize(beam))
            .min_by(rank)
            .map(|(_, beam)| normalize_text(&beam.words.join(" ")))
            .unwrap_or_default();

        tracing::debug!(
            frames = log_probs.nrows(),
            vocab_size = log_probs.ncols(),
            beam_width,
            lm = self.scorer.is_some(),
            "beam search finished"
        );

        Ok(best)
    }
}
