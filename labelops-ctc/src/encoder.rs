//! Label encoder: text to label indices and back.

use crate::ctc::collapse;
use crate::error::{DecodeError, EncodingError};
use crate::text::normalize_text;
use crate::vocab::{CharVocabulary, Vocabulary};
use ndarray::Array2;
use std::sync::Arc;

/// Maps reference text to label indices and label indices to text.
///
/// Built once at startup and shared read-only between decode calls.
#[derive(Clone, Debug)]
pub struct TextEncoder {
    vocabulary: Arc<dyn Vocabulary>,
}

impl Default for TextEncoder {
    fn default() -> Self {
        Self::new(Arc::new(CharVocabulary::english()))
    }
}

impl TextEncoder {
    pub fn new(vocabulary: Arc<dyn Vocabulary>) -> Self {
        Self { vocabulary }
    }

    /// Active vocabulary.
    pub fn vocabulary(&self) -> &Arc<dyn Vocabulary> {
        &self.vocabulary
    }

    /// Number of labels.
    pub fn len(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vocabulary.is_empty()
    }

    /// Canonical form used for encoding and scoring.
    pub fn normalize(&self, text: &str) -> String {
        normalize_text(text)
    }

    /// Normalize `text` and map it to label indices.
    ///
    /// # Errors
    ///
    /// Returns [`EncodingError::UnknownUnits`] listing every unit that has no
    /// index in the vocabulary.
    pub fn encode(&self, text: &str) -> Result<Vec<u32>, EncodingError> {
        self.encode_raw(&self.normalize(text))
    }

    /// Map `text` to label indices as given, without normalizing it.
    ///
    /// Characters the normalizer would strip (digits, punctuation) are
    /// reported as unknown units.
    pub fn encode_raw(&self, text: &str) -> Result<Vec<u32>, EncodingError> {
        self.vocabulary.tokens_of(text)
    }

    /// Encode into a `(1, n)` label tensor.
    pub fn encode_array(&self, text: &str) -> Result<Array2<i64>, EncodingError> {
        let indices = self.encode(text)?;
        let n = indices.len();

        Ok(Array2::from_shape_fn((1, n), |(_, j)| indices[j] as i64))
    }

    /// Raw decoding without CTC collapsing.
    ///
    /// Keeps blanks and repetitions; used to check the collapsing decoder.
    pub fn decode_raw(&self, indices: &[u32]) -> Result<String, DecodeError> {
        let text = self.vocabulary.text_of(indices)?;
        Ok(text.trim().to_string())
    }

    /// Greedy CTC decoding: merge repeated labels, then drop blanks.
    pub fn decode_ctc(&self, indices: &[u32]) -> Result<String, DecodeError> {
        let collapsed = collapse(indices, self.vocabulary.blank_index());
        self.vocabulary.text_of(&collapsed)
    }
}
