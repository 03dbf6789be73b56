//! labelops-ctc: CTC label encoding and decoding for speech recognition.
//!
//! Converts reference text into label index sequences and per-frame
//! log-probabilities from an acoustic model back into text.
//!
//! # Architecture
//!
//! - [`vocab::Vocabulary`]: index/token bijection, either characters
//!   ([`vocab::CharVocabulary`]) or sub-word tokenizer pieces
//!   ([`vocab::SubwordVocabulary`])
//! - [`encoder::TextEncoder`]: normalize and encode text, raw and greedy CTC
//!   decoding
//! - [`beam::BeamSearch`]: scored search over log-probabilities, implemented
//!   by [`beam::PrefixBeamSearch`] with an optional
//!   [`lm::LanguageModelScorer`]
//! - [`inference::Inferencer`]: batch loop producing error-rate rows
//!
//! # Quick Start
//!
//! ```
//! use labelops_ctc::encoder::TextEncoder;
//!
//! let encoder = TextEncoder::default();
//!
//! let labels = encoder.encode("Hello, World!")?;
//! assert_eq!(encoder.decode_raw(&labels)?, "hello world");
//! # Ok::<(), labelops_ctc::Error>(())
//! ```

pub mod beam;
pub mod ctc;
pub mod encoder;
pub mod error;
pub mod inference;
pub mod lm;
pub mod metrics;
pub mod text;
pub mod types;
pub mod vocab;

pub use error::{ConfigError, DecodeError, EncodingError, Error, OutputError, Result};
