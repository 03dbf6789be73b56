//! JSON lines reader for model outputs.
//!
//! Each line holds one utterance:
//!
//! ```json
//! {"audio_path": "a/1.flac", "text": "Hello", "log_probs": [[-0.1, ...], ...], "length": 42}
//! ```

use eyre::{Result, WrapErr, bail};
use labelops_ctc::inference::{Batch, Utterance};
use ndarray::Array2;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// One serialized model output.
#[derive(Debug, Deserialize)]
pub struct Record {
    pub audio_path: String,
    pub text: String,
    /// `frames x vocab_size`
    pub log_probs: Vec<Vec<f32>>,
    /// Valid frames; all frames when missing
    #[serde(default)]
    pub length: Option<usize>,
}

impl TryFrom<Record> for Utterance {
    type Error = eyre::Error;

    fn try_from(record: Record) -> Result<Self> {
        let frames = record.log_probs.len();
        let cols = record.log_probs.first().map_or(0, Vec::len);

        if let Some(row) = record.log_probs.iter().position(|r| r.len() != cols) {
            bail!(
                "ragged log_probs in {:?}: frame {row} has {} columns, expected {cols}",
                record.audio_path,
                record.log_probs[row].len()
            );
        }

        let flat = record.log_probs.into_iter().flatten().collect();
        let log_probs = Array2::from_shape_vec((frames, cols), flat)?;

        Ok(Self {
            audio_path: record.audio_path,
            text: record.text,
            log_probs,
            length: record.length,
        })
    }
}

/// Read every utterance of a JSON lines file, skipping blank lines.
pub fn read_utterances(path: &Path) -> Result<Vec<Utterance>> {
    let file =
        File::open(path).wrap_err_with(|| format!("failed to open input: {:?}", path.display()))?;

    let mut utterances = Vec::new();

    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.wrap_err_with(|| format!("failed to read line {}", index + 1))?;
        if line.trim().is_empty() {
            continue;
        }

        let record: Record = serde_json::from_str(&line)
            .wrap_err_with(|| format!("invalid record at line {}", index + 1))?;
        utterances.push(Utterance::try_from(record)?);
    }

    tracing::debug!(path = ?path.display(), utterances = utterances.len(), "input read");

    Ok(utterances)
}

/// Group utterances into padded batches of at most `batch_size`.
pub fn into_batches(utterances: Vec<Utterance>, batch_size: usize) -> Result<Vec<Batch>> {
    if batch_size == 0 {
        bail!("batch size must be at least 1");
    }

    let mut batches = Vec::with_capacity(utterances.len().div_ceil(batch_size));
    let mut rest = utterances.into_iter().peekable();

    while rest.peek().is_some() {
        let chunk: Vec<Utterance> = rest.by_ref().take(batch_size).collect();
        batches.push(Batch::from_utterances(chunk)?);
    }

    Ok(batches)
}
