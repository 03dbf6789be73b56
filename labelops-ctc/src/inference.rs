//! Batch inference loop over model outputs.
//!
//! Each utterance is decoded three ways (raw argmax, greedy CTC, beam
//! search), scored against its normalized reference, and written as one CSV
//! row. Utterances of a batch are decoded in parallel; running totals are
//! only touched by the caller's thread.

use crate::beam::{BeamSearch, check_beam_width};
use crate::ctc::{argmax_path, check_columns};
use crate::encoder::TextEncoder;
use crate::error::{DecodeError, Error, OutputError, Result};
use crate::metrics::{char_error_rate, word_error_rate};
use ndarray::{Array2, Array3, ArrayView2, Axis, s};
use rayon::prelude::*;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// CSV header, in column order.
pub const COLUMNS: [&str; 9] = [
    "audio",
    "target",
    "raw_prediction",
    "argmax_prediction",
    "wer_argmax",
    "cer_argmax",
    "beam_search_prediction",
    "wer_beam_search",
    "cer_beam_search",
];

/// Model output for a single utterance.
#[derive(Clone, Debug)]
pub struct Utterance {
    pub audio_path: String,
    /// Reference transcript, not yet normalized
    pub text: String,
    /// `(frames, vocab_size)` log-probabilities
    pub log_probs: Array2<f32>,
    /// Valid frames; all frames when unset
    pub length: Option<usize>,
}

/// Padded batch of model outputs.
#[derive(Clone, Debug)]
pub struct Batch {
    /// `(batch, frames, vocab_size)` log-probabilities
    pub log_probs: Array3<f32>,
    /// Valid frames per utterance
    pub lengths: Vec<usize>,
    pub texts: Vec<String>,
    pub audio_paths: Vec<String>,
}

impl Batch {
    /// Stack utterances into one batch, padding short ones with zeros.
    ///
    /// Utterances without frames take the column count of the others.
    ///
    /// # Errors
    ///
    /// [`DecodeError::ShapeMismatch`] when utterances with frames disagree on
    /// the column count.
    pub fn from_utterances(utterances: Vec<Utterance>) -> Result<Self> {
        let frames = utterances
            .iter()
            .map(|u| u.log_probs.nrows())
            .max()
            .unwrap_or(0);
        let vocab_size = utterances
            .iter()
            .find(|u| u.log_probs.nrows() > 0)
            .or(utterances.first())
            .map_or(0, |u| u.log_probs.ncols());

        let mut log_probs = Array3::zeros((utterances.len(), frames, vocab_size));
        let mut lengths = Vec::with_capacity(utterances.len());
        let mut texts = Vec::with_capacity(utterances.len());
        let mut audio_paths = Vec::with_capacity(utterances.len());

        for (i, utterance) in utterances.into_iter().enumerate() {
            let (rows, cols) = utterance.log_probs.dim();
            if rows > 0 {
                if cols != vocab_size {
                    return Err(DecodeError::ShapeMismatch {
                        expected: vocab_size,
                        got: cols,
                    }
                    .into());
                }

                log_probs
                    .slice_mut(s![i, ..rows, ..])
                    .assign(&utterance.log_probs);
            }
            lengths.push(utterance.length.unwrap_or(rows));
            texts.push(utterance.text);
            audio_paths.push(utterance.audio_path);
        }

        Ok(Self {
            log_probs,
            lengths,
            texts,
            audio_paths,
        })
    }

    pub fn len(&self) -> usize {
        self.log_probs.len_of(Axis(0))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Padded frame count.
    pub fn frames(&self) -> usize {
        self.log_probs.len_of(Axis(1))
    }

    fn validate(&self) -> Result<()> {
        let rows = self.len();

        for (field, got) in [
            ("lengths", self.lengths.len()),
            ("texts", self.texts.len()),
            ("audio_paths", self.audio_paths.len()),
        ] {
            if got != rows {
                return Err(DecodeError::BatchMismatch {
                    field,
                    log_probs: rows,
                    got,
                }
                .into());
            }
        }

        Ok(())
    }
}

/// One output row.
///
/// Error rates are percentages and are empty for utterances that failed to
/// decode.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UtteranceResult {
    pub audio: String,
    pub target: String,
    pub raw_prediction: String,
    pub argmax_prediction: String,
    pub wer_argmax: Option<f64>,
    pub cer_argmax: Option<f64>,
    pub beam_search_prediction: String,
    pub wer_beam_search: Option<f64>,
    pub cer_beam_search: Option<f64>,
}

impl UtteranceResult {
    fn failed(audio: String, target: String, error: &Error) -> Self {
        let placeholder = format!("<error: {error}>");

        Self {
            audio,
            target,
            raw_prediction: placeholder.clone(),
            argmax_prediction: placeholder.clone(),
            wer_argmax: None,
            cer_argmax: None,
            beam_search_prediction: placeholder,
            wer_beam_search: None,
            cer_beam_search: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.wer_argmax.is_none()
    }
}

/// Average error rates, in percent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct MetricAverages {
    pub wer_argmax: f64,
    pub cer_argmax: f64,
    pub wer_beam_search: f64,
    pub cer_beam_search: f64,
}

/// Running sums of error rates.
#[derive(Clone, Copy, Debug, Default)]
pub struct MetricTotals {
    sums: MetricAverages,
    count: usize,
}

impl MetricTotals {
    /// Add a row; failed rows are not counted.
    pub fn add(&mut self, result: &UtteranceResult) {
        let (Some(wa), Some(ca), Some(wb), Some(cb)) = (
            result.wer_argmax,
            result.cer_argmax,
            result.wer_beam_search,
            result.cer_beam_search,
        ) else {
            return;
        };

        self.sums.wer_argmax += wa;
        self.sums.cer_argmax += ca;
        self.sums.wer_beam_search += wb;
        self.sums.cer_beam_search += cb;
        self.count += 1;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Means over counted rows; zeros when nothing was counted.
    pub fn averages(&self) -> MetricAverages {
        if self.count == 0 {
            return MetricAverages::default();
        }

        let n = self.count as f64;
        MetricAverages {
            wer_argmax: self.sums.wer_argmax / n,
            cer_argmax: self.sums.cer_argmax / n,
            wer_beam_search: self.sums.wer_beam_search / n,
            cer_beam_search: self.sums.cer_beam_search / n,
        }
    }
}

/// Decodes batches and keeps running error totals.
///
/// The beam width given here is the one every search call receives.
pub struct Inferencer {
    encoder: TextEncoder,
    beam_search: Arc<dyn BeamSearch>,
    beam_width: usize,
    totals: MetricTotals,
}

impl Inferencer {
    /// # Errors
    ///
    /// [`ConfigError::InvalidBeamWidth`](crate::ConfigError::InvalidBeamWidth)
    /// for a zero beam width.
    pub fn new(
        encoder: TextEncoder,
        beam_search: Arc<dyn BeamSearch>,
        beam_width: usize,
    ) -> Result<Self> {
        check_beam_width(beam_width)?;

        Ok(Self {
            encoder,
            beam_search,
            beam_width,
            totals: MetricTotals::default(),
        })
    }

    pub fn encoder(&self) -> &TextEncoder {
        &self.encoder
    }

    pub fn beam_width(&self) -> usize {
        self.beam_width
    }

    pub fn totals(&self) -> &MetricTotals {
        &self.totals
    }

    /// Clear running totals, e.g. between dataset partitions.
    pub fn reset(&mut self) {
        self.totals = MetricTotals::default();
    }

    /// Decode every utterance of `batch` and add it to the running totals.
    ///
    /// # Errors
    ///
    /// A vocabulary/column mismatch or inconsistent batch fields fail the
    /// whole batch. Failures of single utterances become placeholder rows.
    pub fn process_batch(&mut self, batch: &Batch) -> Result<Vec<UtteranceResult>> {
        batch.validate()?;
        if !batch.is_empty() && batch.frames() > 0 {
            check_columns(batch.log_probs.index_axis(Axis(0), 0), self.encoder.len())?;
        }

        let start = Instant::now();
        let this = &*self;

        let results: Vec<UtteranceResult> = (0..batch.len())
            .into_par_iter()
            .map(|i| {
                let audio = audio_key(&batch.audio_paths[i]);
                let target = this.encoder.normalize(&batch.texts[i]);
                let log_probs = batch.log_probs.index_axis(Axis(0), i);

                this.process_utterance(log_probs, batch.lengths[i], &target, &audio)
                    .unwrap_or_else(|e| {
                        tracing::warn!(audio = %audio, error = %e, "utterance failed");
                        UtteranceResult::failed(audio, target, &e)
                    })
            })
            .collect();

        for result in &results {
            self.totals.add(result);
        }

        tracing::debug!(
            utterances = results.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "batch decoded"
        );

        Ok(results)
    }

    fn process_utterance(
        &self,
        log_probs: ArrayView2<f32>,
        length: usize,
        target: &str,
        audio: &str,
    ) -> Result<UtteranceResult> {
        let frames = log_probs.nrows();
        if length > frames {
            return Err(DecodeError::LengthOutOfRange { length, frames }.into());
        }

        // a batch of silent utterances carries no columns at all
        let silent = Array2::<f32>::zeros((0, self.encoder.len()));
        let log_probs = if frames == 0 {
            silent.view()
        } else {
            log_probs.slice(s![..length, ..])
        };
        let path = argmax_path(log_probs)?;

        let raw_prediction = self.encoder.decode_raw(&path)?;
        let argmax_prediction = self.encoder.decode_ctc(&path)?;
        let beam_search_prediction = self.beam_search.search(log_probs, self.beam_width)?;

        Ok(UtteranceResult {
            audio: audio.to_string(),
            target: target.to_string(),
            wer_argmax: Some(word_error_rate(target, &argmax_prediction) * 100.0),
            cer_argmax: Some(char_error_rate(target, &argmax_prediction) * 100.0),
            wer_beam_search: Some(word_error_rate(target, &beam_search_prediction) * 100.0),
            cer_beam_search: Some(char_error_rate(target, &beam_search_prediction) * 100.0),
            raw_prediction,
            argmax_prediction,
            beam_search_prediction,
        })
    }

    /// Log and return the average error rates so far.
    pub fn statistics(&self) -> MetricAverages {
        let averages = self.totals.averages();

        tracing::info!(
            utterances = self.totals.count(),
            wer_argmax = averages.wer_argmax,
            cer_argmax = averages.cer_argmax,
            wer_beam_search = averages.wer_beam_search,
            cer_beam_search = averages.cer_beam_search,
            "statistics"
        );

        averages
    }
}

/// Row key: file name of the audio path.
fn audio_key(audio_path: &str) -> String {
    Path::new(audio_path)
        .file_name()
        .map_or_else(|| audio_path.to_string(), |n| n.to_string_lossy().into_owned())
}

/// CSV sink for result rows.
pub struct ResultWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl ResultWriter<File> {
    /// Create `path` and write the header.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path).map_err(OutputError::from)?;
        Self::from_writer(file)
    }
}

impl<W: Write> ResultWriter<W> {
    pub fn from_writer(writer: W) -> Result<Self> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        writer.write_record(COLUMNS)?;

        Ok(Self { writer })
    }

    pub fn write(&mut self, rows: &[UtteranceResult]) -> Result<()> {
        for row in rows {
            self.writer.serialize(row)?;
        }
        Ok(())
    }

    /// Flush and hand back the underlying writer.
    pub fn finish(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| Error::from(e.into_error()))
    }
}

/// Decode named partitions in order, writing `<save_dir>/<name>.csv` for
/// each. Totals are reset per partition.
///
/// Returns the averages of every partition.
pub fn run_inference<P, B>(
    inferencer: &mut Inferencer,
    parts: P,
    save_dir: &Path,
) -> Result<Vec<(String, MetricAverages)>>
where
    P: IntoIterator<Item = (String, B)>,
    B: IntoIterator<Item = Batch>,
{
    std::fs::create_dir_all(save_dir).map_err(OutputError::from)?;

    let mut summary = Vec::new();

    for (name, batches) in parts {
        inferencer.reset();

        let path: PathBuf = save_dir.join(format!("{name}.csv"));
        let mut writer = ResultWriter::create(&path)?;

        for (index, batch) in batches.into_iter().enumerate() {
            let rows = inferencer.process_batch(&batch)?;
            writer.write(&rows)?;
            tracing::debug!(part = %name, batch = index, rows = rows.len(), "batch written");
        }

        writer.finish()?;
        tracing::info!(part = %name, path = ?path.display(), "results saved");

        summary.push((name, inferencer.statistics()));
    }

    Ok(summary)
}
