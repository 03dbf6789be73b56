//! Infer subcommand - decode model outputs and score them against references.

use crate::config::{LmArgs, LmConfig, VocabArgs, VocabConfig};
use crate::input::{into_batches, read_utterances};
use eyre::{Result, WrapErr, ensure};
use labelops_ctc::beam::PrefixBeamSearch;
use labelops_ctc::inference::{Inferencer, MetricAverages, run_inference};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// CLI arguments for batch inference.
#[derive(clap::Args, Debug)]
pub struct Args {
    /// JSON lines file of model outputs
    pub input: PathBuf,

    /// Directory receiving `<part>.csv`
    #[arg(short, long)]
    pub output: PathBuf,

    /// Dataset partition name
    #[arg(long, default_value = "test")]
    pub part: String,

    /// Utterances decoded together
    #[arg(long, default_value_t = 16)]
    pub batch_size: usize,

    #[command(flatten)]
    pub vocab: VocabArgs,

    #[command(flatten)]
    pub lm: LmArgs,
}

/// Resolved configuration for batch inference.
#[derive(Debug)]
pub struct Config {
    pub input: PathBuf,
    pub output: PathBuf,
    pub part: String,
    pub batch_size: usize,
    pub vocab: VocabConfig,
    pub lm: LmConfig,
}

impl TryFrom<Args> for Config {
    type Error = eyre::Error;

    fn try_from(args: Args) -> Result<Self> {
        ensure!(args.batch_size > 0, "batch size must be at least 1");

        let lm = LmConfig::resolve(args.lm, &args.vocab.repo)?;

        Ok(Self {
            input: args.input,
            output: args.output,
            part: args.part,
            batch_size: args.batch_size,
            vocab: args.vocab.try_into()?,
            lm,
        })
    }
}

/// Run inference and return the averages of the partition.
pub fn infer(config: &Config) -> Result<MetricAverages> {
    let s = Instant::now();

    let encoder = config.vocab.encoder()?;
    let scorer = config.lm.scorer()?;

    tracing::info!(
        vocab_size = encoder.len(),
        blank = encoder.vocabulary().blank_index(),
        lm = scorer.is_some(),
        duration = %format_secs(s.elapsed().as_secs_f32()),
        "decoder loaded"
    );

    let search = PrefixBeamSearch::new(encoder.vocabulary().clone(), scorer, config.lm.beam);
    let mut inferencer = Inferencer::new(encoder, Arc::new(search), config.lm.beam_width)?;

    let utterances = read_utterances(&config.input)?;
    let batches = into_batches(utterances, config.batch_size)?;

    let s = Instant::now();

    let summary = run_inference(
        &mut inferencer,
        [(config.part.clone(), batches)],
        &config.output,
    )
    .wrap_err("inference failed")?;

    tracing::info!(duration = %format_secs(s.elapsed().as_secs_f32()), "inference completed");

    summary
        .into_iter()
        .next()
        .map(|(_, averages)| averages)
        .ok_or_else(|| eyre::eyre!("no partition processed"))
}

pub fn execute(config: Config) -> Result<()> {
    let averages = infer(&config)?;

    println!("{}:", config.part);
    println!("    WER (argmax): {:.2}", averages.wer_argmax);
    println!("    CER (argmax): {:.2}", averages.cer_argmax);
    println!("    WER (beam search): {:.2}", averages.wer_beam_search);
    println!("    CER (beam search): {:.2}", averages.cer_beam_search);

    Ok(())
}

/// Format seconds as a string with two decimal places.
fn format_secs(secs: f32) -> String {
    format!("{:.2}s", secs)
}
