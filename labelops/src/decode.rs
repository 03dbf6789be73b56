//! Decode subcommand - map label indices back to text.

use crate::config::{VocabArgs, VocabConfig};
use eyre::{Result, WrapErr};

/// CLI arguments for index decoding.
#[derive(clap::Args, Debug)]
pub struct Args {
    /// Frame-level label indices
    #[arg(required = true, num_args = 1..)]
    pub indices: Vec<u32>,

    #[command(flatten)]
    pub vocab: VocabArgs,
}

/// Resolved configuration for index decoding.
#[derive(Debug)]
pub struct Config {
    pub indices: Vec<u32>,
    pub vocab: VocabConfig,
}

impl TryFrom<Args> for Config {
    type Error = eyre::Error;

    fn try_from(args: Args) -> Result<Self> {
        Ok(Self {
            indices: args.indices,
            vocab: args.vocab.try_into()?,
        })
    }
}

/// Raw and CTC-collapsed text of the configured indices.
#[derive(Debug, PartialEq, Eq)]
pub struct Decoded {
    pub raw: String,
    pub ctc: String,
}

pub fn decode(config: &Config) -> Result<Decoded> {
    let encoder = config.vocab.encoder()?;

    let raw = encoder
        .decode_raw(&config.indices)
        .wrap_err("raw decoding failed")?;
    let ctc = encoder
        .decode_ctc(&config.indices)
        .wrap_err("ctc decoding failed")?;

    Ok(Decoded { raw, ctc })
}

pub fn execute(config: Config) -> Result<()> {
    let Decoded { raw, ctc } = decode(&config)?;

    println!("raw: {raw}");
    println!("ctc: {ctc}");

    Ok(())
}
