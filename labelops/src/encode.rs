//! Encode subcommand - map reference text to label indices.

use crate::config::{VocabArgs, VocabConfig};
use eyre::{Result, WrapErr};

/// CLI arguments for text encoding.
#[derive(clap::Args, Debug)]
pub struct Args {
    /// Reference text
    pub text: String,

    /// Encode the text as given, without normalizing it
    #[arg(long)]
    pub raw: bool,

    #[command(flatten)]
    pub vocab: VocabArgs,
}

/// Resolved configuration for text encoding.
#[derive(Debug)]
pub struct Config {
    pub text: String,
    pub raw: bool,
    pub vocab: VocabConfig,
}

impl TryFrom<Args> for Config {
    type Error = eyre::Error;

    fn try_from(args: Args) -> Result<Self> {
        Ok(Self {
            text: args.text,
            raw: args.raw,
            vocab: args.vocab.try_into()?,
        })
    }
}

/// Space-separated label indices of `config.text`.
pub fn encode(config: &Config) -> Result<String> {
    let encoder = config.vocab.encoder()?;

    let labels = if config.raw {
        encoder.encode_raw(&config.text)
    } else {
        encoder.encode(&config.text)
    }
    .wrap_err("encoding failed")?;

    tracing::debug!(labels = labels.len(), raw = config.raw, "text encoded");

    Ok(labels
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(" "))
}

pub fn execute(config: Config) -> Result<()> {
    println!("{}", encode(&config)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use labelops_ctc::EncodingError;
    use labelops_ctc::vocab::VocabularySource;

    fn config(text: &str, raw: bool) -> Config {
        Config {
            text: text.to_string(),
            raw,
            vocab: VocabConfig {
                source: VocabularySource::Characters,
            },
        }
    }

    #[test]
    fn prints_indices() {
        assert_eq!(encode(&config("Ab c!", false)).unwrap(), "1 2 27 3");
    }

    #[test]
    fn raw_digit_surfaces_encoding_error() {
        let err = encode(&config("abc 1", true)).unwrap_err();

        let cause = err.downcast_ref::<EncodingError>().unwrap();
        assert!(cause.to_string().contains("unknown units: '1'"));
    }
}
