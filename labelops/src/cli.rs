//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use eyre::Result;

#[derive(Debug, Parser)]
#[command(name = "labelops")]
#[command(about = "CTC label encoding, decoding and beam search evaluation")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Map reference text to label indices
    Encode(crate::encode::Args),

    /// Map label indices to raw and CTC-collapsed text
    Decode(crate::decode::Args),

    /// Decode model outputs and write error rates to CSV
    Infer(crate::infer::Args),
}

/// Execute CLI command - separated for testing.
pub fn run(cli: Cli) -> Result<()> {
    tracing::debug!(?cli, "parsed arguments");

    match cli.command {
        Commands::Encode(args) => crate::encode::execute(args.try_into()?),
        Commands::Decode(args) => crate::decode::execute(args.try_into()?),
        Commands::Infer(args) => crate::infer::execute(args.try_into()?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use labelops_ctc::beam::BeamSearchConfig;

    fn assert_default_beam_config(config: &BeamSearchConfig) {
        assert!((config.alpha - 0.5).abs() < 0.001);
        assert!((config.beta - 1.5).abs() < 0.001);
        assert!((config.unk_score_offset + 10.0).abs() < 0.001);
        assert!(!config.no_score_boundary);
    }

    #[test]
    fn parses_encode_command() {
        let cli = Cli::parse_from(["labelops", "encode", "Hello world"]);

        match &cli.command {
            Commands::Encode(crate::encode::Args { text, raw, vocab })
                if text == "Hello world" && !raw =>
            {
                assert!(!vocab.bpe);
                assert_eq!(vocab.repo.resources, "pretrained_lm");
            }
            _ => panic!("unexpected command: {:?}", cli.command),
        }
    }

    #[test]
    fn parses_decode_indices() {
        let cli = Cli::parse_from(["labelops", "decode", "1", "1", "0", "2"]);

        match &cli.command {
            Commands::Decode(crate::decode::Args { indices, .. }) => {
                assert_eq!(indices, &[1, 1, 0, 2]);
            }
            _ => panic!("unexpected command: {:?}", cli.command),
        }
    }

    #[test]
    fn decode_requires_indices() {
        assert!(Cli::try_parse_from(["labelops", "decode"]).is_err());
    }

    #[test]
    fn parses_infer_defaults() {
        let cli = Cli::parse_from(["labelops", "infer", "outputs.jsonl", "-o", "results"]);

        match &cli.command {
            Commands::Infer(crate::infer::Args {
                input,
                output,
                part,
                batch_size,
                lm,
                ..
            }) if input.to_str() == Some("outputs.jsonl") && output.to_str() == Some("results") => {
                assert_eq!(part, "test");
                assert_eq!(*batch_size, 16);
                assert!(!lm.no_lm);
                assert!(!lm.no_lexicon);
                assert_eq!(lm.beam_width, 50);
                assert_default_beam_config(&lm.beam);
            }
            _ => panic!("unexpected command: {:?}", cli.command),
        }
    }

    #[test]
    fn parses_infer_search_options() {
        let cli = Cli::parse_from([
            "labelops",
            "infer",
            "outputs.jsonl",
            "-o",
            "results",
            "--bpe",
            "--tokenizer",
            "tok.json",
            "--blank-token",
            "<pad>",
            "--beam-width",
            "8",
            "--alpha",
            "-0.25",
            "--no-score-boundary",
            "--lm",
            "lm.arpa",
        ]);

        match &cli.command {
            Commands::Infer(crate::infer::Args { vocab, lm, .. }) => {
                assert!(vocab.bpe);
                assert_eq!(vocab.blank_token.as_deref(), Some("<pad>"));
                assert_eq!(lm.beam_width, 8);
                assert!((lm.beam.alpha + 0.25).abs() < 0.001);
                assert!(lm.beam.no_score_boundary);
                assert_eq!(lm.lm.as_ref().and_then(|p| p.to_str()), Some("lm.arpa"));
            }
            _ => panic!("unexpected command: {:?}", cli.command),
        }
    }

    #[test]
    fn no_lm_conflicts_with_lm_path() {
        let result = Cli::try_parse_from([
            "labelops",
            "infer",
            "outputs.jsonl",
            "-o",
            "results",
            "--no-lm",
            "--lm",
            "lm.arpa",
        ]);

        assert!(result.is_err());
    }

    #[test]
    fn no_lexicon_conflicts_with_lexicon_path() {
        let result = Cli::try_parse_from([
            "labelops",
            "infer",
            "outputs.jsonl",
            "-o",
            "results",
            "--no-lexicon",
            "--lexicon",
            "vocab.txt",
        ]);

        assert!(result.is_err());
    }

    #[test]
    fn tokenizer_requires_bpe() {
        let result = Cli::try_parse_from(["labelops", "encode", "hi", "--tokenizer", "tok.json"]);

        assert!(result.is_err());
    }
}
