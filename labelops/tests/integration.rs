//! Integration tests for labelops CLI.

use clap::Parser;
use labelops::cli::{Cli, run};
use labelops::infer::{Config, infer};
use tempdir::TempDir;

const ARPA: &str = "\
\\data\\
ngram 1=5

\\1-grams:
-1.0\t<s>
-1.0\t</s>
-0.6\thi
-0.7\tyou
-3.0\t<unk>

\\end\\
";

/// JSON log-probability rows spelling `path` with the english vocabulary
/// (`_` is blank).
fn log_probs(path: &str) -> String {
    let rows: Vec<String> = path
        .chars()
        .map(|c| {
            let hot = match c {
                '_' => 0,
                ' ' => 27,
                c => (c as u8 - b'a' + 1) as usize,
            };
            let row: Vec<&str> = (0..28)
                .map(|i| if i == hot { "-0.01" } else { "-12.0" })
                .collect();
            format!("[{}]", row.join(","))
        })
        .collect();

    format!("[{}]", rows.join(","))
}

fn write_input(dir: &TempDir) -> std::path::PathBuf {
    let lines = [
        format!(
            r#"{{"audio_path": "/data/clean/1089-1.flac", "text": "Hi you!", "log_probs": {}}}"#,
            log_probs("hh_i _yyou")
        ),
        format!(
            r#"{{"audio_path": "/data/clean/1089-2.flac", "text": "hi", "log_probs": {}, "length": 3}}"#,
            log_probs("hi_zzzz")
        ),
    ];
    let path = dir.path().join("outputs.jsonl");
    std::fs::write(&path, lines.join("\n")).unwrap();
    path
}

#[test]
fn infer_writes_csv_without_lm() {
    let dir = TempDir::new("labelops").unwrap();
    let input = write_input(&dir);
    let output = dir.path().join("results");

    let cli = Cli::parse_from([
        "labelops",
        "infer",
        input.to_str().unwrap(),
        "-o",
        output.to_str().unwrap(),
        "--part",
        "test-clean",
        "--batch-size",
        "1",
        "--no-lm",
    ]);

    run(cli).unwrap();

    let csv = std::fs::read_to_string(output.join("test-clean.csv")).unwrap();
    let lines: Vec<&str> = csv.lines().collect();

    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines[0],
        "audio,target,raw_prediction,argmax_prediction,wer_argmax,cer_argmax,\
         beam_search_prediction,wer_beam_search,cer_beam_search"
    );
    assert_eq!(lines[1], "1089-1.flac,hi you,hhi yyou,hi you,0.0,0.0,hi you,0.0,0.0");
    assert!(lines[2].starts_with("1089-2.flac,hi,hi,hi,0.0,0.0,hi,"));
}

#[test]
fn infer_with_language_model_files() {
    let dir = TempDir::new("labelops").unwrap();
    let input = write_input(&dir);
    let lm = dir.path().join("lm.arpa");
    let lexicon = dir.path().join("vocab.txt");
    std::fs::write(&lm, ARPA).unwrap();
    std::fs::write(&lexicon, "HI\nYOU\n").unwrap();

    let cli = Cli::parse_from([
        "labelops",
        "infer",
        input.to_str().unwrap(),
        "-o",
        dir.path().join("results").to_str().unwrap(),
        "--lm",
        lm.to_str().unwrap(),
        "--lexicon",
        lexicon.to_str().unwrap(),
        "--beam-width",
        "4",
    ]);
    let labelops::cli::Commands::Infer(args) = cli.command else {
        panic!("expected infer command");
    };
    let config = Config::try_from(args).unwrap();

    let averages = infer(&config).unwrap();

    assert_eq!(averages.wer_argmax, 0.0);
    assert_eq!(averages.wer_beam_search, 0.0);
}

#[test]
fn encode_and_decode_commands_succeed() {
    run(Cli::parse_from(["labelops", "encode", "Hello, World!"])).unwrap();
    run(Cli::parse_from(["labelops", "decode", "8", "8", "0", "9"])).unwrap();
}

#[test]
fn raw_encode_of_digit_fails() {
    let result = run(Cli::parse_from(["labelops", "encode", "--raw", "room 101"]));

    assert!(result.is_err());
}

#[test]
fn missing_language_model_is_reported() {
    let dir = TempDir::new("labelops").unwrap();
    let input = write_input(&dir);

    let cli = Cli::parse_from([
        "labelops",
        "infer",
        input.to_str().unwrap(),
        "-o",
        dir.path().join("results").to_str().unwrap(),
        "--resources",
        dir.path().join("missing").to_str().unwrap(),
        "--resource-source",
        "path",
    ]);

    let err = run(cli).unwrap_err();

    assert!(err.to_string().contains("no language model given"));
}
