//! ARPA n-gram model loader with Katz backoff scoring.

use crate::error::ConfigError;
use crate::lm::{LanguageModel, UNK};
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use thiserror::Error;

/// Score of words missing from the model and without an `<unk>` entry.
pub const DEFAULT_UNK_LOG10: f32 = -100.0;

#[derive(Clone, Copy, Debug)]
struct Entry {
    log10_prob: f32,
    backoff: f32,
}

/// Back-off n-gram model read from an ARPA text file.
#[derive(Debug)]
pub struct ArpaModel {
    /// `ngrams[n - 1]` holds the n-grams keyed by space-joined words.
    ngrams: Vec<HashMap<String, Entry>>,
    unk_log10: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Section {
    Preamble,
    Data,
    Grams(usize),
    End,
}

impl ArpaModel {
    /// Load a model from an ARPA file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Unreadable`] if the file cannot be read and
    /// [`ConfigError::InvalidLanguageModel`] if it is not valid ARPA text
    /// (binary KenLM models included).
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let unreadable = |source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        };

        let file = std::fs::File::open(path).map_err(unreadable)?;
        let model = Self::from_reader(file).map_err(|e| match e {
            ArpaError::Io(source) => unreadable(source),
            ArpaError::Config(e) => e,
        })?;

        tracing::debug!(
            path = ?path.display(),
            order = model.order(),
            unigrams = model.ngrams.first().map_or(0, HashMap::len),
            "language model loaded"
        );

        Ok(model)
    }

    /// Parse ARPA text from any reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ArpaError> {
        let mut section = Section::Preamble;
        let mut counts: Vec<usize> = Vec::new();
        let mut ngrams: Vec<HashMap<String, Entry>> = Vec::new();

        for (number, line) in BufReader::new(reader).lines().enumerate() {
            let line_no = number + 1;
            let line = line.map_err(|e| match e.kind() {
                std::io::ErrorKind::InvalidData => {
                    ArpaError::Config(invalid(line_no, "not a text ARPA file"))
                }
                _ => ArpaError::Io(e),
            })?;
            let line = line.trim();

            if line.is_empty() {
                continue;
            }

            if line == "\\data\\" {
                section = Section::Data;
                continue;
            }
            if line == "\\end\\" {
                section = Section::End;
                break;
            }
            if let Some(n) = parse_section_header(line) {
                if n == 0 || n > counts.len() {
                    return Err(invalid(line_no, format!("unexpected section {line}")).into());
                }
                ngrams.resize_with(counts.len(), HashMap::new);
                section = Section::Grams(n);
                continue;
            }

            match section {
                Section::Preamble => continue,
                Section::Data => {
                    let count = parse_count(line, counts.len() + 1)
                        .ok_or_else(|| invalid(line_no, format!("bad count line {line:?}")))?;
                    counts.push(count);
                }
                Section::Grams(n) => {
                    let (words, entry) = parse_entry(line, n)
                        .ok_or_else(|| invalid(line_no, format!("bad {n}-gram line {line:?}")))?;
                    ngrams[n - 1].insert(words, entry);
                }
                Section::End => break,
            }
        }

        if section != Section::End {
            return Err(invalid(0, "missing \\data\\ or \\end\\ marker").into());
        }

        for (n, (&expected, grams)) in counts.iter().zip(&ngrams).enumerate() {
            if grams.len() != expected {
                return Err(invalid(
                    0,
                    format!("expected {expected} {}-grams, found {}", n + 1, grams.len()),
                )
                .into());
            }
        }

        if ngrams.is_empty() {
            return Err(invalid(0, "no n-gram sections").into());
        }

        let unk_log10 = ngrams[0]
            .get(UNK)
            .map_or(DEFAULT_UNK_LOG10, |e| e.log10_prob);

        Ok(Self { ngrams, unk_log10 })
    }

    fn entry(&self, words: &[&str]) -> Option<&Entry> {
        self.ngrams.get(words.len().checked_sub(1)?)?.get(&words.join(" "))
    }
}

impl LanguageModel for ArpaModel {
    fn order(&self) -> usize {
        self.ngrams.len()
    }

    fn log10_prob(&self, context: &[&str], word: &str) -> f32 {
        let history = context.len().min(self.order() - 1);
        let context = &context[context.len() - history..];

        let mut backoff = 0.0;
        let mut words: Vec<&str> = Vec::with_capacity(history + 1);

        for skip in 0..=history {
            let hist = &context[skip..];

            words.clear();
            words.extend_from_slice(hist);
            words.push(word);

            if let Some(entry) = self.entry(&words) {
                return backoff + entry.log10_prob;
            }

            if let Some(entry) = self.entry(hist) {
                backoff += entry.backoff;
            }
        }

        backoff + self.unk_log10
    }
}

/// Failure while reading ARPA text from a reader.
#[derive(Debug, Error)]
pub enum ArpaError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

fn invalid(line: usize, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidLanguageModel {
        line,
        reason: reason.into(),
    }
}

/// `\N-grams:` → `N`
fn parse_section_header(line: &str) -> Option<usize> {
    line.strip_prefix('\\')?
        .strip_suffix("-grams:")?
        .parse()
        .ok()
}

/// `ngram N=count` for the expected `N`.
fn parse_count(line: &str, expected: usize) -> Option<usize> {
    let (n, count) = line.strip_prefix("ngram ")?.split_once('=')?;
    if n.trim().parse::<usize>().ok()? != expected {
        return None;
    }
    count.trim().parse().ok()
}

/// `log10_prob <tab> w1 .. wn [<tab> backoff]`
fn parse_entry(line: &str, n: usize) -> Option<(String, Entry)> {
    let mut fields = line.split_whitespace();
    let log10_prob: f32 = fields.next()?.parse().ok()?;

    let words: Vec<&str> = fields.by_ref().take(n).collect();
    if words.len() != n {
        return None;
    }

    let backoff = match fields.next() {
        Some(b) => b.parse().ok()?,
        None => 0.0,
    };

    if fields.next().is_some() {
        return None;
    }

    Some((
        words.join(" "),
        Entry {
            log10_prob,
            backoff,
        },
    ))
}
