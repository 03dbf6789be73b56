//! Decoding resources: the n-gram model, its lexicon, and the sub-word
//! tokenizer, looked up in a local directory or a Hugging Face repository.

use eyre::{Result, WrapErr, bail, eyre};
use hf_hub::CacheRepo;
use hf_hub::api::sync::ApiRepo;
use std::path::PathBuf;

/// Default pruned 3-gram ARPA model.
pub const LM_FILE: &str = "lowercase_3-gram.pruned.1e-7.arpa";

/// Default unigram lexicon, one word per line.
pub const LEXICON_FILE: &str = "librispeech-vocab.txt";

/// Tokenizer definitions tried in order when none is given.
pub const TOKENIZER_FILES: [&str; 2] = ["bpe_tokenizer.json", "tokenizer.json"];

/// Local directory holding the default resources.
pub const DEFAULT_RESOURCE_DIR: &str = "pretrained_lm";

/// Where decoding resources are read from.
#[derive(Debug)]
pub enum ResourceRepo {
    /// Directory with the resource files side by side
    Dir(PathBuf),
    /// Hugging Face repository, only what is already cached
    Cached(CacheRepo),
    /// Hugging Face repository, downloaded on demand
    Hub(ApiRepo),
}

impl ResourceRepo {
    /// Local path of the resource `file_name`.
    pub fn resolve(&self, file_name: &str) -> Result<PathBuf> {
        match self {
            ResourceRepo::Dir(dir) => {
                let path = dir.join(file_name);
                if !path.is_file() {
                    bail!("{file_name} not found in {}", dir.display());
                }
                path.canonicalize()
                    .wrap_err_with(|| format!("failed to resolve {}", path.display()))
            }
            ResourceRepo::Cached(repo) => repo
                .get(file_name)
                .ok_or_else(|| eyre!("{file_name} is not in the Hugging Face cache")),
            ResourceRepo::Hub(repo) => repo
                .get(file_name)
                .wrap_err_with(|| format!("failed to fetch {file_name} from the Hugging Face Hub")),
        }
    }

    /// First of `candidates` present in the repository.
    pub fn resolve_first(&self, candidates: &[&str]) -> Result<PathBuf> {
        for name in candidates {
            match self.resolve(name) {
                Ok(path) => return Ok(path),
                Err(e) => tracing::debug!(resource = *name, error = %e, "resource candidate skipped"),
            }
        }

        bail!("none of {} found", candidates.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn resolves_file_in_directory() {
        let dir = TempDir::new("resources").unwrap();
        std::fs::write(dir.path().join(LEXICON_FILE), "hello\n").unwrap();
        let repo = ResourceRepo::Dir(dir.path().to_path_buf());

        let path = repo.resolve(LEXICON_FILE).unwrap();

        assert!(path.ends_with(LEXICON_FILE));
    }

    #[test]
    fn missing_file_names_directory() {
        let dir = TempDir::new("resources").unwrap();
        let repo = ResourceRepo::Dir(dir.path().to_path_buf());

        let err = repo.resolve(LM_FILE).unwrap_err();

        assert!(err.to_string().starts_with(&format!("{LM_FILE} not found in ")));
    }

    #[test]
    fn subdirectory_is_not_a_resource() {
        let dir = TempDir::new("resources").unwrap();
        std::fs::create_dir(dir.path().join(LEXICON_FILE)).unwrap();
        let repo = ResourceRepo::Dir(dir.path().to_path_buf());

        assert!(repo.resolve(LEXICON_FILE).is_err());
    }

    #[test]
    fn first_present_tokenizer_wins() {
        let dir = TempDir::new("resources").unwrap();
        std::fs::write(dir.path().join("tokenizer.json"), "{}").unwrap();
        let repo = ResourceRepo::Dir(dir.path().to_path_buf());

        let path = repo.resolve_first(&TOKENIZER_FILES).unwrap();

        assert!(path.ends_with("tokenizer.json"));

        let err = ResourceRepo::Dir(dir.path().join("missing"))
            .resolve_first(&TOKENIZER_FILES)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "none of bpe_tokenizer.json, tokenizer.json found"
        );
    }
}
