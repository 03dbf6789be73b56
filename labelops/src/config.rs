//! Shared CLI argument groups and their resolved configurations.
//!
//! Args structs are parsed by clap; Config structs are produced from them via
//! TryFrom and hold resolved file paths ready for loading.

use eyre::{Result, WrapErr};
use hf_hub::Cache;
use hf_hub::api::sync::Api;
use labelops_ctc::beam::{BeamSearchConfig, DEFAULT_BEAM_WIDTH, check_beam_width};
use labelops_ctc::encoder::TextEncoder;
use labelops_ctc::lm::{ArpaModel, LanguageModelScorer, Lexicon};
use labelops_ctc::types::{
    DEFAULT_RESOURCE_DIR, LEXICON_FILE, LM_FILE, ResourceRepo, TOKENIZER_FILES,
};
use labelops_ctc::vocab::VocabularySource;
use std::cell::OnceCell;
use std::path::PathBuf;
use std::sync::Arc;

/// Where resource files are looked up.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResourceSource {
    /// Local directory if it exists, else Hugging Face API for `owner/name` ids
    #[default]
    Auto,
    /// Local directory
    Path,
    /// Hugging Face cache only
    Cache,
    /// Hugging Face API
    Api,
}

/// Resource repository arguments.
#[derive(clap::Args, Clone, Debug)]
pub struct ResourceArgs {
    /// Directory or Hugging Face repository holding the tokenizer, language
    /// model, and lexicon
    #[arg(long, default_value = DEFAULT_RESOURCE_DIR)]
    pub resources: String,

    /// How to interpret --resources
    #[arg(long, value_enum, default_value_t)]
    pub resource_source: ResourceSource,
}

impl Default for ResourceArgs {
    fn default() -> Self {
        Self {
            resources: DEFAULT_RESOURCE_DIR.to_string(),
            resource_source: ResourceSource::Auto,
        }
    }
}

impl ResourceArgs {
    /// Open the repository; only API access touches the network.
    pub fn repo(&self) -> Result<ResourceRepo> {
        let id = self.resources.clone();

        let repo = match self.resource_source {
            ResourceSource::Auto => {
                let path = PathBuf::from(&id);
                if path.is_dir() || !id.contains('/') {
                    ResourceRepo::Dir(path)
                } else {
                    ResourceRepo::Hub(Api::new()?.model(id))
                }
            }
            ResourceSource::Path => ResourceRepo::Dir(PathBuf::from(id)),
            ResourceSource::Cache => ResourceRepo::Cached(Cache::from_env().model(id)),
            ResourceSource::Api => ResourceRepo::Hub(Api::new()?.model(id)),
        };

        tracing::debug!(?repo, "resource repository");

        Ok(repo)
    }
}

/// Vocabulary selection arguments.
#[derive(clap::Args, Clone, Debug, Default)]
pub struct VocabArgs {
    /// Use the sub-word tokenizer vocabulary instead of characters
    #[arg(long)]
    pub bpe: bool,

    /// Tokenizer definition (default: bpe_tokenizer.json or tokenizer.json in
    /// --resources)
    #[arg(long, requires = "bpe")]
    pub tokenizer: Option<PathBuf>,

    /// Blank token of the tokenizer vocabulary (default: first of <blank>,
    /// [pad], <pad>, "")
    #[arg(long, requires = "bpe")]
    pub blank_token: Option<String>,

    /// Character alphabet file replacing a-z and space
    #[arg(long, conflicts_with = "bpe")]
    pub alphabet: Option<PathBuf>,

    #[command(flatten)]
    pub repo: ResourceArgs,
}

/// Resolved vocabulary configuration.
#[derive(Clone, Debug)]
pub struct VocabConfig {
    pub source: VocabularySource,
}

impl TryFrom<VocabArgs> for VocabConfig {
    type Error = eyre::Error;

    fn try_from(args: VocabArgs) -> Result<Self> {
        let source = if args.bpe {
            let tokenizer = match args.tokenizer {
                Some(path) => path,
                None => args
                    .repo
                    .repo()?
                    .resolve_first(&TOKENIZER_FILES)
                    .wrap_err("no tokenizer given; pass --tokenizer")?,
            };

            VocabularySource::Subword {
                tokenizer,
                blank: args.blank_token,
            }
        } else if let Some(path) = args.alphabet {
            VocabularySource::Alphabet(path)
        } else {
            VocabularySource::Characters
        };

        Ok(Self { source })
    }
}

impl VocabConfig {
    /// Build the label encoder for this vocabulary.
    pub fn encoder(&self) -> Result<TextEncoder> {
        let vocabulary = self
            .source
            .build()
            .wrap_err_with(|| format!("failed to build vocabulary from {:?}", self.source))?;

        Ok(TextEncoder::new(vocabulary))
    }
}

/// Language model and beam search arguments.
#[derive(clap::Args, Clone, Debug)]
pub struct LmArgs {
    /// ARPA language model (default: lowercase_3-gram.pruned.1e-7.arpa in
    /// --resources)
    #[arg(long, conflicts_with = "no_lm")]
    pub lm: Option<PathBuf>,

    /// Unigram lexicon, one word per line (default: librispeech-vocab.txt in
    /// --resources)
    #[arg(long, conflicts_with_all = ["no_lm", "no_lexicon"])]
    pub lexicon: Option<PathBuf>,

    /// Score words with the language model only, without a lexicon
    #[arg(long, conflicts_with = "no_lm")]
    pub no_lexicon: bool,

    /// Beam search without a language model
    #[arg(long)]
    pub no_lm: bool,

    /// Number of hypotheses kept after each frame
    #[arg(long, default_value_t = DEFAULT_BEAM_WIDTH)]
    pub beam_width: usize,

    #[command(flatten)]
    pub beam: BeamSearchConfig,
}

/// Resolved language model files.
#[derive(Clone, Debug, PartialEq)]
pub struct LmFiles {
    pub lm: PathBuf,
    /// Unset only when the lexicon was switched off
    pub lexicon: Option<PathBuf>,
}

/// Resolved language model and beam search configuration.
#[derive(Clone, Debug)]
pub struct LmConfig {
    pub files: Option<LmFiles>,
    pub beam_width: usize,
    pub beam: BeamSearchConfig,
}

impl LmConfig {
    /// Resolve LM and lexicon paths, falling back to the resource repository.
    pub fn resolve(args: LmArgs, resources: &ResourceArgs) -> Result<Self> {
        check_beam_width(args.beam_width)?;

        if args.no_lm {
            return Ok(Self {
                files: None,
                beam_width: args.beam_width,
                beam: args.beam,
            });
        }

        let repo = OnceCell::new();

        let lm = match args.lm {
            Some(path) => path,
            None => lazy_repo(&repo, resources)?
                .resolve(LM_FILE)
                .wrap_err("no language model given; pass --lm or --no-lm")?,
        };

        let lexicon = match args.lexicon {
            Some(path) => Some(path),
            None if args.no_lexicon => {
                tracing::info!("lexicon disabled, words are not constrained");
                None
            }
            None => Some(
                lazy_repo(&repo, resources)?
                    .resolve(LEXICON_FILE)
                    .wrap_err("no lexicon given; pass --lexicon, --no-lexicon or --no-lm")?,
            ),
        };

        Ok(Self {
            files: Some(LmFiles { lm, lexicon }),
            beam_width: args.beam_width,
            beam: args.beam,
        })
    }

    /// Load the language model scorer, if any.
    pub fn scorer(&self) -> Result<Option<LanguageModelScorer>> {
        let Some(files) = &self.files else {
            return Ok(None);
        };

        let model = ArpaModel::from_file(&files.lm)
            .wrap_err_with(|| format!("failed to load language model: {:?}", files.lm.display()))?;

        let lexicon = match &files.lexicon {
            Some(path) => Lexicon::from_file(path)
                .wrap_err_with(|| format!("failed to load lexicon: {:?}", path.display()))?,
            None => Lexicon::default(),
        };

        Ok(Some(LanguageModelScorer::new(
            Arc::new(model),
            Arc::new(lexicon),
            self.beam.lm_weights(),
        )))
    }
}

/// Open the repository on first use.
fn lazy_repo<'a>(
    cell: &'a OnceCell<ResourceRepo>,
    resources: &ResourceArgs,
) -> Result<&'a ResourceRepo> {
    if let Some(repo) = cell.get() {
        return Ok(repo);
    }
    let repo = resources.repo()?;
    Ok(cell.get_or_init(|| repo))
}
