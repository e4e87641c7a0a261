use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use hf_hub::api::sync::{ApiBuilder, ApiRepo};
use hf_hub::{Repo, RepoType};
use serde::Deserialize;
use tokenizers::models::bpe::BPE;
use tokenizers::pre_tokenizers::byte_level::ByteLevel;
use tokenizers::processors::roberta::RobertaProcessing;
use tokenizers::Tokenizer;

use crate::error::{AnalysisError, Result};

#[derive(Debug, Clone)]
pub struct HfLoader {
    pub repo: String,
    pub cache_dir: Option<PathBuf>,
}

impl HfLoader {
    pub fn new(repo: &str, cache_dir: Option<&Path>) -> Self {
        Self {
            repo: repo.into(),
            cache_dir: cache_dir.map(Path::to_path_buf),
        }
    }

    fn api_repo(&self) -> Result<ApiRepo> {
        let mut builder = ApiBuilder::new().with_progress(false);
        if let Some(dir) = &self.cache_dir {
            builder = builder.with_cache_dir(dir.clone());
        }
        let api = builder.build().map_err(|e| {
            AnalysisError::ModelUnavailable(format!("Failed to initialize HuggingFace API: {e}"))
        })?;
        Ok(api.repo(Repo::new(self.repo.clone(), RepoType::Model)))
    }

    pub fn load(&self, filename: &str) -> Result<PathBuf> {
        let repo = self.api_repo()?;

        let max_retries = 3;
        for attempt in 0..max_retries {
            match repo.get(filename) {
                Ok(path) => return Ok(path),
                Err(e) => {
                    let error_msg = e.to_string();
                    if error_msg.contains("Lock acquisition failed") && attempt < max_retries - 1 {
                        std::thread::sleep(Duration::from_millis(100 * (1 << attempt)));
                        continue;
                    }
                    return Err(AnalysisError::ModelUnavailable(format!(
                        "Failed to download '{}' from '{}': {}",
                        filename, self.repo, error_msg
                    )));
                }
            }
        }

        Err(AnalysisError::ModelUnavailable(format!(
            "Download timed out for '{}' from '{}' after {} attempt(s)",
            filename, self.repo, max_retries
        )))
    }

    /// Returns the first of `filenames` the repo provides.
    pub fn load_any(&self, filenames: &[&str]) -> Result<PathBuf> {
        let mut last_err = None;
        for filename in filenames {
            match self.load(filename) {
                Ok(path) => return Ok(path),
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            AnalysisError::ModelUnavailable(format!("No candidate files for '{}'", self.repo))
        }))
    }
}

pub struct TokenizerLoader {
    file_loader: HfLoader,
}

impl TokenizerLoader {
    pub fn new(file_loader: HfLoader) -> Self {
        Self { file_loader }
    }

    /// Loads `tokenizer.json`, falling back to the RoBERTa `vocab.json` + `merges.txt` pair.
    pub fn load(&self) -> Result<Tokenizer> {
        match self.file_loader.load("tokenizer.json") {
            Ok(path) => Tokenizer::from_file(&path).map_err(|e| {
                AnalysisError::ModelUnavailable(format!(
                    "Failed to load tokenizer from '{}': {}",
                    path.display(),
                    e
                ))
            }),
            Err(fast_err) => {
                let vocab = self.file_loader.load("vocab.json");
                let merges = self.file_loader.load("merges.txt");
                match (vocab, merges) {
                    (Ok(vocab), Ok(merges)) => byte_level_bpe(&vocab, &merges),
                    _ => Err(fast_err),
                }
            }
        }
    }
}

fn byte_level_bpe(vocab: &Path, merges: &Path) -> Result<Tokenizer> {
    let vocab_str = vocab.display().to_string();
    let merges_str = merges.display().to_string();

    let bpe = BPE::from_file(&vocab_str, &merges_str)
        .build()
        .map_err(|e| {
            AnalysisError::ModelUnavailable(format!(
                "Failed to build BPE tokenizer from '{vocab_str}': {e}"
            ))
        })?;

    let mut tokenizer = Tokenizer::new(bpe);
    tokenizer
        .with_pre_tokenizer(Some(ByteLevel::default().add_prefix_space(false)))
        .with_post_processor(Some(RobertaProcessing::default()))
        .with_decoder(Some(ByteLevel::default()));

    Ok(tokenizer)
}

#[derive(Deserialize)]
struct RawClassifierConfig {
    #[serde(default)]
    model_type: Option<String>,
    #[serde(default)]
    id2label: HashMap<String, String>,
    #[serde(default)]
    max_position_embeddings: Option<usize>,
    #[serde(default)]
    pad_token_id: Option<u32>,
}

/// The parts of a classifier `config.json` that are not architecture specific.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub model_type: String,
    /// Labels ordered by class id.
    pub labels: Vec<String>,
    pub max_position_embeddings: Option<usize>,
    pub pad_token_id: Option<u32>,
    /// The raw file, for the architecture-specific config types.
    pub raw: String,
}

impl ClassifierConfig {
    pub fn from_json(raw: String) -> Result<Self> {
        let parsed: RawClassifierConfig = serde_json::from_str(&raw)?;

        let mut ids: Vec<(usize, String)> = parsed
            .id2label
            .into_iter()
            .map(|(id, label)| {
                id.parse::<usize>().map(|id| (id, label)).map_err(|_| {
                    AnalysisError::ModelUnavailable(format!("Invalid id2label key '{id}'"))
                })
            })
            .collect::<Result<_>>()?;
        ids.sort_by_key(|(id, _)| *id);

        if ids.iter().enumerate().any(|(i, (id, _))| i != *id) {
            return Err(AnalysisError::ModelUnavailable(
                "id2label ids are not contiguous from 0".into(),
            ));
        }

        Ok(Self {
            model_type: parsed.model_type.unwrap_or_default(),
            labels: ids.into_iter().map(|(_, label)| label).collect(),
            max_position_embeddings: parsed.max_position_embeddings,
            pad_token_id: parsed.pad_token_id,
            raw,
        })
    }
}

pub struct ClassifierFiles {
    pub config: ClassifierConfig,
    pub tokenizer: Tokenizer,
    pub weights: PathBuf,
}

impl ClassifierFiles {
    pub fn fetch(loader: &HfLoader) -> Result<Self> {
        let config_path = loader.load("config.json")?;
        let config = ClassifierConfig::from_json(std::fs::read_to_string(&config_path)?)?;
        let weights = loader.load_any(&["model.safetensors", "pytorch_model.bin"])?;
        let tokenizer = TokenizerLoader::new(loader.clone()).load()?;

        Ok(Self {
            config,
            tokenizer,
            weights,
        })
    }

    pub fn var_builder(&self, device: &Device) -> Result<VarBuilder<'static>> {
        let weights = &self.weights;
        let vb = if weights.extension().is_some_and(|e| e == "safetensors") {
            unsafe { VarBuilder::from_mmaped_safetensors(&[weights], DType::F32, device)? }
        } else {
            VarBuilder::from_pth(weights, DType::F32, device)?
        };
        Ok(vb)
    }
}
