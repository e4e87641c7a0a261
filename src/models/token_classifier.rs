use std::path::Path;

use candle_core::{Device, Tensor, D};
use candle_nn::{Linear, Module};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use serde::Deserialize;
use tokenizers::Tokenizer;
use tracing::debug;

use super::classifier::truncate_tokens;
use crate::error::{AnalysisError, Result};
use crate::loaders::{ClassifierFiles, HfLoader};
use crate::pipelines::aspect::{EntityRecognizer, EntitySpan};

#[derive(Deserialize)]
struct HiddenSize {
    hidden_size: usize,
}

/// A BERT token-classification (NER) checkpoint, e.g. `dslim/bert-base-NER`.
///
/// Tags are decoded as BIO spans over the input's byte offsets.
pub struct TokenClassifier {
    bert: BertModel,
    classifier: Linear,
    tokenizer: Tokenizer,
    labels: Vec<String>,
    device: Device,
    max_tokens: usize,
}

impl TokenClassifier {
    pub fn load(model_id: &str, cache_dir: Option<&Path>, device: Device) -> Result<Self> {
        let loader = HfLoader::new(model_id, cache_dir);
        let files = ClassifierFiles::fetch(&loader)?;
        if files.config.model_type != "bert" {
            return Err(AnalysisError::ModelUnavailable(format!(
                "Aspect model '{model_id}' has model_type '{}', expected bert",
                files.config.model_type
            )));
        }

        let config: BertConfig = serde_json::from_str(&files.config.raw)?;
        let HiddenSize { hidden_size } = serde_json::from_str(&files.config.raw)?;
        let labels = files.config.labels.clone();

        let vb = files.var_builder(&device)?;
        let bert = BertModel::load(vb.pp("bert"), &config)
            .or_else(|_| BertModel::load(vb.clone(), &config))?;
        let classifier = candle_nn::linear(hidden_size, labels.len(), vb.pp("classifier"))?;

        let max_tokens = files.config.max_position_embeddings.unwrap_or(512);
        debug!(model = model_id, labels = ?labels, "token classifier ready");

        Ok(Self {
            bert,
            classifier,
            tokenizer: files.tokenizer,
            labels,
            device,
            max_tokens,
        })
    }

    fn tag(&self, text: &str) -> Result<Vec<TaggedToken>> {
        let encoding = self.tokenizer.encode(text, true).map_err(|e| {
            AnalysisError::Inference(format!(
                "Tokenization failed on '{}': {}",
                &text.chars().take(50).collect::<String>(),
                e
            ))
        })?;
        let (ids, mask) = truncate_tokens(
            encoding.get_ids(),
            encoding.get_attention_mask(),
            self.max_tokens,
        );

        let input_ids = Tensor::new(ids.as_slice(), &self.device)?.unsqueeze(0)?;
        let attention_mask = Tensor::new(mask.as_slice(), &self.device)?.unsqueeze(0)?;
        let token_type_ids = input_ids.zeros_like()?;

        let hidden = self
            .bert
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let logits = self.classifier.forward(&hidden)?;
        let tag_ids = logits.argmax(D::Minus1)?.squeeze(0)?.to_vec1::<u32>()?;

        let offsets = encoding.get_offsets();
        let special = encoding.get_special_tokens_mask();

        Ok(tag_ids
            .into_iter()
            .enumerate()
            .filter(|(i, _)| special.get(*i).is_some_and(|s| *s == 0))
            .filter_map(|(i, tag)| {
                let (start, end) = *offsets.get(i)?;
                let label = self.labels.get(tag as usize)?.clone();
                Some(TaggedToken { start, end, label })
            })
            .collect())
    }
}

impl EntityRecognizer for TokenClassifier {
    fn entities(&self, text: &str) -> Result<Vec<EntitySpan>> {
        Ok(decode_bio(&self.tag(text)?))
    }
}

#[derive(Debug, Clone)]
pub(crate) struct TaggedToken {
    pub start: usize,
    pub end: usize,
    pub label: String,
}

/// Groups BIO tags into entity spans.
///
/// `I-` tags, and `B-` tags on a word piece directly attached to the previous
/// token, extend the open span when its type matches.
pub(crate) fn decode_bio(tokens: &[TaggedToken]) -> Vec<EntitySpan> {
    let mut spans: Vec<EntitySpan> = Vec::new();
    let mut open = false;

    for token in tokens {
        let (prefix, kind) = match token.label.split_once('-') {
            Some((p, k)) if p == "B" || p == "I" => (p, k),
            _ if token.label == "O" => {
                open = false;
                continue;
            }
            _ => ("I", token.label.as_str()),
        };

        let extends = open
            && spans.last().is_some_and(|span| {
                span.label == kind && (prefix == "I" || span.end == token.start)
            });

        match spans.last_mut() {
            Some(span) if extends => span.end = token.end,
            _ => spans.push(EntitySpan {
                start: token.start,
                end: token.end,
                label: kind.to_string(),
            }),
        }
        open = true;
    }

    spans
}
