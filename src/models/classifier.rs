use std::collections::HashMap;
use std::path::Path;

use candle_core::{Device, Tensor, D};
use candle_nn::ops::softmax;
use candle_transformers::models::modernbert::{
    self, ModernBertForSequenceClassification as CandleModernBertForSequenceClassification,
};
use candle_transformers::models::xlm_roberta::{
    self, XLMRobertaForSequenceClassification as CandleRobertaForSequenceClassification,
};
use tokenizers::{Encoding, Tokenizer};
use tracing::debug;

use crate::error::{AnalysisError, Result};
use crate::loaders::{ClassifierFiles, HfLoader};
use crate::pipelines::model::TextClassifier;

const DEFAULT_MAX_TOKENS: usize = 512;

enum Backend {
    ModernBert(CandleModernBertForSequenceClassification),
    Roberta(CandleRobertaForSequenceClassification),
}

/// A Hub sequence-classification checkpoint with its tokenizer.
///
/// The architecture is read from `config.json`:
///
/// | `model_type` | Candle model |
/// |--------------|--------------|
/// | `modernbert` | `ModernBertForSequenceClassification` |
/// | `roberta`, `xlm-roberta` | `XLMRobertaForSequenceClassification` |
pub struct SequenceClassifier {
    backend: Backend,
    tokenizer: Tokenizer,
    labels: Vec<String>,
    device: Device,
    max_tokens: usize,
}

impl SequenceClassifier {
    pub fn load(model_id: &str, cache_dir: Option<&Path>, device: Device) -> Result<Self> {
        let loader = HfLoader::new(model_id, cache_dir);
        let files = ClassifierFiles::fetch(&loader)?;
        let labels = files.config.labels.clone();
        if labels.is_empty() {
            return Err(AnalysisError::ModelUnavailable(format!(
                "Model '{model_id}' has no id2label mapping"
            )));
        }

        let vb = files.var_builder(&device)?;
        let max_positions = files
            .config
            .max_position_embeddings
            .unwrap_or(DEFAULT_MAX_TOKENS);

        let (backend, max_tokens) = match files.config.model_type.as_str() {
            "modernbert" => {
                let mut config: modernbert::Config = serde_json::from_str(&files.config.raw)?;
                patch_config_labels(&mut config, &labels);
                let model = CandleModernBertForSequenceClassification::load(vb, &config)?;
                (Backend::ModernBert(model), max_positions)
            }
            "roberta" | "xlm-roberta" => {
                let config: xlm_roberta::Config = serde_json::from_str(&files.config.raw)?;
                let model = CandleRobertaForSequenceClassification::new(labels.len(), &config, vb)?;
                // RoBERTa position ids start after the padding index.
                let offset = files.config.pad_token_id.unwrap_or(1) as usize + 1;
                (
                    Backend::Roberta(model),
                    max_positions.saturating_sub(offset).max(2),
                )
            }
            other => {
                return Err(AnalysisError::ModelUnavailable(format!(
                    "Model '{model_id}' has unsupported model_type '{other}', expected modernbert, roberta or xlm-roberta"
                )))
            }
        };

        debug!(
            model = model_id,
            labels = ?labels,
            max_tokens,
            "sequence classifier ready"
        );

        Ok(Self {
            backend,
            tokenizer: files.tokenizer,
            labels,
            device,
            max_tokens,
        })
    }

    fn encode(&self, text: &str) -> Result<Encoding> {
        self.tokenizer.encode(text, true).map_err(|e| {
            AnalysisError::Inference(format!(
                "Tokenization failed on '{}': {}",
                &text.chars().take(50).collect::<String>(),
                e
            ))
        })
    }

    fn logits(&self, input_ids: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
        let logits = match &self.backend {
            Backend::ModernBert(model) => {
                let output = model.forward(input_ids, attention_mask)?;
                undo_sigmoid(&output)?
            }
            Backend::Roberta(model) => {
                let token_type_ids = input_ids.zeros_like()?;
                model.forward(input_ids, attention_mask, &token_type_ids)?
            }
        };
        Ok(logits)
    }
}

impl TextClassifier for SequenceClassifier {
    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn scores(&self, text: &str) -> Result<Vec<f32>> {
        let encoding = self.encode(text)?;
        let (ids, mask) = truncate_tokens(
            encoding.get_ids(),
            encoding.get_attention_mask(),
            self.max_tokens,
        );

        let input_ids = Tensor::new(ids.as_slice(), &self.device)?.unsqueeze(0)?;
        let attention_mask = Tensor::new(mask.as_slice(), &self.device)?.unsqueeze(0)?;

        let logits = self.logits(&input_ids, &attention_mask)?;
        let probs = softmax(&logits, D::Minus1)?;
        Ok(probs.squeeze(0)?.to_vec1::<f32>()?)
    }
}

/// Candle's ModernBERT head ends in a sigmoid. Mapping the outputs back through
/// the logit function lets the softmax see real logits; the mapping is monotonic
/// so the predicted class never changes.
fn undo_sigmoid(output: &Tensor) -> Result<Tensor> {
    const EPS: f32 = 1e-7;
    let values = output.flatten_all()?.to_vec1::<f32>()?;
    if !values.iter().all(|v| (0.0..=1.0).contains(v)) {
        return Ok(output.clone());
    }
    let p = output.clamp(EPS, 1.0 - EPS)?;
    let complement = p.affine(-1.0, 1.0)?;
    Ok(p.div(&complement)?.log()?)
}

/// Cuts an encoding to `max` tokens, keeping the closing special token.
pub(crate) fn truncate_tokens(ids: &[u32], mask: &[u32], max: usize) -> (Vec<u32>, Vec<u32>) {
    let max = max.max(2);
    if ids.len() <= max {
        return (ids.to_vec(), mask.to_vec());
    }
    let mut kept_ids = ids[..max - 1].to_vec();
    kept_ids.push(ids[ids.len() - 1]);
    let kept_mask = mask[..max].to_vec();
    (kept_ids, kept_mask)
}

fn patch_config_labels(config: &mut modernbert::Config, labels: &[String]) {
    use candle_transformers::models::modernbert::{ClassifierConfig, ClassifierPooling};

    let id2label: HashMap<String, String> = labels
        .iter()
        .enumerate()
        .map(|(i, label)| (i.to_string(), label.clone()))
        .collect();
    let label2id: HashMap<String, String> = id2label
        .iter()
        .map(|(k, v)| (v.clone(), k.clone()))
        .collect();

    let pooling = config
        .classifier_config
        .as_ref()
        .map(|c| c.classifier_pooling.clone())
        .unwrap_or_else(ClassifierPooling::default);

    config.classifier_config = Some(ClassifierConfig {
        id2label,
        label2id,
        classifier_pooling: pooling,
    });
}
