//! Lazily loaded, shared model handles.
//!
//! [`ModelRegistry`] hands out ready pipelines. The first request for each one
//! goes through a [`ModelSource`]; the result is kept in a [`ModelCache`] slot
//! for the life of the process.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::models::{SequenceClassifier, TokenClassifier};
use crate::pipelines::aspect::{
    AspectExtractor, AspectLexicon, AspectPipeline, EntityExtractor, HeuristicExtractor,
};
use crate::pipelines::cache::ModelCache;
use crate::pipelines::emotion::EmotionPipeline;
use crate::pipelines::model::TextClassifier;
use crate::pipelines::sentiment::SentimentPipeline;
use crate::pipelines::utils::DeviceRequest;

/// Identifiers reported by the health endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    pub sentiment: String,
    pub emotion: String,
    /// Token-classification model id, or `heuristic`.
    pub aspect: String,
}

/// Where the registry gets its models from.
///
/// Each method is called at most once per successful load; a failed call is
/// retried by the next request that needs the model.
pub trait ModelSource: Send + Sync {
    fn info(&self) -> ModelInfo;

    fn load_sentiment(&self) -> Result<Arc<dyn TextClassifier>>;

    fn load_emotion(&self) -> Result<Arc<dyn TextClassifier>>;

    fn load_aspect_extractor(&self) -> Result<Arc<dyn AspectExtractor>>;
}

/// Loads Candle models from the Hugging Face Hub.
#[derive(Debug, Clone)]
pub struct HubModelSource {
    pub sentiment_model: String,
    pub emotion_model: String,
    pub aspect_model: Option<String>,
    pub aspect_terms: Vec<String>,
    pub cache_dir: Option<PathBuf>,
    pub device: DeviceRequest,
}

impl HubModelSource {
    fn load_classifier(&self, model_id: &str) -> Result<Arc<dyn TextClassifier>> {
        let device = self.device.resolve()?;
        info!(model = model_id, device = ?device, "loading classifier");
        let model = SequenceClassifier::load(model_id, self.cache_dir.as_deref(), device)
            .map_err(|e| e.into_unavailable(model_id))?;
        info!(model = model_id, labels = ?model.labels(), "classifier loaded");
        Ok(Arc::new(model))
    }

    fn load_recognizer(&self, model_id: &str) -> Result<TokenClassifier> {
        let device = self.device.resolve()?;
        info!(model = model_id, device = ?device, "loading aspect model");
        TokenClassifier::load(model_id, self.cache_dir.as_deref(), device)
            .map_err(|e| e.into_unavailable(model_id))
    }
}

impl ModelSource for HubModelSource {
    fn info(&self) -> ModelInfo {
        ModelInfo {
            sentiment: self.sentiment_model.clone(),
            emotion: self.emotion_model.clone(),
            aspect: self
                .aspect_model
                .clone()
                .unwrap_or_else(|| "heuristic".to_string()),
        }
    }

    fn load_sentiment(&self) -> Result<Arc<dyn TextClassifier>> {
        self.load_classifier(&self.sentiment_model)
    }

    fn load_emotion(&self) -> Result<Arc<dyn TextClassifier>> {
        self.load_classifier(&self.emotion_model)
    }

    fn load_aspect_extractor(&self) -> Result<Arc<dyn AspectExtractor>> {
        let lexicon = AspectLexicon::with_defaults(&self.aspect_terms)?;

        let Some(model_id) = self.aspect_model.as_deref() else {
            info!("using heuristic aspect extractor");
            return Ok(Arc::new(HeuristicExtractor::new(lexicon)));
        };

        match self.load_recognizer(model_id) {
            Ok(recognizer) => {
                info!(model = model_id, "using entity aspect extractor");
                Ok(Arc::new(EntityExtractor::new(Arc::new(recognizer), lexicon)))
            }
            Err(e) => {
                warn!(
                    model = model_id,
                    error = %e,
                    "aspect model unavailable, falling back to heuristic extractor"
                );
                Ok(Arc::new(HeuristicExtractor::new(lexicon)))
            }
        }
    }
}

/// Lazily initialised pipelines over a [`ModelSource`].
pub struct ModelRegistry {
    source: Arc<dyn ModelSource>,
    cache: ModelCache,
}

impl ModelRegistry {
    pub fn new(source: Arc<dyn ModelSource>) -> Self {
        Self {
            source,
            cache: ModelCache::new(),
        }
    }

    pub fn info(&self) -> ModelInfo {
        self.source.info()
    }

    pub fn sentiment(&self) -> Result<SentimentPipeline> {
        let id = self.source.info().sentiment;
        self.cache.get_or_create(&id, || {
            self.source
                .load_sentiment()
                .and_then(SentimentPipeline::new)
                .map_err(|e| e.into_unavailable(&id))
        })
    }

    pub fn emotion(&self) -> Result<EmotionPipeline> {
        let id = self.source.info().emotion;
        self.cache.get_or_create(&id, || {
            self.source
                .load_emotion()
                .and_then(EmotionPipeline::new)
                .map_err(|e| e.into_unavailable(&id))
        })
    }

    pub fn aspect_extractor(&self) -> Result<Arc<dyn AspectExtractor>> {
        let id = self.source.info().aspect;
        self.cache.get_or_create(&id, || {
            self.source
                .load_aspect_extractor()
                .map_err(|e| e.into_unavailable(&id))
        })
    }

    /// The aspect pipeline shares the cached sentiment model.
    pub fn aspect(&self) -> Result<AspectPipeline> {
        let sentiment = self.sentiment()?;
        let extractor = self.aspect_extractor()?;
        Ok(AspectPipeline::new(extractor, sentiment))
    }

    /// Number of models loaded so far.
    pub fn loaded(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Uniform(Vec<String>);

    impl TextClassifier for Uniform {
        fn labels(&self) -> &[String] {
            &self.0
        }

        fn scores(&self, _text: &str) -> Result<Vec<f32>> {
            let n = self.0.len() as f32;
            Ok(vec![1.0 / n; self.0.len()])
        }
    }

    #[derive(Default)]
    struct Counting {
        sentiment_loads: AtomicUsize,
        fail_first_emotion: AtomicUsize,
    }

    impl ModelSource for Counting {
        fn info(&self) -> ModelInfo {
            ModelInfo {
                sentiment: "test/sentiment".into(),
                emotion: "test/emotion".into(),
                aspect: "heuristic".into(),
            }
        }

        fn load_sentiment(&self) -> Result<Arc<dyn TextClassifier>> {
            self.sentiment_loads.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Uniform(vec![
                "negative".into(),
                "neutral".into(),
                "positive".into(),
            ])))
        }

        fn load_emotion(&self) -> Result<Arc<dyn TextClassifier>> {
            if self.fail_first_emotion.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(AnalysisError::Inference("download interrupted".into()));
            }
            Ok(Arc::new(Uniform(vec!["joy".into(), "anger".into()])))
        }

        fn load_aspect_extractor(&self) -> Result<Arc<dyn AspectExtractor>> {
            Ok(Arc::new(HeuristicExtractor::default()))
        }
    }

    #[test]
    fn sentiment_loads_once_and_is_shared_with_aspect() {
        let source = Arc::new(Counting::default());
        let registry = ModelRegistry::new(source.clone());

        registry.sentiment().unwrap();
        registry.sentiment().unwrap();
        registry.aspect().unwrap();

        assert_eq!(source.sentiment_loads.load(Ordering::SeqCst), 1);
        assert_eq!(registry.loaded(), 2);
    }

    #[test]
    fn failed_load_is_reported_unavailable_and_retried() {
        let registry = ModelRegistry::new(Arc::new(Counting::default()));

        let err = registry.emotion().unwrap_err();
        assert!(matches!(err, AnalysisError::ModelUnavailable(_)), "{err:?}");
        assert!(err.to_string().contains("test/emotion"));

        let pipeline = registry.emotion().unwrap();
        assert_eq!(pipeline.emotions(), ["joy", "anger"]);
    }

    #[test]
    fn incompatible_sentiment_labels_are_unavailable() {
        struct Binary;
        impl ModelSource for Binary {
            fn info(&self) -> ModelInfo {
                Counting::default().info()
            }
            fn load_sentiment(&self) -> Result<Arc<dyn TextClassifier>> {
                Ok(Arc::new(Uniform(vec!["NEGATIVE".into(), "POSITIVE".into()])))
            }
            fn load_emotion(&self) -> Result<Arc<dyn TextClassifier>> {
                unreachable!()
            }
            fn load_aspect_extractor(&self) -> Result<Arc<dyn AspectExtractor>> {
                unreachable!()
            }
        }

        let registry = ModelRegistry::new(Arc::new(Binary));
        assert!(matches!(
            registry.sentiment(),
            Err(AnalysisError::ModelUnavailable(_))
        ));
        assert_eq!(registry.loaded(), 0);
    }

    #[test]
    fn hub_source_reports_heuristic_without_aspect_model() {
        let source = HubModelSource {
            sentiment_model: "a/sentiment".into(),
            emotion_model: "b/emotion".into(),
            aspect_model: None,
            aspect_terms: vec!["wifi".into()],
            cache_dir: None,
            device: DeviceRequest::Cpu,
        };
        assert_eq!(source.info().aspect, "heuristic");

        let extractor = source.load_aspect_extractor().unwrap();
        assert_eq!(extractor.name(), "heuristic");
        assert_eq!(
            extractor.extract("The wifi kept dropping").unwrap(),
            vec!["wifi"]
        );
    }
}
