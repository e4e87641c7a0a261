use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::error::{AnalysisError, Result};
use crate::pipelines::model::{classify, round_score, TextClassifier};

/// Output of [`EmotionPipeline::run`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmotionResult {
    /// The emotion with the highest score.
    pub primary_emotion: String,
    /// Score of `primary_emotion` (0.0 to 1.0).
    pub confidence: f32,
    /// The full distribution, one entry per emotion.
    pub all_emotions: BTreeMap<String, f32>,
}

#[derive(Clone)]
pub struct EmotionPipeline {
    model: Arc<dyn TextClassifier>,
    labels: Vec<String>,
}

impl std::fmt::Debug for EmotionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmotionPipeline")
            .field("labels", &self.labels)
            .finish()
    }
}

impl EmotionPipeline {
    pub fn new(model: Arc<dyn TextClassifier>) -> Result<Self> {
        let labels: Vec<String> = model
            .labels()
            .iter()
            .map(|label| label.trim().to_lowercase())
            .collect();

        if labels.len() < 2 {
            return Err(AnalysisError::ModelUnavailable(format!(
                "Emotion model needs at least two classes, got {:?}",
                model.labels()
            )));
        }
        let mut unique = labels.clone();
        unique.sort();
        unique.dedup();
        if unique.len() != labels.len() {
            return Err(AnalysisError::ModelUnavailable(format!(
                "Emotion model has duplicate classes: {:?}",
                model.labels()
            )));
        }

        Ok(Self { model, labels })
    }

    /// The emotions this pipeline can report, in model order.
    pub fn emotions(&self) -> &[String] {
        &self.labels
    }

    pub fn run(&self, text: &str) -> Result<EmotionResult> {
        let (scores, best) = classify(self.model.as_ref(), text)?;

        let all_emotions = self
            .labels
            .iter()
            .zip(&scores)
            .map(|(label, score)| (label.clone(), round_score(*score)))
            .collect();

        Ok(EmotionResult {
            primary_emotion: self.labels[best].clone(),
            confidence: round_score(scores[best]),
            all_emotions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec<String>, Vec<f32>);

    impl TextClassifier for Fixed {
        fn labels(&self) -> &[String] {
            &self.0
        }

        fn scores(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(self.1.clone())
        }
    }

    const EMOTIONS: [&str; 7] = [
        "anger", "disgust", "fear", "joy", "neutral", "sadness", "surprise",
    ];

    #[test]
    fn reports_primary_emotion_and_distribution() {
        let model = Fixed(
            EMOTIONS.iter().map(|e| e.to_string()).collect(),
            vec![0.01, 0.01, 0.02, 0.9, 0.03, 0.02, 0.01],
        );
        let pipeline = EmotionPipeline::new(Arc::new(model)).unwrap();
        let result = pipeline.run("What a wonderful day!").unwrap();

        assert_eq!(result.primary_emotion, "joy");
        assert_eq!(result.confidence, 0.9);
        assert_eq!(result.all_emotions.len(), 7);
        let total: f32 = result.all_emotions.values().sum();
        assert!((total - 1.0).abs() < 1e-3);
    }

    #[test]
    fn lowercases_model_labels() {
        let model = Fixed(vec!["Joy".into(), "Sadness".into()], vec![0.3, 0.7]);
        let pipeline = EmotionPipeline::new(Arc::new(model)).unwrap();
        assert_eq!(pipeline.emotions(), ["joy", "sadness"]);
        assert_eq!(pipeline.run("sigh").unwrap().primary_emotion, "sadness");
    }

    #[test]
    fn rejects_degenerate_label_sets() {
        let single = Fixed(vec!["joy".into()], vec![1.0]);
        assert!(EmotionPipeline::new(Arc::new(single)).is_err());

        let duplicated = Fixed(vec!["joy".into(), "JOY".into()], vec![0.5, 0.5]);
        assert!(EmotionPipeline::new(Arc::new(duplicated)).is_err());
    }
}
