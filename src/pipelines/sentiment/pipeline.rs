use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use super::model::Sentiment;
use crate::error::{AnalysisError, Result};
use crate::pipelines::model::{classify, round_score, TextClassifier};

/// Output of [`SentimentPipeline::run`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentResult {
    /// The class with the highest score.
    pub label: Sentiment,
    /// Score of `label` (0.0 to 1.0).
    pub confidence: f32,
    /// The full distribution, one entry per sentiment.
    pub all_scores: BTreeMap<Sentiment, f32>,
}

/// Three-way sentiment classification over a [`TextClassifier`].
#[derive(Clone)]
pub struct SentimentPipeline {
    model: Arc<dyn TextClassifier>,
    labels: Vec<Sentiment>,
}

impl std::fmt::Debug for SentimentPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SentimentPipeline")
            .field("labels", &self.labels)
            .finish()
    }
}

impl SentimentPipeline {
    /// Wraps `model`, which must expose exactly the three sentiment classes.
    pub fn new(model: Arc<dyn TextClassifier>) -> Result<Self> {
        let labels = model
            .labels()
            .iter()
            .map(|label| {
                Sentiment::from_model_label(label).ok_or_else(|| {
                    AnalysisError::ModelUnavailable(format!(
                        "Sentiment model label '{label}' is not positive, negative or neutral"
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let covers_all = Sentiment::ALL.iter().all(|s| labels.contains(s));
        if labels.len() != Sentiment::ALL.len() || !covers_all {
            return Err(AnalysisError::ModelUnavailable(format!(
                "Sentiment model must have exactly the classes positive, negative and neutral, got {:?}",
                model.labels()
            )));
        }

        Ok(Self { model, labels })
    }

    /// Classify `text`. Ties resolve to the class the model lists first.
    pub fn run(&self, text: &str) -> Result<SentimentResult> {
        let (scores, best) = classify(self.model.as_ref(), text)?;

        let all_scores = self
            .labels
            .iter()
            .zip(&scores)
            .map(|(label, score)| (*label, round_score(*score)))
            .collect();

        Ok(SentimentResult {
            label: self.labels[best],
            confidence: round_score(scores[best]),
            all_scores,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        labels: Vec<String>,
        scores: Vec<f32>,
    }

    impl TextClassifier for Fixed {
        fn labels(&self) -> &[String] {
            &self.labels
        }

        fn scores(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(self.scores.clone())
        }
    }

    fn fixed(labels: &[&str], scores: &[f32]) -> Arc<dyn TextClassifier> {
        Arc::new(Fixed {
            labels: labels.iter().map(|l| l.to_string()).collect(),
            scores: scores.to_vec(),
        })
    }

    #[test]
    fn picks_argmax_and_reports_distribution() {
        let pipeline =
            SentimentPipeline::new(fixed(&["negative", "neutral", "positive"], &[0.05, 0.15, 0.8]))
                .unwrap();
        let result = pipeline.run("I love this product!").unwrap();

        assert_eq!(result.label, Sentiment::Positive);
        assert_eq!(result.confidence, 0.8);
        assert_eq!(result.all_scores.len(), 3);
        assert_eq!(result.all_scores[&Sentiment::Negative], 0.05);
        let total: f32 = result.all_scores.values().sum();
        assert!((total - 1.0).abs() < 1e-3);
    }

    #[test]
    fn maps_cardiff_style_labels() {
        let pipeline =
            SentimentPipeline::new(fixed(&["LABEL_0", "LABEL_1", "LABEL_2"], &[0.7, 0.2, 0.1]))
                .unwrap();
        assert_eq!(pipeline.run("awful").unwrap().label, Sentiment::Negative);
    }

    #[test]
    fn ties_resolve_to_model_order() {
        let pipeline =
            SentimentPipeline::new(fixed(&["neutral", "positive", "negative"], &[0.4, 0.4, 0.2]))
                .unwrap();
        assert_eq!(pipeline.run("meh").unwrap().label, Sentiment::Neutral);
    }

    #[test]
    fn rejects_models_without_three_sentiments() {
        let binary = SentimentPipeline::new(fixed(&["negative", "positive"], &[0.5, 0.5]));
        assert!(matches!(binary, Err(AnalysisError::ModelUnavailable(_))));

        let emotions = SentimentPipeline::new(fixed(&["joy", "anger", "fear"], &[0.3, 0.3, 0.4]));
        assert!(matches!(emotions, Err(AnalysisError::ModelUnavailable(_))));

        let duplicated =
            SentimentPipeline::new(fixed(&["positive", "pos", "negative"], &[0.3, 0.3, 0.4]));
        assert!(matches!(duplicated, Err(AnalysisError::ModelUnavailable(_))));
    }

    #[test]
    fn short_score_vectors_are_inference_errors() {
        let pipeline = SentimentPipeline::new(Arc::new(Fixed {
            labels: vec!["negative".into(), "neutral".into(), "positive".into()],
            scores: vec![1.0],
        }))
        .unwrap();
        assert!(matches!(
            pipeline.run("x"),
            Err(AnalysisError::Inference(_))
        ));
    }
}
