use crate::error::{AnalysisError, Result};

/// A sequence classifier producing a probability for each of its labels.
///
/// Implemented by [`crate::models::SequenceClassifier`]; the sentiment and
/// emotion pipelines only see this trait.
pub trait TextClassifier: Send + Sync {
    /// Labels in class id order.
    fn labels(&self) -> &[String];

    /// One normalized probability per label, in [`Self::labels`] order.
    fn scores(&self, text: &str) -> Result<Vec<f32>>;
}

/// Index of the highest score; ties go to the lowest index.
pub(crate) fn argmax(scores: &[f32]) -> Option<usize> {
    scores
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, &score)| match best {
            Some((_, best_score)) if score <= best_score => best,
            _ => Some((i, score)),
        })
        .map(|(i, _)| i)
}

/// Runs `model` and checks it returned a full distribution.
pub(crate) fn classify(model: &dyn TextClassifier, text: &str) -> Result<(Vec<f32>, usize)> {
    let scores = model.scores(text)?;
    if scores.len() != model.labels().len() {
        return Err(AnalysisError::Inference(format!(
            "Model returned {} scores for {} labels",
            scores.len(),
            model.labels().len()
        )));
    }
    let best = argmax(&scores)
        .ok_or_else(|| AnalysisError::Inference("Model returned no scores".into()))?;
    Ok((scores, best))
}

/// Rounds a probability to 4 decimal places for reporting.
pub(crate) fn round_score(score: f32) -> f32 {
    (score * 10_000.0).round() / 10_000.0
}
