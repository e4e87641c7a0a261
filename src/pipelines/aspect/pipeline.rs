use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::extractor::AspectExtractor;
use crate::error::{AnalysisError, Result};
use crate::pipelines::sentiment::{Sentiment, SentimentPipeline, SentimentResult};

static SENTENCE_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?\n]+").expect("sentence pattern is valid"));

// Contrastive conjunctions usually switch the target of an opinion.
static CLAUSE_BREAK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i);|,?\s+(?:but|however|although|though|whereas|yet|while)\b,?")
        .expect("clause pattern is valid")
});

/// Sentiment towards one aspect.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AspectSentiment {
    pub aspect: String,
    pub sentiment: Sentiment,
    pub confidence: f32,
}

/// Output of [`AspectPipeline::run`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AspectResult {
    /// Aspects in order of first appearance.
    pub aspects: Vec<AspectSentiment>,
    pub aspect_count: usize,
}

/// Aspect-based sentiment: extract aspects, then classify the clauses around each.
#[derive(Clone)]
pub struct AspectPipeline {
    extractor: Arc<dyn AspectExtractor>,
    sentiment: SentimentPipeline,
}

impl std::fmt::Debug for AspectPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AspectPipeline")
            .field("extractor", &self.extractor.name())
            .field("sentiment", &self.sentiment)
            .finish()
    }
}

impl AspectPipeline {
    pub fn new(extractor: Arc<dyn AspectExtractor>, sentiment: SentimentPipeline) -> Self {
        Self {
            extractor,
            sentiment,
        }
    }

    pub fn run(&self, text: &str) -> Result<AspectResult> {
        let aspects = self.extractor.extract(text)?;
        let clauses = split_clauses(text);
        let mut overall: Option<SentimentResult> = None;

        let mut scored = Vec::with_capacity(aspects.len());
        for aspect in aspects {
            let result = match context_window(&clauses, &aspect)? {
                Some(window) => self.sentiment.run(&window)?,
                None => match &overall {
                    Some(result) => result.clone(),
                    None => overall.insert(self.sentiment.run(text)?).clone(),
                },
            };
            scored.push(AspectSentiment {
                aspect,
                sentiment: result.label,
                confidence: result.confidence,
            });
        }

        Ok(AspectResult {
            aspect_count: scored.len(),
            aspects: scored,
        })
    }
}

/// Sentences, further split at `;` and contrastive conjunctions.
pub(crate) fn split_clauses(text: &str) -> Vec<&str> {
    SENTENCE_BREAK
        .split(text)
        .flat_map(|sentence| CLAUSE_BREAK.split(sentence))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// The clauses mentioning `aspect` or its `s`/`es` plural, joined with `". "`.
pub(crate) fn context_window(sentences: &[&str], aspect: &str) -> Result<Option<String>> {
    let mention = Regex::new(&format!(r"(?i)\b{}(?:s|es)?\b", regex::escape(aspect)))
        .map_err(|e| AnalysisError::Inference(format!("Invalid aspect '{aspect}': {e}")))?;

    let relevant: Vec<&str> = sentences
        .iter()
        .copied()
        .filter(|sentence| mention.is_match(sentence))
        .collect();

    Ok((!relevant.is_empty()).then(|| relevant.join(". ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipelines::aspect::HeuristicExtractor;
    use crate::pipelines::model::TextClassifier;

    /// Scores by keyword so each sentence gets a predictable label.
    struct Keywords;

    impl TextClassifier for Keywords {
        fn labels(&self) -> &[String] {
            static LABELS: Lazy<Vec<String>> = Lazy::new(|| {
                vec!["negative".into(), "neutral".into(), "positive".into()]
            });
            &LABELS
        }

        fn scores(&self, text: &str) -> Result<Vec<f32>> {
            let lower = text.to_lowercase();
            if lower.contains("great") {
                Ok(vec![0.1, 0.1, 0.8])
            } else if lower.contains("slow") {
                Ok(vec![0.7, 0.2, 0.1])
            } else {
                Ok(vec![0.2, 0.6, 0.2])
            }
        }
    }

    fn pipeline() -> AspectPipeline {
        let sentiment = SentimentPipeline::new(Arc::new(Keywords)).unwrap();
        AspectPipeline::new(Arc::new(HeuristicExtractor::default()), sentiment)
    }

    #[test]
    fn splits_on_sentence_punctuation() {
        assert_eq!(
            split_clauses("Great food!! Slow service. Why?\nOk"),
            vec!["Great food", "Slow service", "Why", "Ok"]
        );
        assert!(split_clauses("...").is_empty());
    }

    #[test]
    fn splits_on_contrastive_conjunctions() {
        assert_eq!(
            split_clauses("The food was great but service was slow; prices, however, were fair"),
            vec!["The food was great", "service was slow", "prices", "were fair"]
        );
        assert_eq!(split_clauses("Butter is tasty"), vec!["Butter is tasty"]);
    }

    #[test]
    fn context_is_the_sentences_that_mention_the_aspect() {
        let sentences = ["The food was great", "The service was slow", "More food please"];
        assert_eq!(
            context_window(&sentences, "food").unwrap().as_deref(),
            Some("The food was great. More food please")
        );
        assert_eq!(context_window(&sentences, "menu").unwrap(), None);
    }

    #[test]
    fn context_includes_plural_mentions() {
        let sentences = ["The prices were slow", "The boxes were great", "Pricey place"];
        assert_eq!(
            context_window(&sentences, "price").unwrap().as_deref(),
            Some("The prices were slow")
        );
        assert_eq!(
            context_window(&sentences, "box").unwrap().as_deref(),
            Some("The boxes were great")
        );
    }

    #[test]
    fn plural_only_aspect_uses_its_own_sentence() {
        let result = pipeline()
            .run("The food was great. The prices were slow.")
            .unwrap();

        let labels: Vec<_> = result
            .aspects
            .iter()
            .map(|a| (a.aspect.as_str(), a.sentiment))
            .collect();
        assert_eq!(
            labels,
            vec![("food", Sentiment::Positive), ("price", Sentiment::Negative)]
        );
    }

    #[test]
    fn aspects_in_separate_sentences_get_their_own_sentiment() {
        let result = pipeline()
            .run("The food was great. The service was slow.")
            .unwrap();

        assert_eq!(result.aspect_count, 2);
        assert_eq!(result.aspects[0].aspect, "food");
        assert_eq!(result.aspects[0].sentiment, Sentiment::Positive);
        assert_eq!(result.aspects[1].aspect, "service");
        assert_eq!(result.aspects[1].sentiment, Sentiment::Negative);
    }

    #[test]
    fn contrasting_clauses_in_one_sentence_differ() {
        let result = pipeline()
            .run("The food was great but service was slow")
            .unwrap();

        let labels: Vec<_> = result
            .aspects
            .iter()
            .map(|a| (a.aspect.as_str(), a.sentiment))
            .collect();
        assert_eq!(
            labels,
            vec![
                ("food", Sentiment::Positive),
                ("service", Sentiment::Negative)
            ]
        );
    }

    #[test]
    fn no_aspects_yields_empty_list() {
        let result = pipeline().run("It was fine I guess.").unwrap();
        assert!(result.aspects.is_empty());
        assert_eq!(result.aspect_count, 0);
    }
}
