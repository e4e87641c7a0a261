//! Request-level orchestration: feature checks, validation, cleaning, model
//! dispatch and history recording.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AnalysisError, Result};
use crate::history::{HistoryEntry, HistoryStore};
use crate::pipelines::aspect::{AspectPipeline, AspectResult};
use crate::pipelines::emotion::{EmotionPipeline, EmotionResult};
use crate::pipelines::sentiment::{SentimentPipeline, SentimentResult};
use crate::registry::{ModelInfo, ModelRegistry};
use crate::text::{clean_text, validate_text};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    #[default]
    Sentiment,
    Emotion,
    Aspect,
}

impl AnalysisMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMode::Sentiment => "sentiment",
            AnalysisMode::Emotion => "emotion",
            AnalysisMode::Aspect => "aspect",
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisMode {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sentiment" => Ok(AnalysisMode::Sentiment),
            "emotion" => Ok(AnalysisMode::Emotion),
            "aspect" => Ok(AnalysisMode::Aspect),
            _ => Err(AnalysisError::Validation("Invalid mode".into())),
        }
    }
}

/// The result of one analysis. Serialises as the inner result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnalysisResult {
    Sentiment(SentimentResult),
    Emotion(EmotionResult),
    Aspect(AspectResult),
}

/// One slot of a batch response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BatchItem {
    Ok(AnalysisResult),
    Err { error: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum input length in characters.
    pub max_text_length: usize,
    pub batch_size_limit: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_text_length: 5000,
            batch_size_limit: 100,
        }
    }
}

/// Switches for the optional endpoints. Sentiment is always on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Features {
    pub emotion: bool,
    pub aspect: bool,
    pub batch: bool,
    pub history: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            emotion: true,
            aspect: true,
            batch: true,
            history: true,
        }
    }
}

/// A resolved pipeline for one mode.
enum Runner {
    Sentiment(SentimentPipeline),
    Emotion(EmotionPipeline),
    Aspect(AspectPipeline),
}

impl Runner {
    fn run(&self, text: &str) -> Result<AnalysisResult> {
        Ok(match self {
            Runner::Sentiment(p) => AnalysisResult::Sentiment(p.run(text)?),
            Runner::Emotion(p) => AnalysisResult::Emotion(p.run(text)?),
            Runner::Aspect(p) => AnalysisResult::Aspect(p.run(text)?),
        })
    }
}

pub struct Analyzer {
    registry: ModelRegistry,
    history: HistoryStore,
    limits: Limits,
    features: Features,
}

impl Analyzer {
    pub fn new(
        registry: ModelRegistry,
        limits: Limits,
        features: Features,
        history_capacity: usize,
    ) -> Self {
        Self {
            registry,
            history: HistoryStore::with_capacity(history_capacity),
            limits,
            features,
        }
    }

    pub fn models(&self) -> ModelInfo {
        self.registry.info()
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    pub fn features(&self) -> Features {
        self.features
    }

    fn ensure_enabled(&self, mode: AnalysisMode) -> Result<()> {
        let (enabled, name) = match mode {
            AnalysisMode::Sentiment => (true, "Sentiment analysis"),
            AnalysisMode::Emotion => (self.features.emotion, "Emotion detection"),
            AnalysisMode::Aspect => (self.features.aspect, "Aspect analysis"),
        };
        if enabled {
            Ok(())
        } else {
            Err(AnalysisError::FeatureDisabled(format!("{name} is disabled")))
        }
    }

    fn runner(&self, mode: AnalysisMode) -> Result<Runner> {
        Ok(match mode {
            AnalysisMode::Sentiment => Runner::Sentiment(self.registry.sentiment()?),
            AnalysisMode::Emotion => Runner::Emotion(self.registry.emotion()?),
            AnalysisMode::Aspect => Runner::Aspect(self.registry.aspect()?),
        })
    }

    fn prepare(&self, text: &str) -> Result<String> {
        validate_text(text, self.limits.max_text_length)?;
        let cleaned = clean_text(text);
        if cleaned.is_empty() {
            return Err(AnalysisError::Validation("Text cannot be empty".into()));
        }
        Ok(cleaned)
    }

    /// Runs `runner` on the prepared text and records `text` as submitted.
    fn run_and_record(
        &self,
        runner: &Runner,
        mode: AnalysisMode,
        text: &str,
        cleaned: &str,
    ) -> Result<AnalysisResult> {
        let result = runner.run(cleaned)?;
        debug!(mode = %mode, chars = cleaned.chars().count(), "analysis complete");
        if self.features.history {
            self.history.append(mode, text, result.clone());
        }
        Ok(result)
    }

    /// Runs one analysis and records it in the history.
    ///
    /// Input is validated before any model is loaded.
    pub fn analyze(&self, mode: AnalysisMode, text: &str) -> Result<AnalysisResult> {
        self.ensure_enabled(mode)?;
        let cleaned = self.prepare(text)?;
        let runner = self.runner(mode)?;
        self.run_and_record(&runner, mode, text, &cleaned)
    }

    pub fn analyze_sentiment(&self, text: &str) -> Result<SentimentResult> {
        match self.analyze(AnalysisMode::Sentiment, text)? {
            AnalysisResult::Sentiment(result) => Ok(result),
            other => Err(unexpected(AnalysisMode::Sentiment, &other)),
        }
    }

    pub fn analyze_emotion(&self, text: &str) -> Result<EmotionResult> {
        match self.analyze(AnalysisMode::Emotion, text)? {
            AnalysisResult::Emotion(result) => Ok(result),
            other => Err(unexpected(AnalysisMode::Emotion, &other)),
        }
    }

    pub fn analyze_aspects(&self, text: &str) -> Result<AspectResult> {
        match self.analyze(AnalysisMode::Aspect, text)? {
            AnalysisResult::Aspect(result) => Ok(result),
            other => Err(unexpected(AnalysisMode::Aspect, &other)),
        }
    }

    /// Applies `mode` to every text in order.
    ///
    /// Size limits are checked before anything runs and the model is resolved
    /// once, so a load failure fails the whole batch. Per-text validation and
    /// inference failures become [`BatchItem::Err`] entries.
    pub fn batch(&self, texts: &[String], mode: AnalysisMode) -> Result<Vec<BatchItem>> {
        if !self.features.batch {
            return Err(AnalysisError::FeatureDisabled(
                "Batch processing is disabled".into(),
            ));
        }
        self.ensure_enabled(mode)?;
        if texts.is_empty() {
            return Err(AnalysisError::Validation("Invalid texts array".into()));
        }
        if texts.len() > self.limits.batch_size_limit {
            return Err(AnalysisError::Validation(format!(
                "Batch size exceeds limit of {}",
                self.limits.batch_size_limit
            )));
        }

        let runner = self.runner(mode)?;
        let items = texts
            .iter()
            .map(|text| {
                self.prepare(text)
                    .and_then(|cleaned| self.run_and_record(&runner, mode, text, &cleaned))
            })
            .map(|outcome| match outcome {
                Ok(result) => BatchItem::Ok(result),
                Err(e) => BatchItem::Err {
                    error: e.to_string(),
                },
            })
            .collect();
        debug!(mode = %mode, count = texts.len(), "batch complete");
        Ok(items)
    }

    /// The most recent `limit` entries (oldest first) and the total stored.
    pub fn history(&self, limit: usize) -> Result<(Vec<HistoryEntry>, usize)> {
        self.ensure_history()?;
        Ok((self.history.list(limit), self.history.len()))
    }

    pub fn clear_history(&self) -> Result<()> {
        self.ensure_history()?;
        self.history.clear();
        debug!("history cleared");
        Ok(())
    }

    fn ensure_history(&self) -> Result<()> {
        if self.features.history {
            Ok(())
        } else {
            Err(AnalysisError::FeatureDisabled("History is disabled".into()))
        }
    }
}

fn unexpected(mode: AnalysisMode, result: &AnalysisResult) -> AnalysisError {
    AnalysisError::Inference(format!("{mode} analysis returned {result:?}"))
}
