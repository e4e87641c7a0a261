//! # candle-sentiment
//!
//! Sentiment, emotion and aspect-based sentiment analysis over pretrained
//! Hugging Face classifiers, run locally with Candle and served as a JSON API.
//!
//! The pieces compose bottom-up:
//!
//! - [`models`]: Candle sequence and token classifiers loaded from the Hub.
//! - [`pipelines`]: label normalisation and result shaping per task.
//! - [`registry`]: lazily loaded, cached pipelines behind a [`registry::ModelSource`].
//! - [`analyzer`]: validation, dispatch and history recording.
//! - [`api`]: the axum router.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use candle_sentiment::analyzer::{Analyzer, Features, Limits};
//! use candle_sentiment::config::Settings;
//! use candle_sentiment::registry::ModelRegistry;
//!
//! # fn main() -> candle_sentiment::Result<()> {
//! let settings = Settings::default();
//! let registry = ModelRegistry::new(Arc::new(settings.model_source()));
//! let analyzer = Analyzer::new(registry, Limits::default(), Features::default(), 100);
//!
//! let result = analyzer.analyze_sentiment("I love this product!")?;
//! println!("{} ({:.2})", result.label, result.confidence);
//! # Ok(())
//! # }
//! ```

pub mod analyzer;
pub mod api;
pub mod config;
pub mod error;
pub mod history;
pub(crate) mod loaders;
pub mod models;
pub mod pipelines;
pub mod registry;
pub mod text;

pub use error::{AnalysisError, Result};
pub use pipelines::{aspect, emotion, sentiment};
