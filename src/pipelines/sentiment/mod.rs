//! Sentiment analysis pipeline.
//!
//! Classify text as `positive`, `negative`, or `neutral`.
//! Returns the predicted label, its confidence and the full score distribution.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use candle_sentiment::models::SequenceClassifier;
//! use candle_sentiment::pipelines::utils::DeviceRequest;
//! use candle_sentiment::sentiment::SentimentPipeline;
//!
//! # fn main() -> candle_sentiment::error::Result<()> {
//! let device = DeviceRequest::Cpu.resolve()?;
//! let model = SequenceClassifier::load("clapAI/modernBERT-base-multilingual-sentiment", None, device)?;
//! let pipeline = SentimentPipeline::new(Arc::new(model))?;
//!
//! let output = pipeline.run("I absolutely love this product!")?;
//! println!("sentiment: {} (confidence: {:.2})", output.label, output.confidence);
//! # Ok(())
//! # }
//! ```

pub(crate) mod model;
pub(crate) mod pipeline;

pub use model::Sentiment;
pub use pipeline::{SentimentPipeline, SentimentResult};
