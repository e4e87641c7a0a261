//! Emotion detection pipeline.
//!
//! Classify text into the affect categories of the configured emotion model
//! (for the default checkpoint: anger, disgust, fear, joy, neutral, sadness,
//! surprise). Label names are taken from the model and lowercased.

pub(crate) mod pipeline;

pub use pipeline::{EmotionPipeline, EmotionResult};
