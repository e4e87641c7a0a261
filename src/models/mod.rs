//! Candle models behind the pipelines.

pub mod classifier;
pub mod token_classifier;

pub use classifier::SequenceClassifier;
pub use token_classifier::TokenClassifier;
