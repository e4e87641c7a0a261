//! Aspect-based sentiment pipeline.
//!
//! Finds the things a text talks about ("food", "service", named entities)
//! and scores the sentiment of the clauses mentioning each one.
//!
//! Two extractors implement [`AspectExtractor`]:
//!
//! | Extractor | Source of candidates |
//! |-----------|----------------------|
//! | [`EntityExtractor`] | token-classification (NER) model + aspect lexicon |
//! | [`HeuristicExtractor`] | aspect lexicon + capitalised and repeated words |

pub(crate) mod extractor;
pub(crate) mod pipeline;

pub use extractor::{
    AspectExtractor, AspectLexicon, EntityExtractor, EntityRecognizer, EntitySpan,
    HeuristicExtractor, DEFAULT_ASPECT_TERMS,
};
pub use pipeline::{AspectPipeline, AspectResult, AspectSentiment};
