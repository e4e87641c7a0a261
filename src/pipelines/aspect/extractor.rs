use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{AnalysisError, Result};

/// Review-domain vocabulary matched by every extractor.
pub const DEFAULT_ASPECT_TERMS: &[&str] = &[
    "food",
    "service",
    "staff",
    "price",
    "quality",
    "location",
    "product",
    "delivery",
    "packaging",
    "support",
    "experience",
    "design",
    "performance",
    "battery",
    "camera",
    "screen",
    "sound",
    "value",
    "customer service",
    "ambiance",
    "menu",
];

const STOPWORDS: &[&str] = &[
    "a", "about", "after", "again", "all", "also", "am", "an", "and", "any", "are", "as", "at",
    "be", "because", "been", "before", "being", "but", "by", "can", "could", "did", "do", "does",
    "doing", "for", "from", "had", "has", "have", "having", "he", "her", "here", "him", "his",
    "how", "i", "if", "in", "into", "is", "it", "its", "just", "me", "more", "most", "my", "no",
    "not", "of", "on", "once", "only", "or", "other", "our", "out", "over", "really", "she", "so",
    "some", "such", "than", "that", "the", "their", "them", "then", "there", "these", "they",
    "this", "those", "through", "to", "too", "under", "until", "up", "very", "was", "we", "were",
    "what", "when", "where", "which", "while", "who", "why", "will", "with", "would", "you",
    "your",
];

static WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\p{L}[\p{L}\p{N}'-]*").expect("word pattern is valid"));

/// Extracts candidate aspects (targets of sentiment) from text.
pub trait AspectExtractor: Send + Sync {
    /// Short name for logs and the health endpoint.
    fn name(&self) -> &'static str;

    /// Candidates in order of first appearance, without duplicates.
    fn extract(&self, text: &str) -> Result<Vec<String>>;
}

/// A span of recognized entity text, as byte offsets into the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySpan {
    pub start: usize,
    pub end: usize,
    pub label: String,
}

/// Finds named entities. Implemented by [`crate::models::TokenClassifier`].
pub trait EntityRecognizer: Send + Sync {
    fn entities(&self, text: &str) -> Result<Vec<EntitySpan>>;
}

/// Case-insensitive whole-word matcher over a fixed set of aspect terms.
///
/// `s`/`es` plurals (`prices`) are reported as their lexicon term.
#[derive(Debug, Clone)]
pub struct AspectLexicon {
    pattern: Option<Regex>,
}

impl AspectLexicon {
    pub fn new<S: AsRef<str>>(terms: &[S]) -> Result<Self> {
        let mut terms: Vec<String> = terms
            .iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        if terms.is_empty() {
            return Ok(Self { pattern: None });
        }
        // Longest first so multi-word terms win over their last word.
        terms.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        terms.dedup();

        let alternation = terms
            .iter()
            .map(|t| regex::escape(t).replace(r"\ ", r"\s+").replace(' ', r"\s+"))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!(r"(?i)\b({alternation})(?:s|es)?\b"))
            .map_err(|e| AnalysisError::Validation(format!("Invalid aspect term: {e}")))?;

        Ok(Self {
            pattern: Some(pattern),
        })
    }

    /// The built-in vocabulary plus `extra` terms.
    pub fn with_defaults<S: AsRef<str>>(extra: &[S]) -> Result<Self> {
        let mut terms: Vec<String> = DEFAULT_ASPECT_TERMS.iter().map(|t| t.to_string()).collect();
        terms.extend(extra.iter().map(|t| t.as_ref().to_string()));
        Self::new(&terms)
    }

    /// `(byte offset, term)` for every match.
    pub fn find(&self, text: &str) -> Vec<(usize, String)> {
        let Some(pattern) = &self.pattern else {
            return Vec::new();
        };
        pattern
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| {
                let term = m.as_str().split_whitespace().collect::<Vec<_>>().join(" ");
                (m.start(), term.to_lowercase())
            })
            .collect()
    }
}

impl Default for AspectLexicon {
    fn default() -> Self {
        Self::with_defaults::<&str>(&[]).expect("built-in aspect terms are valid")
    }
}

/// Orders candidates by position and drops case-insensitive repeats, keeping the first.
pub(crate) fn merge_candidates(mut candidates: Vec<(usize, String)>) -> Vec<String> {
    candidates.sort_by_key(|(pos, _)| *pos);
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|(_, aspect)| seen.insert(aspect.to_lowercase()))
        .map(|(_, aspect)| aspect)
        .collect()
}

fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(&word.to_lowercase().as_str())
}

fn starts_sentence(text: &str, pos: usize) -> bool {
    match text[..pos].trim_end().chars().last() {
        None => true,
        Some(c) => matches!(c, '.' | '!' | '?' | '\n' | ':' | ';' | '"'),
    }
}

/// Fallback extractor: lexicon terms plus a naive noun-chunk heuristic.
///
/// A chunk is a run of capitalised words that does not open a sentence, or a
/// non-stopword that occurs at least twice.
#[derive(Debug, Clone, Default)]
pub struct HeuristicExtractor {
    lexicon: AspectLexicon,
}

impl HeuristicExtractor {
    pub fn new(lexicon: AspectLexicon) -> Self {
        Self { lexicon }
    }

    fn capitalized_chunks(text: &str) -> Vec<(usize, String)> {
        let mut chunks: Vec<(usize, usize)> = Vec::new();
        for m in WORD.find_iter(text) {
            let word = m.as_str();
            let capitalized = word.chars().next().is_some_and(char::is_uppercase);
            if !capitalized || is_stopword(word) {
                continue;
            }
            match chunks.last_mut() {
                Some((_, end)) if text[*end..m.start()].chars().all(|c| c == ' ') => {
                    *end = m.end();
                }
                _ if starts_sentence(text, m.start()) => {}
                _ => chunks.push((m.start(), m.end())),
            }
        }
        chunks
            .into_iter()
            .map(|(start, end)| (start, text[start..end].to_string()))
            .collect()
    }

    fn repeated_words(text: &str) -> Vec<(usize, String)> {
        let mut first_seen: HashMap<String, (usize, usize)> = HashMap::new();
        for m in WORD.find_iter(text) {
            let word = m.as_str().to_lowercase();
            if word.chars().count() < 3 || is_stopword(&word) {
                continue;
            }
            first_seen.entry(word).or_insert((m.start(), 0)).1 += 1;
        }
        first_seen
            .into_iter()
            .filter(|(_, (_, count))| *count >= 2)
            .map(|(word, (pos, _))| (pos, word))
            .collect()
    }
}

impl AspectExtractor for HeuristicExtractor {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    fn extract(&self, text: &str) -> Result<Vec<String>> {
        let mut candidates = self.lexicon.find(text);
        candidates.extend(Self::capitalized_chunks(text));
        candidates.extend(Self::repeated_words(text));
        Ok(merge_candidates(candidates))
    }
}

/// Parser-backed extractor: named entities from a token classifier plus lexicon terms.
pub struct EntityExtractor {
    recognizer: Arc<dyn EntityRecognizer>,
    lexicon: AspectLexicon,
}

impl EntityExtractor {
    pub fn new(recognizer: Arc<dyn EntityRecognizer>, lexicon: AspectLexicon) -> Self {
        Self {
            recognizer,
            lexicon,
        }
    }
}

impl AspectExtractor for EntityExtractor {
    fn name(&self) -> &'static str {
        "entity"
    }

    fn extract(&self, text: &str) -> Result<Vec<String>> {
        let mut candidates = self.lexicon.find(text);
        for span in self.recognizer.entities(text)? {
            let Some(surface) = text.get(span.start..span.end) else {
                continue;
            };
            let surface = surface.trim();
            if !surface.is_empty() {
                candidates.push((span.start, surface.to_string()));
            }
        }
        Ok(merge_candidates(candidates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexicon_matches_whole_words_in_order() {
        let lexicon = AspectLexicon::default();
        let found = lexicon.find("The food was great but service was slow");
        assert_eq!(
            found,
            vec![(4, "food".to_string()), (23, "service".to_string())]
        );
        assert!(lexicon.find("seafoods and screening").is_empty());
    }

    #[test]
    fn lexicon_reports_plurals_as_terms() {
        let lexicon = AspectLexicon::default();
        let terms: Vec<_> = lexicon
            .find("Prices were fair, the Menu small")
            .into_iter()
            .map(|(_, t)| t)
            .collect();
        assert_eq!(terms, vec!["price", "menu"]);
    }

    #[test]
    fn multi_word_terms_win_over_their_tail() {
        let lexicon = AspectLexicon::default();
        let terms: Vec<_> = lexicon
            .find("Customer  service was rude.")
            .into_iter()
            .map(|(_, t)| t)
            .collect();
        assert_eq!(terms, vec!["customer service"]);
    }

    #[test]
    fn extra_terms_extend_the_vocabulary() {
        let lexicon = AspectLexicon::with_defaults(&["wifi", "check-in"]).unwrap();
        let terms: Vec<_> = lexicon
            .find("The check-in was slow and the wifi kept dropping")
            .into_iter()
            .map(|(_, t)| t)
            .collect();
        assert_eq!(terms, vec!["check-in", "wifi"]);
    }

    #[test]
    fn empty_lexicon_matches_nothing() {
        let lexicon = AspectLexicon::new::<&str>(&[]).unwrap();
        assert!(lexicon.find("food").is_empty());
    }

    #[test]
    fn heuristic_finds_food_and_service() {
        let extractor = HeuristicExtractor::default();
        let aspects = extractor
            .extract("The food was great but service was slow")
            .unwrap();
        assert_eq!(aspects, vec!["food", "service"]);
    }

    #[test]
    fn heuristic_picks_up_capitalized_chunks() {
        let extractor = HeuristicExtractor::default();
        let aspects = extractor
            .extract("We flew with Air Canada last week. Honestly the seats were cramped.")
            .unwrap();
        assert_eq!(aspects, vec!["Air Canada"]);
    }

    #[test]
    fn heuristic_picks_up_repeated_words() {
        let extractor = HeuristicExtractor::default();
        let aspects = extractor
            .extract("The keyboard is nice. I type all day and the keyboard never lags.")
            .unwrap();
        assert_eq!(aspects, vec!["keyboard"]);
    }

    #[test]
    fn duplicates_keep_first_occurrence() {
        let extractor = HeuristicExtractor::default();
        let aspects = extractor
            .extract("Food first. Then more food, and the FOOD again.")
            .unwrap();
        assert_eq!(aspects, vec!["food"]);
    }

    #[test]
    fn no_candidates_is_empty_not_error() {
        let extractor = HeuristicExtractor::default();
        assert!(extractor.extract("it was ok").unwrap().is_empty());
    }

    struct Scripted(Vec<EntitySpan>);

    impl EntityRecognizer for Scripted {
        fn entities(&self, _text: &str) -> Result<Vec<EntitySpan>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn entity_extractor_merges_entities_with_lexicon() {
        let text = "Service at Luigi's was slow";
        let recognizer = Scripted(vec![EntitySpan {
            start: 11,
            end: 18,
            label: "ORG".into(),
        }]);
        let extractor = EntityExtractor::new(Arc::new(recognizer), AspectLexicon::default());
        assert_eq!(extractor.extract(text).unwrap(), vec!["service", "Luigi's"]);
    }

    #[test]
    fn entity_extractor_skips_spans_outside_text() {
        let recognizer = Scripted(vec![EntitySpan {
            start: 40,
            end: 50,
            label: "PER".into(),
        }]);
        let extractor = EntityExtractor::new(Arc::new(recognizer), AspectLexicon::default());
        assert!(extractor.extract("short").unwrap().is_empty());
    }
}
