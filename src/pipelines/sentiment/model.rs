use serde::{Deserialize, Serialize};

/// Text polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub const ALL: [Sentiment; 3] = [Sentiment::Positive, Sentiment::Negative, Sentiment::Neutral];

    /// Maps a model's `id2label` entry onto a sentiment.
    ///
    /// Accepts plain names and the `LABEL_<id>` form used by Cardiff NLP
    /// checkpoints (0 = negative, 1 = neutral, 2 = positive).
    pub fn from_model_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "positive" | "pos" | "label_2" => Some(Sentiment::Positive),
            "neutral" | "neu" | "label_1" => Some(Sentiment::Neutral),
            "negative" | "neg" | "label_0" => Some(Sentiment::Negative),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
