//! Service configuration from CLI flags, environment variables and `.env`.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};

use crate::analyzer::{Features, Limits};
use crate::pipelines::utils::DeviceRequest;
use crate::registry::HubModelSource;

pub const DEFAULT_SENTIMENT_MODEL: &str = "clapAI/modernBERT-base-multilingual-sentiment";
pub const DEFAULT_EMOTION_MODEL: &str = "j-hartmann/emotion-english-distilroberta-base";

#[derive(Debug, Clone, Parser)]
#[command(
    name = "candle-sentiment",
    version,
    about = "Sentiment, emotion and aspect analysis over a JSON API"
)]
pub struct Settings {
    /// Hub id of the three-way sentiment classifier.
    #[arg(long, env = "SENTIMENT_MODEL", default_value = DEFAULT_SENTIMENT_MODEL)]
    pub sentiment_model: String,

    /// Hub id of the emotion classifier.
    #[arg(long, env = "EMOTION_MODEL", default_value = DEFAULT_EMOTION_MODEL)]
    pub emotion_model: String,

    /// Hub id of a BERT token-classification (NER) model for aspect extraction.
    /// Without one, aspects come from the built-in heuristic.
    #[arg(long, env = "ASPECT_MODEL")]
    pub aspect_model: Option<String>,

    /// Extra aspect terms, comma separated.
    #[arg(long, env = "ASPECT_TERMS", value_delimiter = ',')]
    pub aspect_terms: Vec<String>,

    #[arg(long, env = "MAX_TEXT_LENGTH", default_value_t = 5000)]
    pub max_text_length: usize,

    #[arg(long, env = "BATCH_SIZE_LIMIT", default_value_t = 100)]
    pub batch_size_limit: usize,

    #[arg(long, env = "HISTORY_CAPACITY", default_value_t = 1000)]
    pub history_capacity: usize,

    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: IpAddr,

    #[arg(long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// Verbose logging.
    #[arg(long, env = "DEBUG", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    pub debug: bool,

    /// `auto`, `cpu` or `cuda:N`.
    #[arg(long, env = "DEVICE", default_value = "auto")]
    pub device: DeviceRequest,

    /// Hugging Face cache directory. Defaults to the hub's own.
    #[arg(long, env = "CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Directory served at `/`.
    #[arg(long, env = "STATIC_DIR", default_value = "static")]
    pub static_dir: PathBuf,

    #[arg(long, env = "ENABLE_EMOTION_DETECTION", default_value_t = true, action = ArgAction::Set, value_parser = BoolishValueParser::new())]
    pub enable_emotion_detection: bool,

    #[arg(long, env = "ENABLE_ASPECT_ANALYSIS", default_value_t = true, action = ArgAction::Set, value_parser = BoolishValueParser::new())]
    pub enable_aspect_analysis: bool,

    #[arg(long, env = "ENABLE_BATCH_PROCESSING", default_value_t = true, action = ArgAction::Set, value_parser = BoolishValueParser::new())]
    pub enable_batch_processing: bool,

    #[arg(long, env = "ENABLE_HISTORY", default_value_t = true, action = ArgAction::Set, value_parser = BoolishValueParser::new())]
    pub enable_history: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sentiment_model: DEFAULT_SENTIMENT_MODEL.to_string(),
            emotion_model: DEFAULT_EMOTION_MODEL.to_string(),
            aspect_model: None,
            aspect_terms: Vec::new(),
            max_text_length: 5000,
            batch_size_limit: 100,
            history_capacity: 1000,
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 5000,
            debug: false,
            device: DeviceRequest::Auto,
            cache_dir: None,
            static_dir: PathBuf::from("static"),
            enable_emotion_detection: true,
            enable_aspect_analysis: true,
            enable_batch_processing: true,
            enable_history: true,
        }
    }
}

impl Settings {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn limits(&self) -> Limits {
        Limits {
            max_text_length: self.max_text_length,
            batch_size_limit: self.batch_size_limit,
        }
    }

    pub fn features(&self) -> Features {
        Features {
            emotion: self.enable_emotion_detection,
            aspect: self.enable_aspect_analysis,
            batch: self.enable_batch_processing,
            history: self.enable_history,
        }
    }

    pub fn model_source(&self) -> HubModelSource {
        HubModelSource {
            sentiment_model: self.sentiment_model.clone(),
            emotion_model: self.emotion_model.clone(),
            aspect_model: self
                .aspect_model
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(String::from),
            aspect_terms: self
                .aspect_terms
                .iter()
                .map(|term| term.trim().to_string())
                .filter(|term| !term.is_empty())
                .collect(),
            cache_dir: self.cache_dir.clone(),
            device: self.device,
        }
    }

    /// Default `EnvFilter` directives when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> &'static str {
        if self.debug {
            "candle_sentiment=debug,tower_http=debug"
        } else {
            "candle_sentiment=info,tower_http=info"
        }
    }
}
