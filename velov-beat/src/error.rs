//! Error taxonomy of the collector
//!
//! `ConfigError` is raised before the loop starts; `CollectorError` ends `Collector::run`.
//! Fetch, decode and non-fatal publish errors are absorbed by the loop: the tick is logged
//! and skipped.

use std::path::PathBuf;

use thiserror::Error;

use crate::collector::LoopState;

/// Invalid or unreadable configuration, raised before the loop starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("poll period must be greater than zero")]
    ZeroPeriod,

    #[error("missing API key (set api.key or VELOV_API_KEY)")]
    MissingApiKey,

    #[error("invalid API endpoint {url}: {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("invalid sink settings: {0}")]
    InvalidSink(String),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// One station-list request failed. Transient: the tick is skipped.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected HTTP status {status} from {url}")]
    Status { url: String, status: u16 },
}

impl FetchError {
    /// HTTP status observed upstream, if the request got that far.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport { source, .. } => source.status().map(|s| s.as_u16()),
        }
    }
}

/// The payload did not match the station list schema.
#[derive(Debug, Error)]
#[error("malformed station payload ({len} bytes): {source}")]
pub struct DecodeError {
    pub len: usize,
    #[source]
    pub source: serde_json::Error,
}

/// A sink could not accept an event.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to encode station {number}: {source}")]
    Encode {
        number: u32,
        #[source]
        source: serde_json::Error,
    },

    #[error("sink rejected event: {0}")]
    Rejected(String),

    #[error("sink connection lost: {0}")]
    ConnectionLost(String),
}

impl PublishError {
    /// A fatal error means the sink connection is unusable and the loop must stop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ConnectionLost(_))
    }
}

/// Errors that terminate `Collector::run`.
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("failed to connect to sink: {0}")]
    Connect(#[source] PublishError),

    #[error("sink became unusable: {0}")]
    SinkLost(#[source] PublishError),

    #[error("collector cannot run from state {0:?}")]
    NotIdle(LoopState),
}
