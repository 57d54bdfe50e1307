//! Velov Beat - periodic bike-share station collector
//!
//! On every tick the collector:
//! - Fetches the JCDecaux station list over HTTP
//! - Decodes it against the upstream schema
//! - Flattens each station into a `StationEvent`
//! - Publishes the events one by one to a sink (MQTT or console)

pub mod collector;
pub mod config;
pub mod decoder;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod sink;
pub mod transform;

pub use collector::{Collector, CollectorStats, LoopState, StopHandle, TickError, TickOutcome};
pub use config::BeatConfig;
pub use error::{CollectorError, ConfigError, DecodeError, FetchError, PublishError};
pub use fetcher::{HttpFetcher, StationSource};
pub use models::{StationEvent, StationRecord};
pub use sink::EventSink;
