//! Publisher adapters
//!
//! A sink receives one `StationEvent` per call. Delivery guarantees beyond the success of
//! that single call belong to the sink itself.

mod console;
mod mqtt;

pub use console::ConsoleSink;
pub use mqtt::MqttSink;

use async_trait::async_trait;

use crate::config::SinkConfig;
use crate::error::PublishError;
use crate::models::StationEvent;

#[async_trait]
pub trait EventSink: Send {
    /// Establish the connection. Called once, before the first tick.
    async fn connect(&mut self) -> Result<(), PublishError>;

    /// Hand over one event. Fatal errors (`PublishError::is_fatal`) stop the collector.
    async fn publish(&mut self, event: StationEvent) -> Result<(), PublishError>;

    /// Release the connection. Called once, when the collector stops.
    async fn close(&mut self) -> Result<(), PublishError>;
}

/// Build the sink selected in the configuration.
pub fn from_config(config: &SinkConfig) -> Box<dyn EventSink> {
    match config {
        SinkConfig::Mqtt(mqtt) => Box::new(MqttSink::new(mqtt.clone())),
        SinkConfig::Console => Box::new(ConsoleSink::stdout()),
    }
}
