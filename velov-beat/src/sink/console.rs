use std::io::{self, Stdout, Write};

use async_trait::async_trait;

use super::EventSink;
use crate::error::PublishError;
use crate::models::{EventEnvelope, StationEvent};

/// Writes one JSON envelope per line. Used for dry runs without a broker.
///
/// Writes are blocking and happen on the runtime thread; fine for stdout or an in-memory buffer.
pub struct ConsoleSink<W = Stdout> {
    writer: W,
}

impl ConsoleSink<Stdout> {
    pub fn stdout() -> Self {
        Self { writer: io::stdout() }
    }
}

impl<W: Write + Send> ConsoleSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<W: Write + Send> EventSink for ConsoleSink<W> {
    async fn connect(&mut self) -> Result<(), PublishError> {
        Ok(())
    }

    async fn publish(&mut self, event: StationEvent) -> Result<(), PublishError> {
        let line = serde_json::to_string(&EventEnvelope::now(&event))
            .map_err(|source| PublishError::Encode { number: event.number, source })?;

        writeln!(self.writer, "{line}").map_err(|e| PublishError::ConnectionLost(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), PublishError> {
        self.writer.flush().map_err(|e| PublishError::ConnectionLost(e.to_string()))
    }
}
