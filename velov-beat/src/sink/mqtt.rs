//! MQTT publisher
//!
//! The rumqttc event loop runs in a background task, the way every Symbion-style publisher
//! drives it. Publishing is non-blocking: a full outbound queue rejects the single event,
//! while a connection that exhausted its reconnect budget is reported as lost (fatal).

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, ConnectionError, Event, EventLoop, Incoming, MqttOptions, Outgoing};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::EventSink;
use crate::config::MqttConfig;
use crate::error::PublishError;
use crate::models::{EventEnvelope, StationEvent};

/// How long `close` waits for the event loop to flush the DISCONNECT packet.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Connection status shared between the sink and its event-loop task.
#[derive(Debug, Default)]
struct ConnectionHealth {
    consecutive_failures: AtomicU32,
    lost: AtomicBool,
}

impl ConnectionHealth {
    fn mark_connected(&self) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
    }

    fn record_failure(&self) -> u32 {
        self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn mark_lost(&self) {
        self.lost.store(true, Ordering::Release);
    }

    fn is_lost(&self) -> bool {
        self.lost.load(Ordering::Acquire)
    }
}

pub struct MqttSink {
    config: MqttConfig,
    client: Option<AsyncClient>,
    driver: Option<JoinHandle<()>>,
    health: Arc<ConnectionHealth>,
}

impl MqttSink {
    pub fn new(config: MqttConfig) -> Self {
        Self {
            config,
            client: None,
            driver: None,
            health: Arc::new(ConnectionHealth::default()),
        }
    }

    fn client_id(&self) -> String {
        self.config
            .client_id
            .clone()
            .unwrap_or_else(|| format!("velov-beat-{}", uuid::Uuid::new_v4().simple()))
    }
}

#[async_trait]
impl EventSink for MqttSink {
    async fn connect(&mut self) -> Result<(), PublishError> {
        if self.client.is_some() {
            return Ok(());
        }

        let client_id = self.client_id();
        let mut options = MqttOptions::new(&client_id, &self.config.host, self.config.port);
        options.set_keep_alive(self.config.keep_alive);
        options.set_clean_session(true);

        let (client, eventloop) = AsyncClient::new(options, self.config.capacity);
        let health = Arc::clone(&self.health);
        let delay = self.config.reconnect_delay;
        let max_attempts = self.config.max_reconnect_attempts;
        self.driver = Some(tokio::spawn(drive_eventloop(eventloop, health, delay, max_attempts)));
        self.client = Some(client);

        info!(
            client_id = %client_id,
            broker = %format!("{}:{}", self.config.host, self.config.port),
            topic = %self.config.topic,
            "MQTT sink ready"
        );
        Ok(())
    }

    async fn publish(&mut self, event: StationEvent) -> Result<(), PublishError> {
        if self.health.is_lost() {
            return Err(PublishError::ConnectionLost(format!(
                "broker {}:{} unreachable after {} attempts",
                self.config.host, self.config.port, self.config.max_reconnect_attempts
            )));
        }
        let Some(client) = &self.client else {
            return Err(PublishError::ConnectionLost("sink is not connected".into()));
        };

        let payload = serde_json::to_vec(&EventEnvelope::now(&event))
            .map_err(|source| PublishError::Encode { number: event.number, source })?;

        client
            .try_publish(self.config.topic.as_str(), self.config.qos.into(), false, payload)
            .map_err(|e| {
                let driver_gone = self.driver.as_ref().map_or(true, |d| d.is_finished());
                if self.health.is_lost() || driver_gone {
                    PublishError::ConnectionLost(e.to_string())
                } else {
                    PublishError::Rejected(format!("outbound queue full: {e}"))
                }
            })
    }

    async fn close(&mut self) -> Result<(), PublishError> {
        let Some(client) = self.client.take() else {
            return Ok(());
        };

        let sent = client.try_disconnect();
        drop(client);

        if let Some(mut driver) = self.driver.take() {
            if tokio::time::timeout(CLOSE_GRACE, &mut driver).await.is_err() {
                debug!("MQTT event loop did not stop in time, aborting");
                driver.abort();
            }
        }

        sent.map_err(|e| PublishError::ConnectionLost(e.to_string()))
    }
}

/// Polls the event loop until DISCONNECT goes out, the client is dropped, or the
/// reconnect budget is spent. `max_attempts == 0` retries forever.
async fn drive_eventloop(mut eventloop: EventLoop, health: Arc<ConnectionHealth>, delay: Duration, max_attempts: u32) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                health.mark_connected();
                info!("connected to MQTT broker");
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                debug!("MQTT disconnect sent");
                break;
            }
            Ok(_) => {}
            Err(ConnectionError::RequestsDone) => break,
            Err(e) => {
                let failures = health.record_failure();
                if max_attempts > 0 && failures >= max_attempts {
                    health.mark_lost();
                    error!(error = %e, failures, "MQTT broker unreachable, giving up");
                    break;
                }
                warn!(error = %e, failures, "MQTT connection error, retrying");
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Availabilities, Location, Stands};

    fn event() -> StationEvent {
        StationEvent {
            number: 42,
            contract_name: "lyon".into(),
            name: "Terreaux".into(),
            address: "place des Terreaux".into(),
            location: Location { lat: 45.767, lon: 4.833 },
            banking: true,
            bonus: false,
            status: "OPEN".into(),
            last_update: None,
            connected: true,
            overflow: false,
            stands: Stands {
                capacity: 12,
                availabilities: Availabilities { bikes: 4, stands: 8, mechanical_bikes: 4, electrical_bikes: 0 },
            },
        }
    }

    #[tokio::test]
    async fn test_publish_before_connect_is_fatal() {
        let mut sink = MqttSink::new(MqttConfig::default());
        let err = sink.publish(event()).await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_close_without_connect_is_noop() {
        let mut sink = MqttSink::new(MqttConfig::default());
        assert!(sink.close().await.is_ok());
        assert!(sink.close().await.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_broker_becomes_fatal() {
        let mut sink = MqttSink::new(MqttConfig {
            host: "127.0.0.1".into(),
            port: 1,
            max_reconnect_attempts: 1,
            reconnect_delay: Duration::from_millis(10),
            ..MqttConfig::default()
        });
        sink.connect().await.unwrap();

        let mut fatal = None;
        for _ in 0..250 {
            match sink.publish(event()).await {
                Err(e) if e.is_fatal() => {
                    fatal = Some(e);
                    break;
                }
                _ => tokio::time::sleep(Duration::from_millis(20)).await,
            }
        }
        assert!(matches!(fatal, Some(PublishError::ConnectionLost(_))));
        let _ = sink.close().await;
    }

    #[test]
    fn test_health_counts_consecutive_failures() {
        let health = ConnectionHealth::default();
        assert_eq!(health.record_failure(), 1);
        assert_eq!(health.record_failure(), 2);
        health.mark_connected();
        assert_eq!(health.record_failure(), 1);
        assert!(!health.is_lost());
        health.mark_lost();
        assert!(health.is_lost());
    }
}
