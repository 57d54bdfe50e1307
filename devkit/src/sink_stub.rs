/*!
Mock sink pour développement sans broker

Remplace `MqttSink` dans les tests: enregistre chaque `StationEvent` publié, compte les
connexions/fermetures et permet d'injecter des échecs (rejet d'une station, perte de
connexion, connexion lente ou impossible).
*/

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use velov_beat::{EventSink, PublishError, StationEvent};

#[derive(Debug, Default)]
struct Faults {
    rejected_stations: HashSet<u32>,
    lose_connection_after: Option<usize>,
    refuse_connect: bool,
    connect_delay: Option<Duration>,
}

/// Mock sink clonable: les clones partagent le même enregistrement
#[derive(Clone, Default)]
pub struct MockSink {
    published: Arc<Mutex<Vec<StationEvent>>>,
    connects: Arc<Mutex<usize>>,
    closes: Arc<Mutex<usize>>,
    faults: Arc<Mutex<Faults>>,
}

impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Les publications de cette station échouent (erreur non fatale)
    pub fn reject_station(&self, number: u32) -> &Self {
        self.faults.lock().unwrap().rejected_stations.insert(number);
        self
    }

    /// Après `count` publications réussies, la connexion est perdue (erreur fatale)
    pub fn lose_connection_after(&self, count: usize) -> &Self {
        self.faults.lock().unwrap().lose_connection_after = Some(count);
        self
    }

    /// `connect` échoue
    pub fn refuse_connect(&self) -> &Self {
        self.faults.lock().unwrap().refuse_connect = true;
        self
    }

    /// `connect` prend `delay` avant de réussir
    pub fn delay_connect(&self, delay: Duration) -> &Self {
        self.faults.lock().unwrap().connect_delay = Some(delay);
        self
    }

    /// Récupère tous les événements publiés (pour assertions de tests)
    pub fn published(&self) -> Vec<StationEvent> {
        self.published.lock().unwrap().clone()
    }

    /// Numéros de station dans l'ordre de publication
    pub fn published_numbers(&self) -> Vec<u32> {
        self.published.lock().unwrap().iter().map(|e| e.number).collect()
    }

    /// Événements publiés sérialisés en JSON
    pub fn published_json(&self) -> Vec<Value> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .map(|e| serde_json::to_value(e).unwrap_or(Value::Null))
            .collect()
    }

    pub fn published_count(&self) -> usize {
        self.published.lock().unwrap().len()
    }

    pub fn connect_count(&self) -> usize {
        *self.connects.lock().unwrap()
    }

    pub fn close_count(&self) -> usize {
        *self.closes.lock().unwrap()
    }

    /// Reset des événements enregistrés et des compteurs
    pub fn clear(&self) {
        self.published.lock().unwrap().clear();
        *self.connects.lock().unwrap() = 0;
        *self.closes.lock().unwrap() = 0;
    }
}

#[async_trait]
impl EventSink for MockSink {
    async fn connect(&mut self) -> Result<(), PublishError> {
        let (refuse, delay) = {
            let faults = self.faults.lock().unwrap();
            (faults.refuse_connect, faults.connect_delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if refuse {
            log::info!("🚫 [MOCK] Connection refused");
            return Err(PublishError::ConnectionLost("mock sink refused connection".into()));
        }

        *self.connects.lock().unwrap() += 1;
        log::info!("🔌 [MOCK] Connected");
        Ok(())
    }

    async fn publish(&mut self, event: StationEvent) -> Result<(), PublishError> {
        let faults = self.faults.lock().unwrap();
        let mut published = self.published.lock().unwrap();

        if faults.lose_connection_after.is_some_and(|limit| published.len() >= limit) {
            return Err(PublishError::ConnectionLost("mock connection dropped".into()));
        }
        if faults.rejected_stations.contains(&event.number) {
            return Err(PublishError::Rejected(format!("station {} rejected by mock", event.number)));
        }

        log::info!("📤 [MOCK] Published station {}", event.number);
        published.push(event);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), PublishError> {
        *self.closes.lock().unwrap() += 1;
        log::info!("🔒 [MOCK] Closed");
        Ok(())
    }
}
