/*!
Test Harness pour le collecteur velov-beat

Facilite l'écriture de tests avec:
- Source scriptée (réponses API rejouées dans l'ordre)
- Mock sink partagé pour les assertions
- Attente bornée sur les publications
*/

use crate::fixtures::empty_payload;
use crate::sink_stub::MockSink;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use velov_beat::{Collector, FetchError, StationSource};

type Response = Result<Vec<u8>, FetchError>;

/// Source qui rejoue une file de réponses; une fois vide elle renvoie `[]`
#[derive(Clone, Default)]
pub struct ScriptedSource {
    responses: Arc<Mutex<VecDeque<Response>>>,
    fetches: Arc<Mutex<usize>>,
    delay: Arc<Mutex<Option<Duration>>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ajoute une réponse 200 avec ce corps
    pub fn push_body(&self, body: impl Into<Vec<u8>>) -> &Self {
        self.responses.lock().unwrap().push_back(Ok(body.into()));
        self
    }

    /// Ajoute une réponse HTTP en erreur
    pub fn push_status(&self, status: u16) -> &Self {
        self.responses.lock().unwrap().push_back(Err(FetchError::Status {
            url: "http://mock.invalid/vls/v3/stations".to_string(),
            status,
        }));
        self
    }

    /// Chaque fetch attend `delay` avant de répondre (tick long)
    pub fn delay_fetch(&self, delay: Duration) -> &Self {
        *self.delay.lock().unwrap() = Some(delay);
        self
    }

    pub fn fetch_count(&self) -> usize {
        *self.fetches.lock().unwrap()
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().unwrap().len()
    }
}

#[async_trait]
impl StationSource for ScriptedSource {
    async fn fetch(&self) -> Result<Vec<u8>, FetchError> {
        *self.fetches.lock().unwrap() += 1;
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.responses.lock().unwrap().pop_front();
        log::info!("📥 [MOCK] Fetch #{}", self.fetch_count());
        next.unwrap_or_else(|| Ok(empty_payload()))
    }
}

/// Harness de test: une source scriptée et un mock sink partagés avec le collecteur
pub struct TestHarness {
    pub source: ScriptedSource,
    pub sink: MockSink,
}

impl TestHarness {
    /// Crée un nouveau harness de test
    pub fn new() -> Self {
        env_logger::builder().is_test(true).try_init().ok(); // Init logging pour tests

        Self {
            source: ScriptedSource::new(),
            sink: MockSink::new(),
        }
    }

    /// Collecteur branché sur la source et le sink du harness
    pub fn collector(&self, period: Duration) -> Collector {
        Collector::new(period, Box::new(self.source.clone()), Box::new(self.sink.clone()))
            .unwrap_or_else(|e| panic!("invalid test period {period:?}: {e}"))
    }

    /// Attend qu'au moins `count` événements soient publiés
    pub async fn wait_for_published(&self, count: usize, timeout: Duration) -> bool {
        let start = tokio::time::Instant::now();

        while start.elapsed() < timeout {
            if self.sink.published_count() >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        log::warn!("⏰ Timeout waiting for {} published events", count);
        self.sink.published_count() >= count
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{stations_payload, StationJson};

    #[tokio::test]
    async fn test_scripted_source_replays_in_order() {
        let source = ScriptedSource::new();
        source.push_body(b"[1]".to_vec()).push_status(503);

        assert_eq!(source.fetch().await.unwrap(), b"[1]".to_vec());
        assert_eq!(source.fetch().await.unwrap_err().status(), Some(503));
        assert_eq!(source.fetch().await.unwrap(), b"[]".to_vec());
        assert_eq!(source.fetch_count(), 3);
        assert_eq!(source.remaining(), 0);
    }

    #[tokio::test]
    async fn test_harness_single_tick() {
        let harness = TestHarness::new();
        harness.source.push_body(stations_payload(&[StationJson::new(4), StationJson::new(9)]));

        let mut collector = harness.collector(Duration::from_secs(60));
        collector.collect_once().await.unwrap();

        assert!(harness.wait_for_published(2, Duration::from_millis(100)).await);
        assert_eq!(harness.sink.published_numbers(), vec![4, 9]);
    }
}
