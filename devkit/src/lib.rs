/*!
# Velov DevKit - Stubs et Utilitaires pour Développement

Bibliothèque facilitant les tests du collecteur velov-beat avec:
- Sink factice qui enregistre les événements publiés (sans broker MQTT)
- Source scriptée qui rejoue des réponses de l'API JCDecaux
- Fixtures JSON conformes au schéma `vls/v3/stations`
- Harness pour piloter un `Collector` dans les tests
*/

pub mod fixtures;
pub mod sink_stub;
pub mod test_utils;

pub use fixtures::{stations_payload, StationJson};
pub use sink_stub::MockSink;
pub use test_utils::{ScriptedSource, TestHarness};
