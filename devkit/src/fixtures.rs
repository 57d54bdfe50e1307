/*!
Fixtures conformes au schéma JCDecaux `vls/v3/stations`

Construit des stations JSON telles que l'API les renvoie, pour alimenter `ScriptedSource`
ou un faux serveur HTTP.
*/

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

/// Construction d'une station au format upstream
#[derive(Debug, Clone)]
pub struct StationJson {
    number: u32,
    contract_name: String,
    name: String,
    address: String,
    latitude: f64,
    longitude: f64,
    banking: bool,
    bonus: bool,
    status: String,
    last_update: Option<DateTime<Utc>>,
    connected: bool,
    overflow: bool,
    capacity: u32,
    availabilities: [u32; 4],
}

impl StationJson {
    /// Station ouverte à Lyon avec des valeurs par défaut cohérentes
    pub fn new(number: u32) -> Self {
        Self {
            number,
            contract_name: "lyon".to_string(),
            name: format!("Station {number}"),
            address: format!("{number} rue de la République"),
            latitude: 45.76,
            longitude: 4.83,
            banking: true,
            bonus: false,
            status: "OPEN".to_string(),
            last_update: None,
            connected: true,
            overflow: false,
            capacity: 20,
            availabilities: [10, 10, 6, 4],
        }
    }

    /// La station du scénario de référence (Part-Dieu)
    pub fn part_dieu() -> Self {
        Self::new(12)
            .name("Part-Dieu")
            .address("1 rue X")
            .position(45.75, 4.85)
            .capacity(20)
            .availabilities(5, 15, 3, 2)
    }

    pub fn contract(mut self, contract: &str) -> Self {
        self.contract_name = contract.to_string();
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn address(mut self, address: &str) -> Self {
        self.address = address.to_string();
        self
    }

    pub fn position(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = latitude;
        self.longitude = longitude;
        self
    }

    pub fn status(mut self, status: &str) -> Self {
        self.status = status.to_string();
        self
    }

    pub fn closed(self) -> Self {
        Self { connected: false, ..self.status("CLOSED") }
    }

    pub fn last_update(mut self, at: DateTime<Utc>) -> Self {
        self.last_update = Some(at);
        self
    }

    pub fn capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn availabilities(mut self, bikes: u32, stands: u32, mechanical: u32, electrical: u32) -> Self {
        self.availabilities = [bikes, stands, mechanical, electrical];
        self
    }

    pub fn build(&self) -> Value {
        let [bikes, stands, mechanical, electrical] = self.availabilities;
        let mut station = json!({
            "number": self.number,
            "contractName": self.contract_name,
            "name": self.name,
            "address": self.address,
            "position": {"latitude": self.latitude, "longitude": self.longitude},
            "banking": self.banking,
            "bonus": self.bonus,
            "status": self.status,
            "connected": self.connected,
            "overflow": self.overflow,
            "shape": null,
            "totalStands": {
                "availabilities": {
                    "bikes": bikes,
                    "stands": stands,
                    "mechanicalBikes": mechanical,
                    "electricalBikes": electrical,
                    "electricalInternalBatteryBikes": 0,
                    "electricalRemovableBatteryBikes": electrical
                },
                "capacity": self.capacity
            }
        });
        if let Some(at) = self.last_update {
            station["lastUpdate"] = json!(at.to_rfc3339());
        }
        station
    }
}

/// Corps de réponse HTTP pour une liste de stations
pub fn stations_payload(stations: &[StationJson]) -> Vec<u8> {
    let list: Vec<Value> = stations.iter().map(StationJson::build).collect();
    serde_json::to_vec(&list).unwrap_or_else(|_| b"[]".to_vec())
}

/// Réponse "aucune station" de l'API
pub fn empty_payload() -> Vec<u8> {
    b"[]".to_vec()
}
