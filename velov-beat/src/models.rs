//! Station data shapes
//!
//! `StationRecord` mirrors one element of the JCDecaux `vls/v3/stations` response; the serde
//! attributes below are the schema mapping. `StationEvent` is the document handed to sinks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One station as returned by the upstream API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationRecord {
    pub number: u32,
    pub contract_name: String,
    pub name: String,
    pub address: String,
    pub position: Position,
    pub banking: bool,
    pub bonus: bool,
    pub status: String,
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
    pub connected: bool,
    pub overflow: bool,
    pub total_stands: Stands,
}

/// Geographic position, upstream spelling `latitude`/`longitude`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Position {
    #[serde(alias = "lat")]
    pub latitude: f64,
    #[serde(alias = "lon")]
    pub longitude: f64,
}

/// Stand block (`totalStands` upstream, `stands` in events).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stands {
    pub capacity: u32,
    pub availabilities: Availabilities,
}

/// Availability counters. Not checked against capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Availabilities {
    pub bikes: u32,
    pub stands: u32,
    pub mechanical_bikes: u32,
    pub electrical_bikes: u32,
}

/// Flattened station document published once per record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationEvent {
    pub number: u32,
    pub contract_name: String,
    pub name: String,
    pub address: String,
    pub location: Location,
    pub banking: bool,
    pub bonus: bool,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<Utc>>,
    pub connected: bool,
    pub overflow: bool,
    pub stands: Stands,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

/// Wire envelope written by sinks: `{"@timestamp": ..., "station": {...}}`.
#[derive(Debug, Serialize)]
pub struct EventEnvelope<'a> {
    #[serde(rename = "@timestamp")]
    pub timestamp: DateTime<Utc>,
    pub station: &'a StationEvent,
}

impl<'a> EventEnvelope<'a> {
    /// Wraps an event with the current publish time.
    pub fn now(station: &'a StationEvent) -> Self {
        Self { timestamp: Utc::now(), station }
    }
}
