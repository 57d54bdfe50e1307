//! Record → event projection
//!
//! Pure field renaming and nesting: no unit conversion, filtering or deduplication.

use crate::models::{Location, StationEvent, StationRecord};

impl From<StationRecord> for StationEvent {
    fn from(record: StationRecord) -> Self {
        Self {
            number: record.number,
            contract_name: record.contract_name,
            name: record.name,
            address: record.address,
            location: Location {
                lat: record.position.latitude,
                lon: record.position.longitude,
            },
            banking: record.banking,
            bonus: record.bonus,
            status: record.status,
            last_update: record.last_update,
            connected: record.connected,
            overflow: record.overflow,
            stands: record.total_stands,
        }
    }
}

pub fn transform(record: StationRecord) -> StationEvent {
    StationEvent::from(record)
}

/// One event per record, same order.
pub fn transform_all(records: Vec<StationRecord>) -> Vec<StationEvent> {
    records.into_iter().map(transform).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Availabilities, Position, Stands};
    use serde_json::json;

    fn part_dieu() -> StationRecord {
        StationRecord {
            number: 12,
            contract_name: "lyon".into(),
            name: "Part-Dieu".into(),
            address: "1 rue X".into(),
            position: Position { latitude: 45.75, longitude: 4.85 },
            banking: true,
            bonus: false,
            status: "OPEN".into(),
            last_update: None,
            connected: true,
            overflow: false,
            total_stands: Stands {
                capacity: 20,
                availabilities: Availabilities {
                    bikes: 5,
                    stands: 15,
                    mechanical_bikes: 3,
                    electrical_bikes: 2,
                },
            },
        }
    }

    #[test]
    fn test_part_dieu_projection() {
        let event = transform(part_dieu());

        let expected = json!({
            "number": 12,
            "contractName": "lyon",
            "name": "Part-Dieu",
            "address": "1 rue X",
            "location": {"lat": 45.75, "lon": 4.85},
            "banking": true,
            "bonus": false,
            "status": "OPEN",
            "connected": true,
            "overflow": false,
            "stands": {
                "capacity": 20,
                "availabilities": {"bikes": 5, "stands": 15, "mechanicalBikes": 3, "electricalBikes": 2}
            }
        });
        assert_eq!(serde_json::to_value(&event).unwrap(), expected);
    }

    #[test]
    fn test_transform_is_deterministic() {
        let first = serde_json::to_vec(&transform(part_dieu())).unwrap();
        let second = serde_json::to_vec(&transform(part_dieu())).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_last_update_is_carried_when_present() {
        let mut record = part_dieu();
        record.last_update = Some("2024-05-01T08:00:00Z".parse().unwrap());

        let value = serde_json::to_value(transform(record)).unwrap();
        assert_eq!(value["lastUpdate"], "2024-05-01T08:00:00Z");
    }

    #[test]
    fn test_transform_all_preserves_length_and_order() {
        let records: Vec<_> = [3, 1, 2, 1]
            .into_iter()
            .map(|number| StationRecord { number, ..part_dieu() })
            .collect();

        let numbers: Vec<_> = transform_all(records).into_iter().map(|e| e.number).collect();
        assert_eq!(numbers, vec![3, 1, 2, 1]);
    }

    #[test]
    fn test_inconsistent_counts_are_not_corrected() {
        let mut record = part_dieu();
        record.total_stands.availabilities.bikes = 99;

        let event = transform(record);
        assert_eq!(event.stands.availabilities.bikes, 99);
        assert_eq!(event.stands.capacity, 20);
    }
}
