use crate::error::DecodeError;
use crate::models::StationRecord;

/// Bodies up to this length are the API's way of saying "no stations" (`[]`).
pub const EMPTY_PAYLOAD_MAX_LEN: usize = 2;

/// Parses a station-list response body.
///
/// An empty-array body short-circuits to an empty list. Anything that does not match the
/// schema fails as a whole; partially valid batches are never returned.
pub fn decode(body: &[u8]) -> Result<Vec<StationRecord>, DecodeError> {
    if body.len() <= EMPTY_PAYLOAD_MAX_LEN {
        return Ok(Vec::new());
    }

    serde_json::from_slice(body).map_err(|source| DecodeError { len: body.len(), source })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_STATIONS: &str = r#"[
        {"number": 12, "contractName": "lyon", "name": "Part-Dieu", "address": "1 rue X",
         "position": {"latitude": 45.75, "longitude": 4.85}, "banking": true, "bonus": false,
         "status": "OPEN", "connected": true, "overflow": false,
         "totalStands": {"capacity": 20, "availabilities": {"bikes": 5, "stands": 15, "mechanicalBikes": 3, "electricalBikes": 2}}},
        {"number": 7, "contractName": "lyon", "name": "Bellecour", "address": "2 place Y",
         "position": {"latitude": 45.757, "longitude": 4.832}, "banking": false, "bonus": true,
         "status": "CLOSED", "lastUpdate": null, "connected": false, "overflow": true,
         "totalStands": {"capacity": 10, "availabilities": {"bikes": 0, "stands": 10, "mechanicalBikes": 0, "electricalBikes": 0}}}
    ]"#;

    #[test]
    fn test_empty_array_is_not_an_error() {
        assert!(decode(b"[]").unwrap().is_empty());
        assert!(decode(b"").unwrap().is_empty());
    }

    #[test]
    fn test_decodes_records_in_order() {
        let records = decode(TWO_STATIONS.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].number, 12);
        assert_eq!(records[1].number, 7);
        assert_eq!(records[1].status, "CLOSED");
        assert!(records[1].last_update.is_none());
    }

    #[test]
    fn test_truncated_payload_fails_whole_batch() {
        let truncated = &TWO_STATIONS.as_bytes()[..TWO_STATIONS.len() / 2];
        let err = decode(truncated).unwrap_err();
        assert_eq!(err.len, truncated.len());
    }

    #[test]
    fn test_missing_field_is_decode_error() {
        let body = br#"[{"number": 1, "contractName": "lyon"}]"#;
        assert!(decode(body).is_err());
    }

    #[test]
    fn test_negative_count_is_decode_error() {
        let body = TWO_STATIONS.replace("\"bikes\": 5", "\"bikes\": -5");
        assert!(decode(body.as_bytes()).is_err());
    }

    #[test]
    fn test_counts_above_capacity_pass_through() {
        let body = TWO_STATIONS.replace("\"bikes\": 5", "\"bikes\": 50");
        let records = decode(body.as_bytes()).unwrap();
        assert_eq!(records[0].total_stands.availabilities.bikes, 50);
        assert_eq!(records[0].total_stands.capacity, 20);
    }
}
