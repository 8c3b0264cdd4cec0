//! Station and country payloads
//!
//! Upstream records are passed through untouched, so they are modelled as raw
//! JSON values. These helpers read the few fields the hub relies on.

use serde_json::Value;

/// Field that uniquely identifies an upstream station
pub const STATION_KEY: &str = "stationuuid";

/// Field carrying the number of stations in an upstream country entry
pub const STATION_COUNT_KEY: &str = "stationcount";

/// Upstream-assigned station key, if the record has a string one
pub fn station_key(station: &Value) -> Option<&str> {
    station.get(STATION_KEY).and_then(Value::as_str)
}

/// Station count of a country entry. Any JSON number is taken as is; missing or
/// non-numeric counts read as 0.
pub fn station_count(country: &Value) -> f64 {
    country
        .get(STATION_COUNT_KEY)
        .and_then(Value::as_f64)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_station_key() {
        assert_eq!(station_key(&json!({"stationuuid": "u1", "name": "Test FM"})), Some("u1"));
        assert_eq!(station_key(&json!({"name": "No Key"})), None);
        assert_eq!(station_key(&json!({"stationuuid": 42})), None);
    }

    #[test]
    fn test_station_count() {
        assert_eq!(station_count(&json!({"name": "Germany", "stationcount": 7})), 7.0);
        assert_eq!(station_count(&json!({"name": "Nowhere"})), 0.0);
        assert_eq!(station_count(&json!({"stationcount": "12"})), 0.0);
        assert_eq!(station_count(&json!({"stationcount": 2.5})), 2.5);
        assert_eq!(station_count(&json!({"stationcount": -3})), -3.0);
    }
}
