//! Sensor reading domain type.
//!
//! A reading is a timestamped set of six named metrics captured from the
//! field device. Values are stored exactly as the device formatted them —
//! unit-less text — and a reading is never mutated after creation; the only
//! write paths are insert and bulk delete.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The six metric fields a reading carries, in digest order.
///
/// Each entry is `(json_key, digest_label)` — the key used on the wire and
/// the human-readable label interpolated into the prompt digest.
pub const METRIC_FIELDS: [(&str, &str); 6] = [
    ("temperature", "Temperature"),
    ("humidity", "Humidity"),
    ("waterLevel", "WaterLevel"),
    ("steam", "Steam"),
    ("light", "Light"),
    ("soilHumidity", "SoilHumidity"),
];

/// One persisted observation from the sensor device.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    /// Unique reading ID
    #[serde(rename = "_id")]
    pub id: String,

    pub temperature: String,
    pub humidity: String,
    pub water_level: String,
    pub steam: String,
    pub light: String,
    pub soil_humidity: String,

    /// When the reading was persisted
    pub created_at: DateTime<Utc>,
}

impl SensorReading {
    /// Create a reading from the six coerced metric values.
    pub fn new(
        temperature: impl Into<String>,
        humidity: impl Into<String>,
        water_level: impl Into<String>,
        steam: impl Into<String>,
        light: impl Into<String>,
        soil_humidity: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            temperature: temperature.into(),
            humidity: humidity.into(),
            water_level: water_level.into(),
            steam: steam.into(),
            light: light.into(),
            soil_humidity: soil_humidity.into(),
            created_at: Utc::now(),
        }
    }

    /// The metric values in digest order, paired with their labels.
    pub fn metrics(&self) -> [(&'static str, &str); 6] {
        [
            ("Temperature", self.temperature.as_str()),
            ("Humidity", self.humidity.as_str()),
            ("WaterLevel", self.water_level.as_str()),
            ("Steam", self.steam.as_str()),
            ("Light", self.light.as_str()),
            ("SoilHumidity", self.soil_humidity.as_str()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_gets_id_and_timestamp() {
        let r = SensorReading::new("25.5", "60", "high", "0", "340", "41");
        assert!(!r.id.is_empty());
        assert_eq!(r.temperature, "25.5");
        assert_eq!(r.soil_humidity, "41");
    }

    #[test]
    fn reading_serializes_with_wire_names() {
        let r = SensorReading::new("25.5", "60", "high", "0", "340", "41");
        let json = serde_json::to_value(&r).unwrap();
        assert!(json.get("_id").is_some());
        assert_eq!(json["waterLevel"], "high");
        assert_eq!(json["soilHumidity"], "41");
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn metrics_follow_digest_order() {
        let r = SensorReading::new("1", "2", "3", "4", "5", "6");
        let labels: Vec<&str> = r.metrics().iter().map(|(l, _)| *l).collect();
        let expected: Vec<&str> = METRIC_FIELDS.iter().map(|(_, l)| *l).collect();
        assert_eq!(labels, expected);
    }
}
