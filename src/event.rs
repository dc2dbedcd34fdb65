//! Analytics event types and their wire representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Open string-keyed metadata attached to an event.
pub type EventMetadata = serde_json::Map<String, serde_json::Value>;

/// A single recorded analytics occurrence.
///
/// Events are immutable once handed to the tracker. The wire shape is a JSON
/// object with all six fields present; `timestamp` is ISO-8601 with
/// millisecond precision and a `Z` suffix (`2024-01-01T00:00:00.000Z`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedEvent {
    pub category: String,
    pub action: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub metadata: EventMetadata,
    #[serde(with = "iso8601_millis")]
    pub timestamp: DateTime<Utc>,
}

impl TrackedEvent {
    /// Create an event with the current time as its timestamp.
    ///
    /// Label, value, and metadata start empty; use the `with_*` setters to
    /// fill them before handing the event to the tracker.
    #[must_use]
    pub fn new(category: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            action: action.into(),
            label: String::new(),
            value: String::new(),
            metadata: EventMetadata::new(),
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    /// Replace the whole metadata map.
    #[must_use]
    pub fn with_metadata(mut self, metadata: EventMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Insert a single metadata entry.
    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Serde adapter pinning timestamps to the wire contract: millisecond
/// precision, `Z` suffix. Chrono's default RFC 3339 output varies its
/// fractional digits, so the format is fixed here.
mod iso8601_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&timestamp.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn new_event_has_empty_optional_fields() {
        let event = TrackedEvent::new("ui", "click");
        assert_eq!(event.category, "ui");
        assert_eq!(event.action, "click");
        assert_eq!(event.label, "");
        assert_eq!(event.value, "");
        assert!(event.metadata.is_empty());
    }

    #[test]
    fn wire_shape_matches_contract() {
        let mut event = TrackedEvent::new("ui", "click")
            .with_label("button")
            .with_value("42")
            .with_meta("page", json!("/home"));
        event.timestamp = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "category": "ui",
                "action": "click",
                "label": "button",
                "value": "42",
                "metadata": {"page": "/home"},
                "timestamp": "2024-01-01T00:00:00.000Z"
            })
        );
    }

    #[test]
    fn timestamp_keeps_millisecond_precision() {
        let mut event = TrackedEvent::new("ui", "click");
        event.timestamp = Utc.timestamp_millis_opt(1_704_067_200_123).unwrap();

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["timestamp"], "2024-01-01T00:00:00.123Z");
    }

    #[test]
    fn missing_optional_fields_default_on_deserialize() {
        let event: TrackedEvent = serde_json::from_value(json!({
            "category": "ui",
            "action": "click",
            "timestamp": "2024-01-01T00:00:00.000Z"
        }))
        .unwrap();

        assert_eq!(event.label, "");
        assert_eq!(event.value, "");
        assert!(event.metadata.is_empty());
        assert_eq!(event.timestamp, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    }
}
