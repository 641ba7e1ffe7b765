use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Sentinel name used when extraction fails
pub const UNKNOWN_EVENT_NAME: &str = "Unknown Event";

/// Format of extracted local date/times (24-hour, no timezone)
pub const LOCAL_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Duration applied when the model gives none, or an unusable one
pub const DEFAULT_DURATION_MINUTES: i64 = 60;

/// One concrete date/time/duration instance within an event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Occurrence {
    /// Naive local date-time string ("YYYY-MM-DD HH:mm") in the source timezone
    #[serde(rename = "date_time")]
    pub start_local: String,
    /// Length of the occurrence in minutes
    #[serde(
        default = "default_duration",
        deserialize_with = "lenient_duration_minutes"
    )]
    pub duration_minutes: i64,
}

impl Occurrence {
    /// Parse the local start time against the expected format
    pub fn parse_start(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(self.start_local.trim(), LOCAL_TIME_FORMAT).ok()
    }

    /// Canonical form of the start time used as the dedup key component
    pub fn dedup_start(&self) -> String {
        normalize_start(&self.start_local)
    }
}

/// Canonical form of a local start string used in dedup keys.
/// Unparsable starts fall back to the trimmed raw string.
pub fn normalize_start(raw: &str) -> String {
    match NaiveDateTime::parse_from_str(raw.trim(), LOCAL_TIME_FORMAT) {
        Ok(start) => start.format(LOCAL_TIME_FORMAT).to_string(),
        Err(_) => raw.trim().to_string(),
    }
}

/// Structured representation extracted from one email's free text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    /// Event name, or the sentinel when extraction failed
    #[serde(rename = "event_name", default = "default_event_name")]
    pub name: String,
    /// Raw extracted participant tokens; only address-shaped tokens are invited
    #[serde(default)]
    pub participants: Vec<String>,
    /// Venue, if one was mentioned
    #[serde(default)]
    pub location: Option<String>,
    /// Extracted occurrences; may be empty
    #[serde(default)]
    pub occurrences: Vec<Occurrence>,
    /// Free-text recurrence hint; recorded, not expanded
    #[serde(default)]
    pub repeat_frequency: Option<String>,
    /// Last date of a repeating event, if mentioned
    #[serde(default, deserialize_with = "lenient_date")]
    pub end_date: Option<NaiveDate>,
    /// Set on fallback records produced when extraction fails
    #[serde(default, skip_serializing_if = "is_false")]
    pub extraction_failed: bool,
    /// The unparsed model output, kept for diagnostics on fallback records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

impl EventRecord {
    /// Build the fallback record returned when extraction or parsing fails
    pub fn fallback(raw_response: Option<String>) -> Self {
        Self {
            name: UNKNOWN_EVENT_NAME.to_string(),
            participants: Vec::new(),
            location: None,
            occurrences: Vec::new(),
            repeat_frequency: None,
            end_date: None,
            extraction_failed: true,
            raw_response,
        }
    }

    /// Dedup key component for the first occurrence, if the record has any
    pub fn first_dedup_start(&self) -> Option<String> {
        self.occurrences.first().map(Occurrence::dedup_start)
    }
}

/// A persisted event row
#[derive(Debug, Clone)]
pub struct StoredEvent {
    /// Unique identifier, assigned exactly once at insert
    pub id: String,
    /// Address of the mailbox the batch ran against
    pub mailbox_address: String,
    /// Event name copied from the record
    pub name: String,
    /// Insertion time
    pub created_at: DateTime<Utc>,
    /// Full record serialized as JSON
    pub payload: String,
}

fn default_event_name() -> String {
    UNKNOWN_EVENT_NAME.to_string()
}

fn default_duration() -> i64 {
    DEFAULT_DURATION_MINUTES
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Accept a number or a numeric string; anything else (or a non-positive
/// value) falls back to the default duration instead of failing the record.
fn lenient_duration_minutes<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let minutes = match &value {
        serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    Ok(match minutes {
        Some(m) if m > 0 => m,
        _ => DEFAULT_DURATION_MINUTES,
    })
}

/// Accept a "YYYY-MM-DD" string; anything unparsable becomes None
fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_start() {
        let occurrence = Occurrence {
            start_local: "2025-01-25 14:30".to_string(),
            duration_minutes: 60,
        };
        let start = occurrence.parse_start().unwrap();
        assert_eq!(start.format("%Y-%m-%d %H:%M").to_string(), "2025-01-25 14:30");

        let bad = Occurrence {
            start_local: "not-a-date".to_string(),
            duration_minutes: 30,
        };
        assert!(bad.parse_start().is_none());
    }

    #[test]
    fn test_dedup_start_normalization() {
        // Unpadded components normalize to the canonical form
        let occurrence = Occurrence {
            start_local: " 2025-1-5 9:05 ".to_string(),
            duration_minutes: 60,
        };
        assert_eq!(occurrence.dedup_start(), "2025-01-05 09:05");

        // Unparsable starts compare as trimmed raw strings
        let bad = Occurrence {
            start_local: "  next tuesday  ".to_string(),
            duration_minutes: 60,
        };
        assert_eq!(bad.dedup_start(), "next tuesday");
    }

    #[test]
    fn test_duration_defaults() {
        let record: EventRecord = serde_json::from_str(
            r#"{
                "event_name": "Sync",
                "occurrences": [
                    {"date_time": "2025-01-25 14:30"},
                    {"date_time": "2025-01-26 14:30", "duration_minutes": "45"},
                    {"date_time": "2025-01-27 14:30", "duration_minutes": "soon"},
                    {"date_time": "2025-01-28 14:30", "duration_minutes": -15}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(record.occurrences[0].duration_minutes, 60);
        assert_eq!(record.occurrences[1].duration_minutes, 45);
        assert_eq!(record.occurrences[2].duration_minutes, 60);
        assert_eq!(record.occurrences[3].duration_minutes, 60);
    }

    #[test]
    fn test_lenient_end_date() {
        let record: EventRecord = serde_json::from_str(
            r#"{"event_name": "Sync", "end_date": "2025-03-31"}"#,
        )
        .unwrap();
        assert_eq!(
            record.end_date,
            Some(NaiveDate::from_ymd_opt(2025, 3, 31).unwrap())
        );

        let record: EventRecord = serde_json::from_str(
            r#"{"event_name": "Sync", "end_date": "end of march"}"#,
        )
        .unwrap();
        assert_eq!(record.end_date, None);
    }

    #[test]
    fn test_fallback_record() {
        let record = EventRecord::fallback(Some("garbage".to_string()));
        assert!(record.extraction_failed);
        assert_eq!(record.name, UNKNOWN_EVENT_NAME);
        assert_eq!(record.raw_response.as_deref(), Some("garbage"));
        assert!(record.occurrences.is_empty());
    }
}
