use crate::error::BotResult;
use crate::model::{EventRecord, Occurrence};
use chrono::{Duration, TimeZone, Utc};
use chrono_tz::Tz;
use icalendar::{Calendar, Component, Event, EventLike, Property};
use tracing::{info, warn};
use uuid::Uuid;

/// Converts event records into mailable calendar documents.
///
/// Local start times are interpreted in the configured source timezone and
/// written to the artifact as UTC instants.
pub struct InviteBuilder {
    timezone: Tz,
    organizer: String,
}

impl InviteBuilder {
    /// Create a builder for the given source timezone and organizer address
    pub fn new(timezone: Tz, organizer: impl Into<String>) -> Self {
        Self {
            timezone,
            organizer: organizer.into(),
        }
    }

    /// Build a calendar document with one sub-event per valid occurrence.
    ///
    /// An occurrence whose start does not parse is skipped with a warning;
    /// a record with no valid occurrences still yields an (empty) artifact.
    pub fn build(&self, record: &EventRecord) -> BotResult<String> {
        info!("Creating calendar invite for event '{}'", record.name);

        let mut calendar = Calendar::new();
        calendar.append_property(Property::new(
            "PRODID",
            format!("-//Kutsubotti//{}//", self.organizer).as_str(),
        ));
        calendar.append_property(Property::new("METHOD", "REQUEST"));

        for occurrence in &record.occurrences {
            let Some(start) = occurrence.parse_start() else {
                warn!(
                    "Skipping occurrence with unparsable start '{}'",
                    occurrence.start_local
                );
                continue;
            };

            let start_utc = match self.timezone.from_local_datetime(&start) {
                chrono::LocalResult::Single(dt) => dt.with_timezone(&Utc),
                // DST fold: both instants are real, take the earlier one
                chrono::LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
                chrono::LocalResult::None => {
                    warn!(
                        "Skipping occurrence '{}': no such local time in {}",
                        occurrence.start_local, self.timezone
                    );
                    continue;
                }
            };
            let end_utc = start_utc + Duration::minutes(occurrence.duration_minutes);

            let mut event = Event::new();
            event
                .uid(&Uuid::new_v4().to_string())
                .summary(&record.name)
                .starts(start_utc)
                .ends(end_utc)
                .description(&self.compose_description(record, occurrence));

            if let Some(location) = &record.location {
                event.location(location);
            }

            // Only address-shaped participant tokens become attendees
            for participant in record.participants.iter().filter(|p| p.contains('@')) {
                event.append_property(Property::new(
                    "ATTENDEE",
                    format!("mailto:{}", participant).as_str(),
                ));
            }
            event.append_property(Property::new(
                "ORGANIZER",
                format!("mailto:{}", self.organizer).as_str(),
            ));

            calendar.push(event.done());
        }

        Ok(calendar.to_string())
    }

    fn compose_description(&self, record: &EventRecord, occurrence: &Occurrence) -> String {
        let mut lines = Vec::new();
        if let Some(location) = &record.location {
            lines.push(format!("Location: {}", location));
        }
        lines.push(format!("Duration: {} minutes", occurrence.duration_minutes));
        if let Some(repeat) = &record.repeat_frequency {
            lines.push(format!("Repeats: {}", repeat));
        }
        if let Some(end_date) = &record.end_date {
            lines.push(format!("Repeats until: {}", end_date.format("%Y-%m-%d")));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> InviteBuilder {
        InviteBuilder::new(chrono_tz::Europe::Helsinki, "bot@example.com")
    }

    fn record_json(json: serde_json::Value) -> EventRecord {
        serde_json::from_value(json).unwrap()
    }

    fn vevent_count(ics: &str) -> usize {
        ics.matches("BEGIN:VEVENT").count()
    }

    #[test]
    fn test_unparsable_occurrence_is_skipped() {
        let record = record_json(serde_json::json!({
            "event_name": "Team Sync",
            "occurrences": [
                {"date_time": "2025-01-25 14:30", "duration_minutes": 60},
                {"date_time": "not-a-date", "duration_minutes": 30}
            ],
        }));

        let ics = builder().build(&record).unwrap();
        assert_eq!(vevent_count(&ics), 1);
        assert!(ics.contains("DTSTART:20250125T123000Z"));
    }

    #[test]
    fn test_winter_time_conversion() {
        // Helsinki is UTC+2 in January
        let record = record_json(serde_json::json!({
            "event_name": "Team Sync",
            "occurrences": [{"date_time": "2025-01-25 14:30", "duration_minutes": 60}],
        }));

        let ics = builder().build(&record).unwrap();
        assert!(ics.contains("DTSTART:20250125T123000Z"));
        assert!(ics.contains("DTEND:20250125T133000Z"));
    }

    #[test]
    fn test_summer_time_conversion() {
        // Helsinki is UTC+3 when daylight saving is in effect
        let record = record_json(serde_json::json!({
            "event_name": "Team Sync",
            "occurrences": [{"date_time": "2025-06-25 14:30", "duration_minutes": 45}],
        }));

        let ics = builder().build(&record).unwrap();
        assert!(ics.contains("DTSTART:20250625T113000Z"));
        assert!(ics.contains("DTEND:20250625T121500Z"));
    }

    #[test]
    fn test_attendee_filtering() {
        let record = record_json(serde_json::json!({
            "event_name": "Team Sync",
            "participants": ["a@b.com", "not-an-email"],
            "occurrences": [{"date_time": "2025-01-25 14:30", "duration_minutes": 60}],
        }));

        let ics = builder().build(&record).unwrap();
        assert_eq!(ics.matches("ATTENDEE:mailto:").count(), 1);
        assert!(ics.contains("ATTENDEE:mailto:a@b.com"));
        assert!(ics.contains("ORGANIZER:mailto:bot@example.com"));
    }

    #[test]
    fn test_empty_occurrences_yield_empty_artifact() {
        let record = record_json(serde_json::json!({"event_name": "Team Sync"}));

        let ics = builder().build(&record).unwrap();
        assert_eq!(vevent_count(&ics), 0);
        assert!(ics.contains("BEGIN:VCALENDAR"));
        assert!(ics.contains("METHOD:REQUEST"));
    }

    #[test]
    fn test_multiple_occurrences_share_summary_and_location() {
        let record = record_json(serde_json::json!({
            "event_name": "Yoga",
            "location": "Studio 2",
            "occurrences": [
                {"date_time": "2025-02-03 18:00", "duration_minutes": 60},
                {"date_time": "2025-02-10 18:00", "duration_minutes": 60}
            ],
            "repeat_frequency": "weekly",
        }));

        let ics = builder().build(&record).unwrap();
        assert_eq!(vevent_count(&ics), 2);
        assert_eq!(ics.matches("SUMMARY:Yoga").count(), 2);
        assert_eq!(ics.matches("LOCATION:Studio 2").count(), 2);
    }
}
