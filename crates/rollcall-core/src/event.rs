// Event domain types
//
// Events are owned by the external CRUD subsystem. The certificate pipeline
// only reads them; the status sweep is the single place that writes status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Event lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub enum EventStatus {
    Scheduled,
    Ongoing,
    Accomplished,
}

impl EventStatus {
    /// Status an event should move to at `now`, or `None` to leave it as is.
    ///
    /// Events that have not started yet are never touched, so a manually
    /// rescheduled event keeps whatever status the admin gave it.
    pub fn derive(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Option<EventStatus> {
        if start <= now && end > now {
            Some(EventStatus::Ongoing)
        } else if start < now && end <= now {
            Some(EventStatus::Accomplished)
        } else {
            None
        }
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventStatus::Scheduled => write!(f, "Scheduled"),
            EventStatus::Ongoing => write!(f, "Ongoing"),
            EventStatus::Accomplished => write!(f, "Accomplished"),
        }
    }
}

impl From<&str> for EventStatus {
    fn from(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "ongoing" => EventStatus::Ongoing,
            "accomplished" => EventStatus::Accomplished,
            _ => EventStatus::Scheduled,
        }
    }
}

/// An institutional event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Event {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_date_time: DateTime<Utc>,
    pub end_date_time: DateTime<Utc>,
    pub status: EventStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_picture: Option<String>,
    #[serde(default)]
    pub documents: Vec<String>,
}

impl Event {
    /// Duration in hours, derived from the start/end timestamps
    pub fn duration_hours(&self) -> f64 {
        let millis = (self.end_date_time - self.start_date_time).num_milliseconds();
        millis as f64 / (1000.0 * 60.0 * 60.0)
    }

    pub fn is_accomplished(&self) -> bool {
        self.status == EventStatus::Accomplished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_derive_status_windows() {
        assert_eq!(EventStatus::derive(at(10), at(12), at(9)), None);
        assert_eq!(
            EventStatus::derive(at(10), at(12), at(10)),
            Some(EventStatus::Ongoing)
        );
        assert_eq!(
            EventStatus::derive(at(10), at(12), at(11)),
            Some(EventStatus::Ongoing)
        );
        assert_eq!(
            EventStatus::derive(at(10), at(12), at(12)),
            Some(EventStatus::Accomplished)
        );
        assert_eq!(
            EventStatus::derive(at(10), at(12), at(20)),
            Some(EventStatus::Accomplished)
        );
    }

    #[test]
    fn test_status_round_trip_names() {
        assert_eq!(EventStatus::from("Accomplished"), EventStatus::Accomplished);
        assert_eq!(EventStatus::from("ongoing"), EventStatus::Ongoing);
        assert_eq!(EventStatus::from("anything"), EventStatus::Scheduled);
        assert_eq!(EventStatus::Accomplished.to_string(), "Accomplished");
        assert_eq!(
            serde_json::to_string(&EventStatus::Ongoing).unwrap(),
            "\"Ongoing\""
        );
    }

    #[test]
    fn test_duration_hours() {
        let event = Event {
            id: "E1".into(),
            title: "Tech Talk".into(),
            description: String::new(),
            start_date_time: at(10),
            end_date_time: Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 0).unwrap(),
            status: EventStatus::Scheduled,
            template_picture: None,
            documents: vec![],
        };
        assert!((event.duration_hours() - 2.5).abs() < f64::EPSILON);
    }
}
