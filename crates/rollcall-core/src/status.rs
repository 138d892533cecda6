// Event status sweep
//
// Moves events into Ongoing / Accomplished based on their time window.
// Events that have not started are left alone.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

use crate::error::SourceError;
use crate::event::EventStatus;
use crate::traits::RecordStore;

/// One status transition applied by a sweep
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct StatusChange {
    pub event_id: String,
    pub from: EventStatus,
    pub to: EventStatus,
}

/// Apply derived statuses to every event whose status is out of date
///
/// Only listing the events can fail the sweep. A failed update is logged and
/// left out of the returned changes.
pub async fn sweep_event_statuses(
    store: &dyn RecordStore,
    now: DateTime<Utc>,
) -> Result<Vec<StatusChange>, SourceError> {
    let events = store.list_events().await?;
    let mut changes = Vec::new();

    for event in events {
        let Some(target) = EventStatus::derive(event.start_date_time, event.end_date_time, now)
        else {
            continue;
        };
        if target == event.status {
            continue;
        }

        if let Err(e) = store.set_event_status(&event.id, target).await {
            warn!(event_id = %event.id, to = %target, error = %e, "Event status not updated");
            continue;
        }
        debug!(event_id = %event.id, from = %event.status, to = %target, "Event status updated");
        changes.push(StatusChange {
            event_id: event.id,
            from: event.status,
            to: target,
        });
    }

    if !changes.is_empty() {
        info!(updated = changes.len(), "Event status sweep applied");
    }
    Ok(changes)
}
