// Attendance domain type
//
// One record per (user, event), written by the check-in flow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Proof that a user checked in to an event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Attendance {
    pub id: String,
    pub event_id: String,
    pub user_id: String,
    pub time_in: DateTime<Utc>,
}
