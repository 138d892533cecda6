// Certificate domain types
//
// The only entity this crate creates. Records are append-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::Event;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// An issued certificate: artifact URL plus issuance metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Certificate {
    pub id: Uuid,
    pub user_id: String,
    pub event_id: String,
    /// Publicly fetchable URL of the rendered PDF
    pub cert: String,
    pub date_received: DateTime<Utc>,
}

/// Certificate joined with the event it was issued for
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct CertificateWithEvent {
    #[serde(flatten)]
    pub certificate: Certificate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<Event>,
}
