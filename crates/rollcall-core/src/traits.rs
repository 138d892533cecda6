// Core traits for pluggable backends
//
// These traits let the pipeline run against different backends:
// - In-memory implementations for examples and testing
// - Postgres implementations for production (rollcall-storage)
// - Filesystem / HTTP object storage for rendered artifacts

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::attendance::Attendance;
use crate::certificate::Certificate;
use crate::error::{BlobError, LedgerError, RenderError, SourceError};
use crate::evaluation::{Evaluation, Response};
use crate::event::{Event, EventStatus};
use crate::user::User;

// ============================================================================
// RecordStore - The collaborator data store owned by the CRUD subsystem
// ============================================================================

/// Read access to events, attendance, evaluations, responses and users
///
/// `set_event_status` is the only write, used by the status sweep.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// `events/{event_id}`
    async fn get_event(&self, event_id: &str) -> Result<Option<Event>, SourceError>;

    /// All events, used by the status sweep
    async fn list_events(&self) -> Result<Vec<Event>, SourceError>;

    /// `attendance` filtered by event
    async fn list_attendance(&self, event_id: &str) -> Result<Vec<Attendance>, SourceError>;

    /// `evaluation/{event_id}`
    async fn get_evaluation(&self, event_id: &str) -> Result<Option<Evaluation>, SourceError>;

    /// `responses` filtered by evaluation
    async fn list_responses(&self, evaluation_id: &str) -> Result<Vec<Response>, SourceError>;

    /// `users/{user_id}`
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, SourceError>;

    async fn set_event_status(&self, event_id: &str, status: EventStatus)
        -> Result<(), SourceError>;
}

// ============================================================================
// CertificateLedger - Append-only certificate records
// ============================================================================

#[async_trait]
pub trait CertificateLedger: Send + Sync {
    /// Write a new record under `certificate.id`
    async fn insert_certificate(&self, certificate: &Certificate) -> Result<(), LedgerError>;

    async fn list_for_event(&self, event_id: &str) -> Result<Vec<Certificate>, LedgerError>;

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Certificate>, LedgerError>;

    async fn get_certificate(&self, id: Uuid) -> Result<Option<Certificate>, LedgerError>;
}

// ============================================================================
// BlobStore - Durable artifact storage
// ============================================================================

/// Path-addressed blob storage with URL retrieval
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload bytes under `key`, replacing nothing (keys are unique per call)
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), BlobError>;

    /// Publicly dereferenceable URL of a stored key
    async fn url(&self, key: &str) -> Result<String, BlobError>;
}

// ============================================================================
// CertificateRenderer - Template overlay
// ============================================================================

/// Text drawn onto one certificate
#[derive(Debug, Clone, PartialEq)]
pub struct CertificateText {
    pub recipient_name: String,
    pub event_title: String,
    pub event_start: DateTime<Utc>,
    pub distributed_at: DateTime<Utc>,
}

/// Produces PDF bytes for one recipient
///
/// Synchronous on purpose: rendering is CPU work and the distributor runs it
/// on the blocking pool.
pub trait CertificateRenderer: Send + Sync {
    fn render(&self, text: &CertificateText) -> Result<Vec<u8>, RenderError>;
}
