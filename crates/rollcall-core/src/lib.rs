// Certificate distribution core
//
// This crate provides a DB-agnostic implementation of the attendance
// certificate pipeline (aggregate -> render -> store -> record).
//
// Key design decisions:
// - Uses traits (RecordStore, CertificateLedger, BlobStore) for pluggable backends
// - The renderer is a synchronous trait; batches run it on the blocking pool
// - Recipients are processed as independent tasks with bounded concurrency
// - Only aggregation failures end a batch; per-recipient failures are reported
// - Configuration via DistributionConfig (loaded from env or built directly)

// Domain entity types
pub mod attendance;
pub mod certificate;
pub mod evaluation;
pub mod event;
pub mod user;

pub mod config;
pub mod error;
pub mod retry;
pub mod traits;

// Pipeline stages
pub mod aggregator;
pub mod artifact;
pub mod distributor;
pub mod recorder;
pub mod render;
pub mod status;

// In-memory implementations for examples and testing
pub mod memory;

// Re-exports for convenience
pub use aggregator::{Aggregate, Aggregator, Recipient};
pub use artifact::{storage_key, ArtifactStore, StoredArtifact};
pub use attendance::Attendance;
pub use certificate::{Certificate, CertificateWithEvent};
pub use config::{DistributionConfig, RosterPolicy};
pub use distributor::{
    CertificateDistributor, DistributionOutcome, DistributionReport, RecipientFailure,
    SUCCESS_MESSAGE,
};
pub use error::{
    AggregateError, BlobError, LedgerError, RecipientError, RecordError, RenderError, SourceError,
    Stage, StoreError,
};
pub use evaluation::{CommentAnswer, Evaluation, Question, RatingAnswer, Response};
pub use event::{Event, EventStatus};
pub use recorder::IssuanceRecorder;
pub use render::PdfTemplateRenderer;
pub use retry::RetryPolicy;
pub use status::{sweep_event_statuses, StatusChange};
pub use traits::{BlobStore, CertificateLedger, CertificateRenderer, CertificateText, RecordStore};
pub use user::{User, UserRole};
