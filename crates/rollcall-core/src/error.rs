// Error types for the certificate pipeline
//
// Two families: aggregation errors end the batch before any rendering,
// per-recipient errors are recovered by the distributor and only logged.

use thiserror::Error;

/// Error from the collaborator data store (reads and status writes)
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("data store error: {0}")]
    Backend(String),

    #[error("malformed record {key}: {reason}")]
    Malformed { key: String, reason: String },
}

impl SourceError {
    pub fn backend(msg: impl Into<String>) -> Self {
        SourceError::Backend(msg.into())
    }
}

/// Aggregation-stage failures
///
/// Everything except [`AggregateError::Source`] is a known precondition
/// failure that is reported back to the caller as a message.
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("Event not found")]
    NotFound(String),

    #[error("Event has not been accomplished yet")]
    NotAccomplished(String),

    #[error("No attendance were found in the record")]
    NoAttendance,

    #[error("No Evaluation Found for this event")]
    NoEvaluation,

    #[error("No one has responded to the evaluation")]
    NoResponses,

    #[error("User not found")]
    NoResolvableUsers,

    #[error(transparent)]
    Source(#[from] SourceError),
}

impl AggregateError {
    /// Whether this is a known precondition (as opposed to an unexpected failure)
    pub fn is_precondition(&self) -> bool {
        !matches!(self, AggregateError::Source(_))
    }
}

/// Template rendering failure
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template could not be parsed: {0}")]
    Template(String),

    #[error("template has no pages")]
    EmptyTemplate,

    #[error("font could not be embedded: {0}")]
    Font(String),

    #[error("document could not be serialized: {0}")]
    Serialize(String),
}

/// Blob store failure
#[derive(Debug, Error)]
pub enum BlobError {
    #[error("upload failed for {key}: {reason}")]
    Upload { key: String, reason: String },

    #[error("permission denied for {0}")]
    PermissionDenied(String),

    #[error("blob not found: {0}")]
    NotFound(String),

    #[error("blob store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BlobError {
    /// Short machine-readable kind, matched against retry policies
    pub fn kind(&self) -> &'static str {
        match self {
            BlobError::Upload { .. } => "upload",
            BlobError::PermissionDenied(_) => "permission_denied",
            BlobError::NotFound(_) => "not_found",
            BlobError::Io(_) => "io",
        }
    }
}

/// Artifact store adapter failure
#[derive(Debug, Error)]
#[error("artifact store error ({attempts} attempt(s)): {source}")]
pub struct StoreError {
    pub attempts: u32,
    #[source]
    pub source: BlobError,
}

/// Certificate ledger failure
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("certificate write failed: {0}")]
    Write(String),

    #[error("duplicate certificate id: {0}")]
    Duplicate(uuid::Uuid),

    #[error("certificate read failed: {0}")]
    Read(String),
}

impl LedgerError {
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::Write(_) => "write",
            LedgerError::Duplicate(_) => "duplicate",
            LedgerError::Read(_) => "read",
        }
    }
}

/// Issuance recorder failure
#[derive(Debug, Error)]
#[error("record error ({attempts} attempt(s)): {source}")]
pub struct RecordError {
    pub attempts: u32,
    #[source]
    pub source: LedgerError,
}

/// Stage of the per-recipient pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Render,
    Store,
    Record,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Render => write!(f, "render"),
            Stage::Store => write!(f, "store"),
            Stage::Record => write!(f, "record"),
        }
    }
}

/// Failure of one recipient inside a batch
#[derive(Debug, Error)]
pub enum RecipientError {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error("recipient timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("recipient task aborted: {0}")]
    Aborted(String),
}

impl RecipientError {
    /// Stage that failed, when the failure belongs to one
    pub fn stage(&self) -> Option<Stage> {
        match self {
            RecipientError::Render(_) => Some(Stage::Render),
            RecipientError::Store(_) => Some(Stage::Store),
            RecipientError::Record(_) => Some(Stage::Record),
            RecipientError::Timeout(_) | RecipientError::Aborted(_) => None,
        }
    }
}
