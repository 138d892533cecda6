// Database models (internal, may differ from the core domain types)

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

// ============================================
// Collaborator records (read-only here)
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct EventRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub start_date_time: DateTime<Utc>,
    pub end_date_time: DateTime<Utc>,
    pub status: String,
    pub template_picture: Option<String>,
    pub documents: Vec<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct AttendanceRow {
    pub id: String,
    pub event_id: String,
    pub user_id: String,
    pub time_in: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct EvaluationRow {
    pub id: String,
    pub rating: sqlx::types::JsonValue,
    pub comment: sqlx::types::JsonValue,
}

#[derive(Debug, Clone, FromRow)]
pub struct ResponseRow {
    pub id: String,
    pub evaluation_id: String,
    pub user_id: String,
    pub rating: sqlx::types::JsonValue,
    pub comment: sqlx::types::JsonValue,
}

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub role: String,
    pub student_id: Option<String>,
    pub course: Option<String>,
    pub year: Option<String>,
    pub section: Option<String>,
}

// ============================================
// Certificates (written by the pipeline)
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct CertificateRow {
    pub id: Uuid,
    pub user_id: String,
    pub event_id: String,
    pub cert: String,
    pub date_received: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateCertificate {
    pub id: Uuid,
    pub user_id: String,
    pub event_id: String,
    pub cert: String,
    pub date_received: DateTime<Utc>,
}
