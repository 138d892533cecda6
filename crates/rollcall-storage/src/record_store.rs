// Database-backed RecordStore and CertificateLedger implementations
//
// Rows are converted into core domain types here. JSONB question/answer
// columns that fail to decode surface as SourceError::Malformed.

use async_trait::async_trait;
use rollcall_core::{
    traits::{CertificateLedger, RecordStore},
    Attendance, Certificate, CommentAnswer, Evaluation, Event, EventStatus, LedgerError, Question,
    RatingAnswer, Response, SourceError, User, UserRole,
};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::models::*;
use crate::repositories::Database;

// ============================================================================
// Row conversions
// ============================================================================

fn decode_json<T: DeserializeOwned>(
    key: &str,
    value: sqlx::types::JsonValue,
) -> Result<T, SourceError> {
    serde_json::from_value(value).map_err(|e| SourceError::Malformed {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

pub fn event_from_row(row: EventRow) -> Event {
    Event {
        status: EventStatus::from(row.status.as_str()),
        id: row.id,
        title: row.title,
        description: row.description,
        start_date_time: row.start_date_time,
        end_date_time: row.end_date_time,
        template_picture: row.template_picture,
        documents: row.documents,
    }
}

pub fn attendance_from_row(row: AttendanceRow) -> Attendance {
    Attendance {
        id: row.id,
        event_id: row.event_id,
        user_id: row.user_id,
        time_in: row.time_in,
    }
}

pub fn evaluation_from_row(row: EvaluationRow) -> Result<Evaluation, SourceError> {
    let key = format!("evaluation/{}", row.id);
    let rating: Vec<Question> = decode_json(&key, row.rating)?;
    let comment: Vec<Question> = decode_json(&key, row.comment)?;
    Ok(Evaluation {
        id: row.id,
        rating,
        comment,
    })
}

pub fn response_from_row(row: ResponseRow) -> Result<Response, SourceError> {
    let key = format!("responses/{}", row.id);
    let rating: Vec<RatingAnswer> = decode_json(&key, row.rating)?;
    let comment: Vec<CommentAnswer> = decode_json(&key, row.comment)?;
    Ok(Response {
        id: row.id,
        evaluation_id: row.evaluation_id,
        user_id: row.user_id,
        rating,
        comment,
    })
}

pub fn user_from_row(row: UserRow) -> User {
    User {
        role: UserRole::from(row.role.as_str()),
        id: row.id,
        full_name: row.full_name,
        email: row.email,
        student_id: row.student_id,
        course: row.course,
        year: row.year,
        section: row.section,
    }
}

pub fn certificate_from_row(row: CertificateRow) -> Certificate {
    Certificate {
        id: row.id,
        user_id: row.user_id,
        event_id: row.event_id,
        cert: row.cert,
        date_received: row.date_received,
    }
}

// ============================================================================
// DbRecordStore - Collaborator records from Postgres
// ============================================================================

#[derive(Clone)]
pub struct DbRecordStore {
    db: Database,
}

impl DbRecordStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RecordStore for DbRecordStore {
    async fn get_event(&self, event_id: &str) -> Result<Option<Event>, SourceError> {
        let row = self
            .db
            .get_event(event_id)
            .await
            .map_err(|e| SourceError::backend(e.to_string()))?;
        Ok(row.map(event_from_row))
    }

    async fn list_events(&self) -> Result<Vec<Event>, SourceError> {
        let rows = self
            .db
            .list_events()
            .await
            .map_err(|e| SourceError::backend(e.to_string()))?;
        Ok(rows.into_iter().map(event_from_row).collect())
    }

    async fn list_attendance(&self, event_id: &str) -> Result<Vec<Attendance>, SourceError> {
        let rows = self
            .db
            .list_attendance_for_event(event_id)
            .await
            .map_err(|e| SourceError::backend(e.to_string()))?;
        Ok(rows.into_iter().map(attendance_from_row).collect())
    }

    async fn get_evaluation(&self, event_id: &str) -> Result<Option<Evaluation>, SourceError> {
        let row = self
            .db
            .get_evaluation(event_id)
            .await
            .map_err(|e| SourceError::backend(e.to_string()))?;
        row.map(evaluation_from_row).transpose()
    }

    async fn list_responses(&self, evaluation_id: &str) -> Result<Vec<Response>, SourceError> {
        let rows = self
            .db
            .list_responses_for_evaluation(evaluation_id)
            .await
            .map_err(|e| SourceError::backend(e.to_string()))?;
        rows.into_iter().map(response_from_row).collect()
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, SourceError> {
        let row = self
            .db
            .get_user(user_id)
            .await
            .map_err(|e| SourceError::backend(e.to_string()))?;
        Ok(row.map(user_from_row))
    }

    async fn set_event_status(
        &self,
        event_id: &str,
        status: EventStatus,
    ) -> Result<(), SourceError> {
        let updated = self
            .db
            .update_event_status(event_id, &status.to_string())
            .await
            .map_err(|e| SourceError::backend(e.to_string()))?;
        if updated {
            Ok(())
        } else {
            Err(SourceError::backend(format!("event {event_id} not found")))
        }
    }
}

// ============================================================================
// DbCertificateLedger - Certificate records in Postgres
// ============================================================================

#[derive(Clone)]
pub struct DbCertificateLedger {
    db: Database,
}

impl DbCertificateLedger {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CertificateLedger for DbCertificateLedger {
    async fn insert_certificate(&self, certificate: &Certificate) -> Result<(), LedgerError> {
        let inserted = self
            .db
            .create_certificate(CreateCertificate {
                id: certificate.id,
                user_id: certificate.user_id.clone(),
                event_id: certificate.event_id.clone(),
                cert: certificate.cert.clone(),
                date_received: certificate.date_received,
            })
            .await
            .map_err(|e| LedgerError::Write(e.to_string()))?;

        if inserted {
            Ok(())
        } else {
            Err(LedgerError::Duplicate(certificate.id))
        }
    }

    async fn list_for_event(&self, event_id: &str) -> Result<Vec<Certificate>, LedgerError> {
        let rows = self
            .db
            .list_certificates_for_event(event_id)
            .await
            .map_err(|e| LedgerError::Read(e.to_string()))?;
        Ok(rows.into_iter().map(certificate_from_row).collect())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Certificate>, LedgerError> {
        let rows = self
            .db
            .list_certificates_for_user(user_id)
            .await
            .map_err(|e| LedgerError::Read(e.to_string()))?;
        Ok(rows.into_iter().map(certificate_from_row).collect())
    }

    async fn get_certificate(&self, id: Uuid) -> Result<Option<Certificate>, LedgerError> {
        let row = self
            .db
            .get_certificate(id)
            .await
            .map_err(|e| LedgerError::Read(e.to_string()))?;
        Ok(row.map(certificate_from_row))
    }
}

// ============================================================================
// Factory functions
// ============================================================================

pub fn create_db_record_store(db: Database) -> DbRecordStore {
    DbRecordStore::new(db)
}

pub fn create_db_certificate_ledger(db: Database) -> DbCertificateLedger {
    DbCertificateLedger::new(db)
}
