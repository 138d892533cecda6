// Repository layer for database operations

use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::*;

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create database connection from URL
    pub async fn from_url(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the bundled schema migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    // ============================================
    // Events
    // ============================================

    pub async fn get_event(&self, id: &str) -> Result<Option<EventRow>> {
        let row = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT id, title, description, start_date_time, end_date_time, status, template_picture, documents
            FROM events
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn list_events(&self) -> Result<Vec<EventRow>> {
        let rows = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT id, title, description, start_date_time, end_date_time, status, template_picture, documents
            FROM events
            ORDER BY start_date_time ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Returns false when no event has this id
    pub async fn update_event_status(&self, id: &str, status: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE events
            SET status = $2
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    // ============================================
    // Attendance
    // ============================================

    pub async fn list_attendance_for_event(&self, event_id: &str) -> Result<Vec<AttendanceRow>> {
        let rows = sqlx::query_as::<_, AttendanceRow>(
            r#"
            SELECT id, event_id, user_id, time_in
            FROM attendance
            WHERE event_id = $1
            ORDER BY time_in ASC, id ASC
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // ============================================
    // Evaluations and responses
    // ============================================

    pub async fn get_evaluation(&self, event_id: &str) -> Result<Option<EvaluationRow>> {
        let row = sqlx::query_as::<_, EvaluationRow>(
            r#"
            SELECT id, rating, comment
            FROM evaluations
            WHERE id = $1
            "#,
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn list_responses_for_evaluation(
        &self,
        evaluation_id: &str,
    ) -> Result<Vec<ResponseRow>> {
        let rows = sqlx::query_as::<_, ResponseRow>(
            r#"
            SELECT id, evaluation_id, user_id, rating, comment
            FROM responses
            WHERE evaluation_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(evaluation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // ============================================
    // Users
    // ============================================

    pub async fn get_user(&self, id: &str) -> Result<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, full_name, email, role, student_id, course, year, section
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    // ============================================
    // Certificates
    // ============================================

    /// Insert a certificate; returns false if the id already exists
    pub async fn create_certificate(&self, input: CreateCertificate) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO certificates (id, user_id, event_id, cert, date_received)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(input.id)
        .bind(&input.user_id)
        .bind(&input.event_id)
        .bind(&input.cert)
        .bind(input.date_received)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn get_certificate(&self, id: Uuid) -> Result<Option<CertificateRow>> {
        let row = sqlx::query_as::<_, CertificateRow>(
            r#"
            SELECT id, user_id, event_id, cert, date_received
            FROM certificates
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn list_certificates_for_event(&self, event_id: &str) -> Result<Vec<CertificateRow>> {
        let rows = sqlx::query_as::<_, CertificateRow>(
            r#"
            SELECT id, user_id, event_id, cert, date_received
            FROM certificates
            WHERE event_id = $1
            ORDER BY date_received DESC, id DESC
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn list_certificates_for_user(&self, user_id: &str) -> Result<Vec<CertificateRow>> {
        let rows = sqlx::query_as::<_, CertificateRow>(
            r#"
            SELECT id, user_id, event_id, cert, date_received
            FROM certificates
            WHERE user_id = $1
            ORDER BY date_received DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
