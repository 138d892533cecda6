// In-memory implementations for examples and testing
//
// These implementations keep all data in memory, making them useful for:
// - Unit and integration tests
// - Running the pipeline without a database or object storage
//
// Each store can also be told to fail, so tests can exercise retry and
// per-recipient isolation without a real backend.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::attendance::Attendance;
use crate::certificate::Certificate;
use crate::error::{BlobError, LedgerError, RenderError, SourceError};
use crate::evaluation::{Evaluation, Response};
use crate::event::{Event, EventStatus};
use crate::traits::{BlobStore, CertificateLedger, CertificateRenderer, CertificateText, RecordStore};
use crate::user::User;

// ============================================================================
// InMemoryRecordStore - Events, attendance, evaluations, responses, users
// ============================================================================

#[derive(Debug, Default)]
struct Records {
    events: HashMap<String, Event>,
    attendance: Vec<Attendance>,
    evaluations: HashMap<String, Evaluation>,
    responses: Vec<Response>,
    users: HashMap<String, User>,
    read_failure: Option<String>,
}

impl Records {
    fn check(&self) -> Result<(), SourceError> {
        match &self.read_failure {
            Some(reason) => Err(SourceError::backend(reason.clone())),
            None => Ok(()),
        }
    }
}

/// In-memory collaborator data store
#[derive(Debug, Default, Clone)]
pub struct InMemoryRecordStore {
    data: Arc<RwLock<Records>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an event
    pub async fn add_event(&self, event: Event) {
        self.data.write().await.events.insert(event.id.clone(), event);
    }

    pub async fn add_attendance(&self, attendance: Attendance) {
        self.data.write().await.attendance.push(attendance);
    }

    pub async fn add_evaluation(&self, evaluation: Evaluation) {
        self.data
            .write()
            .await
            .evaluations
            .insert(evaluation.id.clone(), evaluation);
    }

    pub async fn add_response(&self, response: Response) {
        self.data.write().await.responses.push(response);
    }

    pub async fn add_user(&self, user: User) {
        self.data.write().await.users.insert(user.id.clone(), user);
    }

    /// Make every subsequent call fail with a backend error
    pub async fn fail_reads(&self, reason: impl Into<String>) {
        self.data.write().await.read_failure = Some(reason.into());
    }

    pub async fn event_status(&self, event_id: &str) -> Option<EventStatus> {
        self.data.read().await.events.get(event_id).map(|e| e.status)
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get_event(&self, event_id: &str) -> Result<Option<Event>, SourceError> {
        let data = self.data.read().await;
        data.check()?;
        Ok(data.events.get(event_id).cloned())
    }

    async fn list_events(&self) -> Result<Vec<Event>, SourceError> {
        let data = self.data.read().await;
        data.check()?;
        let mut events: Vec<Event> = data.events.values().cloned().collect();
        events.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(events)
    }

    async fn list_attendance(&self, event_id: &str) -> Result<Vec<Attendance>, SourceError> {
        let data = self.data.read().await;
        data.check()?;
        Ok(data
            .attendance
            .iter()
            .filter(|a| a.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn get_evaluation(&self, event_id: &str) -> Result<Option<Evaluation>, SourceError> {
        let data = self.data.read().await;
        data.check()?;
        Ok(data.evaluations.get(event_id).cloned())
    }

    async fn list_responses(&self, evaluation_id: &str) -> Result<Vec<Response>, SourceError> {
        let data = self.data.read().await;
        data.check()?;
        Ok(data
            .responses
            .iter()
            .filter(|r| r.evaluation_id == evaluation_id)
            .cloned()
            .collect())
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, SourceError> {
        let data = self.data.read().await;
        data.check()?;
        Ok(data.users.get(user_id).cloned())
    }

    async fn set_event_status(
        &self,
        event_id: &str,
        status: EventStatus,
    ) -> Result<(), SourceError> {
        let mut data = self.data.write().await;
        data.check()?;
        match data.events.get_mut(event_id) {
            Some(event) => {
                event.status = status;
                Ok(())
            }
            None => Err(SourceError::backend(format!("event {event_id} not found"))),
        }
    }
}

// ============================================================================
// InMemoryCertificateLedger - Append-only certificate records
// ============================================================================

#[derive(Debug, Default)]
struct Ledger {
    certificates: Vec<Certificate>,
    failures_remaining: u32,
    lost_acks_remaining: u32,
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryCertificateLedger {
    data: Arc<RwLock<Ledger>>,
}

impl InMemoryCertificateLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` writes with a transient error
    pub async fn fail_next_writes(&self, n: u32) {
        self.data.write().await.failures_remaining = n;
    }

    /// Store the next `n` writes but report them as failed
    pub async fn lose_next_acks(&self, n: u32) {
        self.data.write().await.lost_acks_remaining = n;
    }

    pub async fn all(&self) -> Vec<Certificate> {
        self.data.read().await.certificates.clone()
    }

    pub async fn seed(&self, certificate: Certificate) {
        self.data.write().await.certificates.push(certificate);
    }
}

#[async_trait]
impl CertificateLedger for InMemoryCertificateLedger {
    async fn insert_certificate(&self, certificate: &Certificate) -> Result<(), LedgerError> {
        let mut data = self.data.write().await;
        if data.failures_remaining > 0 {
            data.failures_remaining -= 1;
            return Err(LedgerError::Write("simulated write failure".to_string()));
        }
        if data.certificates.iter().any(|c| c.id == certificate.id) {
            return Err(LedgerError::Duplicate(certificate.id));
        }
        data.certificates.push(certificate.clone());
        if data.lost_acks_remaining > 0 {
            data.lost_acks_remaining -= 1;
            return Err(LedgerError::Write("connection reset".to_string()));
        }
        Ok(())
    }

    async fn list_for_event(&self, event_id: &str) -> Result<Vec<Certificate>, LedgerError> {
        Ok(self
            .data
            .read()
            .await
            .certificates
            .iter()
            .filter(|c| c.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Certificate>, LedgerError> {
        Ok(self
            .data
            .read()
            .await
            .certificates
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_certificate(&self, id: Uuid) -> Result<Option<Certificate>, LedgerError> {
        Ok(self
            .data
            .read()
            .await
            .certificates
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }
}

// ============================================================================
// InMemoryBlobStore - Artifacts keyed by path
// ============================================================================

#[derive(Debug, Default)]
struct Blobs {
    objects: HashMap<String, Vec<u8>>,
    failures_remaining: u32,
    put_delay: Option<Duration>,
}

/// In-memory blob store with `memory://{key}` URLs
#[derive(Debug, Default, Clone)]
pub struct InMemoryBlobStore {
    data: Arc<RwLock<Blobs>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` uploads with a transient error
    pub async fn fail_next_puts(&self, n: u32) {
        self.data.write().await.failures_remaining = n;
    }

    /// Sleep (on the tokio clock) before every upload
    pub async fn set_put_delay(&self, delay: Duration) {
        self.data.write().await.put_delay = Some(delay);
    }

    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.data.read().await.objects.get(key).cloned()
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.data.read().await.objects.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub async fn len(&self) -> usize {
        self.data.read().await.objects.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> Result<(), BlobError> {
        let delay = self.data.read().await.put_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut data = self.data.write().await;
        if data.failures_remaining > 0 {
            data.failures_remaining -= 1;
            return Err(BlobError::Upload {
                key: key.to_string(),
                reason: "simulated upload failure".to_string(),
            });
        }
        data.objects.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn url(&self, key: &str) -> Result<String, BlobError> {
        if self.data.read().await.objects.contains_key(key) {
            Ok(format!("memory://{key}"))
        } else {
            Err(BlobError::NotFound(key.to_string()))
        }
    }
}

// ============================================================================
// StubRenderer - Cheap renderer with injectable failures
// ============================================================================

/// Renderer producing a small fake document instead of a real PDF
///
/// Can fail or panic for chosen recipient names.
#[derive(Debug, Default, Clone)]
pub struct StubRenderer {
    calls: Arc<AtomicUsize>,
    fail_for: Arc<HashSet<String>>,
    panic_for: Arc<HashSet<String>>,
}

impl StubRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fail_for = Arc::new(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn panicking_for<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.panic_for = Arc::new(names.into_iter().map(Into::into).collect());
        self
    }

    /// Number of render calls made so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CertificateRenderer for StubRenderer {
    fn render(&self, text: &CertificateText) -> Result<Vec<u8>, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panic_for.contains(&text.recipient_name) {
            panic!("stub renderer panic for {}", text.recipient_name);
        }
        if self.fail_for.contains(&text.recipient_name) {
            return Err(RenderError::Template(format!(
                "simulated failure for {}",
                text.recipient_name
            )));
        }
        Ok(format!(
            "%PDF-stub\n{}\n{}\n{}\n{}\n",
            text.recipient_name,
            text.event_title,
            text.event_start.to_rfc3339(),
            text.distributed_at.to_rfc3339()
        )
        .into_bytes())
    }
}

// ============================================================================
// Fixtures - Small builders for seeding stores in tests
// ============================================================================

pub mod fixtures {
    use chrono::{DateTime, TimeZone, Utc};

    use crate::attendance::Attendance;
    use crate::evaluation::{Evaluation, Question, RatingAnswer, Response};
    use crate::event::{Event, EventStatus};

    fn june_first(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, hour, minute, 0)
            .single()
            .unwrap_or_default()
    }

    /// "tech talk", 2024-06-01 10:00-12:00 UTC
    pub fn event(id: &str, status: EventStatus) -> Event {
        Event {
            id: id.to_string(),
            title: "tech talk".to_string(),
            description: String::new(),
            start_date_time: june_first(10, 0),
            end_date_time: june_first(12, 0),
            status,
            template_picture: None,
            documents: vec![],
        }
    }

    pub fn attendance(event_id: &str, user_id: &str) -> Attendance {
        Attendance {
            id: format!("{event_id}-{user_id}"),
            event_id: event_id.to_string(),
            user_id: user_id.to_string(),
            time_in: june_first(10, 5),
        }
    }

    /// Evaluation with a single rating question
    pub fn evaluation(event_id: &str) -> Evaluation {
        Evaluation {
            id: event_id.to_string(),
            rating: vec![Question {
                text: "How useful was the event?".to_string(),
            }],
            comment: vec![],
        }
    }

    pub fn response(event_id: &str, user_id: &str) -> Response {
        Response {
            id: format!("{event_id}-{user_id}-response"),
            evaluation_id: event_id.to_string(),
            user_id: user_id.to_string(),
            rating: vec![RatingAnswer {
                question: "How useful was the event?".to_string(),
                score: 5,
            }],
            comment: vec![],
        }
    }
}
