// Issuance recorder
//
// Writes one Certificate record per issued artifact. The identifier is
// generated before the first attempt and reused across retries, so a retried
// write can only ever collide with itself. Such a collision means an earlier
// attempt landed without its acknowledgement and counts as success.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::certificate::Certificate;
use crate::error::{LedgerError, RecordError};
use crate::retry::RetryPolicy;
use crate::traits::CertificateLedger;

#[derive(Clone)]
pub struct IssuanceRecorder {
    ledger: Arc<dyn CertificateLedger>,
    retry: RetryPolicy,
}

impl IssuanceRecorder {
    pub fn new(ledger: Arc<dyn CertificateLedger>, retry: RetryPolicy) -> Self {
        Self { ledger, retry }
    }

    pub async fn record(
        &self,
        user_id: &str,
        event_id: &str,
        url: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<Certificate, RecordError> {
        let certificate = Certificate {
            id: Uuid::now_v7(),
            user_id: user_id.to_string(),
            event_id: event_id.to_string(),
            cert: url.to_string(),
            date_received: issued_at,
        };

        let ledger = &self.ledger;
        let record = &certificate;
        let attempts = &AtomicU32::new(0);
        self.retry
            .run("certificate_record", LedgerError::kind, move || async move {
                let attempt = attempts.fetch_add(1, Ordering::Relaxed) + 1;
                match ledger.insert_certificate(record).await {
                    Err(LedgerError::Duplicate(id)) if attempt > 1 && id == record.id => {
                        debug!(certificate_id = %id, attempt, "Earlier certificate write had landed");
                        Ok(())
                    }
                    other => other,
                }
            })
            .await
            .map_err(|(source, attempts)| RecordError { attempts, source })?;

        debug!(certificate_id = %certificate.id, user_id, event_id, "Recorded certificate");
        Ok(certificate)
    }
}
