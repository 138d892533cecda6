// Batch orchestrator
//
// AGGREGATING -> RENDERING_LOOP -> DONE, or AGGREGATING -> FAILED_EARLY.
//
// Recipients are independent: each one runs render -> store -> record in its
// own task under a shared semaphore. A failing, hanging or panicking
// recipient only costs that recipient its certificate.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{error, info, warn};

use crate::aggregator::{Aggregator, Recipient};
use crate::artifact::{ArtifactStore, StoredArtifact};
use crate::certificate::Certificate;
use crate::config::DistributionConfig;
use crate::error::{AggregateError, RecipientError, SourceError, Stage};
use crate::recorder::IssuanceRecorder;
use crate::traits::{
    BlobStore, CertificateLedger, CertificateRenderer, CertificateText, RecordStore,
};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Message returned once the rendering loop has run, whatever its per-recipient results
pub const SUCCESS_MESSAGE: &str = "Certificate Generated and Distributed";

/// Coarse batch result handed back to HTTP callers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct DistributionOutcome {
    pub success: bool,
    pub message: String,
}

impl DistributionOutcome {
    pub fn completed() -> Self {
        Self {
            success: true,
            message: SUCCESS_MESSAGE.to_string(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// A recipient that did not receive a certificate
#[derive(Debug, Clone, Serialize)]
pub struct RecipientFailure {
    pub user_id: String,
    pub full_name: String,
    /// None for timeouts and aborted tasks
    pub stage: Option<Stage>,
    pub error: String,
}

/// Detailed result of one batch
#[derive(Debug, Clone, Serialize)]
pub struct DistributionReport {
    pub event_id: String,
    pub distributed_at: DateTime<Utc>,
    pub issued: Vec<Certificate>,
    pub failures: Vec<RecipientFailure>,
    /// Users skipped because they already held a certificate
    pub skipped: Vec<String>,
}

impl DistributionReport {
    fn new(event_id: &str, distributed_at: DateTime<Utc>) -> Self {
        Self {
            event_id: event_id.to_string(),
            distributed_at,
            issued: Vec::new(),
            failures: Vec::new(),
            skipped: Vec::new(),
        }
    }

    fn fail(&mut self, recipient: &Recipient, err: &RecipientError) {
        warn!(
            recipient = %recipient.profile.full_name,
            user_id = %recipient.user_id,
            stage = ?err.stage(),
            error = %err,
            "Certificate not issued"
        );
        self.failures.push(RecipientFailure {
            user_id: recipient.user_id.clone(),
            full_name: recipient.profile.full_name.clone(),
            stage: err.stage(),
            error: err.to_string(),
        });
    }
}

/// Runs certificate batches for events
#[derive(Clone)]
pub struct CertificateDistributor {
    aggregator: Aggregator,
    ledger: Arc<dyn CertificateLedger>,
    artifacts: ArtifactStore,
    recorder: IssuanceRecorder,
    renderer: Arc<dyn CertificateRenderer>,
    config: DistributionConfig,
}

impl CertificateDistributor {
    pub fn new(
        records: Arc<dyn RecordStore>,
        ledger: Arc<dyn CertificateLedger>,
        blobs: Arc<dyn BlobStore>,
        renderer: Arc<dyn CertificateRenderer>,
        config: DistributionConfig,
    ) -> Self {
        let aggregator = Aggregator::new(records)
            .with_roster(config.roster)
            .with_lookup_concurrency(config.lookup_concurrency)
            .with_require_accomplished(config.require_accomplished);
        let artifacts = ArtifactStore::new(blobs, config.key_prefix.clone(), config.store_retry.clone());
        let recorder = IssuanceRecorder::new(ledger.clone(), config.record_retry.clone());

        Self {
            aggregator,
            ledger,
            artifacts,
            recorder,
            renderer,
            config,
        }
    }

    pub fn config(&self) -> &DistributionConfig {
        &self.config
    }

    /// Run a batch and collapse the result into `{success, message}`
    ///
    /// Known precondition failures become `success: false`; anything else is
    /// returned as an error for the caller to report as a server error.
    pub async fn distribute_certificates(
        &self,
        event_id: &str,
    ) -> Result<DistributionOutcome, AggregateError> {
        match self.distribute(event_id).await {
            Ok(_) => Ok(DistributionOutcome::completed()),
            Err(e) if e.is_precondition() => {
                info!(event_id, reason = %e, "Certificate batch not started");
                Ok(DistributionOutcome::failed(e.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    /// Run a batch for `event_id` and return the per-recipient report
    pub async fn distribute(&self, event_id: &str) -> Result<DistributionReport, AggregateError> {
        let distributed_at = Utc::now();
        let aggregate = self.aggregator.aggregate(event_id).await?;
        let mut report = DistributionReport::new(event_id, distributed_at);

        let mut recipients = aggregate.recipients;
        if self.config.skip_already_issued {
            let holders: HashSet<String> = self
                .ledger
                .list_for_event(event_id)
                .await
                .map_err(|e| SourceError::backend(e.to_string()))?
                .into_iter()
                .map(|c| c.user_id)
                .collect();
            recipients.retain(|r| {
                let holds = holders.contains(&r.user_id);
                if holds {
                    report.skipped.push(r.user_id.clone());
                }
                !holds
            });
        }

        info!(
            event_id,
            recipients = recipients.len(),
            skipped = report.skipped.len(),
            concurrency = self.config.max_concurrency,
            "Distributing certificates"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let mut tasks = JoinSet::new();
        let mut pending: HashMap<usize, Recipient> = HashMap::with_capacity(recipients.len());

        for (index, recipient) in recipients.into_iter().enumerate() {
            let job = RecipientJob {
                event_id: event_id.to_string(),
                user_id: recipient.user_id.clone(),
                text: CertificateText {
                    recipient_name: recipient.profile.full_name.clone(),
                    event_title: aggregate.event.title.clone(),
                    event_start: aggregate.event.start_date_time,
                    distributed_at,
                },
                renderer: self.renderer.clone(),
                artifacts: self.artifacts.clone(),
                recorder: self.recorder.clone(),
            };
            let semaphore = semaphore.clone();
            let timeout = self.config.recipient_timeout;

            tasks.spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => match tokio::time::timeout(timeout, job.produce()).await {
                        Ok(Ok(artifact)) => job.record(&artifact).await,
                        Ok(Err(e)) => Err(e),
                        Err(_) => Err(RecipientError::Timeout(timeout)),
                    },
                    Err(e) => Err(RecipientError::Aborted(e.to_string())),
                };
                (index, result)
            });
            pending.insert(index, recipient);
        }

        let deadline = self
            .config
            .batch_deadline()
            .map(|d| tokio::time::Instant::now() + d);
        let mut deadline_hit = false;

        loop {
            let next = match deadline {
                Some(at) => match tokio::time::timeout_at(at, tasks.join_next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        deadline_hit = true;
                        break;
                    }
                },
                None => tasks.join_next().await,
            };
            match next {
                Some(joined) => absorb(&mut report, &mut pending, joined),
                None => break,
            }
        }

        if deadline_hit {
            warn!(
                event_id,
                unfinished = pending.len(),
                "Batch deadline exceeded, aborting remaining recipients"
            );
            tasks.abort_all();
            // Results that raced the abort still count
            while let Some(joined) = tasks.join_next().await {
                absorb(&mut report, &mut pending, joined);
            }
        }

        let mut leftovers: Vec<(usize, Recipient)> = pending.into_iter().collect();
        leftovers.sort_by_key(|(index, _)| *index);
        for (_, recipient) in leftovers {
            let reason = if deadline_hit {
                "batch deadline exceeded"
            } else {
                "recipient task panicked"
            };
            report.fail(&recipient, &RecipientError::Aborted(reason.to_string()));
        }

        info!(
            event_id,
            issued = report.issued.len(),
            failed = report.failures.len(),
            skipped = report.skipped.len(),
            "Certificate batch finished"
        );
        Ok(report)
    }
}

fn absorb(
    report: &mut DistributionReport,
    pending: &mut HashMap<usize, Recipient>,
    joined: Result<(usize, Result<Certificate, RecipientError>), JoinError>,
) {
    match joined {
        Ok((index, result)) => {
            let Some(recipient) = pending.remove(&index) else {
                return;
            };
            match result {
                Ok(certificate) => {
                    info!(
                        recipient = %recipient.profile.full_name,
                        certificate_id = %certificate.id,
                        "Certificate issued"
                    );
                    report.issued.push(certificate);
                }
                Err(e) => report.fail(&recipient, &e),
            }
        }
        // Panicked or cancelled: the recipient stays pending and is reported after the loop
        Err(e) if e.is_cancelled() => {}
        Err(e) => error!(error = %e, "Recipient task panicked"),
    }
}

/// Everything one recipient's task needs, owned
struct RecipientJob {
    event_id: String,
    user_id: String,
    text: CertificateText,
    renderer: Arc<dyn CertificateRenderer>,
    artifacts: ArtifactStore,
    recorder: IssuanceRecorder,
}

impl RecipientJob {
    /// Render and store; bounded by the per-recipient timeout
    async fn produce(&self) -> Result<StoredArtifact, RecipientError> {
        let renderer = self.renderer.clone();
        let text = self.text.clone();
        let pdf = tokio::task::spawn_blocking(move || renderer.render(&text))
            .await
            .map_err(|e| RecipientError::Aborted(format!("render task failed: {e}")))??;

        Ok(self.artifacts.store(pdf, &self.user_id).await?)
    }

    /// Write the ledger record. Not cut off by the per-recipient timeout, so a
    /// write in flight either lands and is reported or fails and is reported.
    /// Only the batch deadline can still abort it.
    async fn record(&self, artifact: &StoredArtifact) -> Result<Certificate, RecipientError> {
        Ok(self
            .recorder
            .record(
                &self.user_id,
                &self.event_id,
                &artifact.url,
                self.text.distributed_at,
            )
            .await?)
    }
}
