// Event & response aggregator
//
// Collects everything a batch needs and enforces the preconditions in a fixed
// order: event, (status gate), attendance, evaluation, responses, recipients.
// Read-only.

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::debug;

use crate::attendance::Attendance;
use crate::config::RosterPolicy;
use crate::error::AggregateError;
use crate::evaluation::{Evaluation, Response};
use crate::event::Event;
use crate::traits::RecordStore;
use crate::user::User;

/// A user eligible for a certificate in this batch
#[derive(Debug, Clone, PartialEq)]
pub struct Recipient {
    pub user_id: String,
    pub profile: User,
}

/// Everything gathered for one event
#[derive(Debug, Clone)]
pub struct Aggregate {
    pub event: Event,
    pub attendance: Vec<Attendance>,
    pub evaluation: Evaluation,
    pub responses: Vec<Response>,
    /// Resolved recipients, in roster order, without duplicates
    pub recipients: Vec<Recipient>,
}

#[derive(Clone)]
pub struct Aggregator {
    records: Arc<dyn RecordStore>,
    roster: RosterPolicy,
    lookup_concurrency: usize,
    require_accomplished: bool,
}

impl Aggregator {
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self {
            records,
            roster: RosterPolicy::default(),
            lookup_concurrency: 8,
            require_accomplished: false,
        }
    }

    pub fn with_roster(mut self, roster: RosterPolicy) -> Self {
        self.roster = roster;
        self
    }

    pub fn with_lookup_concurrency(mut self, n: usize) -> Self {
        self.lookup_concurrency = n.max(1);
        self
    }

    pub fn with_require_accomplished(mut self, require: bool) -> Self {
        self.require_accomplished = require;
        self
    }

    pub async fn aggregate(&self, event_id: &str) -> Result<Aggregate, AggregateError> {
        let event = self
            .records
            .get_event(event_id)
            .await?
            .ok_or_else(|| AggregateError::NotFound(event_id.to_string()))?;

        if self.require_accomplished && !event.is_accomplished() {
            return Err(AggregateError::NotAccomplished(event_id.to_string()));
        }

        let attendance = self.records.list_attendance(event_id).await?;
        if attendance.is_empty() {
            return Err(AggregateError::NoAttendance);
        }

        let evaluation = self
            .records
            .get_evaluation(event_id)
            .await?
            .ok_or(AggregateError::NoEvaluation)?;

        let responses = self.records.list_responses(&evaluation.id).await?;
        if responses.is_empty() {
            return Err(AggregateError::NoResponses);
        }

        let candidates = roster_candidates(self.roster, &attendance, &responses);
        let recipients = self.resolve(candidates).await?;
        if recipients.is_empty() {
            return Err(AggregateError::NoResolvableUsers);
        }

        debug!(
            event_id,
            attendance = attendance.len(),
            responses = responses.len(),
            recipients = recipients.len(),
            roster = ?self.roster,
            "Aggregated event"
        );

        Ok(Aggregate {
            event,
            attendance,
            evaluation,
            responses,
            recipients,
        })
    }

    /// Look up profiles with bounded concurrency, keeping candidate order
    async fn resolve(&self, candidates: Vec<String>) -> Result<Vec<Recipient>, AggregateError> {
        let records = &self.records;
        let lookups: Vec<_> = stream::iter(candidates)
            .map(|user_id| async move {
                let profile = records.get_user(&user_id).await;
                (user_id, profile)
            })
            .buffered(self.lookup_concurrency)
            .collect()
            .await;

        let mut recipients = Vec::with_capacity(lookups.len());
        for (user_id, profile) in lookups {
            match profile? {
                Some(profile) => recipients.push(Recipient { user_id, profile }),
                None => debug!(user_id = %user_id, "Dropping recipient without a user profile"),
            }
        }
        Ok(recipients)
    }
}

/// Distinct candidate user ids for `policy`, first occurrence wins
pub fn roster_candidates(
    policy: RosterPolicy,
    attendance: &[Attendance],
    responses: &[Response],
) -> Vec<String> {
    let attendees = attendance.iter().map(|a| a.user_id.as_str());
    let respondents = responses.iter().map(|r| r.user_id.as_str());

    let ids: Vec<&str> = match policy {
        RosterPolicy::Attendance => attendees.collect(),
        RosterPolicy::Respondents => respondents.collect(),
        RosterPolicy::AttendingRespondents => {
            let present: HashSet<&str> = attendees.collect();
            respondents.filter(|id| present.contains(id)).collect()
        }
    };

    let mut seen = HashSet::new();
    ids.into_iter()
        .filter(|id| seen.insert(*id))
        .map(str::to_string)
        .collect()
}
