// Distribution configuration
//
// DistributionConfig is a DB-agnostic configuration struct that can be:
// - Created directly for tests and examples
// - Loaded from the environment by the API server via `from_env`

use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::retry::RetryPolicy;

/// Which records define the recipients of a batch
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RosterPolicy {
    /// Every distinct attendee of the event
    #[default]
    Attendance,
    /// Every distinct evaluation respondent
    Respondents,
    /// Respondents that also checked in
    AttendingRespondents,
}

impl std::str::FromStr for RosterPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "attendance" => Ok(RosterPolicy::Attendance),
            "respondents" => Ok(RosterPolicy::Respondents),
            "attending_respondents" => Ok(RosterPolicy::AttendingRespondents),
            other => Err(format!("unknown roster policy: {other}")),
        }
    }
}

/// Configuration for one certificate batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionConfig {
    #[serde(default)]
    pub roster: RosterPolicy,

    /// Maximum recipients processed at once
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Maximum concurrent user-profile lookups during aggregation
    #[serde(default = "default_lookup_concurrency")]
    pub lookup_concurrency: usize,

    /// Upper bound for render + store + record of one recipient
    #[serde(with = "secs", default = "default_recipient_timeout")]
    pub recipient_timeout: Duration,

    /// Upper bound for the whole rendering loop (None = unbounded)
    #[serde(default)]
    pub batch_deadline_secs: Option<u64>,

    /// Retry policy for blob uploads
    #[serde(default)]
    pub store_retry: RetryPolicy,

    /// Retry policy for certificate writes
    #[serde(default)]
    pub record_retry: RetryPolicy,

    /// Fail aggregation unless the event is `Accomplished`
    #[serde(default)]
    pub require_accomplished: bool,

    /// Skip users that already hold a certificate for the event
    #[serde(default)]
    pub skip_already_issued: bool,

    /// Offset used when printing dates on the certificate, in minutes east of UTC
    #[serde(default)]
    pub utc_offset_minutes: i32,

    /// Key prefix for stored artifacts
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

fn default_max_concurrency() -> usize {
    4
}

fn default_lookup_concurrency() -> usize {
    8
}

fn default_recipient_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_key_prefix() -> String {
    "pdfs".to_string()
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            roster: RosterPolicy::default(),
            max_concurrency: default_max_concurrency(),
            lookup_concurrency: default_lookup_concurrency(),
            recipient_timeout: default_recipient_timeout(),
            batch_deadline_secs: None,
            store_retry: RetryPolicy::default(),
            record_retry: RetryPolicy::default(),
            require_accomplished: false,
            skip_already_issued: false,
            utc_offset_minutes: 0,
            key_prefix: default_key_prefix(),
        }
    }
}

impl DistributionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load overrides from environment variables, keeping defaults for unset ones
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(roster) = env_parse::<RosterPolicy>("ROSTER_POLICY") {
            config.roster = roster;
        }
        if let Some(n) = env_parse::<usize>("DISTRIBUTION_CONCURRENCY") {
            config.max_concurrency = n.max(1);
        }
        if let Some(secs) = env_parse::<u64>("RECIPIENT_TIMEOUT_SECS") {
            config.recipient_timeout = Duration::from_secs(secs.max(1));
        }
        config.batch_deadline_secs = env_parse::<u64>("BATCH_DEADLINE_SECS").filter(|s| *s > 0);

        let mut retry = RetryPolicy::default();
        if let Some(n) = env_parse::<u32>("RETRY_MAX_ATTEMPTS") {
            retry = retry.with_max_attempts(n);
        }
        if let Some(ms) = env_parse::<u64>("RETRY_INITIAL_MS") {
            retry = retry.with_initial_interval(Duration::from_millis(ms));
        }
        if let Some(ms) = env_parse::<u64>("RETRY_MAX_MS") {
            retry = retry.with_max_interval(Duration::from_millis(ms));
        }
        config.store_retry = retry.clone();
        config.record_retry = retry;

        if let Some(flag) = env_parse::<bool>("REQUIRE_ACCOMPLISHED") {
            config.require_accomplished = flag;
        }
        if let Some(flag) = env_parse::<bool>("SKIP_ALREADY_ISSUED") {
            config.skip_already_issued = flag;
        }
        if let Some(offset) = env_parse::<i32>("CERTIFICATE_UTC_OFFSET_MINUTES") {
            config.utc_offset_minutes = offset;
        }

        config
    }

    pub fn with_roster(mut self, roster: RosterPolicy) -> Self {
        self.roster = roster;
        self
    }

    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max.max(1);
        self
    }

    pub fn with_recipient_timeout(mut self, timeout: Duration) -> Self {
        self.recipient_timeout = timeout;
        self
    }

    pub fn with_batch_deadline(mut self, deadline: Duration) -> Self {
        self.batch_deadline_secs = Some(deadline.as_secs().max(1));
        self
    }

    /// Use the same policy for both the store adapter and the recorder
    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.store_retry = policy.clone();
        self.record_retry = policy;
        self
    }

    pub fn with_require_accomplished(mut self, require: bool) -> Self {
        self.require_accomplished = require;
        self
    }

    pub fn with_skip_already_issued(mut self, skip: bool) -> Self {
        self.skip_already_issued = skip;
        self
    }

    pub fn with_utc_offset_minutes(mut self, minutes: i32) -> Self {
        self.utc_offset_minutes = minutes;
        self
    }

    pub fn batch_deadline(&self) -> Option<Duration> {
        self.batch_deadline_secs.map(Duration::from_secs)
    }

    /// Offset for printed dates; out-of-range values fall back to UTC
    pub fn display_offset(&self) -> FixedOffset {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok().filter(|v| !v.trim().is_empty())?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring invalid environment value");
            None
        }
    }
}

mod secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DistributionConfig::default();
        assert_eq!(config.roster, RosterPolicy::Attendance);
        assert_eq!(config.max_concurrency, 4);
        assert_eq!(config.recipient_timeout, Duration::from_secs(60));
        assert!(config.batch_deadline().is_none());
        assert!(!config.require_accomplished);
        assert_eq!(config.display_offset().local_minus_utc(), 0);
    }

    #[test]
    fn test_roster_policy_parse() {
        assert_eq!(
            "respondents".parse::<RosterPolicy>().unwrap(),
            RosterPolicy::Respondents
        );
        assert_eq!(
            "Attending_Respondents".parse::<RosterPolicy>().unwrap(),
            RosterPolicy::AttendingRespondents
        );
        assert!("everyone".parse::<RosterPolicy>().is_err());
    }

    #[test]
    fn test_invalid_offset_falls_back_to_utc() {
        let config = DistributionConfig::default().with_utc_offset_minutes(24 * 60 * 2);
        assert_eq!(config.display_offset().local_minus_utc(), 0);

        let config = DistributionConfig::default().with_utc_offset_minutes(i32::MAX);
        assert_eq!(config.display_offset().local_minus_utc(), 0);

        let config = DistributionConfig::default().with_utc_offset_minutes(480);
        assert_eq!(config.display_offset().local_minus_utc(), 8 * 3600);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: DistributionConfig =
            serde_json::from_str(r#"{"roster":"respondents","max_concurrency":2}"#).unwrap();
        assert_eq!(config.roster, RosterPolicy::Respondents);
        assert_eq!(config.max_concurrency, 2);
        assert_eq!(config.key_prefix, "pdfs");
    }
}
