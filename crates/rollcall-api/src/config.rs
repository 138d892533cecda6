// Server configuration
//
// Loaded from environment variables (after .env via dotenvy). Distribution
// tuning lives in rollcall_core::DistributionConfig and is loaded alongside.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use rollcall_core::DistributionConfig;

/// Where rendered certificates are stored
#[derive(Debug, Clone, PartialEq)]
pub enum BlobBackend {
    /// Local directory, served by this server under /files
    Fs {
        root: PathBuf,
        public_base_url: String,
    },
    /// Object gateway accepting PUT uploads
    Http {
        endpoint: String,
        public_base_url: String,
        token: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub database_url: String,
    pub run_migrations: bool,
    pub bind_address: String,
    pub api_prefix: String,
    pub cors_origins: Vec<String>,
    pub template_path: PathBuf,
    pub blob: BlobBackend,
    /// None disables the periodic status sweep
    pub status_sweep_interval: Option<Duration>,
    pub distribution: DistributionConfig,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::from_lookup(|key| std::env::var(key).ok())?;
        config.distribution = DistributionConfig::from_env();
        Ok(config)
    }

    /// Build from an arbitrary key lookup (the environment in production)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_url = get("DATABASE_URL").context("DATABASE_URL environment variable required")?;
        let bind_address = get("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:8080".to_string());

        let run_migrations = match get("RUN_MIGRATIONS") {
            Some(v) => parse_bool(&v).with_context(|| format!("invalid RUN_MIGRATIONS: {v}"))?,
            None => true,
        };

        let cors_origins = get("CORS_ALLOWED_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let blob = match get("BLOB_BACKEND").as_deref().unwrap_or("fs") {
            "fs" => BlobBackend::Fs {
                root: PathBuf::from(get("BLOB_ROOT").unwrap_or_else(|| "./data/blobs".to_string())),
                public_base_url: get("BLOB_PUBLIC_BASE_URL")
                    .unwrap_or_else(|| "http://localhost:8080/files".to_string()),
            },
            "http" => {
                let endpoint = get("BLOB_HTTP_ENDPOINT")
                    .context("BLOB_HTTP_ENDPOINT is required when BLOB_BACKEND=http")?;
                BlobBackend::Http {
                    public_base_url: get("BLOB_PUBLIC_BASE_URL").unwrap_or_else(|| endpoint.clone()),
                    endpoint,
                    token: get("BLOB_HTTP_TOKEN"),
                }
            }
            other => bail!("unknown BLOB_BACKEND: {other} (expected fs or http)"),
        };

        let status_sweep_interval = match get("STATUS_SWEEP_INTERVAL_SECS") {
            Some(v) => {
                let secs: u64 = v
                    .parse()
                    .with_context(|| format!("invalid STATUS_SWEEP_INTERVAL_SECS: {v}"))?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            database_url,
            run_migrations,
            bind_address,
            api_prefix: get("API_PREFIX").unwrap_or_default(),
            cors_origins,
            template_path: PathBuf::from(
                get("CERTIFICATE_TEMPLATE_PATH").unwrap_or_else(|| "template.pdf".to_string()),
            ),
            blob,
            status_sweep_interval,
            distribution: DistributionConfig::default(),
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ApiConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://db")])).unwrap();
        assert_eq!(config.bind_address, "0.0.0.0:8080");
        assert!(config.run_migrations);
        assert!(config.cors_origins.is_empty());
        assert_eq!(config.template_path, PathBuf::from("template.pdf"));
        assert_eq!(config.status_sweep_interval, None);
        assert!(matches!(config.blob, BlobBackend::Fs { .. }));
    }

    #[test]
    fn test_database_url_required() {
        assert!(ApiConfig::from_lookup(lookup(&[])).is_err());
    }

    #[test]
    fn test_http_backend() {
        let config = ApiConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db"),
            ("BLOB_BACKEND", "http"),
            ("BLOB_HTTP_ENDPOINT", "https://objects.example.edu/certs"),
            ("BLOB_HTTP_TOKEN", "secret"),
        ]))
        .unwrap();
        assert_eq!(
            config.blob,
            BlobBackend::Http {
                endpoint: "https://objects.example.edu/certs".into(),
                public_base_url: "https://objects.example.edu/certs".into(),
                token: Some("secret".into()),
            }
        );
    }

    #[test]
    fn test_http_backend_needs_endpoint() {
        let result = ApiConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db"),
            ("BLOB_BACKEND", "http"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_sweep_interval_and_cors() {
        let config = ApiConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db"),
            ("STATUS_SWEEP_INTERVAL_SECS", "300"),
            ("CORS_ALLOWED_ORIGINS", "https://a.example.edu, https://b.example.edu,"),
            ("RUN_MIGRATIONS", "false"),
        ]))
        .unwrap();
        assert_eq!(config.status_sweep_interval, Some(Duration::from_secs(300)));
        assert_eq!(config.cors_origins.len(), 2);
        assert!(!config.run_migrations);

        let config = ApiConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db"),
            ("STATUS_SWEEP_INTERVAL_SECS", "0"),
        ]))
        .unwrap();
        assert_eq!(config.status_sweep_interval, None);
    }
}
