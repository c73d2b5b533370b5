//! Client and store configuration loaded from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// How `Store::load_all` treats a partial failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadPolicy {
    /// Apply whichever collection fetched successfully.
    #[default]
    Independent,
    /// Apply nothing unless both collections fetched successfully.
    AllOrNothing,
}

impl FromStr for LoadPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "independent" => Ok(Self::Independent),
            "all-or-nothing" | "all_or_nothing" => Ok(Self::AllOrNothing),
            other => Err(format!("unknown load policy: {other}")),
        }
    }
}

/// Store behaviour knobs.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub load_policy: LoadPolicy,
    /// Upper bound for every remote call; `None` waits forever.
    pub request_timeout: Option<Duration>,
    /// Whether a failed mutation also sets the shared error.
    pub record_mutation_errors: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            load_policy: LoadPolicy::default(),
            request_timeout: Some(Duration::from_secs(30)),
            record_mutation_errors: true,
        }
    }
}

impl StoreConfig {
    /// Load from `QUILL_LOAD_POLICY`, `QUILL_REQUEST_TIMEOUT_SECS` (0 disables)
    /// and `QUILL_RECORD_MUTATION_ERRORS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let load_policy = match env::var("QUILL_LOAD_POLICY") {
            Ok(raw) => raw.parse().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Ignoring QUILL_LOAD_POLICY");
                defaults.load_policy
            }),
            Err(_) => defaults.load_policy,
        };

        let request_timeout = env::var("QUILL_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(|secs| (secs > 0).then(|| Duration::from_secs(secs)))
            .unwrap_or(defaults.request_timeout);

        Self {
            load_policy,
            request_timeout,
            record_mutation_errors: env::var("QUILL_RECORD_MUTATION_ERRORS")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(defaults.record_mutation_errors),
        }
    }
}

/// Where the API lives.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    pub fn from_env() -> Self {
        env::var("QUILL_API_URL")
            .map(Self::new)
            .unwrap_or_default()
    }

    /// Absolute URL for an `/api`-relative path.
    pub fn api_url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url.trim_end_matches('/'), path)
    }
}
