//! Runtime configuration, read from the environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{PortalError, Result};

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Which [`DataSource`](crate::source::DataSource) implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceKind {
    #[default]
    Remote,
    Fixture,
}

impl FromStr for SourceKind {
    type Err = PortalError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "remote" | "api" => Ok(Self::Remote),
            "fixture" | "demo" => Ok(Self::Fixture),
            other => Err(PortalError::Config(format!("unknown data source {other:?}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortalConfig {
    pub api_base_url: String,
    pub access_token: Option<String>,
    pub source: SourceKind,
    /// CSV roster served by the fixture source instead of the built-in one.
    pub fixture_path: Option<PathBuf>,
    pub request_timeout: Duration,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            access_token: None,
            source: SourceKind::Remote,
            fixture_path: None,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl PortalConfig {
    /// Read `CAMPUS_*` variables from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or blank keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(url) = get("CAMPUS_API_URL") {
            config.api_base_url = url;
        }
        config.access_token = get("CAMPUS_ACCESS_TOKEN");
        if let Some(source) = get("CAMPUS_DATA_SOURCE") {
            config.source = source.parse()?;
        }
        config.fixture_path = get("CAMPUS_FIXTURE").map(PathBuf::from);
        if let Some(secs) = get("CAMPUS_TIMEOUT_SECS") {
            let secs: u64 = secs
                .trim()
                .parse()
                .map_err(|_| PortalError::Config(format!("CAMPUS_TIMEOUT_SECS must be whole seconds, got {secs:?}")))?;
            config.request_timeout = Duration::from_secs(secs.max(1));
        }
        Ok(config)
    }
}
