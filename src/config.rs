//! Server configuration.
//!
//! Values come from `CRYPTSESSION_*` environment variables; the binary layers
//! command-line flags on top. Lookup goes through a closure so tests never
//! touch the process environment.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use crate::codec::{IV_LEN, KEY_LEN};

pub const DEFAULT_HTTP_PORT: u16 = 3000;
pub const DEFAULT_CAS_URL: &str = "https://testcas.cs.ksu.edu";
pub const DEFAULT_PUBLIC_DIR: &str = "public";
pub const DEFAULT_VALIDATE_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_VALIDATE_RETRIES: u32 = 1;

// Development secrets; compatible with cookies minted by the original demo.
const DEV_KEY: &[u8; KEY_LEN] = b"abcd1234abcd1234abcd1234abcd1234";
const DEV_IV: &[u8; IV_LEN] = b"abcd1234abcd1234";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be exactly {expected} bytes, got {actual}")]
    BadLength { name: &'static str, expected: usize, actual: usize },
    #[error("{name}: cannot parse '{value}'")]
    BadNumber { name: &'static str, value: String },
}

#[derive(Clone)]
pub struct ServerConfig {
    pub http_port: u16,
    pub key: [u8; KEY_LEN],
    pub iv: [u8; IV_LEN],
    /// Base URL of the CAS server, without trailing slash.
    pub cas_base_url: String,
    /// Externally reachable base URL of this server, without trailing slash.
    pub service_base_url: String,
    pub public_dir: PathBuf,
    /// Per-attempt bound on the ticket validation call.
    pub validate_timeout: Duration,
    /// Extra attempts after a transport failure.
    pub validate_retries: u32,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("http_port", &self.http_port)
            .field("cas_base_url", &self.cas_base_url)
            .field("service_base_url", &self.service_base_url)
            .field("public_dir", &self.public_dir)
            .field("validate_timeout", &self.validate_timeout)
            .field("validate_retries", &self.validate_retries)
            .finish_non_exhaustive()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            http_port: DEFAULT_HTTP_PORT,
            key: *DEV_KEY,
            iv: *DEV_IV,
            cas_base_url: DEFAULT_CAS_URL.to_string(),
            service_base_url: format!("http://localhost:{}", DEFAULT_HTTP_PORT),
            public_dir: PathBuf::from(DEFAULT_PUBLIC_DIR),
            validate_timeout: Duration::from_millis(DEFAULT_VALIDATE_TIMEOUT_MS),
            validate_retries: DEFAULT_VALIDATE_RETRIES,
        }
    }
}

fn fixed_bytes<const N: usize>(name: &'static str, value: &str) -> Result<[u8; N], ConfigError> {
    value
        .as_bytes()
        .try_into()
        .map_err(|_| ConfigError::BadLength { name, expected: N, actual: value.len() })
}

fn parse_num<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::BadNumber { name, value: value.to_string() })
}

pub(crate) fn trim_base(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = ServerConfig::default();

        if let Some(v) = lookup("CRYPTSESSION_HTTP_PORT") {
            cfg.http_port = parse_num("CRYPTSESSION_HTTP_PORT", &v)?;
        }
        match lookup("CRYPTSESSION_KEY") {
            Some(v) => cfg.key = fixed_bytes("CRYPTSESSION_KEY", &v)?,
            None => warn!(target: "config", "CRYPTSESSION_KEY unset; using the built-in development key"),
        }
        match lookup("CRYPTSESSION_IV") {
            Some(v) => cfg.iv = fixed_bytes("CRYPTSESSION_IV", &v)?,
            None => warn!(target: "config", "CRYPTSESSION_IV unset; using the built-in development IV"),
        }
        if let Some(v) = lookup("CRYPTSESSION_CAS_URL") {
            cfg.cas_base_url = trim_base(&v);
        }
        cfg.service_base_url = match lookup("CRYPTSESSION_SERVICE_URL") {
            Some(v) => trim_base(&v),
            None => format!("http://localhost:{}", cfg.http_port),
        };
        if let Some(v) = lookup("CRYPTSESSION_PUBLIC_DIR") {
            cfg.public_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("CRYPTSESSION_VALIDATE_TIMEOUT_MS") {
            let ms: u64 = parse_num("CRYPTSESSION_VALIDATE_TIMEOUT_MS", &v)?;
            cfg.validate_timeout = Duration::from_millis(ms);
        }
        if let Some(v) = lookup("CRYPTSESSION_VALIDATE_RETRIES") {
            cfg.validate_retries = parse_num("CRYPTSESSION_VALIDATE_RETRIES", &v)?;
        }
        Ok(cfg)
    }

    /// URL the CAS server sends the browser back to with a ticket.
    pub fn callback_url(&self) -> String {
        format!("{}/ticket", self.service_base_url)
    }
}
