//! CAS (Central Authentication Service) client.
//!
//! Builds the login/logout redirect targets and redeems service tickets
//! against `/serviceValidate`.

use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::config::ServerConfig;

static CAS_USER: Lazy<Regex> = Lazy::new(|| Regex::new(r"<cas:user>(\S+)</cas:user>").expect("static regex"));

/// Result of redeeming a ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Success { username: String },
    /// The provider answered but did not vouch for a user.
    Rejected,
    /// The exchange with the provider failed.
    TransportError(String),
}

/// Scan a `serviceValidate` response body for the authenticated user.
pub fn parse_validation_body(body: &str) -> ValidationOutcome {
    match CAS_USER.captures(body).and_then(|c| c.get(1)) {
        Some(m) => ValidationOutcome::Success { username: m.as_str().to_string() },
        None => ValidationOutcome::Rejected,
    }
}

#[derive(Debug, Clone)]
pub struct CasClient {
    http: reqwest::Client,
    cas_base_url: String,
    callback_url: String,
    retries: u32,
}

impl CasClient {
    pub fn new(cfg: &ServerConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(cfg.validate_timeout)
            .build()
            .context("While building the CAS http client")?;
        Ok(CasClient {
            http,
            cas_base_url: crate::config::trim_base(&cfg.cas_base_url),
            callback_url: cfg.callback_url(),
            retries: cfg.validate_retries,
        })
    }

    pub fn callback_url(&self) -> &str {
        &self.callback_url
    }

    pub fn login_url(&self) -> String {
        format!("{}/login?service={}", self.cas_base_url, urlencoding::encode(&self.callback_url))
    }

    pub fn logout_url(&self) -> String {
        format!("{}/logout", self.cas_base_url)
    }

    pub fn validate_url(&self, ticket: &str) -> String {
        format!(
            "{}/serviceValidate?ticket={}&service={}",
            self.cas_base_url,
            urlencoding::encode(ticket),
            urlencoding::encode(&self.callback_url)
        )
    }

    async fn fetch(&self, url: &str) -> Result<String, reqwest::Error> {
        let resp = self.http.get(url).send().await?;
        debug!(target: "cas", status = %resp.status(), "serviceValidate answered");
        resp.text().await
    }

    /// Redeem `ticket`. Only connect failures are retried: once the request
    /// has reached the provider the ticket may be consumed, so timeouts and
    /// body read failures end the exchange.
    pub async fn validate(&self, ticket: &str) -> ValidationOutcome {
        self.redeem(ticket).await.0
    }

    /// Like `validate`, also returning how many requests were attempted.
    async fn redeem(&self, ticket: &str) -> (ValidationOutcome, u32) {
        let url = self.validate_url(ticket);
        let mut attempt: u32 = 1;
        loop {
            match self.fetch(&url).await {
                Ok(body) => return (parse_validation_body(&body), attempt),
                Err(e) if e.is_connect() && attempt <= self.retries => {
                    warn!(target: "cas", attempt, "cannot connect to CAS, retrying: {}", e);
                    attempt += 1;
                }
                Err(e) => return (ValidationOutcome::TransportError(e.to_string()), attempt),
            }
        }
    }
}
