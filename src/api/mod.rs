mod auth;

pub use auth::{provider_from_config, CommandToken, EnvToken, StaticToken, TokenProvider};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use ureq::Agent;

use crate::config::Config;
use crate::error::{ReminderError, Result};
use crate::invoice::RawInvoice;
use crate::logs::{generate_log_id, EmailLog};

/// Body of `POST /send-emails`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SendEmailsRequest {
    pub invoice_ids: Vec<String>,
    /// None asks the backend to apply its default template
    pub template: Option<String>,
    pub sent_by: String,
    pub attachments: Vec<String>,
}

/// Enqueue acknowledgment; per-invoice results arrive later through the logs
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SendEmailsResponse {
    #[serde(default)]
    pub enqueued_departments: u64,
}

/// Hands a reminder batch to whatever sends the emails
pub trait Dispatch {
    fn send_emails(&self, request: &SendEmailsRequest) -> Result<SendEmailsResponse>;
}

/// Blocking client for the reminder backend. Every request carries a bearer
/// token from the injected provider.
pub struct ApiClient {
    agent: Agent,
    base_url: String,
    tokens: Box<dyn TokenProvider>,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration, tokens: Box<dyn TokenProvider>) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.api.base_url,
            Duration::from_secs(config.api.timeout_secs),
            provider_from_config(&config.auth),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn bearer(&self) -> Result<String> {
        Ok(format!("Bearer {}", self.tokens.access_token()?))
    }

    pub(crate) fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        log::debug!("GET {url}");
        let response = self
            .agent
            .get(&url)
            .header("Authorization", self.bearer()?)
            .call()
            .map_err(|e| ReminderError::Transport {
                path: path.to_string(),
                reason: e.to_string(),
            })?;
        self.read_response(path, response)
    }

    pub(crate) fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = self.url(path);
        let payload = serde_json::to_string(body).map_err(|e| ReminderError::Decode {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        log::debug!("POST {url}");
        let response = self
            .agent
            .post(&url)
            .header("Authorization", self.bearer()?)
            .header("Content-Type", "application/json")
            .send(payload)
            .map_err(|e| ReminderError::Transport {
                path: path.to_string(),
                reason: e.to_string(),
            })?;
        self.read_response(path, response)
    }

    fn read_response<T: DeserializeOwned>(
        &self,
        path: &str,
        mut response: ureq::http::Response<ureq::Body>,
    ) -> Result<T> {
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ReminderError::Transport {
                path: path.to_string(),
                reason: e.to_string(),
            })?;

        if status == 401 {
            log::error!("{path}: backend rejected the access token");
            return Err(ReminderError::InteractionRequired {
                login: self.tokens.login_hint().to_string(),
            });
        }
        if !(200..300).contains(&status) {
            log::error!("{path}: backend returned {status}");
            return Err(ReminderError::Backend {
                path: path.to_string(),
                status,
                body: body.trim().to_string(),
            });
        }

        let body = if body.trim().is_empty() { "null" } else { body.as_str() };
        serde_json::from_str(body).map_err(|e| ReminderError::Decode {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }

    pub fn list_invoices(&self) -> Result<Vec<RawInvoice>> {
        self.get_json("/invoices")
    }

    pub fn get_invoice(&self, id: &str) -> Result<RawInvoice> {
        match self.get_json(&format!("/invoices/{id}")) {
            Err(ReminderError::Backend { status: 404, .. }) => {
                Err(ReminderError::InvoiceNotFound(id.to_string()))
            }
            other => other,
        }
    }

    pub fn mark_paid(&self, id: &str) -> Result<()> {
        let _: serde_json::Value =
            self.post_json(&format!("/invoices/{id}/mark-paid"), &serde_json::json!({}))?;
        Ok(())
    }

    pub fn list_logs(&self) -> Result<Vec<EmailLog>> {
        self.get_json("/logs")
    }

    /// Store a log entry, filling in the id and timestamp when missing
    pub fn save_log(&self, entry: &mut EmailLog) -> Result<()> {
        if entry.log_id.is_empty() {
            entry.log_id = generate_log_id();
        }
        if entry.timestamp.is_empty() {
            entry.timestamp = chrono::Utc::now().to_rfc3339();
        }
        let _: serde_json::Value = self.post_json("/logs", &*entry)?;
        log::info!("log saved: {}", entry.log_id);
        Ok(())
    }
}

impl Dispatch for ApiClient {
    fn send_emails(&self, request: &SendEmailsRequest) -> Result<SendEmailsResponse> {
        self.post_json("/send-emails", request)
    }
}
