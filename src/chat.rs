//! Assistant chat. The conversation lives in the backend, keyed by an opaque
//! session id that the caller keeps and passes back in.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::ApiClient;
use crate::error::{ReminderError, Result};

/// Accepts wrapped and unpadded exports as well as canonical base64
const CSV_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Chat session owned by the caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChatSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl ChatSession {
    pub fn is_open(&self) -> bool {
        self.session_id.is_some()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CloseRequest<'a> {
    session_id: &'a str,
}

/// Raw `/chat` response
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatPayload {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub csv_base64: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub count: Option<Value>,
}

/// A CSV file produced by the assistant
#[derive(Debug, Clone, PartialEq)]
pub struct CsvExport {
    pub filename: String,
    /// Row count as reported by the backend
    pub rows: Option<String>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChatReply {
    Text(String),
    Csv(CsvExport),
    Empty,
}

impl ChatPayload {
    pub fn into_reply(self) -> Result<ChatReply> {
        if self.source.as_deref() == Some("csv") {
            if let Some(encoded) = self.csv_base64.as_deref() {
                let compact: String = encoded
                    .chars()
                    .filter(|c| !c.is_ascii_whitespace())
                    .collect();
                let data = CSV_ENGINE
                    .decode(compact)
                    .map_err(|e| ReminderError::InvalidExport(e.to_string()))?;
                let rows = self.count.as_ref().and_then(|c| match c {
                    Value::Number(n) => Some(n.to_string()),
                    Value::String(s) if !s.is_empty() => Some(s.clone()),
                    _ => None,
                });
                return Ok(ChatReply::Csv(CsvExport {
                    filename: self
                        .filename
                        .filter(|f| !f.trim().is_empty())
                        .unwrap_or_else(|| "export.csv".to_string()),
                    rows,
                    data,
                }));
            }
        }
        match self.text {
            Some(text) if !text.is_empty() => Ok(ChatReply::Text(text)),
            _ => Ok(ChatReply::Empty),
        }
    }
}

/// Send one message, adopting whatever session id the backend hands back
pub fn send_message(api: &ApiClient, session: &mut ChatSession, message: &str) -> Result<ChatReply> {
    let request = ChatRequest {
        message,
        session_id: session.session_id.as_deref(),
    };
    let payload: Option<ChatPayload> = api.post_json("/chat", &request)?;
    let payload = payload.unwrap_or_default();
    if let Some(id) = payload.session_id.as_ref().filter(|id| !id.is_empty()) {
        session.session_id = Some(id.clone());
    }
    payload.into_reply()
}

/// End the backend session. The local session is cleared even when the
/// backend call fails.
pub fn close_session(api: &ApiClient, session: &mut ChatSession) -> bool {
    let Some(id) = session.session_id.take() else {
        return false;
    };
    let result: Result<Value> = api.post_json("/chat/close", &CloseRequest { session_id: &id });
    if let Err(e) = result {
        log::warn!("failed to close chat session {id}: {e}");
    }
    true
}
