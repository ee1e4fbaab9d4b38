//! Email dispatch logs: the backend's record of each reminder batch and the
//! per-invoice send results that arrive after it is queued.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::invoice::{BatchPreview, FilterSpec};

/// Outcome of one invoice's email
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct EmailResult {
    pub invoice_id: String,
    /// "sent" or "failed"
    pub status: String,
    #[serde(default)]
    pub ses_message_id: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub timestamp: String,
}

impl EmailResult {
    pub fn is_sent(&self) -> bool {
        self.status.eq_ignore_ascii_case("sent")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct EmailLog {
    #[serde(default)]
    pub log_id: String,
    #[serde(default)]
    pub timestamp: String,

    #[serde(default, deserialize_with = "string_list")]
    pub departments_selected: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub accounts_selected: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub statuses_selected: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub billing_periods_selected: Vec<String>,

    #[serde(default)]
    pub template_used: String,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_invoices_sent: u64,

    #[serde(default, deserialize_with = "string_list")]
    pub invoice_ids: Vec<String>,
    #[serde(default)]
    pub sent_by: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_content: Option<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub attachments: Vec<String>,
    #[serde(default, deserialize_with = "result_list")]
    pub email_results: Vec<EmailResult>,
}

impl EmailLog {
    /// Snapshot of a dispatched batch. Criteria the operator left open are
    /// recorded as the values the batch actually covered.
    pub fn from_batch(preview: &BatchPreview, filters: &FilterSpec, sent_by: &str) -> Self {
        let departments = if filters.departments.is_empty() {
            preview.departments()
        } else {
            filters.departments.iter().cloned().collect()
        };
        let accounts = if filters.accounts.is_empty() {
            preview.groups.iter().map(|g| g.account.clone()).collect()
        } else {
            filters.accounts.iter().cloned().collect()
        };

        EmailLog {
            log_id: generate_log_id(),
            timestamp: Utc::now().to_rfc3339(),
            departments_selected: departments,
            accounts_selected: accounts,
            statuses_selected: filters.statuses.iter().cloned().collect(),
            billing_periods_selected: filters.billing_periods.iter().cloned().collect(),
            template_used: preview.template_name.clone(),
            total_invoices_sent: preview.invoice_count as u64,
            invoice_ids: preview.invoice_ids(),
            sent_by: sent_by.to_string(),
            email_content: Some(preview.body.clone()),
            attachments: preview.attachments.clone(),
            email_results: Vec::new(),
        }
    }

    pub fn timestamp_utc(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }

    /// (sent, failed) counts from the per-invoice results
    pub fn result_counts(&self) -> (usize, usize) {
        let sent = self.email_results.iter().filter(|r| r.is_sent()).count();
        (sent, self.email_results.len() - sent)
    }
}

/// `LOG-<unix millis>-<8 hex chars>`
pub fn generate_log_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("LOG-{}-{}", Utc::now().timestamp_millis(), &suffix[..8])
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

// Lists come back as plain arrays from some backends and as mixed values from
// others; anything that is not an array of scalars reads as empty.
fn string_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) if items.iter().all(|v| v.is_string() || v.is_number()) => {
            items
                .into_iter()
                .map(|v| match v {
                    Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect()
        }
        _ => Vec::new(),
    })
}

fn result_list<'de, D>(deserializer: D) -> std::result::Result<Vec<EmailResult>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect(),
        _ => Vec::new(),
    })
}

fn lenient_count<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().map(|f| f.max(0.0) as u64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

/// Log viewer criteria. Empty lists and missing dates do not restrict.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogFilter {
    pub departments: Vec<String>,
    pub accounts: Vec<String>,
    pub start: Option<NaiveDate>,
    /// Inclusive through the end of the day
    pub end: Option<NaiveDate>,
    pub templates: Vec<String>,
}

impl LogFilter {
    pub fn matches(&self, log: &EmailLog) -> bool {
        if !self.departments.is_empty()
            && !self
                .departments
                .iter()
                .any(|d| log.departments_selected.contains(d))
        {
            return false;
        }
        if !self.accounts.is_empty()
            && !self
                .accounts
                .iter()
                .any(|a| log.accounts_selected.contains(a))
        {
            return false;
        }
        // Entries without a readable timestamp are never excluded by date
        if let Some(ts) = log.timestamp_utc() {
            let start_of_day = self
                .start
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc());
            if start_of_day.is_some_and(|limit| ts < limit) {
                return false;
            }
            let end_of_day = self
                .end
                .and_then(|d| d.and_hms_milli_opt(23, 59, 59, 999))
                .map(|dt| dt.and_utc());
            if end_of_day.is_some_and(|limit| ts > limit) {
                return false;
            }
        }
        if !self.templates.is_empty() && !self.templates.contains(&log.template_used) {
            return false;
        }
        true
    }

    pub fn apply<'a>(&self, logs: &'a [EmailLog]) -> Vec<&'a EmailLog> {
        logs.iter().filter(|log| self.matches(log)).collect()
    }
}

/// Values offered by the log viewer's filters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogOptions {
    pub departments: Vec<String>,
    /// Accounts from logs that include a selected department, when any are selected
    pub accounts: Vec<String>,
    pub templates: Vec<String>,
}

impl LogOptions {
    pub fn from_logs(logs: &[EmailLog], filter: &LogFilter) -> Self {
        let departments = distinct(logs.iter().flat_map(|l| l.departments_selected.iter()));
        let accounts = distinct(
            logs.iter()
                .filter(|l| {
                    filter.departments.is_empty()
                        || l.departments_selected
                            .iter()
                            .any(|d| filter.departments.contains(d))
                })
                .flat_map(|l| l.accounts_selected.iter()),
        );
        let templates = distinct(logs.iter().map(|l| &l.template_used));

        LogOptions {
            departments,
            accounts,
            templates,
        }
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in values {
        if !out.contains(value) {
            out.push(value.clone());
        }
    }
    out
}
