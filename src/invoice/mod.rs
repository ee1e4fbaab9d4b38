mod batch;
mod filter;
mod selection;
mod view;

pub use batch::{compose, AccountGroup, BatchPreview};
pub use filter::{apply, FilterOptions, FilterSpec, StatusFilter, STATUS_OPTIONS};
pub use selection::Selection;
pub use view::{paginate, sort_invoices, Page, SortColumn};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::error::{ReminderError, Result};

/// Normalized payment status, distinct from the raw backend status string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Paid,
    Unpaid,
    Due,
    Overdue,
    Unknown,
}

impl PaymentStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "paid" => PaymentStatus::Paid,
            "unpaid" => PaymentStatus::Unpaid,
            "due" => PaymentStatus::Due,
            "overdue" | "over due" => PaymentStatus::Overdue,
            _ => PaymentStatus::Unknown,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Unpaid => "UNPAID",
            PaymentStatus::Due => "DUE",
            PaymentStatus::Overdue => "OVERDUE",
            PaymentStatus::Unknown => "UNKNOWN",
        };
        f.write_str(label)
    }
}

/// Amounts arrive either as JSON numbers or as formatted strings
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Number(f64),
    Text(String),
}

impl RawAmount {
    fn value(&self) -> Option<f64> {
        match self {
            RawAmount::Number(n) => Some(*n),
            // Only grouping and currency marks are dropped; anything else that
            // does not parse is treated as missing
            RawAmount::Text(s) => {
                let cleaned: String = s
                    .chars()
                    .filter(|c| *c != ',' && *c != '$' && !c.is_whitespace())
                    .collect();
                cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
            }
        }
    }
}

/// Invoice record as returned by `GET /invoices`
#[derive(Debug, Deserialize)]
pub struct RawInvoice {
    invoice_id: String,
    #[serde(default)]
    account_name: Option<String>,
    #[serde(default)]
    department_name: Option<String>,
    #[serde(default)]
    billing_period: Option<String>,
    #[serde(default)]
    due_date: Option<String>,
    #[serde(default)]
    invoice_amount: Option<RawAmount>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    payment_status: Option<String>,
    #[serde(default)]
    balance_due: Option<RawAmount>,
    #[serde(default)]
    paid_timestamp: Option<String>,
    #[serde(default)]
    processed_timestamp: Option<String>,
    #[serde(default)]
    lastupdated: Option<String>,
    #[serde(default)]
    payer_account_id: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    service_provider: Option<String>,
    #[serde(default)]
    s3_object_key: Option<String>,
}

/// An invoice as held by the dashboard; immutable once fetched
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Invoice {
    pub id: String,
    pub account: String,
    pub department: String,
    pub billing_period: String,
    pub due_date: String,
    pub amount: f64,
    pub balance_due: Option<f64>,
    /// Lowercased backend status, e.g. "due" or "over due"
    pub status: String,
    pub payment_status: PaymentStatus,
    pub paid_at: Option<String>,
    pub processed_at: Option<String>,
    pub updated_at: Option<String>,
    pub payer_account_id: Option<String>,
    pub email: Option<String>,
    pub service_provider: Option<String>,
    pub object_key: String,
}

impl From<RawInvoice> for Invoice {
    fn from(raw: RawInvoice) -> Self {
        let status = raw.status.unwrap_or_default().trim().to_lowercase();
        let payment_status = PaymentStatus::parse(raw.payment_status.as_deref().unwrap_or(""));
        Invoice {
            id: raw.invoice_id,
            account: raw.account_name.unwrap_or_default(),
            department: raw.department_name.unwrap_or_default(),
            billing_period: raw.billing_period.unwrap_or_default(),
            due_date: raw.due_date.unwrap_or_default(),
            amount: raw
                .invoice_amount
                .as_ref()
                .and_then(RawAmount::value)
                .unwrap_or(0.0),
            balance_due: raw.balance_due.as_ref().and_then(RawAmount::value),
            status,
            payment_status,
            paid_at: raw.paid_timestamp,
            processed_at: raw.processed_timestamp,
            updated_at: raw.lastupdated,
            payer_account_id: raw.payer_account_id,
            email: raw.email,
            service_provider: raw.service_provider,
            object_key: raw.s3_object_key.unwrap_or_default(),
        }
    }
}

impl Invoice {
    /// Outstanding balance, falling back to the invoice amount
    pub fn balance(&self) -> f64 {
        self.balance_due.unwrap_or(self.amount)
    }

    pub fn is_due(&self) -> bool {
        self.status == "due" || self.payment_status == PaymentStatus::Due
    }

    pub fn is_overdue(&self) -> bool {
        self.status == "over due"
            || self.status == "overdue"
            || self.payment_status == PaymentStatus::Overdue
    }

    /// File name of the stored attachment object
    pub fn attachment_name(&self) -> &str {
        self.object_key.rsplit('/').next().unwrap_or(&self.object_key)
    }
}

/// The full set of invoices fetched for one command
#[derive(Debug, Clone, Default)]
pub struct InvoiceStore {
    invoices: Vec<Invoice>,
}

impl InvoiceStore {
    pub fn new(invoices: Vec<Invoice>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(invoices.len());
        for invoice in &invoices {
            if !seen.insert(invoice.id.as_str()) {
                return Err(ReminderError::DuplicateInvoice(invoice.id.clone()));
            }
        }
        Ok(Self { invoices })
    }

    pub fn from_raw(raw: Vec<RawInvoice>) -> Result<Self> {
        Self::new(raw.into_iter().map(Invoice::from).collect())
    }

    pub fn all(&self) -> &[Invoice] {
        &self.invoices
    }

    pub fn get(&self, id: &str) -> Option<&Invoice> {
        self.invoices.iter().find(|inv| inv.id == id)
    }

    pub fn len(&self) -> usize {
        self.invoices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invoices.is_empty()
    }

    pub fn stats(&self) -> DashboardStats {
        DashboardStats::from_invoices(&self.invoices)
    }
}

/// Headline counts shown above the invoice table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DashboardStats {
    pub total: usize,
    pub paid: usize,
    pub due: usize,
    pub overdue: usize,
    pub total_unpaid: usize,
}

impl DashboardStats {
    pub fn from_invoices(invoices: &[Invoice]) -> Self {
        let paid = invoices
            .iter()
            .filter(|inv| inv.payment_status == PaymentStatus::Paid)
            .count();
        let due = invoices.iter().filter(|inv| inv.status == "due").count();
        let overdue = invoices
            .iter()
            .filter(|inv| inv.status == "over due" || inv.status == "overdue")
            .count();
        DashboardStats {
            total: invoices.len(),
            paid,
            due,
            overdue,
            total_unpaid: due + overdue,
        }
    }
}
