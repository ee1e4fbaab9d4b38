use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{Invoice, PaymentStatus};
use crate::error::{ReminderError, Result};

/// Status criteria in the order they take precedence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    TotalUnpaid,
    Paid,
    Due,
    Overdue,
}

/// (value, label) pairs offered for the status criterion
pub const STATUS_OPTIONS: [(&str, &str); 4] = [
    ("due", "Due"),
    ("overdue", "Overdue"),
    ("paid", "Paid"),
    ("total_unpaid", "Total Unpaid"),
];

impl StatusFilter {
    const PRIORITY: [StatusFilter; 4] = [
        StatusFilter::TotalUnpaid,
        StatusFilter::Paid,
        StatusFilter::Due,
        StatusFilter::Overdue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusFilter::TotalUnpaid => "total_unpaid",
            StatusFilter::Paid => "paid",
            StatusFilter::Due => "due",
            StatusFilter::Overdue => "overdue",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        Self::PRIORITY
            .into_iter()
            .find(|s| s.as_str() == value)
            .ok_or_else(|| ReminderError::InvalidStatus(value.to_string()))
    }

    /// The single rule applied for a set of requested statuses. Only the
    /// highest-priority requested status is used; the others are ignored.
    pub fn effective(requested: &BTreeSet<String>) -> Option<Self> {
        Self::PRIORITY
            .into_iter()
            .find(|s| requested.contains(s.as_str()))
    }

    pub fn matches(&self, invoice: &Invoice) -> bool {
        match self {
            StatusFilter::TotalUnpaid => invoice.payment_status == PaymentStatus::Unpaid,
            StatusFilter::Paid => invoice.payment_status == PaymentStatus::Paid,
            StatusFilter::Due => invoice.status == "due",
            StatusFilter::Overdue => invoice.status == "over due" || invoice.status == "overdue",
        }
    }
}

/// Operator filter criteria. An empty set means "no restriction".
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct FilterSpec {
    #[serde(default)]
    pub departments: BTreeSet<String>,
    #[serde(default)]
    pub accounts: BTreeSet<String>,
    #[serde(default)]
    pub statuses: BTreeSet<String>,
    #[serde(default)]
    pub billing_periods: BTreeSet<String>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.departments.is_empty()
            && self.accounts.is_empty()
            && self.statuses.is_empty()
            && self.billing_periods.is_empty()
    }

    /// Replace the department criterion. Accounts depend on departments, so
    /// the account criterion is reset along with it.
    pub fn set_departments<I: IntoIterator<Item = String>>(&mut self, departments: I) {
        self.departments = departments.into_iter().collect();
        self.accounts.clear();
    }

    /// Drop saved values that no longer occur in `invoices`, returning
    /// `(field, value)` for each one removed. Accounts are checked against
    /// the departments that survive.
    pub fn prune_stale(&mut self, invoices: &[Invoice]) -> Vec<(&'static str, String)> {
        let mut dropped = Vec::new();
        let offered = FilterOptions::from_invoices(invoices, self);
        prune_values("department", &mut self.departments, &offered.departments, &mut dropped);
        prune_values(
            "billing period",
            &mut self.billing_periods,
            &offered.billing_periods,
            &mut dropped,
        );
        let offered = FilterOptions::from_invoices(invoices, self);
        prune_values("account", &mut self.accounts, &offered.accounts, &mut dropped);
        dropped
    }

    pub fn matches(&self, invoice: &Invoice) -> bool {
        if !self.departments.is_empty() && !self.departments.contains(&invoice.department) {
            return false;
        }
        if !self.accounts.is_empty() && !self.accounts.contains(&invoice.account) {
            return false;
        }
        if !self.statuses.is_empty() {
            if let Some(status) = StatusFilter::effective(&self.statuses) {
                if !status.matches(invoice) {
                    return false;
                }
            }
        }
        if !self.billing_periods.is_empty()
            && !self.billing_periods.contains(&invoice.billing_period)
        {
            return false;
        }
        true
    }
}

/// Visible subset of `invoices` under `spec`, in original order
pub fn apply<'a>(invoices: &'a [Invoice], spec: &FilterSpec) -> Vec<&'a Invoice> {
    invoices.iter().filter(|inv| spec.matches(inv)).collect()
}

/// Values the operator may choose from for each criterion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOptions {
    pub departments: Vec<String>,
    /// Constrained to the selected departments when any are selected
    pub accounts: Vec<String>,
    pub billing_periods: Vec<String>,
}

impl FilterOptions {
    pub fn from_invoices(invoices: &[Invoice], spec: &FilterSpec) -> Self {
        let departments = distinct(invoices.iter().map(|inv| inv.department.as_str()));
        let accounts = distinct(
            invoices
                .iter()
                .filter(|inv| {
                    spec.departments.is_empty() || spec.departments.contains(&inv.department)
                })
                .map(|inv| inv.account.as_str()),
        );
        let billing_periods = distinct(invoices.iter().map(|inv| inv.billing_period.as_str()));

        FilterOptions {
            departments,
            accounts,
            billing_periods,
        }
    }

    /// Reject any criterion value the operator could not have been offered
    pub fn validate(&self, spec: &FilterSpec) -> Result<()> {
        check_values("department", &spec.departments, &self.departments)?;
        check_values("account", &spec.accounts, &self.accounts)?;
        check_values("billing period", &spec.billing_periods, &self.billing_periods)?;
        for status in &spec.statuses {
            StatusFilter::parse(status)?;
        }
        Ok(())
    }
}

fn prune_values(
    field: &'static str,
    requested: &mut BTreeSet<String>,
    offered: &[String],
    dropped: &mut Vec<(&'static str, String)>,
) {
    requested.retain(|value| {
        let keep = offered.contains(value);
        if !keep {
            dropped.push((field, value.clone()));
        }
        keep
    });
}

fn check_values(
    field: &'static str,
    requested: &BTreeSet<String>,
    offered: &[String],
) -> Result<()> {
    match requested.iter().find(|v| !offered.contains(v)) {
        Some(value) => Err(ReminderError::UnknownFilterValue {
            field,
            value: value.clone(),
        }),
        None => Ok(()),
    }
}

/// Non-empty values in first-occurrence order
fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in values {
        if !value.is_empty() && !out.iter().any(|v| v == value) {
            out.push(value.to_string());
        }
    }
    out
}
