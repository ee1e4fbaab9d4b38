use serde::Serialize;

use super::{Invoice, Selection};
use crate::config::Template;

/// Selected invoices for one account
#[derive(Debug, Clone, Serialize)]
pub struct AccountGroup {
    pub account: String,
    pub email: Option<String>,
    pub invoices: Vec<Invoice>,
    pub due_count: usize,
    pub overdue_count: usize,
    pub total_amount: f64,
}

impl AccountGroup {
    fn new(invoice: &Invoice) -> Self {
        AccountGroup {
            account: invoice.account.clone(),
            email: invoice.email.clone(),
            invoices: Vec::new(),
            due_count: 0,
            overdue_count: 0,
            total_amount: 0.0,
        }
    }

    fn push(&mut self, invoice: &Invoice) {
        if invoice.is_due() {
            self.due_count += 1;
        }
        if invoice.is_overdue() {
            self.overdue_count += 1;
        }
        self.total_amount += invoice.balance();
        self.invoices.push(invoice.clone());
    }

    pub fn invoice_count(&self) -> usize {
        self.invoices.len()
    }

    /// Attachment file names for display
    pub fn attachment_names(&self) -> Vec<&str> {
        self.invoices.iter().map(Invoice::attachment_name).collect()
    }

    /// "You have 2 invoices, 1 due, 1 overdue"
    pub fn summary(&self) -> String {
        let count = self.invoice_count();
        let mut out = format!(
            "You have {} invoice{}",
            count,
            if count == 1 { "" } else { "s" }
        );
        if self.due_count > 0 {
            out.push_str(&format!(", {} due", self.due_count));
        }
        if self.overdue_count > 0 {
            out.push_str(&format!(", {} overdue", self.overdue_count));
        }
        out
    }
}

/// What the operator reviews before confirming a dispatch
#[derive(Debug, Clone, Serialize)]
pub struct BatchPreview {
    pub template_name: String,
    pub body: String,
    pub groups: Vec<AccountGroup>,
    pub invoice_count: usize,
    pub due_count: usize,
    pub overdue_count: usize,
    pub total_amount: f64,
    /// Stored object keys of every selected invoice's attachment
    pub attachments: Vec<String>,
}

impl BatchPreview {
    pub fn is_empty(&self) -> bool {
        self.invoice_count == 0
    }

    pub fn invoice_ids(&self) -> Vec<String> {
        self.groups
            .iter()
            .flat_map(|g| g.invoices.iter().map(|inv| inv.id.clone()))
            .collect()
    }

    /// Departments covered by the batch, in first-occurrence order
    pub fn departments(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for invoice in self.groups.iter().flat_map(|g| g.invoices.iter()) {
            if !invoice.department.is_empty() && !out.contains(&invoice.department) {
                out.push(invoice.department.clone());
            }
        }
        out
    }
}

/// Group the selected invoices by account (first-occurrence order) and total
/// them up. Ids in `selection` that are not in `invoices` are ignored.
pub fn compose(invoices: &[Invoice], selection: &Selection, template: &Template) -> BatchPreview {
    let mut groups: Vec<AccountGroup> = Vec::new();
    let mut attachments = Vec::new();

    for invoice in invoices.iter().filter(|inv| selection.contains(&inv.id)) {
        let idx = match groups.iter().position(|g| g.account == invoice.account) {
            Some(idx) => idx,
            None => {
                groups.push(AccountGroup::new(invoice));
                groups.len() - 1
            }
        };
        groups[idx].push(invoice);
        if !invoice.object_key.is_empty() {
            attachments.push(invoice.object_key.clone());
        }
    }

    BatchPreview {
        template_name: template.name.clone(),
        body: template.body.clone(),
        invoice_count: groups.iter().map(AccountGroup::invoice_count).sum(),
        due_count: groups.iter().map(|g| g.due_count).sum(),
        overdue_count: groups.iter().map(|g| g.overdue_count).sum(),
        total_amount: groups.iter().map(|g| g.total_amount).sum(),
        groups,
        attachments,
    }
}
