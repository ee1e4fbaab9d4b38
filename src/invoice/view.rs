use std::cmp::Ordering;
use std::str::FromStr;

use super::Invoice;
use crate::error::{ReminderError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    Id,
    Account,
    Department,
    Period,
    DueDate,
    Balance,
    Status,
}

impl FromStr for SortColumn {
    type Err = ReminderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "id" => Ok(SortColumn::Id),
            "account" => Ok(SortColumn::Account),
            "department" => Ok(SortColumn::Department),
            "period" => Ok(SortColumn::Period),
            "due" | "due-date" => Ok(SortColumn::DueDate),
            "balance" => Ok(SortColumn::Balance),
            "status" => Ok(SortColumn::Status),
            _ => Err(ReminderError::InvalidSortColumn(s.to_string())),
        }
    }
}

fn compare(a: &Invoice, b: &Invoice, column: SortColumn) -> Ordering {
    match column {
        SortColumn::Id => a.id.cmp(&b.id),
        SortColumn::Account => a.account.cmp(&b.account),
        SortColumn::Department => a.department.cmp(&b.department),
        SortColumn::Period => a.billing_period.cmp(&b.billing_period),
        SortColumn::DueDate => a.due_date.cmp(&b.due_date),
        SortColumn::Balance => a.balance().total_cmp(&b.balance()),
        SortColumn::Status => a
            .payment_status
            .to_string()
            .cmp(&b.payment_status.to_string()),
    }
}

/// Stable sort of the visible rows
pub fn sort_invoices(invoices: &mut [&Invoice], column: SortColumn, descending: bool) {
    invoices.sort_by(|a, b| {
        let ord = compare(a, b, column);
        if descending {
            ord.reverse()
        } else {
            ord
        }
    });
}

/// One page of rows plus the numbers for "Showing X to Y of Z"
#[derive(Debug)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    pub page: usize,
    pub total_pages: usize,
    pub start: usize,
    pub total: usize,
}

/// Slice out 1-based `page` of size `per_page`; out-of-range pages clamp to the last page
pub fn paginate<T>(items: &[T], page: usize, per_page: usize) -> Result<Page<'_, T>> {
    if per_page == 0 {
        return Err(ReminderError::InvalidPageSize(per_page));
    }
    let total = items.len();
    let total_pages = total.div_ceil(per_page).max(1);
    let page = page.clamp(1, total_pages);
    let start = ((page - 1) * per_page).min(total);
    let end = (start + per_page).min(total);

    Ok(Page {
        items: &items[start..end],
        page,
        total_pages,
        start,
        total,
    })
}
