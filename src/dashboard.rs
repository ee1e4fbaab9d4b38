//! Operator view over the fetched invoice set: filters, the selected batch,
//! and the confirm-and-send step.

use serde::{Deserialize, Serialize};

use crate::api::{Dispatch, SendEmailsRequest, SendEmailsResponse};
use crate::config::Template;
use crate::error::{ReminderError, Result};
use crate::invoice::{
    apply, compose, BatchPreview, DashboardStats, FilterOptions, FilterSpec, Invoice,
    InvoiceStore, Selection,
};

/// The part of the dashboard that outlives a single fetch
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ViewState {
    #[serde(default)]
    pub selection: Selection,
    #[serde(default)]
    pub filters: FilterSpec,
}

impl ViewState {
    pub fn filters(&self) -> &FilterSpec {
        &self.filters
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Replace the filters. The selection is always cleared, even when the
    /// previously selected invoices would remain visible.
    pub fn set_filters(&mut self, filters: FilterSpec) {
        self.filters = filters;
        self.selection.clear();
    }

    pub fn update_filters<F: FnOnce(&mut FilterSpec)>(&mut self, update: F) {
        let mut filters = self.filters.clone();
        update(&mut filters);
        self.set_filters(filters);
    }

    pub fn reset_filters(&mut self) {
        self.set_filters(FilterSpec::default());
    }
}

pub struct Dashboard {
    store: InvoiceStore,
    view: ViewState,
}

impl Dashboard {
    pub fn new(store: InvoiceStore) -> Self {
        Self {
            store,
            view: ViewState::default(),
        }
    }

    /// Restore a saved view over a fresh fetch. Filter values that no longer
    /// occur in the data and selected ids that are no longer visible are
    /// dropped.
    pub fn restore(store: InvoiceStore, view: ViewState) -> Self {
        let mut dashboard = Self { store, view };
        // An empty fetch says nothing about which values went away
        if !dashboard.store.is_empty() {
            let stale = dashboard.view.filters.prune_stale(dashboard.store.all());
            if !stale.is_empty() {
                let values: Vec<String> = stale
                    .iter()
                    .map(|(field, value)| format!("{field} '{value}'"))
                    .collect();
                log::warn!(
                    "dropped saved filter value(s) no longer in the data: {}",
                    values.join(", ")
                );
            }
        }
        let visible: Vec<String> = dashboard.visible().iter().map(|inv| inv.id.clone()).collect();
        let dropped = dashboard.view.selection.retain(|id| visible.iter().any(|v| v == id));
        if !dropped.is_empty() {
            log::warn!(
                "dropped {} selected invoice(s) no longer in view: {}",
                dropped.len(),
                dropped.join(", ")
            );
        }
        dashboard
    }

    pub fn store(&self) -> &InvoiceStore {
        &self.store
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn into_view(self) -> ViewState {
        self.view
    }

    pub fn stats(&self) -> DashboardStats {
        self.store.stats()
    }

    pub fn visible(&self) -> Vec<&Invoice> {
        apply(self.store.all(), &self.view.filters)
    }

    pub fn options(&self) -> FilterOptions {
        FilterOptions::from_invoices(self.store.all(), &self.view.filters)
    }

    /// Validate and apply new filters against the fetched data
    pub fn set_filters(&mut self, filters: FilterSpec) -> Result<()> {
        FilterOptions::from_invoices(self.store.all(), &filters).validate(&filters)?;
        self.view.set_filters(filters);
        Ok(())
    }

    pub fn reset_filters(&mut self) {
        self.view.reset_filters();
    }

    fn ensure_visible(&self, id: &str) -> Result<()> {
        if self.visible().iter().any(|inv| inv.id == id) {
            Ok(())
        } else {
            Err(ReminderError::InvoiceNotVisible(id.to_string()))
        }
    }

    pub fn toggle(&mut self, id: &str) -> Result<bool> {
        self.ensure_visible(id)?;
        Ok(self.view.selection.toggle(id))
    }

    pub fn select(&mut self, id: &str) -> Result<bool> {
        self.ensure_visible(id)?;
        Ok(self.view.selection.insert(id))
    }

    pub fn deselect(&mut self, id: &str) -> bool {
        self.view.selection.remove(id)
    }

    /// Select every visible invoice, across all pages
    pub fn select_all_visible(&mut self) -> usize {
        let ids: Vec<String> = self.visible().iter().map(|inv| inv.id.clone()).collect();
        self.view.selection.select_all(ids);
        self.view.selection.len()
    }

    pub fn clear_selection(&mut self) {
        self.view.selection.clear();
    }

    pub fn preview(&self, template: &Template) -> BatchPreview {
        compose(self.store.all(), &self.view.selection, template)
    }

    /// Send the selected batch. The selection is cleared only once the
    /// backend has accepted it; on failure it is left untouched.
    pub fn send<D: Dispatch + ?Sized>(
        &mut self,
        dispatcher: &D,
        template: &Template,
        sent_by: &str,
    ) -> Result<(BatchPreview, SendEmailsResponse)> {
        let preview = self.preview(template);
        if preview.is_empty() {
            return Err(ReminderError::EmptySelection);
        }

        let request = SendEmailsRequest {
            invoice_ids: self.view.selection.ids().to_vec(),
            template: template.dispatch_body(),
            sent_by: sent_by.to_string(),
            attachments: preview.attachments.clone(),
        };

        let response = dispatcher.send_emails(&request).map_err(|e| {
            log::error!("send-emails failed: {e}");
            e
        })?;
        log::info!(
            "queued {} invoice(s) for {} department(s)",
            request.invoice_ids.len(),
            response.enqueued_departments
        );

        self.view.selection.clear();
        Ok((preview, response))
    }
}
