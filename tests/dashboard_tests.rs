mod common;

use std::cell::RefCell;

use common::invoice;
use invoice_reminder::api::SendEmailsRequest;
use invoice_reminder::{
    Dashboard, Dispatch, FilterSpec, InvoiceStore, ReminderError, Result, SendEmailsResponse,
    Template, ViewState,
};

/// Records every request and answers with a fixed outcome
struct RecordingDispatch {
    fail: bool,
    requests: RefCell<Vec<SendEmailsRequest>>,
}

impl RecordingDispatch {
    fn new(fail: bool) -> Self {
        Self {
            fail,
            requests: RefCell::new(Vec::new()),
        }
    }
}

impl Dispatch for RecordingDispatch {
    fn send_emails(&self, request: &SendEmailsRequest) -> Result<SendEmailsResponse> {
        self.requests.borrow_mut().push(request.clone());
        if self.fail {
            return Err(ReminderError::Backend {
                path: "/send-emails".to_string(),
                status: 500,
                body: "boom".to_string(),
            });
        }
        Ok(SendEmailsResponse {
            enqueued_departments: 1,
        })
    }
}

fn dashboard() -> Dashboard {
    let store = InvoiceStore::new(vec![
        invoice("A", "X", "Research", "due", 100.0),
        invoice("B", "X", "Research", "over due", 50.0),
        invoice("C", "Y", "Finance", "paid", 0.0),
    ])
    .unwrap();
    Dashboard::new(store)
}

fn research_only() -> FilterSpec {
    let mut filters = FilterSpec::new();
    filters.departments.insert("Research".to_string());
    filters
}

fn template() -> Template {
    Template::new("Default Reminder", "Dear [Department] Team")
}

#[test]
fn test_filter_change_clears_selection() {
    let mut dash = dashboard();
    dash.select("A").unwrap();
    dash.select("B").unwrap();
    assert_eq!(dash.view().selection().len(), 2);

    // A and B stay visible, but the selection is still reset
    dash.set_filters(research_only()).unwrap();
    assert!(dash.view().selection().is_empty());
    assert_eq!(dash.visible().len(), 2);
}

#[test]
fn test_view_state_update_clears_selection() {
    let mut view = ViewState::default();
    view.selection.insert("A");
    view.update_filters(|f| {
        f.statuses.insert("due".to_string());
    });
    assert!(view.selection().is_empty());
    assert!(view.filters().statuses.contains("due"));

    view.selection.insert("A");
    view.reset_filters();
    assert!(view.selection().is_empty());
    assert!(view.filters().is_empty());
}

#[test]
fn test_invalid_filter_is_rejected_without_side_effects() {
    let mut dash = dashboard();
    dash.select("A").unwrap();

    let mut filters = FilterSpec::new();
    filters.departments.insert("Legal".to_string());
    let err = dash.set_filters(filters).unwrap_err();

    assert!(matches!(err, ReminderError::UnknownFilterValue { field: "department", .. }));
    assert!(dash.view().selection().contains("A"));
}

#[test]
fn test_cannot_select_invoice_outside_view() {
    let mut dash = dashboard();
    dash.set_filters(research_only()).unwrap();

    let err = dash.select("C").unwrap_err();
    assert!(matches!(err, ReminderError::InvoiceNotVisible(id) if id == "C"));
    assert!(dash.toggle("C").is_err());
    assert!(dash.view().selection().is_empty());
}

#[test]
fn test_toggle_and_select_all_visible() {
    let mut dash = dashboard();
    assert!(dash.toggle("A").unwrap());
    assert!(!dash.toggle("A").unwrap());

    dash.set_filters(research_only()).unwrap();
    assert_eq!(dash.select_all_visible(), 2);
    assert_eq!(dash.view().selection().ids(), &["A", "B"]);

    assert!(dash.deselect("A"));
    assert!(!dash.deselect("A"));
    dash.clear_selection();
    assert!(dash.view().selection().is_empty());
}

#[test]
fn test_send_with_empty_selection_is_an_error() {
    let mut dash = dashboard();
    let dispatch = RecordingDispatch::new(false);

    let err = dash.send(&dispatch, &template(), "ops").unwrap_err();
    assert!(matches!(err, ReminderError::EmptySelection));
    assert!(dispatch.requests.borrow().is_empty());
}

#[test]
fn test_successful_send_clears_selection() {
    let mut dash = dashboard();
    dash.select("A").unwrap();
    dash.select("B").unwrap();
    let dispatch = RecordingDispatch::new(false);

    let (preview, response) = dash.send(&dispatch, &template(), "ops").unwrap();

    assert_eq!(response.enqueued_departments, 1);
    assert_eq!(preview.invoice_count, 2);
    assert!(dash.view().selection().is_empty());

    let requests = dispatch.requests.borrow();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].invoice_ids, vec!["A", "B"]);
    assert_eq!(requests[0].sent_by, "ops");
    assert_eq!(requests[0].template.as_deref(), Some("Dear [Department] Team"));
    assert_eq!(requests[0].attachments.len(), 2);
}

#[test]
fn test_failed_send_keeps_selection() {
    let mut dash = dashboard();
    dash.select("A").unwrap();
    let dispatch = RecordingDispatch::new(true);

    let err = dash.send(&dispatch, &template(), "ops").unwrap_err();

    assert!(matches!(err, ReminderError::Backend { status: 500, .. }));
    assert_eq!(dash.view().selection().ids(), &["A"]);
}

#[test]
fn test_blank_template_sends_no_body() {
    let mut dash = dashboard();
    dash.select("A").unwrap();
    let dispatch = RecordingDispatch::new(false);

    dash.send(&dispatch, &Template::new("Blank", ""), "ops").unwrap();
    assert_eq!(dispatch.requests.borrow()[0].template, None);
}

#[test]
fn test_restore_drops_selection_outside_view() {
    let mut view = ViewState::default();
    view.filters = research_only();
    view.selection.select_all(["A", "C"]);

    let store = InvoiceStore::new(vec![
        invoice("A", "X", "Research", "due", 100.0),
        invoice("C", "Y", "Finance", "paid", 0.0),
    ])
    .unwrap();
    let dash = Dashboard::restore(store, view);

    assert_eq!(dash.view().selection().ids(), &["A"]);
    assert_eq!(dash.view().filters(), &research_only());
}

#[test]
fn test_restore_drops_filter_values_missing_from_data() {
    let mut view = ViewState::default();
    view.filters.departments.insert("Research".to_string());
    view.filters.departments.insert("Legal".to_string());
    view.filters.accounts.insert("X".to_string());
    view.filters.accounts.insert("Closed Co".to_string());
    view.filters.billing_periods.insert("1999-12".to_string());
    view.selection.select_all(["A"]);

    let mut dash = Dashboard::restore(
        InvoiceStore::new(vec![
            invoice("A", "X", "Research", "due", 100.0),
            invoice("C", "Y", "Finance", "paid", 0.0),
        ])
        .unwrap(),
        view,
    );

    let filters = dash.view().filters();
    assert_eq!(filters.departments.iter().collect::<Vec<_>>(), vec!["Research"]);
    assert_eq!(filters.accounts.iter().collect::<Vec<_>>(), vec!["X"]);
    assert!(filters.billing_periods.is_empty());
    assert_eq!(dash.view().selection().ids(), &["A"]);

    // Changing an untouched criterion no longer trips over the stale values
    let mut filters = dash.view().filters().clone();
    filters.statuses.insert("due".to_string());
    dash.set_filters(filters).unwrap();
    assert_eq!(dash.visible().len(), 1);
}

#[test]
fn test_restore_keeps_filters_when_fetch_is_empty() {
    let mut view = ViewState::default();
    view.filters = research_only();

    let dash = Dashboard::restore(InvoiceStore::default(), view);
    assert_eq!(dash.view().filters(), &research_only());
}

#[test]
fn test_view_state_round_trips_through_toml() {
    let mut view = ViewState::default();
    view.filters = research_only();
    view.selection.select_all(["A"]);

    let text = toml::to_string(&view).unwrap();
    let back: ViewState = toml::from_str(&text).unwrap();
    assert_eq!(back, view);
}
