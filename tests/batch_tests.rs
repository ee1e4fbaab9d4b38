mod common;

use common::invoice;
use invoice_reminder::config::{builtin_templates, TemplateCatalog, CUSTOM_TEMPLATE};
use invoice_reminder::{compose, Selection, Template};

fn template() -> Template {
    Template::new("Default Reminder", "Dear [Department] Team")
}

fn selection(ids: &[&str]) -> Selection {
    let mut selection = Selection::new();
    selection.select_all(ids.iter().copied());
    selection
}

#[test]
fn test_empty_selection_composes_empty_batch() {
    let invoices = vec![invoice("A", "X", "Research", "due", 100.0)];
    let preview = compose(&invoices, &Selection::new(), &template());

    assert!(preview.is_empty());
    assert!(preview.groups.is_empty());
    assert_eq!(preview.due_count, 0);
    assert_eq!(preview.overdue_count, 0);
    assert_eq!(preview.total_amount, 0.0);
}

#[test]
fn test_same_account_invoices_share_a_group() {
    let invoices = vec![
        invoice("A", "X", "Research", "due", 100.0),
        invoice("B", "X", "Research", "over due", 50.0),
    ];
    let preview = compose(&invoices, &selection(&["A", "B"]), &template());

    assert_eq!(preview.groups.len(), 1);
    let group = &preview.groups[0];
    assert_eq!(group.account, "X");
    assert_eq!(group.invoice_count(), 2);
    assert_eq!(group.due_count, 1);
    assert_eq!(group.overdue_count, 1);
    assert_eq!(group.total_amount, 150.0);
    assert_eq!(group.summary(), "You have 2 invoices, 1 due, 1 overdue");

    assert_eq!(preview.invoice_count, 2);
    assert_eq!(preview.due_count, 1);
    assert_eq!(preview.overdue_count, 1);
    assert_eq!(preview.total_amount, 150.0);
}

#[test]
fn test_groups_follow_first_occurrence_order() {
    let invoices = vec![
        invoice("A", "Zeta", "Research", "due", 10.0),
        invoice("B", "Alpha", "Finance", "due", 20.0),
        invoice("C", "Zeta", "Research", "paid", 5.0),
    ];
    // Selection order does not drive grouping; invoice order does
    let preview = compose(&invoices, &selection(&["C", "B", "A"]), &template());

    let accounts: Vec<&str> = preview.groups.iter().map(|g| g.account.as_str()).collect();
    assert_eq!(accounts, vec!["Zeta", "Alpha"]);
    assert_eq!(preview.invoice_ids(), vec!["A", "C", "B"]);
    assert_eq!(preview.departments(), vec!["Research", "Finance"]);
    assert_eq!(preview.groups[0].summary(), "You have 2 invoices, 1 due");
}

#[test]
fn test_unknown_selected_ids_are_ignored() {
    let invoices = vec![invoice("A", "X", "Research", "due", 100.0)];
    let preview = compose(&invoices, &selection(&["A", "GONE"]), &template());
    assert_eq!(preview.invoice_count, 1);
    assert_eq!(preview.invoice_ids(), vec!["A"]);
}

#[test]
fn test_attachments_list_object_keys() {
    let invoices = vec![
        invoice("A", "X", "Research", "due", 1.0),
        invoice("B", "Y", "Finance", "due", 2.0),
    ];
    let preview = compose(&invoices, &selection(&["A", "B"]), &template());
    assert_eq!(
        preview.attachments,
        vec!["invoices/2025-01/A.pdf", "invoices/2025-01/B.pdf"]
    );
    assert_eq!(preview.groups[1].attachment_names(), vec!["B.pdf"]);
    assert_eq!(preview.template_name, "Default Reminder");
}

#[test]
fn test_balance_falls_back_to_amount() {
    let mut inv = invoice("A", "X", "Research", "due", 0.0);
    inv.balance_due = None;
    inv.amount = 80.0;
    let preview = compose(&[inv], &selection(&["A"]), &template());
    assert_eq!(preview.total_amount, 80.0);
}

#[test]
fn test_catalog_has_builtins_and_resolves_custom_body() {
    let catalog = TemplateCatalog::default();
    assert_eq!(catalog.iter().count(), builtin_templates().len());
    assert_eq!(catalog.get("final").unwrap().name, "Final Notice");

    let custom = catalog
        .resolve(CUSTOM_TEMPLATE, Some("Pay up, [Department]"))
        .unwrap();
    assert_eq!(custom.body, "Pay up, [Department]");
    assert_eq!(custom.name, "Custom Template");

    // A custom body only replaces the custom template
    let default = catalog.resolve("default", Some("ignored")).unwrap();
    assert_ne!(default.body, "ignored");

    assert!(catalog.resolve("missing", None).is_none());
}

#[test]
fn test_template_preview_and_blank_body() {
    let template = Template::new("T", "Dear [Department] ([Payer Account ID]) / [Account Name]");
    assert_eq!(
        template.preview("Research", "111", "Acme"),
        "Dear Research (111) / Acme"
    );
    assert_eq!(Template::new("Blank", "  \n").dispatch_body(), None);
}
