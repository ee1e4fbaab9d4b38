use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};

use invoice_reminder::api::ApiClient;
use invoice_reminder::chat::{self, ChatReply};
use invoice_reminder::config::{
    config_dir, ensure_initialized, load_config, load_state, load_templates, save_state, Config,
    State, Template, CONFIG_TEMPLATE, CUSTOM_TEMPLATE, TEMPLATES_TEMPLATE,
};
use invoice_reminder::dashboard::Dashboard;
use invoice_reminder::error::{ReminderError, Result};
use invoice_reminder::format::{add_summary_footer, format_money};
use invoice_reminder::invoice::{
    paginate, sort_invoices, FilterSpec, Invoice, InvoiceStore, SortColumn, StatusFilter,
    STATUS_OPTIONS,
};
use invoice_reminder::logs::{EmailLog, LogFilter, LogOptions};

#[derive(Parser)]
#[command(name = "reminder")]
#[command(version, about = "Filter invoices and send reminder emails", long_about = None)]
struct Cli {
    /// Path to config directory (default: ~/.reminder or XDG config)
    #[arg(short = 'C', long, global = true)]
    config_dir: Option<PathBuf>,

    /// More log output (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory with template files
    Init,

    /// Show configuration and the current filters and selection
    Status,

    /// Show invoice counts by payment status
    Stats,

    /// List invoices matching the current filters
    Invoices {
        /// Sort column: id, account, department, period, due, balance, status
        #[arg(short, long)]
        sort: Option<String>,

        /// Sort descending
        #[arg(long)]
        desc: bool,

        /// Page number (1-based)
        #[arg(short, long, default_value_t = 1)]
        page: usize,

        /// Rows per page
        #[arg(long, default_value_t = 10)]
        per_page: usize,
    },

    /// Show one invoice in full
    Show {
        /// Invoice id
        invoice: String,
    },

    /// Mark an invoice as paid
    MarkPaid {
        /// Invoice id
        invoice: String,
    },

    /// Inspect or change the invoice filters (clears the selection)
    Filter {
        #[command(subcommand)]
        action: FilterAction,
    },

    /// Add invoices from the current view to the reminder batch
    Select {
        /// Invoice ids
        ids: Vec<String>,

        /// Select every invoice in the current view
        #[arg(long, conflicts_with = "ids")]
        all: bool,

        /// Toggle each id instead of adding it
        #[arg(long)]
        toggle: bool,
    },

    /// Remove invoices from the reminder batch
    Deselect {
        /// Invoice ids
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Clear the reminder batch
    Clear,

    /// List, show, or choose the reminder template
    Template {
        #[command(subcommand)]
        action: TemplateAction,
    },

    /// Preview the reminder batch grouped by account
    Preview,

    /// Send reminder emails for the selected invoices
    Send {
        /// Confirm the dispatch (without it only the preview is shown)
        #[arg(short, long)]
        yes: bool,

        /// Also store a log entry for the batch from this client
        #[arg(long)]
        record_log: bool,
    },

    /// Browse email dispatch logs
    Logs {
        #[command(subcommand)]
        action: LogsAction,
    },

    /// Talk to the invoice assistant
    Chat {
        #[command(subcommand)]
        action: ChatAction,
    },
}

#[derive(Subcommand)]
enum FilterAction {
    /// Show the current filters
    Show,

    /// List the values each filter accepts
    Options,

    /// Replace the given criteria (criteria not given are kept)
    Set {
        /// Department (repeatable); resets the account criterion
        #[arg(short, long)]
        department: Vec<String>,

        /// Account (repeatable)
        #[arg(short, long)]
        account: Vec<String>,

        /// Status: due, overdue, paid, total_unpaid (repeatable)
        #[arg(short, long)]
        status: Vec<String>,

        /// Billing period (repeatable)
        #[arg(short, long)]
        period: Vec<String>,
    },

    /// Clear all filters
    Reset,
}

#[derive(Subcommand)]
enum TemplateAction {
    /// List available templates
    List,

    /// Show a template body (default: the active template)
    Show { name: Option<String> },

    /// Choose the template for the next batch
    Use {
        name: String,

        /// File with the body for the custom template
        #[arg(long)]
        body_file: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum LogsAction {
    /// List dispatch logs
    List {
        /// Department (repeatable, any match)
        #[arg(short, long)]
        department: Vec<String>,

        /// Account (repeatable, any match)
        #[arg(short, long)]
        account: Vec<String>,

        /// Logs on or after this date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Logs on or before this date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        /// Template name (repeatable)
        #[arg(short, long)]
        template: Vec<String>,

        /// Number of logs to show (default: all)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// List the values the log filters accept
    Options {
        /// Restrict accounts to these departments
        #[arg(short, long)]
        department: Vec<String>,
    },

    /// Show one log entry in full
    Show {
        /// Log id
        log: String,
    },
}

#[derive(Subcommand)]
enum ChatAction {
    /// Send a message to the assistant
    Send {
        /// Message text
        #[arg(required = true)]
        message: Vec<String>,

        /// Directory for CSV exports (default: current directory)
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// End the chat session
    Close,
}

fn main() {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let cfg_dir = match cli.config_dir {
        Some(p) => p,
        None => config_dir()?,
    };

    match cli.command {
        Commands::Init => cmd_init(&cfg_dir),
        Commands::Status => cmd_status(&cfg_dir),
        Commands::Stats => cmd_stats(&cfg_dir),
        Commands::Invoices {
            sort,
            desc,
            page,
            per_page,
        } => cmd_invoices(&cfg_dir, sort, desc, page, per_page),
        Commands::Show { invoice } => cmd_show(&cfg_dir, &invoice),
        Commands::MarkPaid { invoice } => cmd_mark_paid(&cfg_dir, &invoice),
        Commands::Filter { action } => match action {
            FilterAction::Show => cmd_filter_show(&cfg_dir),
            FilterAction::Options => cmd_filter_options(&cfg_dir),
            FilterAction::Set {
                department,
                account,
                status,
                period,
            } => cmd_filter_set(&cfg_dir, department, account, status, period),
            FilterAction::Reset => cmd_filter_reset(&cfg_dir),
        },
        Commands::Select { ids, all, toggle } => cmd_select(&cfg_dir, &ids, all, toggle),
        Commands::Deselect { ids } => cmd_deselect(&cfg_dir, &ids),
        Commands::Clear => cmd_clear(&cfg_dir),
        Commands::Template { action } => match action {
            TemplateAction::List => cmd_template_list(&cfg_dir),
            TemplateAction::Show { name } => cmd_template_show(&cfg_dir, name),
            TemplateAction::Use { name, body_file } => cmd_template_use(&cfg_dir, &name, body_file),
        },
        Commands::Preview => cmd_preview(&cfg_dir),
        Commands::Send { yes, record_log } => cmd_send(&cfg_dir, yes, record_log),
        Commands::Logs { action } => match action {
            LogsAction::List {
                department,
                account,
                from,
                to,
                template,
                limit,
            } => {
                let filter = LogFilter {
                    departments: department,
                    accounts: account,
                    start: from.as_deref().map(parse_date).transpose()?,
                    end: to.as_deref().map(parse_date).transpose()?,
                    templates: template,
                };
                cmd_logs_list(&cfg_dir, &filter, limit)
            }
            LogsAction::Options { department } => cmd_logs_options(&cfg_dir, department),
            LogsAction::Show { log } => cmd_logs_show(&cfg_dir, &log),
        },
        Commands::Chat { action } => match action {
            ChatAction::Send { message, out_dir } => {
                cmd_chat_send(&cfg_dir, &message.join(" "), out_dir)
            }
            ChatAction::Close => cmd_chat_close(&cfg_dir),
        },
    }
}

fn parse_date(s: &str) -> Result<chrono::NaiveDate> {
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| ReminderError::InvalidDate(s.to_string()))
}

/// Initialize config directory with template files
fn cmd_init(cfg_dir: &Path) -> Result<()> {
    if cfg_dir.exists() {
        return Err(ReminderError::AlreadyInitialized(cfg_dir.to_path_buf()));
    }

    fs::create_dir_all(cfg_dir)?;
    fs::write(cfg_dir.join("config.toml"), CONFIG_TEMPLATE)?;
    fs::write(cfg_dir.join("templates.toml"), TEMPLATES_TEMPLATE)?;

    println!("Initialized reminder config at: {}", cfg_dir.display());
    println!();
    println!("Next steps:");
    println!(
        "  1. Point at your backend:       $EDITOR {}/config.toml",
        cfg_dir.display()
    );
    println!(
        "  2. Add your own templates:      $EDITOR {}/templates.toml",
        cfg_dir.display()
    );
    println!();
    println!("Then list invoices:");
    println!("  reminder invoices");

    Ok(())
}

/// Load config and build an authenticated client
fn connect(cfg_dir: &Path) -> Result<(Config, ApiClient)> {
    ensure_initialized(cfg_dir)?;
    let config = load_config(cfg_dir)?;
    let api = ApiClient::from_config(&config);
    Ok((config, api))
}

fn fetch_store(api: &ApiClient) -> Result<InvoiceStore> {
    let raw = api.list_invoices().map_err(|e| {
        log::error!("failed to load invoices: {e}");
        e
    })?;
    InvoiceStore::from_raw(raw)
}

/// Fetch invoices and restore the saved view over them
fn open_dashboard(api: &ApiClient, state: &State) -> Result<Dashboard> {
    let store = fetch_store(api)?;
    Ok(Dashboard::restore(store, state.view.clone()))
}

fn active_template(cfg_dir: &Path, state: &State) -> Result<Template> {
    load_templates(cfg_dir)?
        .resolve(&state.template, state.custom_body.as_deref())
        .ok_or_else(|| ReminderError::TemplateNotFound(state.template.clone()))
}

fn describe_set(values: &std::collections::BTreeSet<String>) -> String {
    if values.is_empty() {
        "(any)".to_string()
    } else {
        values.iter().cloned().collect::<Vec<_>>().join(", ")
    }
}

fn print_filters(filters: &FilterSpec) {
    println!("Departments:      {}", describe_set(&filters.departments));
    println!("Accounts:         {}", describe_set(&filters.accounts));
    println!("Statuses:         {}", describe_set(&filters.statuses));
    println!("Billing periods:  {}", describe_set(&filters.billing_periods));
    if filters.statuses.len() > 1 {
        if let Some(status) = StatusFilter::effective(&filters.statuses) {
            println!(
                "Note: only '{}' applies when several statuses are selected",
                status.as_str()
            );
        }
    }
}

/// Show configuration and session state
fn cmd_status(cfg_dir: &Path) -> Result<()> {
    ensure_initialized(cfg_dir)?;
    let config = load_config(cfg_dir)?;
    let state = load_state(cfg_dir)?;

    println!("Reminder Status");
    println!("{}", "-".repeat(50));
    println!("Config directory: {}", cfg_dir.display());
    println!("API:              {}", config.api.base_url);
    println!("Operator:         {}", config.operator.name);
    println!("Template:         {}", state.template);
    print_filters(&state.view.filters);
    println!("Selected:         {} invoice(s)", state.view.selection.len());
    println!(
        "Chat session:     {}",
        state.chat.session_id.as_deref().unwrap_or("(none)")
    );

    Ok(())
}

/// Show invoice counts
fn cmd_stats(cfg_dir: &Path) -> Result<()> {
    let (_, api) = connect(cfg_dir)?;
    let stats = fetch_store(&api)?.stats();

    println!("Total invoices:               {}", stats.total);
    println!("Paid invoices:                {}", stats.paid);
    println!("Total unpaid (due + overdue): {}", stats.total_unpaid);
    println!("Due invoices:                 {}", stats.due);
    println!("Overdue invoices:             {}", stats.overdue);

    Ok(())
}

#[derive(Tabled)]
struct InvoiceRow {
    #[tabled(rename = "SEL")]
    selected: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "ACCOUNT")]
    account: String,
    #[tabled(rename = "DEPARTMENT")]
    department: String,
    #[tabled(rename = "PERIOD")]
    period: String,
    #[tabled(rename = "DUE DATE")]
    due_date: String,
    #[tabled(rename = "BALANCE")]
    balance: String,
    #[tabled(rename = "STATUS")]
    status: String,
}

/// Index of the BALANCE column in `InvoiceRow`
const BALANCE_COLUMN: usize = 6;

/// List invoices matching the current filters
fn cmd_invoices(
    cfg_dir: &Path,
    sort: Option<String>,
    descending: bool,
    page: usize,
    per_page: usize,
) -> Result<()> {
    let (config, api) = connect(cfg_dir)?;
    let state = load_state(cfg_dir)?;
    let sort = sort.as_deref().map(str::parse::<SortColumn>).transpose()?;
    let dashboard = open_dashboard(&api, &state)?;
    let symbol = &config.operator.currency_symbol;

    let mut visible = dashboard.visible();
    if visible.is_empty() {
        println!("No invoices match the current filters.");
        return Ok(());
    }
    if let Some(column) = sort {
        sort_invoices(&mut visible, column, descending);
    }

    let page = paginate(&visible, page, per_page)?;
    let selection = dashboard.view().selection();

    let rows: Vec<InvoiceRow> = page
        .items
        .iter()
        .map(|inv| InvoiceRow {
            selected: if selection.contains(&inv.id) { "*" } else { "" }.to_string(),
            id: inv.id.clone(),
            account: inv.account.clone(),
            department: inv.department.clone(),
            period: inv.billing_period.clone(),
            due_date: inv.due_date.clone(),
            balance: format_money(inv.balance(), symbol),
            status: inv.payment_status.to_string(),
        })
        .collect();

    let shown_balance: f64 = visible.iter().map(|inv| inv.balance()).sum();
    let selected_balance: f64 = visible
        .iter()
        .filter(|inv| selection.contains(&inv.id))
        .map(|inv| inv.balance())
        .sum();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    let table = add_summary_footer(
        &table,
        BALANCE_COLUMN,
        &[
            ("FILTERED BALANCE", format_money(shown_balance, symbol)),
            ("SELECTED BALANCE", format_money(selected_balance, symbol)),
        ],
    );
    println!("{table}");

    println!();
    println!(
        "Showing {} to {} of {} (page {} of {})",
        page.start + 1,
        page.start + page.items.len(),
        page.total,
        page.page,
        page.total_pages
    );
    println!("{} of {} invoices selected", selection.len(), visible.len());

    Ok(())
}

fn print_invoice(invoice: &Invoice, symbol: &str) {
    let optional = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());

    println!("Invoice {}", invoice.id);
    println!("  Account:          {}", invoice.account);
    println!("  Department:       {}", invoice.department);
    println!("  Billing period:   {}", invoice.billing_period);
    println!("  Due date:         {}", invoice.due_date);
    println!("  Amount:           {}", format_money(invoice.amount, symbol));
    println!("  Balance due:      {}", format_money(invoice.balance(), symbol));
    println!("  Status:           {}", invoice.status);
    println!("  Payment status:   {}", invoice.payment_status);
    println!("  Paid at:          {}", optional(&invoice.paid_at));
    println!("  Processed at:     {}", optional(&invoice.processed_at));
    println!("  Payer account:    {}", optional(&invoice.payer_account_id));
    println!("  Email:            {}", optional(&invoice.email));
    println!("  Provider:         {}", optional(&invoice.service_provider));
    println!("  Attachment:       {}", invoice.object_key);
}

/// Show one invoice
fn cmd_show(cfg_dir: &Path, invoice_id: &str) -> Result<()> {
    let (config, api) = connect(cfg_dir)?;
    let invoice = Invoice::from(api.get_invoice(invoice_id)?);
    print_invoice(&invoice, &config.operator.currency_symbol);
    Ok(())
}

/// Mark an invoice as paid
fn cmd_mark_paid(cfg_dir: &Path, invoice_id: &str) -> Result<()> {
    let (_, api) = connect(cfg_dir)?;
    api.mark_paid(invoice_id)?;
    println!("Marked {invoice_id} as paid");
    Ok(())
}

fn cmd_filter_show(cfg_dir: &Path) -> Result<()> {
    ensure_initialized(cfg_dir)?;
    let state = load_state(cfg_dir)?;
    print_filters(&state.view.filters);
    Ok(())
}

fn print_options(label: &str, values: &[String]) {
    if values.is_empty() {
        println!("{label:<17} (none)");
    } else {
        println!("{label:<17} {}", values.join(", "));
    }
}

/// List the values each filter accepts
fn cmd_filter_options(cfg_dir: &Path) -> Result<()> {
    let (_, api) = connect(cfg_dir)?;
    let state = load_state(cfg_dir)?;
    let options = open_dashboard(&api, &state)?.options();

    print_options("Departments:", &options.departments);
    print_options("Accounts:", &options.accounts);
    let statuses: Vec<String> = STATUS_OPTIONS
        .iter()
        .map(|(value, label)| format!("{value} ({label})"))
        .collect();
    print_options("Statuses:", &statuses);
    print_options("Billing periods:", &options.billing_periods);

    Ok(())
}

fn cmd_filter_set(
    cfg_dir: &Path,
    departments: Vec<String>,
    accounts: Vec<String>,
    statuses: Vec<String>,
    periods: Vec<String>,
) -> Result<()> {
    for status in &statuses {
        StatusFilter::parse(status)?;
    }

    let (_, api) = connect(cfg_dir)?;
    let mut state = load_state(cfg_dir)?;
    let mut dashboard = open_dashboard(&api, &state)?;

    let mut filters = dashboard.view().filters().clone();
    if !departments.is_empty() {
        filters.set_departments(departments);
    }
    if !accounts.is_empty() {
        filters.accounts = accounts.into_iter().collect();
    }
    if !statuses.is_empty() {
        filters.statuses = statuses.into_iter().collect();
    }
    if !periods.is_empty() {
        filters.billing_periods = periods.into_iter().collect();
    }

    let had_selection = !dashboard.view().selection().is_empty();
    dashboard.set_filters(filters)?;
    let visible = dashboard.visible().len();

    state.view = dashboard.into_view();
    save_state(cfg_dir, &state)?;

    print_filters(&state.view.filters);
    println!("{visible} invoice(s) match");
    if had_selection {
        println!("Selection cleared");
    }
    Ok(())
}

fn cmd_filter_reset(cfg_dir: &Path) -> Result<()> {
    ensure_initialized(cfg_dir)?;
    let mut state = load_state(cfg_dir)?;
    state.view.reset_filters();
    save_state(cfg_dir, &state)?;
    println!("Filters reset");
    Ok(())
}

/// Add (or toggle) invoices in the batch
fn cmd_select(cfg_dir: &Path, ids: &[String], all: bool, toggle: bool) -> Result<()> {
    let (_, api) = connect(cfg_dir)?;
    let mut state = load_state(cfg_dir)?;
    let mut dashboard = open_dashboard(&api, &state)?;

    if all {
        let count = dashboard.select_all_visible();
        println!("Selected all {count} invoice(s) in view");
    } else {
        for id in ids {
            let selected = if toggle {
                dashboard.toggle(id)?
            } else {
                dashboard.select(id)?
            };
            let action = match (selected, toggle) {
                (true, _) => "Selected",
                (false, true) => "Deselected",
                (false, false) => "Already selected",
            };
            println!("{action} {id}");
        }
    }

    let visible = dashboard.visible().len();
    state.view = dashboard.into_view();
    save_state(cfg_dir, &state)?;
    println!("{} of {} invoices selected", state.view.selection.len(), visible);
    Ok(())
}

fn cmd_deselect(cfg_dir: &Path, ids: &[String]) -> Result<()> {
    ensure_initialized(cfg_dir)?;
    let mut state = load_state(cfg_dir)?;
    for id in ids {
        if state.view.selection.remove(id) {
            println!("Deselected {id}");
        } else {
            println!("{id} was not selected");
        }
    }
    save_state(cfg_dir, &state)?;
    println!("{} invoice(s) selected", state.view.selection.len());
    Ok(())
}

fn cmd_clear(cfg_dir: &Path) -> Result<()> {
    ensure_initialized(cfg_dir)?;
    let mut state = load_state(cfg_dir)?;
    state.view.selection.clear();
    save_state(cfg_dir, &state)?;
    println!("Selection cleared");
    Ok(())
}

#[derive(Tabled)]
struct TemplateRow {
    #[tabled(rename = "")]
    active: String,
    #[tabled(rename = "KEY")]
    key: String,
    #[tabled(rename = "NAME")]
    name: String,
}

fn cmd_template_list(cfg_dir: &Path) -> Result<()> {
    ensure_initialized(cfg_dir)?;
    let state = load_state(cfg_dir)?;
    let catalog = load_templates(cfg_dir)?;

    let rows: Vec<TemplateRow> = catalog
        .iter()
        .map(|(key, template)| TemplateRow {
            active: if *key == state.template { "*" } else { "" }.to_string(),
            key: key.clone(),
            name: template.name.clone(),
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");
    Ok(())
}

fn cmd_template_show(cfg_dir: &Path, name: Option<String>) -> Result<()> {
    ensure_initialized(cfg_dir)?;
    let state = load_state(cfg_dir)?;
    let key = name.unwrap_or_else(|| state.template.clone());
    let template = load_templates(cfg_dir)?
        .resolve(&key, state.custom_body.as_deref())
        .ok_or_else(|| ReminderError::TemplateNotFound(key.clone()))?;

    println!("{} ({key})", template.name);
    println!("{}", "-".repeat(50));
    println!("{}", template.body);
    Ok(())
}

fn cmd_template_use(cfg_dir: &Path, name: &str, body_file: Option<PathBuf>) -> Result<()> {
    ensure_initialized(cfg_dir)?;
    let catalog = load_templates(cfg_dir)?;
    let template = catalog
        .get(name)
        .ok_or_else(|| ReminderError::TemplateNotFound(name.to_string()))?;

    let mut state = load_state(cfg_dir)?;
    if let Some(path) = body_file {
        if name != CUSTOM_TEMPLATE {
            log::warn!("--body-file only applies to the '{CUSTOM_TEMPLATE}' template; ignored");
        } else {
            state.custom_body = Some(fs::read_to_string(path)?);
        }
    }
    state.template = name.to_string();
    save_state(cfg_dir, &state)?;

    println!("Using template '{}' ({name})", template.name);
    Ok(())
}

fn print_preview(dashboard: &Dashboard, template: &Template, symbol: &str) {
    let preview = dashboard.preview(template);

    println!("Preview Email Batch");
    println!("{}", "-".repeat(50));
    println!("Invoices:  {}", preview.invoice_count);
    println!("Due:       {}", preview.due_count);
    println!("Overdue:   {}", preview.overdue_count);
    println!("Total:     {}", format_money(preview.total_amount, symbol));
    println!("Template:  {}", preview.template_name);
    println!();

    if let Some(first) = preview.groups.first().and_then(|g| g.invoices.first()) {
        println!("Email preview for {}:", first.department);
        println!(
            "{}",
            template.preview(
                &first.department,
                first.payer_account_id.as_deref().unwrap_or(""),
                &first.account
            )
        );
        println!();
    }

    for group in &preview.groups {
        println!(
            "{} <{}>",
            group.account,
            group.email.as_deref().unwrap_or("no email")
        );
        println!("  {}", group.summary());
        for invoice in &group.invoices {
            println!(
                "  - {}  {}  due {}  {}  {}",
                invoice.id,
                invoice.billing_period,
                invoice.due_date,
                format_money(invoice.balance(), symbol),
                invoice.payment_status
            );
        }
        println!("  Attachments: {}", group.attachment_names().join(", "));
        println!();
    }
}

fn cmd_preview(cfg_dir: &Path) -> Result<()> {
    let (config, api) = connect(cfg_dir)?;
    let state = load_state(cfg_dir)?;
    let template = active_template(cfg_dir, &state)?;
    let dashboard = open_dashboard(&api, &state)?;

    if dashboard.view().selection().is_empty() {
        return Err(ReminderError::EmptySelection);
    }
    print_preview(&dashboard, &template, &config.operator.currency_symbol);
    Ok(())
}

fn cmd_send(cfg_dir: &Path, confirmed: bool, record_log: bool) -> Result<()> {
    let (config, api) = connect(cfg_dir)?;
    let mut state = load_state(cfg_dir)?;
    let template = active_template(cfg_dir, &state)?;
    let mut dashboard = open_dashboard(&api, &state)?;

    if dashboard.view().selection().is_empty() {
        return Err(ReminderError::EmptySelection);
    }
    if !confirmed {
        print_preview(&dashboard, &template, &config.operator.currency_symbol);
        println!("Re-run with --yes to send these reminders.");
        return Ok(());
    }

    let filters = dashboard.view().filters().clone();
    let (preview, response) = dashboard.send(&api, &template, &config.operator.name)?;

    state.view = dashboard.into_view();
    save_state(cfg_dir, &state)?;

    println!(
        "Emails queued: {} invoice(s) for {} department(s)",
        preview.invoice_count, response.enqueued_departments
    );

    if record_log {
        let mut entry = EmailLog::from_batch(&preview, &filters, &config.operator.name);
        match api.save_log(&mut entry) {
            Ok(()) => println!("Log recorded: {}", entry.log_id),
            Err(e) => log::error!("failed to save log: {e}"),
        }
    }
    Ok(())
}

fn fetch_logs(api: &ApiClient) -> Result<Vec<EmailLog>> {
    api.list_logs().map_err(|e| {
        log::error!("failed to load logs: {e}");
        e
    })
}

#[derive(Tabled)]
struct LogRow {
    #[tabled(rename = "LOG ID")]
    id: String,
    #[tabled(rename = "TIMESTAMP")]
    timestamp: String,
    #[tabled(rename = "DEPARTMENTS")]
    departments: String,
    #[tabled(rename = "ACCOUNTS")]
    accounts: String,
    #[tabled(rename = "TEMPLATE")]
    template: String,
    #[tabled(rename = "INVOICES")]
    invoices: u64,
    #[tabled(rename = "SENT/FAILED")]
    results: String,
}

fn display_timestamp(entry: &EmailLog) -> String {
    entry
        .timestamp_utc()
        .map(|ts| {
            ts.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M")
                .to_string()
        })
        .unwrap_or_else(|| entry.timestamp.clone())
}

fn cmd_logs_list(cfg_dir: &Path, filter: &LogFilter, limit: Option<usize>) -> Result<()> {
    let (_, api) = connect(cfg_dir)?;
    let logs = fetch_logs(&api)?;
    let matching = filter.apply(&logs);

    if matching.is_empty() {
        println!("No logs found.");
        return Ok(());
    }

    let shown = match limit {
        Some(n) => &matching[..n.min(matching.len())],
        None => &matching[..],
    };

    let rows: Vec<LogRow> = shown
        .iter()
        .map(|entry| {
            let (sent, failed) = entry.result_counts();
            LogRow {
                id: entry.log_id.clone(),
                timestamp: display_timestamp(entry),
                departments: entry.departments_selected.join(", "),
                accounts: entry.accounts_selected.join(", "),
                template: entry.template_used.clone(),
                invoices: entry.total_invoices_sent,
                results: if entry.email_results.is_empty() {
                    "-".to_string()
                } else {
                    format!("{sent}/{failed}")
                },
            }
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");
    println!();
    println!("{} of {} logs match", matching.len(), logs.len());
    Ok(())
}

fn cmd_logs_options(cfg_dir: &Path, departments: Vec<String>) -> Result<()> {
    let (_, api) = connect(cfg_dir)?;
    let logs = fetch_logs(&api)?;
    let filter = LogFilter {
        departments,
        ..LogFilter::default()
    };
    let options = LogOptions::from_logs(&logs, &filter);

    print_options("Departments:", &options.departments);
    print_options("Accounts:", &options.accounts);
    print_options("Templates:", &options.templates);
    Ok(())
}

fn cmd_logs_show(cfg_dir: &Path, log_id: &str) -> Result<()> {
    let (_, api) = connect(cfg_dir)?;
    let logs = fetch_logs(&api)?;
    let entry = logs
        .iter()
        .find(|l| l.log_id == log_id)
        .ok_or_else(|| ReminderError::LogNotFound(log_id.to_string()))?;

    println!("Log {}", entry.log_id);
    println!("  Timestamp:        {}", display_timestamp(entry));
    println!("  Sent by:          {}", entry.sent_by);
    println!("  Template:         {}", entry.template_used);
    println!("  Total invoices:   {}", entry.total_invoices_sent);
    println!("  Departments:      {}", entry.departments_selected.join(", "));
    println!("  Accounts:         {}", entry.accounts_selected.join(", "));
    println!("  Statuses:         {}", entry.statuses_selected.join(", "));
    println!("  Billing periods:  {}", entry.billing_periods_selected.join(", "));
    println!("  Invoices:         {}", entry.invoice_ids.join(", "));
    if !entry.attachments.is_empty() {
        println!("  Attachments:      {}", entry.attachments.join(", "));
    }
    if !entry.email_results.is_empty() {
        println!("  Results:");
        for result in &entry.email_results {
            let detail = result
                .error_message
                .as_deref()
                .or(result.ses_message_id.as_deref())
                .unwrap_or("");
            println!("    {}  {}  {}", result.invoice_id, result.status, detail);
        }
    }
    if let Some(content) = entry.email_content.as_deref().filter(|c| !c.is_empty()) {
        println!();
        println!("{content}");
    }
    Ok(())
}

fn cmd_chat_send(cfg_dir: &Path, message: &str, out_dir: Option<PathBuf>) -> Result<()> {
    let (_, api) = connect(cfg_dir)?;
    let mut state = load_state(cfg_dir)?;

    let reply = chat::send_message(&api, &mut state.chat, message);
    // Keep any session id the backend issued, even if the reply was unusable
    save_state(cfg_dir, &state)?;

    match reply? {
        ChatReply::Text(text) => println!("{text}"),
        ChatReply::Csv(export) => {
            let dir = out_dir.unwrap_or_else(|| PathBuf::from("."));
            fs::create_dir_all(&dir)?;
            let name = Path::new(&export.filename)
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| "export.csv".into());
            let path = dir.join(name);
            fs::write(&path, &export.data)?;
            println!(
                "CSV generated with {} rows: {}",
                export.rows.as_deref().unwrap_or("some"),
                path.display()
            );
        }
        ChatReply::Empty => println!("No response from AI."),
    }
    Ok(())
}

fn cmd_chat_close(cfg_dir: &Path) -> Result<()> {
    let (_, api) = connect(cfg_dir)?;
    let mut state = load_state(cfg_dir)?;

    if chat::close_session(&api, &mut state.chat) {
        save_state(cfg_dir, &state)?;
        println!("Chat session closed");
    } else {
        println!("No open chat session");
    }
    Ok(())
}
