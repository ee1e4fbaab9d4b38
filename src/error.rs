use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReminderError {
    #[error("Config directory not found at {0}. Run 'reminder init' to create it.")]
    ConfigNotFound(PathBuf),

    #[error("Config file not found: {0}")]
    ConfigFileNotFound(PathBuf),

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to write state file: {0}")]
    StateWrite(String),

    #[error("Config directory already exists at {0}")]
    AlreadyInitialized(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Backend returned {status} for {path}: {body}")]
    Backend {
        path: String,
        status: u16,
        body: String,
    },

    #[error("Request to {path} failed: {reason}")]
    Transport { path: String, reason: String },

    #[error("Unexpected response from {path}: {reason}")]
    Decode { path: String, reason: String },

    #[error("No signed-in account. Sign in with '{login}' and retry.")]
    NoAccount { login: String },

    #[error("Sign-in required by the identity provider. Run '{login}' and retry.")]
    InteractionRequired { login: String },

    #[error("Token command failed: {0}")]
    TokenCommand(String),

    #[error("Duplicate invoice id '{0}' in backend response")]
    DuplicateInvoice(String),

    #[error("Invoice '{0}' is not in the current filtered view")]
    InvoiceNotVisible(String),

    #[error("Invoice '{0}' not found")]
    InvoiceNotFound(String),

    #[error("No invoices selected. Use 'reminder select' to build a batch.")]
    EmptySelection,

    #[error("Template '{0}' not found. Use 'reminder template list' to see available templates.")]
    TemplateNotFound(String),

    #[error("Unknown {field} '{value}'. Use 'reminder filter options' to see valid values.")]
    UnknownFilterValue { field: &'static str, value: String },

    #[error("Invalid status '{0}'. Use 'due', 'overdue', 'paid', or 'total_unpaid'.")]
    InvalidStatus(String),

    #[error("Invalid sort column '{0}'. Use id, account, department, period, due, balance, or status.")]
    InvalidSortColumn(String),

    #[error("Invalid date '{0}'. Expected YYYY-MM-DD.")]
    InvalidDate(String),

    #[error("Invalid page size {0}. Must be greater than zero.")]
    InvalidPageSize(usize),

    #[error("Log '{0}' not found")]
    LogNotFound(String),

    #[error("Invalid CSV export from chat: {0}")]
    InvalidExport(String),
}

pub type Result<T> = std::result::Result<T, ReminderError>;
