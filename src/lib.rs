pub mod api;
pub mod chat;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod format;
pub mod invoice;
pub mod logs;

pub use api::{ApiClient, Dispatch, SendEmailsRequest, SendEmailsResponse, TokenProvider};
pub use config::{Config, State, Template, TemplateCatalog};
pub use dashboard::{Dashboard, ViewState};
pub use error::{ReminderError, Result};
pub use invoice::{compose, BatchPreview, FilterSpec, Invoice, InvoiceStore, Selection};
