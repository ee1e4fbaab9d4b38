mod settings;
pub mod state;
mod template;

pub use settings::{ApiSettings, AuthSettings, Config, OperatorSettings};
pub use state::State;
pub use template::{builtin_templates, Template, TemplateCatalog, CUSTOM_TEMPLATE};

use crate::error::{ReminderError, Result};
use directories::ProjectDirs;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Overrides `api.base_url` from config.toml when set
pub const API_URL_ENV: &str = "REMINDER_API_URL";

/// Get the config directory path (~/.reminder/)
pub fn config_dir() -> Result<PathBuf> {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "reminder") {
        return Ok(proj_dirs.config_dir().to_path_buf());
    }

    let home = std::env::var_os("HOME").map(PathBuf::from).ok_or_else(|| {
        ReminderError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine home directory",
        ))
    })?;

    Ok(home.join(".reminder"))
}

/// Fail early when the config directory has not been initialized
pub fn ensure_initialized(config_dir: &Path) -> Result<()> {
    if !config_dir.exists() {
        return Err(ReminderError::ConfigNotFound(config_dir.to_path_buf()));
    }
    Ok(())
}

fn read_toml<T: serde::de::DeserializeOwned>(path: PathBuf) -> Result<T> {
    let content = fs::read_to_string(&path)?;
    toml::from_str(&content).map_err(|e| ReminderError::ConfigParse { path, source: e })
}

/// Load the main config.toml, applying the API URL environment override
pub fn load_config(config_dir: &Path) -> Result<Config> {
    let path = config_dir.join("config.toml");
    if !path.exists() {
        return Err(ReminderError::ConfigFileNotFound(path));
    }
    let mut config: Config = read_toml(path)?;
    if let Ok(url) = std::env::var(API_URL_ENV) {
        if !url.trim().is_empty() {
            log::debug!("using API base URL from {API_URL_ENV}");
            config.api.base_url = url;
        }
    }
    Ok(config)
}

/// Load templates.toml merged over the built-in catalog
pub fn load_templates(config_dir: &Path) -> Result<TemplateCatalog> {
    let path = config_dir.join("templates.toml");
    let user: BTreeMap<String, Template> = if path.exists() {
        read_toml(path)?
    } else {
        BTreeMap::new()
    };
    Ok(TemplateCatalog::with_overrides(user))
}

/// Load state.toml (default if missing)
pub fn load_state(config_dir: &Path) -> Result<State> {
    let path = config_dir.join("state.toml");
    if !path.exists() {
        return Ok(State::default());
    }
    read_toml(path)
}

/// Save state.toml
pub fn save_state(config_dir: &Path, state: &State) -> Result<()> {
    let path = config_dir.join("state.toml");
    let content =
        toml::to_string_pretty(state).map_err(|e| ReminderError::StateWrite(e.to_string()))?;
    fs::write(path, content)?;
    Ok(())
}

/// Template content for config.toml
pub const CONFIG_TEMPLATE: &str = r#"[api]
base_url = "https://invoices.example.com/api"   # or set REMINDER_API_URL
timeout_secs = 30

[auth]
# Environment variable holding a bearer token for the backend API
token_env = "REMINDER_TOKEN"
# Or ask the identity provider's CLI for a fresh token on every command:
# token_command = ["az", "account", "get-access-token", "--scope", "api://invoice-reminder/.default", "--query", "accessToken", "-o", "tsv"]
login_command = "az login"

[operator]
name = "Finance Operator"   # recorded as sent_by on dispatched batches
currency_symbol = "$"
"#;

/// Template content for templates.toml
pub const TEMPLATES_TEMPLATE: &str = r#"# Add your own reminder templates here. The table name (e.g., [quarterly]) is
# the template key used by 'reminder template use'. Built-in keys (default,
# overdue, final, friendly, custom) can be overridden.
#
# Placeholders are filled in by the backend for each department:
#   [Department], [Payer Account ID], [Account Name]
#
# [quarterly]
# name = "Quarterly Statement"
# body = """
# Dear [Department] Team,
#
# Please find attached the invoices outstanding for this quarter.
# """
"#;
