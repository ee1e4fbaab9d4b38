use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub api: ApiSettings,
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub operator: OperatorSettings,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ApiSettings {
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AuthSettings {
    #[serde(default = "default_token_env")]
    pub token_env: String,
    /// Program and arguments that print an access token on stdout
    #[serde(default)]
    pub token_command: Option<Vec<String>>,
    #[serde(default = "default_login")]
    pub login_command: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct OperatorSettings {
    #[serde(default = "default_operator")]
    pub name: String,
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            token_env: default_token_env(),
            token_command: None,
            login_command: default_login(),
        }
    }
}

impl Default for OperatorSettings {
    fn default() -> Self {
        Self {
            name: default_operator(),
            currency_symbol: default_currency_symbol(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_token_env() -> String {
    "REMINDER_TOKEN".to_string()
}

fn default_login() -> String {
    "az login".to_string()
}

fn default_operator() -> String {
    "Finance Operator".to_string()
}

fn default_currency_symbol() -> String {
    "$".to_string()
}
