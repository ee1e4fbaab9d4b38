use serde::{Deserialize, Serialize};

use crate::chat::ChatSession;
use crate::dashboard::ViewState;

/// Operator session persisted between commands
#[derive(Debug, Deserialize, Serialize)]
pub struct State {
    #[serde(default = "default_template")]
    pub template: String,
    /// Body used in place of the custom template's placeholder text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_body: Option<String>,
    #[serde(default)]
    pub view: ViewState,
    #[serde(default)]
    pub chat: ChatSession,
}

impl Default for State {
    fn default() -> Self {
        Self {
            template: default_template(),
            custom_body: None,
            view: ViewState::default(),
            chat: ChatSession::default(),
        }
    }
}

fn default_template() -> String {
    "default".to_string()
}
