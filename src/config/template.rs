use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key of the template whose body the operator can replace from a file
pub const CUSTOM_TEMPLATE: &str = "custom";

const DEPARTMENT: &str = "[Department]";
const PAYER_ACCOUNT: &str = "[Payer Account ID]";
const ACCOUNT_NAME: &str = "[Account Name]";

/// A reminder email body. Placeholders are substituted by the backend at
/// send time; `preview` only fills them in for display.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Template {
    pub name: String,
    pub body: String,
}

impl Template {
    pub fn new(name: &str, body: &str) -> Self {
        Self {
            name: name.to_string(),
            body: body.to_string(),
        }
    }

    /// Body to send, or None to let the backend apply its default template
    pub fn dispatch_body(&self) -> Option<String> {
        if self.body.trim().is_empty() {
            None
        } else {
            Some(self.body.clone())
        }
    }

    pub fn preview(&self, department: &str, payer_account: &str, account: &str) -> String {
        self.body
            .replace(DEPARTMENT, department)
            .replace(PAYER_ACCOUNT, payer_account)
            .replace(ACCOUNT_NAME, account)
    }
}

/// Built-in templates, keyed the way the operator selects them
pub fn builtin_templates() -> BTreeMap<String, Template> {
    let mut map = BTreeMap::new();
    map.insert(
        "default".to_string(),
        Template::new(
            "Default Reminder",
            "Dear [Department] Team,\n\n\
             This is a friendly reminder that your department currently has unpaid invoices.\n\n\
             Please review the attached invoice package for full details.",
        ),
    );
    map.insert(
        "overdue".to_string(),
        Template::new(
            "Overdue Notice",
            "URGENT: Overdue Invoice Notice\n\n\
             Dear [Department] Team,\n\n\
             Our records show that your department has overdue invoices that require immediate attention.\n\n\
             The attached invoice package includes all overdue items associated with your accounts.\n\n\
             Immediate payment is required to avoid any service interruptions.",
        ),
    );
    map.insert(
        "final".to_string(),
        Template::new(
            "Final Notice",
            "FINAL NOTICE - Immediate Action Required\n\n\
             Dear [Department] Team,\n\n\
             This is the final notice regarding overdue invoices associated with your department.\n\n\
             Please review the attached invoice package for details.\n\n\
             Failure to remit payment within 5 business days may result in:\n\
             - Service suspension\n\
             - Collection agency referral\n\
             - Additional late fees",
        ),
    );
    map.insert(
        "friendly".to_string(),
        Template::new(
            "Friendly Reminder",
            "Hi [Department] Team,\n\n\
             Just a quick reminder that your department has pending invoices.\n\n\
             The attached package includes all related invoices grouped by account for your convenience.\n\n\
             If you need clarification or have already processed these, please let us know.",
        ),
    );
    map.insert(
        CUSTOM_TEMPLATE.to_string(),
        Template::new(
            "Custom Template",
            "[Create your own template here]\n\n\
             Available placeholders:\n\
             [Department], [Payer Account ID]",
        ),
    );
    map
}

/// Built-in templates merged with the ones from templates.toml
#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    templates: BTreeMap<String, Template>,
}

impl TemplateCatalog {
    pub fn with_overrides(user: BTreeMap<String, Template>) -> Self {
        let mut templates = builtin_templates();
        templates.extend(user);
        Self { templates }
    }

    pub fn get(&self, key: &str) -> Option<&Template> {
        self.templates.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Template)> {
        self.templates.iter()
    }

    /// Resolve the template for a batch, swapping in the operator's own body
    /// for the custom template when one was supplied.
    pub fn resolve(&self, key: &str, custom_body: Option<&str>) -> Option<Template> {
        let template = self.templates.get(key)?;
        match custom_body {
            Some(body) if key == CUSTOM_TEMPLATE => Some(Template::new(&template.name, body)),
            _ => Some(template.clone()),
        }
    }
}

impl Default for TemplateCatalog {
    fn default() -> Self {
        Self::with_overrides(BTreeMap::new())
    }
}
