use std::process::Command;

use crate::config::AuthSettings;
use crate::error::{ReminderError, Result};

/// Source of bearer tokens for the backend. Acquisition and refresh belong
/// to the identity provider; implementations only hand over what it issued.
pub trait TokenProvider {
    fn access_token(&self) -> Result<String>;

    /// Command the operator runs to sign in again
    fn login_hint(&self) -> &str;
}

/// Reads the token from an environment variable
pub struct EnvToken {
    var: String,
    login: String,
}

impl EnvToken {
    pub fn new(var: &str, login: &str) -> Self {
        Self {
            var: var.to_string(),
            login: login.to_string(),
        }
    }
}

impl TokenProvider for EnvToken {
    fn access_token(&self) -> Result<String> {
        match std::env::var(&self.var) {
            Ok(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
            _ => {
                log::debug!("no token in ${}", self.var);
                Err(ReminderError::NoAccount {
                    login: self.login.clone(),
                })
            }
        }
    }

    fn login_hint(&self) -> &str {
        &self.login
    }
}

/// Runs the identity provider's CLI and takes the token from its stdout
pub struct CommandToken {
    program: String,
    args: Vec<String>,
    login: String,
}

impl CommandToken {
    pub fn new(command: &[String], login: &str) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            login: login.to_string(),
        })
    }
}

impl TokenProvider for CommandToken {
    fn access_token(&self) -> Result<String> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .map_err(|e| ReminderError::TokenCommand(format!("{}: {e}", self.program)))?;

        if !output.status.success() {
            log::error!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Err(ReminderError::InteractionRequired {
                login: self.login.clone(),
            });
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if token.is_empty() {
            return Err(ReminderError::NoAccount {
                login: self.login.clone(),
            });
        }
        Ok(token)
    }

    fn login_hint(&self) -> &str {
        &self.login
    }
}

/// A fixed token, for scripted use and tests
pub struct StaticToken(pub String);

impl TokenProvider for StaticToken {
    fn access_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }

    fn login_hint(&self) -> &str {
        "reminder"
    }
}

/// Prefer the configured token command, fall back to the environment variable
pub fn provider_from_config(auth: &AuthSettings) -> Box<dyn TokenProvider> {
    if let Some(provider) = auth
        .token_command
        .as_deref()
        .and_then(|cmd| CommandToken::new(cmd, &auth.login_command))
    {
        return Box::new(provider);
    }
    Box::new(EnvToken::new(&auth.token_env, &auth.login_command))
}
