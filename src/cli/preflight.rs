//! Pre-flight checks before expensive operations.
//!
//! Validates that credentials are available before starting a run that
//! would otherwise fail after the first request.

use crate::config::{NotionSettings, ProviderSettings};
use crate::error::{Result, SkriveError};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation<'a> {
    /// Generating notes requires the provider's API key.
    Notes(&'a ProviderSettings),
    /// Publishing requires Notion credentials and a database.
    Publish(&'a NotionSettings),
}

/// Run pre-flight checks for the given operation.
pub fn check(operation: Operation<'_>) -> Result<()> {
    match operation {
        Operation::Notes(provider) => check_env_key(&provider.api_key_env),
        Operation::Publish(notion) => {
            check_env_key(&notion.api_key_env)?;
            if notion.resolve_database_id().is_none() {
                return Err(SkriveError::Config(format!(
                    "Notion database not configured. Set notion.database_id or {}",
                    notion.database_id_env
                )));
            }
            Ok(())
        }
    }
}

/// Check that an API key environment variable is set and non-empty.
fn check_env_key(name: &str) -> Result<()> {
    match std::env::var(name) {
        Ok(key) if !key.trim().is_empty() => Ok(()),
        Ok(_) => Err(SkriveError::Config(format!(
            "{} is empty. Set it with: export {}='...'",
            name, name
        ))),
        Err(_) => Err(SkriveError::Config(format!(
            "{} not set. Set it with: export {}='...'",
            name, name
        ))),
    }
}
