//! Completion client factory.
//!
//! Creates a [`Completer`] from application configuration: resolves the
//! provider endpoint and API key and constructs the client once per
//! process; callers share it behind an `Arc`.

use crate::client::Completer;
use crate::providers::OpenAiCompleter;
use docbot_core::{AppError, AppResult};
use std::sync::Arc;

/// Create a completion client for the given provider name.
///
/// # Arguments
/// * `provider` - Provider identifier (currently "openai")
/// * `endpoint` - Base URL of the API
/// * `api_key` - Bearer token for the provider
pub fn create_completer(
    provider: &str,
    endpoint: &str,
    api_key: &str,
) -> AppResult<Arc<dyn Completer>> {
    match provider.to_lowercase().as_str() {
        "openai" => {
            if api_key.is_empty() {
                return Err(AppError::Config(
                    "OpenAI provider requires an API key".to_string(),
                ));
            }
            Ok(Arc::new(OpenAiCompleter::with_base_url(api_key, endpoint)))
        }
        _ => Err(AppError::Config(format!("Unknown provider: {}", provider))),
    }
}
