// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use crate::error::Result;
use crate::models::RenderConfig;

/// Create a configured asynchronous HTTP client.
///
/// The client-level timeout is the navigation deadline; callers may still
/// wrap requests in a shorter `tokio::time::timeout`.
pub fn create_async_client(config: &RenderConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_millis(config.navigation_timeout_ms))
        .build()?;
    Ok(client)
}
