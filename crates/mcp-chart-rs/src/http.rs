use std::time::Duration;

use reqwest::Client;

use crate::error::Result;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Shared client for outbound calls. Every request is bounded by `timeout`.
pub fn client(timeout: Duration) -> Result<Client> {
    let client = Client::builder()
        .timeout(timeout)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}
