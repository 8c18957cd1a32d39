//! Error reports pushed to an ntfy topic.
//!
//! Posts the error text as the message body with ntfy's header format:
//!
//! | Header | Value |
//! |--------|-------|
//! | `Title` | `Application Error on <host>` |
//! | `Tags` | `rotating_light,error` |
//! | `Priority` | `high` |
//!
//! Delivery failures are logged and otherwise ignored.

use std::time::Duration;

use sysinfo::System;
use tracing::{debug, error};

use crate::error::{ReceiptError, Result};

const TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct ErrorNotifier {
    client: reqwest::Client,
    url: String,
    host: String,
}

impl ErrorNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("ntfy-receipt/", env!("CARGO_PKG_VERSION")))
            .timeout(TIMEOUT)
            .build()
            .map_err(|e| ReceiptError::Config(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
            host: System::host_name().unwrap_or_else(|| "unknown".to_string()),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn title(&self) -> String {
        format!("Application Error on {}", self.host)
    }

    /// Send one report. `kind` only shows up in the local log.
    pub async fn notify(&self, kind: &str, message: &str) {
        let result = self
            .client
            .post(&self.url)
            .header("Title", self.title())
            .header("Tags", "rotating_light,error")
            .header("Priority", "high")
            .body(message.to_string())
            .send()
            .await
            .and_then(|r| r.error_for_status());

        match result {
            Ok(_) => debug!(kind, "Error notification sent"),
            Err(e) => error!("Failed to send error notification: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_names_host() {
        let notifier = ErrorNotifier::new("https://ntfy.sh/alerts").unwrap();
        assert!(notifier.title().starts_with("Application Error on "));
        assert_eq!(notifier.url(), "https://ntfy.sh/alerts");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_swallowed() {
        let notifier = ErrorNotifier::new("http://127.0.0.1:9/alerts").unwrap();
        notifier.notify("test", "boom").await;
    }
}
