//! HTTP endpoint watcher

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::json;

use super::Watcher;
use crate::domain::Verdict;
use crate::error::{BoxError, Result, TickwatchError};

/// Issues a GET and compares the response status
#[derive(Debug, Clone)]
pub struct HttpWatcher {
    name: String,
    url: String,
    client: Client,
    expected_status: Option<u16>,
    group: Option<String>,
    interval: Option<Duration>,
    timeout: Option<Duration>,
}

impl HttpWatcher {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            client: Client::new(),
            expected_status: None,
            group: None,
            interval: None,
            timeout: None,
        }
    }

    /// Require an exact status instead of any 2xx
    pub fn with_expected_status(mut self, status: u16) -> Self {
        self.expected_status = Some(status);
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn accepts(&self, status: StatusCode) -> bool {
        match self.expected_status {
            Some(expected) => status.as_u16() == expected,
            None => status.is_success(),
        }
    }
}

#[async_trait]
impl Watcher for HttpWatcher {
    fn name(&self) -> &str {
        &self.name
    }

    fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    fn interval(&self) -> Option<Duration> {
        self.interval
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.url)
            .map_err(|e| TickwatchError::Configuration(format!("invalid url '{}': {}", self.url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(TickwatchError::Configuration(format!(
                "unsupported scheme '{}' in '{}'",
                url.scheme(),
                self.url
            )));
        }
        if let Some(status) = self.expected_status {
            StatusCode::from_u16(status)
                .map_err(|_| TickwatchError::Configuration(format!("invalid expected status {}", status)))?;
        }
        Ok(())
    }

    async fn execute(&self) -> std::result::Result<Verdict, BoxError> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        let payload = json!({ "status": status.as_u16() });

        let description = format!("GET {} -> {}", self.url, status);
        if self.accepts(status) {
            Ok(Verdict::valid(description).with_payload(payload))
        } else {
            Ok(Verdict::invalid(description).with_payload(payload))
        }
    }
}
