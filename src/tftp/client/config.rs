use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::tftp::core::{DEFAULT_RETRY_LIMIT, DEFAULT_TIMEOUT};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ClientConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "humantime_serde")]
    pub timeout: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
    /// Local address to bind, e.g. "0.0.0.0" or "::"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
}

impl ClientConfig {
    pub fn new(server: String, port: u16) -> Self {
        Self {
            server: Some(server),
            port: Some(port),
            timeout: Some(DEFAULT_TIMEOUT),
            retries: Some(DEFAULT_RETRY_LIMIT),
            bind: None,
        }
    }

    /// Server and port always come from the command line; timeout and
    /// retries only when given there, otherwise the file value is kept.
    pub fn merge_cli(
        mut self,
        cli_server: String,
        cli_port: u16,
        cli_timeout: Option<u64>,
        cli_retries: Option<u32>,
    ) -> Self {
        self.server = Some(cli_server);
        self.port = Some(cli_port);
        if let Some(secs) = cli_timeout {
            self.timeout = Some(Duration::from_secs(secs));
        }
        if cli_retries.is_some() {
            self.retries = cli_retries;
        }
        if self.timeout.is_none() {
            self.timeout = Some(DEFAULT_TIMEOUT);
        }
        if self.retries.is_none() {
            self.retries = Some(DEFAULT_RETRY_LIMIT);
        }
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }
}
