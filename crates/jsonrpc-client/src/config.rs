//! Client configuration

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// How calls are encoded and how error responses are surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// A single mapping argument to `call` is sent as named parameters
    pub named_arguments: bool,

    /// Hand error responses back as values instead of failing the call
    pub return_errors: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            named_arguments: true,
            return_errors: false,
        }
    }
}

/// HTTP transport configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpTransportConfig {
    /// Server endpoint URL
    pub url: String,

    /// Whole-request timeout
    #[serde(with = "duration_serde")]
    pub timeout: Duration,

    /// Custom headers sent with every request
    pub headers: HashMap<String, String>,

    /// HTTP Basic credentials
    pub username: Option<String>,
    pub password: Option<String>,

    /// User agent string
    pub user_agent: String,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8000/jsonrpc".to_string(),
            timeout: Duration::from_secs(5),
            headers: HashMap::new(),
            username: None,
            password: None,
            user_agent: concat!("jsonrpc-client/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpTransportConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Serde helper for Duration serialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
