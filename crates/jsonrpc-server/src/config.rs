use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use jsonrpc_protocol::error_codes;

/// Server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Remote addresses allowed to call the server; empty allows everyone
    pub allowed_hosts: Vec<String>,
    /// Username to password; empty disables the user check
    pub users: HashMap<String, String>,
    /// Alternative header carrying base64 `user:pass`, checked before `Authorization`
    pub authentication_header: Option<String>,
    /// Code for errors that have none of their own
    pub default_error_code: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            allowed_hosts: Vec::new(),
            users: HashMap::new(),
            authentication_header: None,
            default_error_code: error_codes::INTERNAL_ERROR,
        }
    }
}
