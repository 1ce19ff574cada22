//! Host and user gates applied before any request is parsed.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::collections::HashMap;
use tracing::debug;

use jsonrpc_protocol::{RpcError, RpcResult};

/// Username and password supplied by the caller, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }

    /// Decode a base64 `user:pass` token, with or without a leading `Basic `.
    pub fn from_basic_token(token: &str) -> Self {
        let token = token.trim();
        let token = token.strip_prefix("Basic ").unwrap_or(token);

        let decoded = match STANDARD.decode(token) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                debug!("Ignoring undecodable credentials: {}", e);
                return Self::default();
            }
        };

        match decoded.split_once(':') {
            Some((username, password)) => Self::new(username, password),
            None => Self {
                username: Some(decoded),
                password: None,
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.password.is_none()
    }
}

/// Reject callers whose address is not listed. An empty list allows everyone.
pub fn validate_host(allowed_hosts: &[String], remote_addr: Option<&str>) -> RpcResult<()> {
    if allowed_hosts.is_empty() {
        return Ok(());
    }

    match remote_addr {
        Some(addr) if allowed_hosts.iter().any(|host| host == addr) => Ok(()),
        _ => Err(RpcError::AccessDenied("Access Forbidden".into())),
    }
}

/// Reject callers whose credentials do not match. An empty map allows everyone.
pub fn validate_user(users: &HashMap<String, String>, credentials: &Credentials) -> RpcResult<()> {
    if users.is_empty() {
        return Ok(());
    }

    let matched = match (&credentials.username, &credentials.password) {
        (Some(username), Some(password)) => users.get(username) == Some(password),
        _ => false,
    };

    if matched {
        Ok(())
    } else {
        Err(RpcError::AuthenticationFailure("Access not allowed".into()))
    }
}
