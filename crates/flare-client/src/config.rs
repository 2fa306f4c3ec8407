//! Client configuration

use flare::AstOptions;
use serde::{Deserialize, Serialize};

use crate::{ClientError, Result};

pub const DEFAULT_HOST: &str = "https://api.sentenai.com";
pub const AUTH_KEY_VAR: &str = "SENTENAI_AUTH_KEY";
pub const HOST_VAR: &str = "SENTENAI_HOST";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub auth_key: String,
    #[serde(default = "default_host")]
    pub host: String,
    /// Lowering options applied to every submitted query.
    #[serde(default)]
    pub ast: AstOptions,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            auth_key: String::new(),
            host: default_host(),
            ast: AstOptions::default(),
        }
    }
}

impl ClientConfig {
    pub fn new(auth_key: impl Into<String>) -> Self {
        Self {
            auth_key: auth_key.into(),
            ..Self::default()
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_ast(mut self, ast: AstOptions) -> Self {
        self.ast = ast;
        self
    }

    /// Read `SENTENAI_AUTH_KEY` (required) and `SENTENAI_HOST` (optional).
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_vars(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let auth_key = get(AUTH_KEY_VAR)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ClientError::Config(format!("{AUTH_KEY_VAR} is not set")))?;
        let mut config = Self::new(auth_key);
        if let Some(host) = get(HOST_VAR).filter(|h| !h.is_empty()) {
            config.host = host;
        }
        Ok(config)
    }
}
