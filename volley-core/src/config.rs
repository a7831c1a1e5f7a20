use crate::{DEFAULT_CONCURRENCY, DEFAULT_OPERATIONS};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Endpoint must not be empty")]
    EmptyEndpoint,

    #[error("Endpoint `{endpoint}` is not a valid http(s) URL: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("Total operations must be at least 1")]
    ZeroOperations,

    #[error("Concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("Invalid header `{0}`")]
    InvalidHeader(String),

    #[error("Unknown HTTP method `{0}`")]
    UnknownMethod(String),
}

/// HTTP methods a workload can issue.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
        }
    }

    /// Whether a request body is sent with this method.
    pub fn allows_body(&self) -> bool {
        !matches!(self, Method::Get)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            "PATCH" => Ok(Method::Patch),
            _ => Err(ConfigError::UnknownMethod(s.to_string())),
        }
    }
}

/// Description of a single load test: what to call, how often and how wide.
///
/// The config is immutable for the lifetime of a run. Use the builder-style setters to construct
/// one and [`WorkloadConfig::validate`] to check it before handing it to the engine (the engine
/// validates again and fails the run if the config is unusable).
///
/// # Example
/// ```
/// use volley_core::{Method, WorkloadConfig};
///
/// let config = WorkloadConfig::new("http://127.0.0.1:3002/ok")
///     .method(Method::Post)
///     .header("Content-Type", "application/json")
///     .body(r#"{"hello":"world"}"#)
///     .operations(100)
///     .concurrency(10);
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.wave_count(), 10);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct WorkloadConfig {
    pub endpoint: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub method: Method,
    #[cfg_attr(feature = "serde", serde(default))]
    pub headers: BTreeMap<String, String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub body: Option<String>,
    #[cfg_attr(feature = "serde", serde(default, alias = "apiKey"))]
    pub auth_token: Option<String>,
    #[cfg_attr(feature = "serde", serde(alias = "operations"))]
    pub total_operations: u64,
    pub concurrency: u64,
}

impl WorkloadConfig {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            method: Method::default(),
            headers: BTreeMap::new(),
            body: None,
            auth_token: None,
            total_operations: DEFAULT_OPERATIONS,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    pub fn body(mut self, body: &str) -> Self {
        self.body = Some(body.to_string());
        self
    }

    pub fn auth_token(mut self, token: &str) -> Self {
        self.auth_token = Some(token.to_string());
        self
    }

    pub fn operations(mut self, total_operations: u64) -> Self {
        self.total_operations = total_operations;
        self
    }

    pub fn concurrency(mut self, concurrency: u64) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::EmptyEndpoint);
        }

        let url = url::Url::parse(&self.endpoint).map_err(|e| ConfigError::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            reason: e.to_string(),
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEndpoint {
                endpoint: self.endpoint.clone(),
                reason: format!("unsupported scheme `{}`", url.scheme()),
            });
        }

        if let Some((name, _)) = self
            .headers
            .iter()
            .find(|(name, value)| !valid_header_name(name) || !valid_header_value(value))
        {
            return Err(ConfigError::InvalidHeader(name.clone()));
        }

        if self.total_operations == 0 {
            return Err(ConfigError::ZeroOperations);
        }

        if self.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }

        Ok(())
    }

    /// Number of waves the workload is split into. Zero for an invalid (zero concurrency) config.
    pub fn wave_count(&self) -> u64 {
        if self.concurrency == 0 {
            return 0;
        }
        self.total_operations.div_ceil(self.concurrency)
    }
}

fn valid_header_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b))
}

fn valid_header_value(value: &str) -> bool {
    !value.bytes().any(|b| matches!(b, b'\r' | b'\n' | b'\0'))
}
