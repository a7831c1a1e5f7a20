//! Operation executor: one timed call per invocation
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use std::future::Future;
use std::time::{Duration, Instant};
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};
use volley_core::{CallOutcome, Method, WorkloadConfig};

/// Issues a single call described by a [`WorkloadConfig`] and reports how it went.
///
/// Implementations must always resolve to a [`CallOutcome`]: failures are data, not errors. They
/// must not retry.
pub trait Executor: Send + Sync + 'static {
    fn execute(&self, config: &WorkloadConfig) -> impl Future<Output = CallOutcome> + Send;
}

/// [`Executor`] backed by a shared `reqwest` client.
#[derive(Clone, Debug)]
pub struct HttpExecutor {
    client: Client,
}

impl HttpExecutor {
    pub fn new() -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().build()?,
        })
    }

    /// Executor whose client aborts calls after `timeout`. Timed out calls are transport failures.
    pub fn with_timeout(timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
        })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

impl Executor for HttpExecutor {
    async fn execute(&self, config: &WorkloadConfig) -> CallOutcome {
        let start = Instant::now();

        let headers = match build_headers(config) {
            Ok(headers) => headers,
            Err(err) => return CallOutcome::transport_error(err, start.elapsed()),
        };

        let mut request = self
            .client
            .request(reqwest_method(config.method), &config.endpoint)
            .headers(headers);

        if config.method.allows_body() {
            if let Some(body) = &config.body {
                request = request.body(body.clone());
            }
        }

        match request.send().await {
            Ok(response) => {
                let latency = start.elapsed();
                let status = response.status().as_u16();
                // Drain the body so the connection returns to the pool.
                if let Err(err) = response.bytes().await {
                    trace!("Failed reading response body: {err}");
                }
                CallOutcome::response(status, latency)
            }
            Err(err) => {
                let latency = start.elapsed();
                warn!("Transport failure calling {}: {err}", config.endpoint);
                CallOutcome::transport_error(err.to_string(), latency)
            }
        }
    }
}

/// Caller headers plus the bearer credential. The token wins over a caller supplied
/// `Authorization` header.
pub(crate) fn build_headers(config: &WorkloadConfig) -> Result<HeaderMap, String> {
    let mut headers = HeaderMap::with_capacity(config.headers.len() + 1);
    for (name, value) in &config.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| format!("invalid header name `{name}`: {e}"))?;
        let value =
            HeaderValue::from_str(value).map_err(|e| format!("invalid value for `{name}`: {e}"))?;
        headers.insert(name, value);
    }

    if let Some(token) = &config.auth_token {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| format!("invalid auth token: {e}"))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    Ok(headers)
}

fn reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
        Method::Patch => reqwest::Method::PATCH,
    }
}
