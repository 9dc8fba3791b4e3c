use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, error, info, trace, warn};

use crate::types::ParamValue;
use crate::{Error, Result};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

const API_PREFIX: &str = "econet";
const SET_PARAM_RESOURCE: &str = "rmCurrNewParam";

pub struct EconetClientBuilder {
    host: String,
    username: String,
    password: String,
    timeout: Duration,
    retry_delay: Duration,
    max_attempts: u32,
}

impl EconetClientBuilder {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            username: String::new(),
            password: String::new(),
            timeout: DEFAULT_TIMEOUT,
            retry_delay: DEFAULT_RETRY_DELAY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Per-attempt timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn build(self) -> Result<EconetClient> {
        let http = reqwest::Client::builder().build()?;
        Ok(EconetClient {
            http,
            host: normalize_host(&self.host),
            username: self.username,
            password: self.password,
            timeout: self.timeout,
            retry_delay: self.retry_delay,
            max_attempts: self.max_attempts,
        })
    }
}

/// Transport to the controller's local HTTP API.
///
/// Every request carries Basic auth. Timeouts are retried up to the attempt
/// budget; a 401 fails immediately with [`Error::Authentication`]; any other
/// non-200 status is "no data" (`Ok(None)`) without retrying.
pub struct EconetClient {
    http: reqwest::Client,
    host: String,
    username: String,
    password: String,
    timeout: Duration,
    retry_delay: Duration,
    max_attempts: u32,
}

impl EconetClient {
    pub fn builder(host: impl Into<String>) -> EconetClientBuilder {
        EconetClientBuilder::new(host)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// GET `{host}/econet/{resource}`.
    pub async fn get(&self, resource: &str) -> Result<Option<Value>> {
        let url = format!("{}/{API_PREFIX}/{resource}", self.host);
        debug!(resource, host = %self.host, "fetching resource");
        self.fetch(&url, &[]).await
    }

    /// Write one parameter through `rmCurrNewParam`.
    pub async fn set_param(&self, key: &str, value: &ParamValue) -> Result<Option<Value>> {
        let url = format!("{}/{API_PREFIX}/{SET_PARAM_RESOURCE}", self.host);
        debug!(key, %value, "setting parameter");
        let query = [
            ("newParamKey", key.to_string()),
            ("newParamValue", value.to_string()),
        ];
        self.fetch(&url, &query).await
    }

    async fn fetch(&self, url: &str, query: &[(&str, String)]) -> Result<Option<Value>> {
        for attempt in 1..=self.max_attempts {
            trace!(url, attempt, "GET");
            let mut request = self
                .http
                .get(url)
                .basic_auth(&self.username, Some(&self.password))
                .timeout(self.timeout);
            if !query.is_empty() {
                request = request.query(query);
            }

            let resp = match request.send().await {
                Ok(resp) => resp,
                Err(e) if is_transient(&e) => {
                    self.back_off(attempt, &e).await;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let status = resp.status();
            debug!(status = status.as_u16(), "received response");
            if status == StatusCode::UNAUTHORIZED {
                error!(url, "unauthorized");
                return Err(Error::Authentication);
            }
            if status != StatusCode::OK {
                error!(url, status = status.as_u16(), "request failed");
                return Ok(None);
            }

            match resp.json::<Value>().await {
                Ok(body) => {
                    trace!(%body, "fetched");
                    return Ok(Some(body));
                }
                Err(e) if is_transient(&e) => self.back_off(attempt, &e).await,
                Err(e) => return Err(e.into()),
            }
        }

        error!(url, attempts = self.max_attempts, "giving up after repeated timeouts");
        Ok(None)
    }

    async fn back_off(&self, attempt: u32, e: &reqwest::Error) {
        warn!(attempt, max = self.max_attempts, error = %e, "request timed out, retrying");
        if attempt < self.max_attempts {
            tokio::time::sleep(self.retry_delay).await;
        }
    }
}

fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect()
}

pub(crate) fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        info!(host, "no scheme in host, assuming http");
        format!("http://{host}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_gets_http_scheme() {
        assert_eq!(normalize_host("192.168.1.20"), "http://192.168.1.20");
        assert_eq!(normalize_host("http://boiler.local/"), "http://boiler.local");
        assert_eq!(normalize_host("https://boiler.local"), "https://boiler.local");
    }

    #[test]
    fn attempts_never_drop_to_zero() {
        let client = EconetClient::builder("boiler").max_attempts(0).build().unwrap();
        assert_eq!(client.max_attempts, 1);
        assert_eq!(client.host(), "http://boiler");
    }
}
