// Blocking HTTP client shared by the embedding and chat providers


use std::io::{BufRead, BufReader};
use std::time::Duration;

use tracing::{debug, error, warn};
use ureq::Body;
use ureq::http::Response;
use url::Url;

use crate::{RagError, Result};

const EXPONENTIAL_BACKOFF_BASE: u32 = 2;
const DEFAULT_BACKOFF_UNIT: Duration = Duration::from_secs(1);
const MAX_ERROR_BODY_CHARS: usize = 500;

/// ureq agent with retry and exponential backoff.
///
/// Transport failures, `429` and `5xx` responses are retried; any other
/// non-success status fails immediately with the response body attached.
#[derive(Debug, Clone)]
pub struct HttpClient {
    agent: ureq::Agent,
    retry_attempts: u32,
    backoff_unit: Duration,
}

impl HttpClient {
    /// Client for request/response calls, bounded by one overall timeout
    #[inline]
    pub fn new(timeout: Duration, retry_attempts: u32) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            retry_attempts: retry_attempts.max(1),
            backoff_unit: DEFAULT_BACKOFF_UNIT,
        }
    }

    /// Client for streamed responses: the timeout bounds connecting and
    /// waiting for the response head, not the length of the body.
    #[inline]
    pub fn streaming(timeout: Duration, retry_attempts: u32) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_connect(Some(timeout))
            .timeout_recv_response(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            retry_attempts: retry_attempts.max(1),
            backoff_unit: DEFAULT_BACKOFF_UNIT,
        }
    }

    #[inline]
    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    #[inline]
    pub fn retry_attempts(&self) -> u32 {
        self.retry_attempts
    }

    /// POST a JSON body and return the response body as text
    #[inline]
    pub fn post_json(&self, url: &Url, headers: &[(&str, String)], body: &str) -> Result<String> {
        let mut response = self.send_with_retry(url, headers, body)?;
        response
            .body_mut()
            .read_to_string()
            .map_err(|e| RagError::Network(format!("Failed to read response from {}: {}", url, e)))
    }

    /// POST a JSON body and return a line reader over the response body
    #[inline]
    pub fn post_stream(
        &self,
        url: &Url,
        headers: &[(&str, String)],
        body: &str,
    ) -> Result<impl BufRead + use<>> {
        let response = self.send_with_retry(url, headers, body)?;
        Ok(BufReader::new(response.into_body().into_reader()))
    }

    fn send_with_retry(
        &self,
        url: &Url,
        headers: &[(&str, String)],
        body: &str,
    ) -> Result<Response<Body>> {
        let mut last_error = None;

        for attempt in 1..=self.retry_attempts {
            debug!(
                "HTTP request attempt {}/{} to {}",
                attempt, self.retry_attempts, url
            );

            let mut request = self
                .agent
                .post(url.as_str())
                .header("Content-Type", "application/json");
            for (name, value) in headers {
                request = request.header(*name, value.as_str());
            }

            match request.send(body) {
                Ok(mut response) => {
                    let status = response.status();
                    if status.is_success() {
                        debug!("Request succeeded on attempt {}", attempt);
                        return Ok(response);
                    }

                    let detail = response
                        .body_mut()
                        .read_to_string()
                        .map(|text| truncate(&text))
                        .unwrap_or_default();

                    if status.as_u16() == 429 || status.is_server_error() {
                        warn!(
                            "Server responded {} on attempt {}/{}",
                            status, attempt, self.retry_attempts
                        );
                        last_error = Some(RagError::Network(format!(
                            "HTTP {} from {}: {}",
                            status.as_u16(),
                            url,
                            detail
                        )));
                    } else {
                        warn!("Client error (status {}), not retrying", status);
                        return Err(RagError::Network(format!(
                            "HTTP {} from {}: {}",
                            status.as_u16(),
                            url,
                            detail
                        )));
                    }
                }
                Err(e) => match e {
                    ureq::Error::ConnectionFailed
                    | ureq::Error::HostNotFound
                    | ureq::Error::Timeout(_)
                    | ureq::Error::Io(_) => {
                        warn!(
                            "Transport error: {}, attempt {}/{}",
                            e, attempt, self.retry_attempts
                        );
                        last_error = Some(RagError::Network(format!(
                            "Request to {} failed: {}",
                            url, e
                        )));
                    }
                    other => {
                        warn!("Non-retryable error: {}", other);
                        return Err(RagError::Network(format!(
                            "Request to {} failed: {}",
                            url, other
                        )));
                    }
                },
            }

            if attempt < self.retry_attempts {
                let delay = self.backoff_unit * EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1);
                debug!("Waiting {:?} before retry", delay);
                std::thread::sleep(delay);
            }
        }

        error!("All retry attempts failed for request to {}", url);

        Err(last_error
            .unwrap_or_else(|| RagError::Network(format!("Request to {} failed", url))))
    }
}

fn truncate(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= MAX_ERROR_BODY_CHARS {
        trimmed.to_string()
    } else {
        let head: String = trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect();
        format!("{}…", head)
    }
}
