use std::io;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use super::TransportError;

/// Default user agent for service requests.
pub const DEFAULT_USER_AGENT: &str = "wfs-replica/0.1";

/// Status, headers and body of one HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    /// HTTP status code.
    pub status: u16,
    /// Response headers in arrival order.
    pub headers: Vec<(String, String)>,
    /// Response body decoded as text.
    pub body: String,
}

impl HttpReply {
    /// Build a reply without headers.
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Whether the status is in the 2xx range.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One HTTP GET per call, with no retry or status interpretation.
///
/// Implementations return every HTTP response, including error statuses, as
/// an [`HttpReply`]; only failures below HTTP become errors.
#[async_trait(?Send)]
pub trait HttpSource {
    /// Issue a GET request for `url`.
    async fn get(&self, url: &Url) -> Result<HttpReply, TransportError>;
}

/// [`HttpSource`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestSource {
    client: Client,
}

impl ReqwestSource {
    /// Build a source sending `user_agent` and giving up on a single round
    /// trip after `timeout`.
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait(?Send)]
impl HttpSource for ReqwestSource {
    async fn get(&self, url: &Url) -> Result<HttpReply, TransportError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| convert_reqwest_error(err, url.as_str()))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_owned(),
                    value.to_str().unwrap_or_default().to_owned(),
                )
            })
            .collect();
        let body = response
            .text()
            .await
            .map_err(|err| convert_reqwest_error(err, url.as_str()))?;
        Ok(HttpReply {
            status,
            headers,
            body,
        })
    }
}

fn convert_reqwest_error(error: reqwest::Error, url: &str) -> TransportError {
    let kind = if error.is_timeout() {
        io::ErrorKind::TimedOut
    } else {
        io::ErrorKind::Other
    };
    TransportError::Network {
        url: url.to_owned(),
        source: io::Error::new(kind, error),
    }
}
