use crate::config::HunterConfig;
use crate::{HunterError, Result};
use std::io::Read;
use std::time::Duration;
use ureq::ResponseExt;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_BODY_BYTES: u64 = 16 * 1024 * 1024;
const MAX_REDIRECTS: u32 = 10;

#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    /// URL after redirects were followed.
    pub final_url: String,
    /// Lowercased `Content-Type` header, empty when absent.
    pub content_type: String,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turns a non-2xx status into `HunterError::HttpStatus`.
    pub fn error_for_status(self, url: &str) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(HunterError::HttpStatus {
                url: url.to_string(),
                status: self.status,
            })
        }
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Byte-fetching capability used by the extractor and the hunter.
///
/// Implementations follow redirects and never treat an HTTP status as a
/// transport error; callers decide what a status means.
pub trait Fetcher: Send + Sync {
    fn get(&self, url: &str) -> Result<FetchResponse>;
    fn head(&self, url: &str) -> Result<FetchResponse>;
}

impl<T: Fetcher + ?Sized> Fetcher for &T {
    fn get(&self, url: &str) -> Result<FetchResponse> {
        (**self).get(url)
    }

    fn head(&self, url: &str) -> Result<FetchResponse> {
        (**self).head(url)
    }
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new(config: &HunterConfig) -> Self {
        let timeout = if config.timeout_secs == 0 {
            DEFAULT_TIMEOUT_SECS
        } else {
            config.timeout_secs
        };
        let user_agent = if config.user_agent.trim().is_empty() {
            DEFAULT_USER_AGENT.to_string()
        } else {
            config.user_agent.trim().to_string()
        };

        let mut builder = ureq::Agent::config_builder();
        builder = builder
            .http_status_as_error(false)
            .max_redirects(MAX_REDIRECTS)
            .timeout_global(Some(Duration::from_secs(timeout)))
            .user_agent(user_agent);
        let agent: ureq::Agent = builder.build().into();
        Self { agent }
    }

    fn into_fetch_response(
        url: &str,
        mut response: ureq::http::Response<ureq::Body>,
        read_body: bool,
    ) -> Result<FetchResponse> {
        let status = response.status().as_u16();
        let final_url = response.get_uri().to_string();
        let content_type = header_string(&response, "content-type");

        let mut body = Vec::new();
        if read_body {
            response
                .body_mut()
                .as_reader()
                .take(MAX_BODY_BYTES)
                .read_to_end(&mut body)
                .map_err(|e| HunterError::Http {
                    url: url.to_string(),
                    message: format!("failed to read body: {e}"),
                })?;
        }

        Ok(FetchResponse {
            status,
            final_url,
            content_type,
            body,
        })
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(&HunterConfig::default())
    }
}

impl Fetcher for HttpFetcher {
    fn get(&self, url: &str) -> Result<FetchResponse> {
        let response = self.agent.get(url).call().map_err(|e| HunterError::Http {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        Self::into_fetch_response(url, response, true)
    }

    fn head(&self, url: &str) -> Result<FetchResponse> {
        let response = self.agent.head(url).call().map_err(|e| HunterError::Http {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        Self::into_fetch_response(url, response, false)
    }
}

fn header_string(response: &ureq::http::Response<ureq::Body>, key: &str) -> String {
    response
        .headers()
        .get(key)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase()
}
