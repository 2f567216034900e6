// MIT License - Copyright (c) 2021 TJForc
// reqwest-backed transport

use reqwest::header::{self, HeaderMap, HeaderValue};
use tracing::{debug, trace, warn};

use crate::config::ClientConfig;
use crate::constants::{ACCEPT, CONTENT_TYPE};
use crate::error::{EOneError, Result};
use crate::transport::{HttpResponse, Method, Transport};

/// Transport talking HTTPS to the real service.
///
/// Every call carries the vendor client identity headers and an explicit
/// `Content-Length`. Connection failures and timeouts are reported as a
/// status 0 reply rather than an error, so callers decide how fatal they are.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT));
        headers.insert(header::ACCEPT_ENCODING, HeaderValue::from_static("deflate"));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE));
        headers.insert(header::CONNECTION, HeaderValue::from_static("close"));
        headers.insert("X-App-Version", header_value(&config.app_version)?);
        headers.insert("X-Vendor", header_value(&config.vendor)?);

        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| EOneError::Config(format!("Unable to build HTTP client: {e}")))?;

        Ok(Self::with_client(http, &config.base_url))
    }

    /// Use a pre-built client. Default headers are then the caller's business.
    pub fn with_client(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Transport for HttpTransport {
    async fn send(&self, method: Method, path: &str, body: Option<&str>) -> Result<HttpResponse> {
        let url = self.url(path);
        debug!("{} {}", method, url);

        let payload = body.unwrap_or_default().to_string();
        let builder = match method {
            Method::Get => self.http.get(&url),
            Method::Post => self.http.post(&url),
        };
        let request = builder
            .header(header::CONTENT_LENGTH, payload.len())
            .body(payload);

        let resp = match request.send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!("Unable to reach {}: {}", url, e);
                return Ok(HttpResponse::unreachable());
            }
        };

        let status = resp.status().as_u16();
        let text = resp.text().await.map_err(|e| EOneError::Transport {
            reason: format!("Unable to read response body: {e}"),
            status,
            message: None,
        })?;
        debug!("HTTP {} from {}", status, path);
        trace!("Body: {}", text);

        Ok(HttpResponse::new(status, text))
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| EOneError::Config(format!("Invalid header value: {value:?}")))
}
