// MIT License - Copyright (c) 2021 TJForc
// Request/response transport to the e-ONE cloud

pub mod http;
pub mod poll;

use std::fmt;

use crate::error::Result;

pub use http::HttpTransport;
pub use poll::JobPoller;

/// HTTP method of a call. The service only uses these two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw reply of one call.
///
/// `status` is 0 when no HTTP response was obtained at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// No response reached us.
    pub fn unreachable() -> Self {
        Self::new(0, String::new())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_unreachable(&self) -> bool {
        self.status == 0
    }
}

/// One request, one response. Paths are relative to the service root.
///
/// Implemented by [`HttpTransport`]; anything else (tests, proxies) can stand
/// in for it.
#[allow(async_fn_in_trait)]
pub trait Transport: Send + Sync {
    async fn send(&self, method: Method, path: &str, body: Option<&str>) -> Result<HttpResponse>;
}
