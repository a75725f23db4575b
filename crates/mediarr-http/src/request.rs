//! Built HTTP request

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;

use http::{HeaderMap, Method, StatusCode};

use crate::uri::HttpUri;

/// Credentials handed to the transport as-is
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// User name
    pub username: String,
    /// Password
    pub password: String,
}

impl Credentials {
    /// Create credentials
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Immutable request snapshot produced by
/// [`RequestBuilder::build`](crate::RequestBuilder::build) and consumed by a
/// [`Transport`](crate::Transport).
///
/// Only a post-build hook gets mutable access, through the `*_mut` and
/// `set_*` methods.
#[derive(Debug, Clone)]
pub struct Request {
    pub(crate) url: HttpUri,
    pub(crate) method: Method,
    pub(crate) headers: HeaderMap,
    pub(crate) cookies: BTreeMap<String, String>,
    pub(crate) content_data: Option<Vec<u8>>,
    pub(crate) content_summary: Option<String>,
    pub(crate) suppress_http_error: bool,
    pub(crate) suppressed_status_codes: BTreeSet<u16>,
    pub(crate) log_http_error: bool,
    pub(crate) use_simplified_user_agent: bool,
    pub(crate) allow_auto_redirect: bool,
    pub(crate) keep_alive: bool,
    pub(crate) rate_limit: Duration,
    pub(crate) log_response_content: bool,
    pub(crate) credentials: Option<Credentials>,
}

impl Request {
    pub(crate) fn new(url: HttpUri) -> Self {
        Self {
            url,
            method: Method::GET,
            headers: HeaderMap::new(),
            cookies: BTreeMap::new(),
            content_data: None,
            content_summary: None,
            suppress_http_error: false,
            suppressed_status_codes: BTreeSet::new(),
            log_http_error: true,
            use_simplified_user_agent: false,
            allow_auto_redirect: true,
            keep_alive: true,
            rate_limit: Duration::ZERO,
            log_response_content: false,
            credentials: None,
        }
    }

    /// Resolved absolute url
    pub fn url(&self) -> &HttpUri {
        &self.url
    }

    /// HTTP method
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request headers
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable request headers
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Cookies to send
    pub fn cookies(&self) -> &BTreeMap<String, String> {
        &self.cookies
    }

    /// Body bytes
    pub fn content_data(&self) -> Option<&[u8]> {
        self.content_data.as_deref()
    }

    /// Replace the body
    pub fn set_content(&mut self, data: Vec<u8>) {
        self.content_data = Some(data);
    }

    /// Diagnostic rendering of the body
    pub fn content_summary(&self) -> Option<&str> {
        self.content_summary.as_deref()
    }

    /// Replace the diagnostic rendering of the body
    pub fn set_content_summary(&mut self, summary: impl Into<String>) {
        self.content_summary = Some(summary.into());
    }

    /// Treat every HTTP error status as a regular response
    pub fn suppress_http_error(&self) -> bool {
        self.suppress_http_error
    }

    /// HTTP error statuses to treat as regular responses
    pub fn suppressed_status_codes(&self) -> &BTreeSet<u16> {
        &self.suppressed_status_codes
    }

    /// Whether `status` must not be raised as an error
    pub fn is_status_suppressed(&self, status: StatusCode) -> bool {
        self.suppress_http_error || self.suppressed_status_codes.contains(&status.as_u16())
    }

    /// Log HTTP errors
    pub fn log_http_error(&self) -> bool {
        self.log_http_error
    }

    /// Send a short user agent
    pub fn use_simplified_user_agent(&self) -> bool {
        self.use_simplified_user_agent
    }

    /// Let the transport follow redirects
    pub fn allow_auto_redirect(&self) -> bool {
        self.allow_auto_redirect
    }

    /// Keep the connection alive
    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    /// Minimum interval between requests to the same host
    pub fn rate_limit(&self) -> Duration {
        self.rate_limit
    }

    /// Log the decoded response content
    pub fn log_response_content(&self) -> bool {
        self.log_response_content
    }

    /// Credentials
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.content_summary {
            Some(summary) => write!(f, "Req: [{}] {}: {}", self.method, self.url, summary),
            None => write!(f, "Req: [{}] {}", self.method, self.url),
        }
    }
}
