//! Request builder
//!
//! A [`RequestBuilder`] accumulates configuration through chained calls and
//! resolves it into a [`Request`] with [`RequestBuilder::build`]. Builders are
//! cheap to clone and every clone is fully independent, so a root builder set
//! up once can be handed to many call sites through a
//! [`RequestBuilderFactory`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use http::header::{HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use http::Method;
use serde::Serialize;

use crate::error::{HttpError, Result};
use crate::form::{self, FormPart};
use crate::request::{Credentials, Request};
use crate::settings::{HttpDefaults, DEFAULT_ACCEPT};
use crate::uri::HttpUri;

/// Content type used by [`RequestBuilder::add_form_file`]
pub const DEFAULT_UPLOAD_CONTENT_TYPE: &str = "application/octet-stream";

/// Hook run on every built request
pub type PostProcess = Arc<dyn Fn(&mut Request) + Send + Sync>;

/// Chainable request configuration
#[derive(Clone)]
pub struct RequestBuilder {
    base_url: HttpUri,
    resource: String,
    method: Method,
    query_params: Vec<(String, String)>,
    suffix_query_params: Vec<(String, String)>,
    segments: BTreeMap<String, String>,
    headers: BTreeMap<String, String>,
    cookies: BTreeMap<String, String>,
    form_parts: Vec<FormPart>,
    body: Option<Vec<u8>>,
    content_summary: Option<String>,
    error: Option<String>,
    suppress_http_error: bool,
    suppressed_status_codes: BTreeSet<u16>,
    log_http_error: bool,
    use_simplified_user_agent: bool,
    allow_auto_redirect: bool,
    keep_alive: bool,
    rate_limit: Duration,
    log_response_content: bool,
    credentials: Option<Credentials>,
    post_process: Option<PostProcess>,
}

impl fmt::Debug for RequestBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("base_url", &self.base_url)
            .field("resource", &self.resource)
            .field("method", &self.method)
            .field("query_params", &self.query_params)
            .field("suffix_query_params", &self.suffix_query_params)
            .field("segments", &self.segments)
            .field("form_parts", &self.form_parts.len())
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl RequestBuilder {
    /// Create a GET builder for `base_url`
    pub fn new(base_url: HttpUri) -> Self {
        Self {
            base_url,
            resource: String::new(),
            method: Method::GET,
            query_params: Vec::new(),
            suffix_query_params: Vec::new(),
            segments: BTreeMap::new(),
            headers: BTreeMap::new(),
            cookies: BTreeMap::new(),
            form_parts: Vec::new(),
            body: None,
            content_summary: None,
            error: None,
            suppress_http_error: false,
            suppressed_status_codes: BTreeSet::new(),
            log_http_error: true,
            use_simplified_user_agent: false,
            allow_auto_redirect: true,
            keep_alive: true,
            rate_limit: Duration::ZERO,
            log_response_content: false,
            credentials: None,
            post_process: None,
        }
    }

    /// Parse `base_url` and create a GET builder for it
    pub fn from_url(base_url: &str) -> Result<Self> {
        Ok(Self::new(HttpUri::parse(base_url)?))
    }

    /// Create a builder for `base_url` starting from shared defaults
    pub fn with_defaults(base_url: HttpUri, defaults: &HttpDefaults) -> Self {
        let mut builder = Self::new(base_url)
            .accept(&defaults.accept)
            .log_http_error(defaults.log_http_error)
            .allow_auto_redirect(defaults.allow_auto_redirect)
            .keep_alive(defaults.keep_alive)
            .log_response_content(defaults.log_response_content)
            .use_simplified_user_agent(defaults.use_simplified_user_agent)
            .with_rate_limit(defaults.rate_limit_secs)
            .suppress_http_error_status_codes(defaults.suppressed_status_codes.iter().copied());

        for (name, value) in &defaults.headers {
            builder = builder.set_header(name, value);
        }

        builder
    }

    /// `scheme://host:port[/url_base]`
    pub fn build_base_url(use_https: bool, host: &str, port: u16, url_base: Option<&str>) -> String {
        let scheme = if use_https { "https" } else { "http" };

        match url_base.map(str::trim).filter(|base| !base.is_empty()) {
            Some(base) if base.starts_with('/') => format!("{scheme}://{host}:{port}{base}"),
            Some(base) => format!("{scheme}://{host}:{port}/{base}"),
            None => format!("{scheme}://{host}:{port}"),
        }
    }

    /// Wrap this builder into a factory handing out clones of it
    pub fn create_factory(self) -> RequestBuilderFactory {
        RequestBuilderFactory::new(self)
    }

    /// Base url
    pub fn base_url(&self) -> &HttpUri {
        &self.base_url
    }

    /// Resource path relative to the base url
    pub fn resource_path(&self) -> &str {
        &self.resource
    }

    /// HTTP method
    pub fn http_method(&self) -> &Method {
        &self.method
    }

    /// Set the resource path.
    ///
    /// A path starting with `/`, or any path while no resource is set yet,
    /// replaces the resource. Otherwise it is appended with a single `/`.
    pub fn resource(mut self, path: &str) -> Self {
        if self.resource.trim().is_empty() || path.starts_with('/') {
            self.resource = path.trim_start_matches('/').to_string();
        } else {
            self.resource = format!("{}/{}", self.resource.trim_end_matches('/'), path);
        }
        self
    }

    /// Set the HTTP method
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Switch to POST
    pub fn post(self) -> Self {
        self.method(Method::POST)
    }

    /// Substitute `{token}` with `value` in the resolved url.
    ///
    /// Fails with [`HttpError::Template`] when the token does not appear in
    /// the url resolved so far, unless `skip_validation` is set.
    pub fn set_segment(mut self, token: &str, value: &str, skip_validation: bool) -> Result<Self> {
        let key = format!("{{{token}}}");

        if !skip_validation && !self.resolve_url()?.as_str().contains(&key) {
            return Err(HttpError::Template {
                segment: token.to_string(),
            });
        }

        self.segments.insert(key, value.to_string());
        Ok(self)
    }

    /// Append a query parameter.
    ///
    /// With `replace`, every existing entry for `key` is dropped first, from
    /// both the primary and the suffix list.
    pub fn add_query_param(mut self, key: &str, value: impl fmt::Display, replace: bool) -> Self {
        if replace {
            self.remove_query_param(key);
        }
        self.query_params.push((key.to_string(), value.to_string()));
        self
    }

    /// Insert a query parameter ahead of all others
    pub fn add_prefix_query_param(
        mut self,
        key: &str,
        value: impl fmt::Display,
        replace: bool,
    ) -> Self {
        if replace {
            self.remove_query_param(key);
        }
        self.query_params.insert(0, (key.to_string(), value.to_string()));
        self
    }

    /// Append a query parameter after all primary parameters
    pub fn add_suffix_query_param(
        mut self,
        key: &str,
        value: impl fmt::Display,
        replace: bool,
    ) -> Self {
        if replace {
            self.remove_query_param(key);
        }
        self.suffix_query_params
            .push((key.to_string(), value.to_string()));
        self
    }

    fn remove_query_param(&mut self, key: &str) {
        self.query_params.retain(|(k, _)| k != key);
        self.suffix_query_params.retain(|(k, _)| k != key);
    }

    /// Set a header, replacing any value under the same name
    pub fn set_header(mut self, name: &str, value: impl fmt::Display) -> Self {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    /// Set the `Accept` header
    pub fn accept(self, value: &str) -> Self {
        self.set_header(ACCEPT.as_str(), value)
    }

    /// Set a cookie
    pub fn set_cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.insert(name.to_string(), value.to_string());
        self
    }

    /// Set several cookies
    pub fn set_cookies<I, K, V>(mut self, cookies: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.cookies
            .extend(cookies.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Keep the connection alive
    pub fn keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Minimum interval between requests to the same host, in seconds.
    ///
    /// Negative or non finite values disable rate limiting.
    pub fn with_rate_limit(mut self, seconds: f64) -> Self {
        self.rate_limit = Duration::try_from_secs_f64(seconds).unwrap_or_default();
        self
    }

    /// Treat every HTTP error status as a regular response
    pub fn suppress_http_error(mut self, suppress: bool) -> Self {
        self.suppress_http_error = suppress;
        self
    }

    /// Treat the given HTTP error statuses as regular responses
    pub fn suppress_http_error_status_codes(
        mut self,
        status_codes: impl IntoIterator<Item = u16>,
    ) -> Self {
        self.suppressed_status_codes.extend(status_codes);
        self
    }

    /// Log HTTP errors
    pub fn log_http_error(mut self, log: bool) -> Self {
        self.log_http_error = log;
        self
    }

    /// Send a short user agent
    pub fn use_simplified_user_agent(mut self, simplified: bool) -> Self {
        self.use_simplified_user_agent = simplified;
        self
    }

    /// Let the transport follow redirects
    pub fn allow_auto_redirect(mut self, allow: bool) -> Self {
        self.allow_auto_redirect = allow;
        self
    }

    /// Log decoded response content
    pub fn log_response_content(mut self, log: bool) -> Self {
        self.log_response_content = log;
        self
    }

    /// Attach credentials
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Run `hook` on every request this builder produces
    pub fn post_process<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Request) + Send + Sync + 'static,
    {
        self.post_process = Some(Arc::new(hook));
        self
    }

    /// Set the raw request body
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set a JSON request body.
    ///
    /// A serialization failure is reported by [`RequestBuilder::build`].
    pub fn json<T: Serialize>(mut self, body: &T) -> Self {
        match serde_json::to_string(body) {
            Ok(json) => {
                self.body = Some(json.clone().into_bytes());
                self.content_summary = Some(json);
                self.error = None;
                self.set_header(CONTENT_TYPE.as_str(), "application/json")
            }
            Err(e) => {
                self.error = Some(e.to_string());
                self
            }
        }
    }

    /// Set the diagnostic rendering of the body
    pub fn content_summary(mut self, summary: impl Into<String>) -> Self {
        self.content_summary = Some(summary.into());
        self
    }

    /// Add a form value. Requires POST.
    pub fn add_form_parameter(self, name: &str, value: impl fmt::Display) -> Result<Self> {
        self.add_form_part(FormPart::value(name, value.to_string()))
    }

    /// Add a file upload. Requires POST.
    pub fn add_form_upload(
        self,
        name: &str,
        filename: &str,
        data: impl Into<Vec<u8>>,
        content_type: &str,
    ) -> Result<Self> {
        self.add_form_part(FormPart::file(name, filename, content_type, data.into()))
    }

    /// Add a file upload as `application/octet-stream`. Requires POST.
    pub fn add_form_file(self, name: &str, filename: &str, data: impl Into<Vec<u8>>) -> Result<Self> {
        self.add_form_upload(name, filename, data, DEFAULT_UPLOAD_CONTENT_TYPE)
    }

    fn add_form_part(mut self, part: FormPart) -> Result<Self> {
        if self.method != Method::POST {
            return Err(HttpError::UnsupportedOperation(
                "HttpRequest method must be POST to add FormParameter".to_string(),
            ));
        }

        self.form_parts.push(part);
        Ok(self)
    }

    /// Resolve base url, resource, query parameters and segments
    pub fn resolve_url(&self) -> Result<HttpUri> {
        let params = self
            .query_params
            .iter()
            .chain(&self.suffix_query_params)
            .map(|(key, value)| (key.as_str(), value.as_str()));

        let url = self
            .base_url
            .combine_path(&self.resource)?
            .add_query_params(params)?;

        if self.segments.is_empty() {
            return Ok(url);
        }

        let mut full_uri = url.as_str().to_string();
        for (token, value) in &self.segments {
            full_uri = full_uri.replace(token.as_str(), value);
        }

        Ok(HttpUri::parse(full_uri)?)
    }

    /// Resolve everything into a [`Request`]
    pub fn build(&self) -> Result<Request> {
        if let Some(err) = &self.error {
            return Err(HttpError::Serialization(err.clone()));
        }

        if self.body.is_some() && !self.form_parts.is_empty() {
            return Err(HttpError::Configuration(
                "Cannot send HttpRequest Body and FormData simultaneously".to_string(),
            ));
        }

        let mut request = Request::new(self.resolve_url()?);
        request.method = self.method.clone();
        request.suppress_http_error = self.suppress_http_error;
        request.suppressed_status_codes = self.suppressed_status_codes.clone();
        request.log_http_error = self.log_http_error;
        request.use_simplified_user_agent = self.use_simplified_user_agent;
        request.allow_auto_redirect = self.allow_auto_redirect;
        request.keep_alive = self.keep_alive;
        request.rate_limit = self.rate_limit;
        request.log_response_content = self.log_response_content;
        request.credentials = self.credentials.clone();
        request.cookies = self.cookies.clone();
        request.content_data = self.body.clone();
        request.content_summary = self.content_summary.clone();

        request
            .headers
            .insert(ACCEPT, HeaderValue::from_static(DEFAULT_ACCEPT));
        for (name, value) in &self.headers {
            request.headers.insert(
                HeaderName::from_bytes(name.as_bytes())?,
                HeaderValue::from_str(value)?,
            );
        }

        if !self.form_parts.is_empty() {
            let encoded = form::encode(&self.form_parts);
            request
                .headers
                .insert(CONTENT_TYPE, HeaderValue::from_str(&encoded.content_type)?);
            request.content_data = Some(encoded.body);
            if request.content_summary.is_none() {
                request.content_summary = Some(encoded.summary);
            }
        }

        if let Some(hook) = &self.post_process {
            hook(&mut request);
        }

        tracing::trace!("Built request for {}", request.url);

        Ok(request)
    }
}

/// Hands out independent clones of a root builder
#[derive(Debug, Clone)]
pub struct RequestBuilderFactory {
    root: RequestBuilder,
}

impl RequestBuilderFactory {
    /// Create a factory around `root`
    pub fn new(root: RequestBuilder) -> Self {
        Self { root }
    }

    /// Create a factory for `base_url` starting from shared defaults
    pub fn with_defaults(base_url: HttpUri, defaults: &HttpDefaults) -> Self {
        Self::new(RequestBuilder::with_defaults(base_url, defaults))
    }

    /// Fresh clone of the root builder
    pub fn create(&self) -> RequestBuilder {
        self.root.clone()
    }

    /// Plain GET builder for `base_url`, sharing nothing with the root
    pub fn create_builder(&self, base_url: HttpUri) -> RequestBuilder {
        RequestBuilder::new(base_url)
    }

    /// Root builder
    pub fn root(&self) -> &RequestBuilder {
        &self.root
    }
}
