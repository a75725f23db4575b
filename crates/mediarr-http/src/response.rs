//! HTTP response types

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};
use http::header::{CONTENT_TYPE, SET_COOKIE};
use http::{HeaderMap, StatusCode, Version};
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use serde::de::DeserializeOwned;

use crate::error::Result;
use crate::request::Request;
use crate::serializer::{ContentDeserializer, JsonDeserializer};

static COOKIE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*?)=(.*?)(?:;|$)").expect("cookie pattern is a valid regex"));

const REDIRECT_STATUSES: [StatusCode; 5] = [
    StatusCode::MOVED_PERMANENTLY,
    StatusCode::FOUND,
    StatusCode::SEE_OTHER,
    StatusCode::TEMPORARY_REDIRECT,
    StatusCode::PERMANENT_REDIRECT,
];

/// `charset` parameter of the `Content-Type` header
fn charset(headers: &HeaderMap) -> Option<String> {
    let content_type = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    let lower = content_type.to_ascii_lowercase();
    let idx = lower.find("charset=")?;
    let value = content_type.get(idx + 8..)?.trim_start_matches('"');
    let end = value
        .find(|c: char| c == '"' || c == ';' || c.is_ascii_whitespace())
        .unwrap_or(value.len());
    if end == 0 {
        return None;
    }
    Some(value.get(..end)?.to_owned())
}

/// Encoding named by the `Content-Type` charset, UTF-8 when absent or unknown
fn encoding(headers: &HeaderMap) -> &'static Encoding {
    charset(headers)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8)
}

/// Encode `text` in `encoding`.
///
/// UTF-16 is written directly since `encoding_rs` only encodes into ASCII
/// compatible encodings. Other encodings without an encoder (`replacement`)
/// produce UTF-8.
fn encode_text(encoding: &'static Encoding, text: &str) -> Vec<u8> {
    if encoding == UTF_16LE {
        text.encode_utf16().flat_map(u16::to_le_bytes).collect()
    } else if encoding == UTF_16BE {
        text.encode_utf16().flat_map(u16::to_be_bytes).collect()
    } else {
        let (data, _, _) = encoding.encode(text);
        data.into_owned()
    }
}

fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_2 => "HTTP/2.0",
        Version::HTTP_3 => "HTTP/3.0",
        _ => "HTTP/1.1",
    }
}

/// A completed round trip
#[derive(Clone)]
pub struct Response {
    request: Arc<Request>,
    headers: HeaderMap,
    status: StatusCode,
    version: Version,
    data: Vec<u8>,
    content: OnceCell<String>,
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("url", self.request.url())
            .field("status", &self.status)
            .field("version", &self.version)
            .field("bytes", &self.data.len())
            .finish_non_exhaustive()
    }
}

impl Response {
    /// Wrap raw response bytes. Text is decoded on first access.
    pub fn new(
        request: impl Into<Arc<Request>>,
        headers: HeaderMap,
        data: Vec<u8>,
        status: StatusCode,
        version: Version,
    ) -> Self {
        Self {
            request: request.into(),
            headers,
            status,
            version,
            data,
            content: OnceCell::new(),
        }
    }

    /// Wrap decoded text, encoding it with the `Content-Type` charset
    pub fn from_text(
        request: impl Into<Arc<Request>>,
        headers: HeaderMap,
        content: impl Into<String>,
        status: StatusCode,
        version: Version,
    ) -> Self {
        let content = content.into();
        let data = encode_text(encoding(&headers), &content);

        Self {
            request: request.into(),
            headers,
            status,
            version,
            data,
            content: OnceCell::with_value(content),
        }
    }

    /// Request that produced this response
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Response headers
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Status code
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Protocol version
    pub fn version(&self) -> Version {
        self.version
    }

    /// Raw body bytes
    pub fn response_data(&self) -> &[u8] {
        &self.data
    }

    /// `Content-Type` header value
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE)?.to_str().ok()
    }

    /// Body decoded with the `Content-Type` charset
    pub fn content(&self) -> &str {
        self.content.get_or_init(|| {
            let (text, _) = encoding(&self.headers).decode_without_bom_handling(&self.data);
            text.into_owned()
        })
    }

    /// Status is 400 or above
    pub fn has_http_error(&self) -> bool {
        self.status.as_u16() >= 400
    }

    /// Status is 500 or above
    pub fn has_http_server_error(&self) -> bool {
        self.status.as_u16() >= 500
    }

    /// Status asks the client to follow a `Location`
    pub fn has_http_redirect(&self) -> bool {
        REDIRECT_STATUSES.contains(&self.status)
    }

    /// Raw `Set-Cookie` header lines
    pub fn get_cookie_headers(&self) -> Vec<String> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
            .collect()
    }

    /// Cookies set by this response. A name set twice keeps its last value.
    pub fn get_cookies(&self) -> BTreeMap<String, String> {
        let mut cookies = BTreeMap::new();

        for header in self.get_cookie_headers() {
            if let Some(captures) = COOKIE_PATTERN.captures(&header) {
                cookies.insert(captures[1].to_string(), captures[2].to_string());
            }
        }

        cookies
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Res: {} [{}] {}: {}.{} ({} bytes)",
            version_label(self.version),
            self.request.method(),
            self.request.url(),
            self.status.as_u16(),
            self.status.canonical_reason().unwrap_or("Unknown"),
            self.data.len()
        )?;

        let is_html = |content_type: &str| {
            content_type
                .split(';')
                .next()
                .map(|media_type| media_type.trim().eq_ignore_ascii_case("text/html"))
                .unwrap_or(false)
        };

        match self.content_type() {
            Some(content_type) if self.has_http_error() && !is_html(content_type) => {
                write!(f, "\n{}", self.content())
            }
            _ => Ok(()),
        }
    }
}

/// A response whose content was deserialized into `T` on construction
#[derive(Debug, Clone)]
pub struct TypedResponse<T> {
    response: Response,
    resource: T,
}

impl<T: DeserializeOwned> TypedResponse<T> {
    /// Deserialize the content as JSON
    pub fn new(response: Response) -> Result<Self> {
        Self::with_deserializer(response, &JsonDeserializer)
    }

    /// Deserialize the content with `deserializer`
    pub fn with_deserializer<D: ContentDeserializer>(
        response: Response,
        deserializer: &D,
    ) -> Result<Self> {
        let resource = deserializer.deserialize(response.content())?;
        Ok(Self { response, resource })
    }
}

impl<T> TypedResponse<T> {
    /// Deserialized content
    pub fn resource(&self) -> &T {
        &self.resource
    }

    /// Untyped response
    pub fn response(&self) -> &Response {
        &self.response
    }

    /// Take the deserialized content
    pub fn into_resource(self) -> T {
        self.resource
    }

    /// Split into the untyped response and the deserialized content
    pub fn into_parts(self) -> (Response, T) {
        (self.response, self.resource)
    }
}

impl<T> Deref for TypedResponse<T> {
    type Target = Response;

    fn deref(&self) -> &Self::Target {
        &self.response
    }
}

#[cfg(test)]
mod tests {
    use http::HeaderValue;
    use serde::Deserialize;

    use super::*;
    use crate::error::HttpError;
    use crate::uri::HttpUri;

    fn request() -> Request {
        Request::new(HttpUri::parse("http://localhost:7878/api/v3/movie").expect("Valid uri"))
    }

    fn response(status: StatusCode, headers: HeaderMap, data: &[u8]) -> Response {
        Response::new(request(), headers, data.to_vec(), status, Version::HTTP_11)
    }

    fn content_type(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_status_classification() {
        let redirect = response(StatusCode::TEMPORARY_REDIRECT, HeaderMap::new(), b"");
        assert!(redirect.has_http_redirect());
        assert!(!redirect.has_http_error());

        let not_found = response(StatusCode::NOT_FOUND, HeaderMap::new(), b"");
        assert!(not_found.has_http_error());
        assert!(!not_found.has_http_server_error());
        assert!(!not_found.has_http_redirect());

        let unavailable = response(StatusCode::SERVICE_UNAVAILABLE, HeaderMap::new(), b"");
        assert!(unavailable.has_http_error());
        assert!(unavailable.has_http_server_error());

        let multiple = response(StatusCode::MULTIPLE_CHOICES, HeaderMap::new(), b"");
        assert!(!multiple.has_http_redirect());

        for status in [301, 302, 303, 307, 308] {
            let status = StatusCode::from_u16(status).expect("Valid status");
            assert!(response(status, HeaderMap::new(), b"").has_http_redirect());
        }
    }

    #[test]
    fn test_cookie_last_wins() {
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("a=1; Path=/"));
        headers.append(SET_COOKIE, HeaderValue::from_static("b=x"));
        headers.append(SET_COOKIE, HeaderValue::from_static("a=2; Secure"));

        let response = response(StatusCode::OK, headers, b"");
        assert_eq!(response.get_cookie_headers().len(), 3);

        let cookies = response.get_cookies();
        assert_eq!(cookies.get("a").map(String::as_str), Some("2"));
        assert_eq!(cookies.get("b").map(String::as_str), Some("x"));
    }

    #[test]
    fn test_content_defaults_to_utf8() {
        let response = response(StatusCode::OK, HeaderMap::new(), "Amélie".as_bytes());
        assert_eq!(response.content(), "Amélie");
    }

    #[test]
    fn test_content_uses_charset() {
        let headers = content_type("text/plain; charset=\"ISO-8859-1\"");
        let response = response(StatusCode::OK, headers, &[0x41, 0x6D, 0xE9, 0x6C, 0x69, 0x65]);
        assert_eq!(response.content(), "Amélie");
    }

    #[test]
    fn test_unknown_charset_falls_back() {
        let headers = content_type("text/plain; charset=klingon");
        let response = response(StatusCode::OK, headers, "Amélie".as_bytes());
        assert_eq!(response.content(), "Amélie");
    }

    #[test]
    fn test_from_text_encodes_with_charset() {
        let response = Response::from_text(
            request(),
            content_type("text/plain; charset=windows-1252"),
            "Amélie",
            StatusCode::OK,
            Version::HTTP_11,
        );

        assert_eq!(response.response_data(), &[0x41, 0x6D, 0xE9, 0x6C, 0x69, 0x65]);
        assert_eq!(response.content(), "Amélie");
    }

    #[test]
    fn test_from_text_utf16() {
        let response = Response::from_text(
            request(),
            content_type("text/plain; charset=utf-16le"),
            "Hé",
            StatusCode::OK,
            Version::HTTP_11,
        );
        assert_eq!(response.response_data(), &[0x48, 0x00, 0xE9, 0x00]);

        let response = Response::from_text(
            request(),
            content_type("text/plain; charset=utf-16be"),
            "Hé",
            StatusCode::OK,
            Version::HTTP_11,
        );
        assert_eq!(response.response_data(), &[0x00, 0x48, 0x00, 0xE9]);

        let decoded = Response::new(
            request(),
            content_type("text/plain; charset=utf-16be"),
            response.response_data().to_vec(),
            StatusCode::OK,
            Version::HTTP_11,
        );
        assert_eq!(decoded.content(), "Hé");
    }

    #[test]
    fn test_display() {
        let ok = response(StatusCode::OK, content_type("application/json"), b"{}");
        assert_eq!(
            ok.to_string(),
            "Res: HTTP/1.1 [GET] http://localhost:7878/api/v3/movie: 200.OK (2 bytes)"
        );

        let error = response(
            StatusCode::BAD_REQUEST,
            content_type("application/json"),
            br#"{"error":"bad"}"#,
        );
        assert_eq!(
            error.to_string(),
            "Res: HTTP/1.1 [GET] http://localhost:7878/api/v3/movie: 400.Bad Request (15 bytes)\n{\"error\":\"bad\"}"
        );

        let html = response(
            StatusCode::BAD_GATEWAY,
            content_type("text/html; charset=utf-8"),
            b"<html></html>",
        );
        assert!(!html.to_string().contains("<html>"));
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Movie {
        title: String,
    }

    #[test]
    fn test_typed_response() {
        let response = response(StatusCode::OK, HeaderMap::new(), br#"{"title":"Heat"}"#);
        let typed = TypedResponse::<Movie>::new(response).expect("Valid movie");

        assert_eq!(typed.resource().title, "Heat");
        assert_eq!(typed.status(), StatusCode::OK);

        let (response, movie) = typed.into_parts();
        assert_eq!(response.response_data().len(), 16);
        assert_eq!(movie.title, "Heat");
    }

    #[test]
    fn test_typed_response_fails_eagerly() {
        let response = response(StatusCode::OK, HeaderMap::new(), b"not json");
        let result = TypedResponse::<Movie>::new(response);
        assert!(matches!(result, Err(HttpError::Deserialization(_))));
    }
}
