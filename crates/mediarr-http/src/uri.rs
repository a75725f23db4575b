//! Uri
//!
//! A permissive URI model. Parsing accepts relative forms, missing schemes,
//! bracketed IPv6 hosts and bare query or fragment suffixes, but rejects a
//! scheme followed by a path with no host (`file:///etc/hosts`, `http:/api`).
//! That shape is never produced by the API clients built on this crate and
//! almost always points at a malformed base url.

use core::fmt;
use core::str::FromStr;
use std::hash::{Hash, Hasher};

use once_cell::sync::{Lazy, OnceCell};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

static URI_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:(?P<scheme>[a-z]+):)?(?://(?P<host>[-_A-Z0-9.]+|\[[A-F0-9:]+\])(?::(?P<port>[0-9]{1,5}))?)?(?P<path>(?:(?:^|/+)[^/?#\r\n]+)+/*|/+)?(?:\?(?P<query>[^#\r\n]*))?(?:#(?P<fragment>.*))?$",
    )
    .expect("uri pattern is a valid regex")
});

/// Characters left alone by component escaping: `A-Z a-z 0-9 - _ . ~`
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encode a query key or value
pub fn escape_data_string(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

/// Decode a percent-encoded component, replacing invalid UTF-8
pub fn unescape_data_string(value: &str) -> String {
    percent_decode_str(value).decode_utf8_lossy().into_owned()
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn capture_text(capture: Option<regex::Match<'_>>) -> String {
    capture
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// A parsed URI
#[derive(Clone)]
pub struct HttpUri {
    uri: String,
    scheme: String,
    host: String,
    port: Option<u16>,
    path: String,
    query: String,
    fragment: String,
    query_params: OnceCell<Vec<(String, String)>>,
}

impl HttpUri {
    /// Parse a uri string
    pub fn parse(uri: impl Into<String>) -> Result<Self, ParseError> {
        let uri = uri.into();

        let captures = URI_PATTERN
            .captures(&uri)
            .ok_or_else(|| ParseError::InvalidUri(uri.clone()))?;

        let scheme = captures.name("scheme");
        let host = captures.name("host");
        let port = captures.name("port");
        let path = captures.name("path");
        let query = captures.name("query");
        let fragment = captures.name("fragment");

        if scheme.is_some() && host.is_none() && path.is_some() {
            return Err(ParseError::OpaqueUri(uri));
        }

        let port = port
            .map(|p| p.as_str().parse::<u16>())
            .transpose()
            .map_err(|_| ParseError::InvalidPort(uri.clone()))?;

        Ok(Self {
            scheme: capture_text(scheme),
            host: capture_text(host),
            port,
            path: capture_text(path),
            query: capture_text(query),
            fragment: capture_text(fragment),
            query_params: OnceCell::new(),
            uri,
        })
    }

    /// Compose a uri from its parts and parse the result
    pub fn from_parts(
        scheme: &str,
        host: &str,
        port: Option<u16>,
        path: &str,
        query: &str,
        fragment: &str,
    ) -> Result<Self, ParseError> {
        let mut uri = String::new();

        if !is_blank(scheme) {
            uri.push_str(scheme);
            uri.push(':');
        }

        if !is_blank(host) {
            uri.push_str("//");
            uri.push_str(host);
            if let Some(port) = port {
                uri.push(':');
                uri.push_str(&port.to_string());
            }
        }

        if !path.is_empty() {
            if !is_blank(host) && !path.starts_with('/') {
                uri.push('/');
            }
            uri.push_str(path);
        }

        if !query.is_empty() {
            uri.push('?');
            uri.push_str(query);
        }

        if !fragment.is_empty() {
            uri.push('#');
            uri.push_str(fragment);
        }

        Self::parse(uri)
    }

    /// The full uri string
    pub fn full_uri(&self) -> &str {
        &self.uri
    }

    /// The full uri string
    pub fn as_str(&self) -> &str {
        &self.uri
    }

    /// Scheme, empty when absent
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Host, empty when absent. IPv6 hosts keep their brackets.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Explicit port
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Path as written, including any leading slash
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query string without the leading `?`
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Fragment without the leading `#`
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// Decoded query pairs, in order, duplicates preserved.
    ///
    /// Computed on first access and cached.
    pub fn query_params(&self) -> &[(String, String)] {
        self.query_params.get_or_init(|| {
            if is_blank(&self.query) {
                return Vec::new();
            }

            self.query
                .split('&')
                .map(|pair| match pair.split_once('=') {
                    Some((key, value)) => (unescape_data_string(key), unescape_data_string(value)),
                    None => (unescape_data_string(pair), String::new()),
                })
                .collect()
        })
    }

    /// Append `path` to this uri's path
    pub fn combine_path(&self, path: &str) -> Result<Self, ParseError> {
        Self::from_parts(
            &self.scheme,
            &self.host,
            self.port,
            &combine_paths(&self.path, path),
            &self.query,
            &self.fragment,
        )
    }

    /// Replace the query string
    pub fn set_query(&self, query: &str) -> Result<Self, ParseError> {
        Self::from_parts(
            &self.scheme,
            &self.host,
            self.port,
            &self.path,
            query,
            &self.fragment,
        )
    }

    /// Append an escaped `key=value` pair to the query
    pub fn add_query_param(&self, key: &str, value: impl fmt::Display) -> Result<Self, ParseError> {
        let mut query = format!(
            "{}={}",
            escape_data_string(key),
            escape_data_string(&value.to_string())
        );

        if !is_blank(&self.query) {
            query = format!("{}&{}", self.query, query);
        }

        self.set_query(&query)
    }

    /// Append escaped pairs to the query, in order
    pub fn add_query_params<I, K, V>(&self, params: I) -> Result<Self, ParseError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut query = self.query.clone();

        for (key, value) in params {
            if !query.is_empty() {
                query.push('&');
            }
            query.push_str(&escape_data_string(key.as_ref()));
            query.push('=');
            query.push_str(&escape_data_string(value.as_ref()));
        }

        self.set_query(&query)
    }

    /// Resolve `relative` against this uri.
    ///
    /// A relative uri with a scheme wins outright. One with a host keeps only
    /// this uri's scheme. One with a path is resolved against the directory of
    /// this path. Otherwise only the query and fragment are taken from it.
    pub fn combine(&self, relative: &HttpUri) -> Result<Self, ParseError> {
        if !is_blank(&relative.scheme) {
            return Ok(relative.clone());
        }

        if !is_blank(&relative.host) {
            return Self::from_parts(
                &self.scheme,
                &relative.host,
                relative.port,
                &relative.path,
                &relative.query,
                &relative.fragment,
            );
        }

        if !is_blank(&relative.path) {
            return Self::from_parts(
                &self.scheme,
                &self.host,
                self.port,
                &combine_relative_path(&self.path, &relative.path),
                &relative.query,
                &relative.fragment,
            );
        }

        Self::from_parts(
            &self.scheme,
            &self.host,
            self.port,
            &self.path,
            &relative.query,
            &relative.fragment,
        )
    }
}

/// Join two paths with exactly one `/` between them
pub fn combine_paths(base_path: &str, relative_path: &str) -> String {
    if is_blank(relative_path) {
        return base_path.to_string();
    }

    if is_blank(base_path) {
        return relative_path.to_string();
    }

    format!(
        "{}/{}",
        base_path.trim_end_matches('/'),
        relative_path.trim_start_matches('/')
    )
}

fn combine_relative_path(base_path: &str, relative_path: &str) -> String {
    if is_blank(relative_path) {
        return base_path.to_string();
    }

    if relative_path.starts_with('/') {
        return relative_path.to_string();
    }

    match base_path.rfind('/') {
        Some(idx) => format!("{}/{}", &base_path[..idx], relative_path),
        None => relative_path.to_string(),
    }
}

impl fmt::Debug for HttpUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpUri")
            .field("scheme", &self.scheme)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("fragment", &self.fragment)
            .finish()
    }
}

impl fmt::Display for HttpUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri)
    }
}

impl FromStr for HttpUri {
    type Err = ParseError;

    fn from_str(uri: &str) -> Result<Self, Self::Err> {
        Self::parse(uri)
    }
}

impl TryFrom<&str> for HttpUri {
    type Error = ParseError;

    fn try_from(uri: &str) -> Result<Self, Self::Error> {
        Self::parse(uri)
    }
}

impl TryFrom<String> for HttpUri {
    type Error = ParseError;

    fn try_from(uri: String) -> Result<Self, Self::Error> {
        Self::parse(uri)
    }
}

impl TryFrom<&HttpUri> for url::Url {
    type Error = url::ParseError;

    fn try_from(uri: &HttpUri) -> Result<Self, Self::Error> {
        url::Url::parse(&uri.uri)
    }
}

impl PartialEq for HttpUri {
    fn eq(&self, other: &Self) -> bool {
        self.uri == other.uri
    }
}

impl Eq for HttpUri {}

impl Hash for HttpUri {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.uri.hash(state);
    }
}

impl PartialEq<str> for HttpUri {
    fn eq(&self, other: &str) -> bool {
        self.uri == other
    }
}

impl PartialEq<&str> for HttpUri {
    fn eq(&self, other: &&str) -> bool {
        self.uri == *other
    }
}

impl PartialEq<String> for HttpUri {
    fn eq(&self, other: &String) -> bool {
        &self.uri == other
    }
}

impl PartialEq<url::Url> for HttpUri {
    fn eq(&self, other: &url::Url) -> bool {
        self.uri == other.as_str()
    }
}

impl Serialize for HttpUri {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.uri)
    }
}

impl<'de> Deserialize<'de> for HttpUri {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        HttpUri::parse(s).map_err(serde::de::Error::custom)
    }
}
