//! Transport seam and client
//!
//! A [`Transport`] performs the network round trip for a built [`Request`].
//! [`HttpClient`] wraps one, turns its raw output into a [`Response`] and
//! applies the request's error suppression and logging flags.

use std::fmt::Debug;
use std::sync::Arc;

use http::{HeaderMap, StatusCode, Version};
use serde::de::DeserializeOwned;

use crate::error::{HttpError, Result};
use crate::request::Request;
use crate::response::{Response, TypedResponse};

/// Raw output of a round trip
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// Status code
    pub status: StatusCode,
    /// Protocol version
    pub version: Version,
    /// Response headers
    pub headers: HeaderMap,
    /// Body bytes
    pub body: Vec<u8>,
}

impl RawResponse {
    /// HTTP/1.1 response without headers
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }
}

/// Executes requests on the wire
#[async_trait::async_trait]
pub trait Transport: Send + Sync + Debug {
    /// Execute `request`.
    ///
    /// HTTP error statuses are not failures at this level; they come back
    /// as a regular [`RawResponse`]. Transports report an elapsed deadline as
    /// [`HttpError::Timeout`] and other network failures as
    /// [`HttpError::Connection`].
    async fn execute(&self, request: &Request) -> Result<RawResponse>;
}

/// Executes built requests through a [`Transport`]
#[derive(Debug, Clone)]
pub struct HttpClient<T: Transport> {
    transport: Arc<T>,
}

impl<T: Transport> HttpClient<T> {
    /// Create a client over `transport`
    pub fn new(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }

    /// Underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Execute `request`.
    ///
    /// Fails with [`HttpError::Status`] when the response is an HTTP error
    /// the request does not suppress.
    pub async fn execute(&self, request: Request) -> Result<Response> {
        tracing::debug!("{}", request);

        let raw = self.transport.execute(&request).await?;
        let response = Response::new(request, raw.headers, raw.body, raw.status, raw.version);

        tracing::debug!(
            "Res: [{}] {}: {} ({} bytes)",
            response.request().method(),
            response.request().url(),
            response.status().as_u16(),
            response.response_data().len()
        );

        if response.request().log_response_content() {
            tracing::trace!("Response content: {}", response.content());
        }

        if response.has_http_error() && !response.request().is_status_suppressed(response.status())
        {
            if response.request().log_http_error() {
                tracing::warn!("HTTP Error - {}", response);
            }

            return Err(HttpError::Status {
                status: response.status().as_u16(),
                message: response.content().to_string(),
            });
        }

        Ok(response)
    }

    /// Execute `request` and deserialize the content as JSON
    pub async fn execute_typed<R: DeserializeOwned>(
        &self,
        request: Request,
    ) -> Result<TypedResponse<R>> {
        let response = self.execute(request).await?;
        TypedResponse::new(response)
    }
}
