//! HTTP request layer for media automation API clients
//!
//! This crate builds HTTP requests and interprets responses without doing any
//! I/O itself. Requests are assembled with a cloneable [`RequestBuilder`],
//! executed by a [`Transport`] implementation and wrapped into a
//! [`Response`] or a [`TypedResponse`].
//!
//! # Example
//!
//! ```no_run
//! use mediarr_http::{HttpClient, HttpUri, RequestBuilder, Result, Transport};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Movie {
//!     title: String,
//! }
//!
//! async fn example<T: Transport>(client: &HttpClient<T>) -> Result<Movie> {
//!     let factory = RequestBuilder::new(HttpUri::parse("http://localhost:7878/api/v3")?)
//!         .set_header("X-Api-Key", "secret")
//!         .create_factory();
//!
//!     let request = factory
//!         .create()
//!         .resource("movie/{id}")
//!         .set_segment("id", "42", false)?
//!         .build()?;
//!
//!     Ok(client.execute_typed::<Movie>(request).await?.into_resource())
//! }
//! ```

mod builder;
mod error;
pub mod form;
mod request;
mod response;
mod serializer;
mod settings;
mod transport;
pub mod uri;

pub use builder::{PostProcess, RequestBuilder, RequestBuilderFactory, DEFAULT_UPLOAD_CONTENT_TYPE};
pub use error::{HttpError, ParseError, Result};
pub use form::FormPart;
pub use request::{Credentials, Request};
pub use response::{Response, TypedResponse};
pub use serializer::{ContentDeserializer, JsonDeserializer};
pub use settings::{HttpDefaults, DEFAULT_ACCEPT};
pub use transport::{HttpClient, RawResponse, Transport};
pub use uri::HttpUri;
