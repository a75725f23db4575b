//! Integration tests for mediarr-http using an in-memory transport

use std::collections::BTreeMap;
use std::sync::Mutex;

use http::header::{CONTENT_TYPE, SET_COOKIE};
use http::{HeaderMap, HeaderValue, StatusCode, Version};
use mediarr_http::{
    HttpClient, HttpDefaults, HttpError, HttpUri, RawResponse, Request, RequestBuilder,
    RequestBuilderFactory, Result, Transport,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Movie {
    id: u32,
    title: String,
}

/// Serves canned responses keyed by path and records every request
#[derive(Debug, Default)]
struct MockTransport {
    routes: BTreeMap<String, RawResponse>,
    requests: Mutex<Vec<Request>>,
}

impl MockTransport {
    fn route(mut self, path: &str, response: RawResponse) -> Self {
        self.routes.insert(path.to_string(), response);
        self
    }

    fn requests(&self) -> Vec<Request> {
        self.requests.lock().expect("Lock").clone()
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: &Request) -> Result<RawResponse> {
        self.requests
            .lock()
            .map_err(|e| HttpError::Other(e.to_string()))?
            .push(request.clone());

        self.routes
            .get(request.url().path())
            .cloned()
            .ok_or_else(|| HttpError::Connection(format!("No route for {}", request.url())))
    }
}

fn json(status: StatusCode, body: &str) -> RawResponse {
    let mut response = RawResponse::new(status, body);
    response
        .headers
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn factory() -> RequestBuilderFactory {
    let base_url = RequestBuilder::build_base_url(false, "localhost", 7878, Some("radarr"));
    RequestBuilder::new(HttpUri::parse(base_url).expect("Valid base url"))
        .set_header("X-Api-Key", "secret")
        .add_suffix_query_param("apikey", "secret", false)
        .create_factory()
}

// === End to end ===

#[tokio::test]
async fn test_typed_get_with_segments() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();

    let transport = MockTransport::default().route(
        "/radarr/api/v3/movie/42",
        json(StatusCode::OK, r#"{"id":42,"title":"Heat"}"#),
    );
    let client = HttpClient::new(transport);

    let request = factory()
        .create()
        .resource("api/v3")
        .resource("movie/{id}")
        .set_segment("id", "42", false)
        .expect("Segment exists")
        .add_query_param("includeFiles", true, false)
        .log_response_content(true)
        .build()
        .expect("Valid request");

    let movie = client
        .execute_typed::<Movie>(request)
        .await
        .expect("Valid movie");

    assert_eq!(
        movie.resource(),
        &Movie {
            id: 42,
            title: "Heat".to_string()
        }
    );

    let sent = client.transport().requests();
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].url(),
        "http://localhost:7878/radarr/api/v3/movie/42?includeFiles=true&apikey=secret"
    );
    assert_eq!(sent[0].headers()["x-api-key"], "secret");
}

#[tokio::test]
async fn test_form_upload_reaches_transport() {
    let transport = MockTransport::default().route(
        "/radarr/api/command",
        json(StatusCode::CREATED, r#"{"id":1,"title":"queued"}"#),
    );
    let client = HttpClient::new(transport);

    let request = factory()
        .create()
        .resource("api/command")
        .post()
        .add_form_parameter("category", "movies")
        .expect("POST builder")
        .add_form_file("file", "heat.nzb", b"<nzb/>".to_vec())
        .expect("POST builder")
        .build()
        .expect("Valid request");

    let response = client.execute(request).await.expect("Created");
    assert_eq!(response.status(), StatusCode::CREATED);

    let sent = client.transport().requests();
    let sent = &sent[0];
    let content_type = sent.headers()[CONTENT_TYPE]
        .to_str()
        .expect("Ascii header");
    let boundary = content_type
        .strip_prefix("multipart/form-data; boundary=")
        .expect("Multipart body");

    let body = String::from_utf8_lossy(sent.content_data().expect("Body"));
    assert!(body.starts_with(&format!("--{boundary}\r\n")));
    assert!(body.contains("Content-Type: application/octet-stream\r\n"));
    assert!(body.ends_with(&format!("--{boundary}--\r\n")));
    assert_eq!(
        sent.content_summary(),
        Some("\r\ncategory=movies\r\nfile=heat.nzb (6 bytes)")
    );
}

#[tokio::test]
async fn test_http_error_and_suppression() {
    let transport = MockTransport::default().route(
        "/radarr/api/v3/movie/7",
        json(StatusCode::NOT_FOUND, r#"{"message":"NotFound"}"#),
    );
    let client = HttpClient::new(transport);
    let factory = factory();

    let request = factory
        .create()
        .resource("api/v3/movie/7")
        .build()
        .expect("Valid request");
    match client.execute(request).await {
        Err(HttpError::Status { status, message }) => {
            assert_eq!(status, 404);
            assert_eq!(message, r#"{"message":"NotFound"}"#);
        }
        other => panic!("Expected HttpError::Status, got {:?}", other),
    }

    let request = factory
        .create()
        .resource("api/v3/movie/7")
        .suppress_http_error_status_codes([404])
        .build()
        .expect("Valid request");
    let response = client.execute(request).await.expect("Suppressed 404");
    assert!(response.has_http_error());
    assert!(!response.has_http_redirect());
    assert!(response.to_string().ends_with("\n{\"message\":\"NotFound\"}"));
}

#[tokio::test]
async fn test_transport_error_propagates() {
    let client = HttpClient::new(MockTransport::default());
    let request = factory()
        .create()
        .resource("missing")
        .build()
        .expect("Valid request");

    let result = client.execute(request).await;
    assert!(matches!(result, Err(HttpError::Connection(_))));
}

#[tokio::test]
async fn test_redirect_and_cookies() {
    let mut redirect = RawResponse::new(StatusCode::TEMPORARY_REDIRECT, "");
    redirect.version = Version::HTTP_2;
    redirect
        .headers
        .append(SET_COOKIE, HeaderValue::from_static("session=1; Path=/"));
    redirect
        .headers
        .append(SET_COOKIE, HeaderValue::from_static("session=2; Secure"));

    let client = HttpClient::new(MockTransport::default().route("/radarr/login", redirect));
    let request = factory()
        .create()
        .resource("login")
        .allow_auto_redirect(false)
        .build()
        .expect("Valid request");

    let response = client.execute(request).await.expect("Redirect");
    assert!(response.has_http_redirect());
    assert!(!response.has_http_error());
    assert_eq!(response.version(), Version::HTTP_2);
    assert_eq!(
        response.get_cookies().get("session").map(String::as_str),
        Some("2")
    );
}

// === Factory and defaults ===

#[test]
fn test_factory_clones_are_independent() {
    let factory = factory();

    let first = factory
        .create()
        .add_query_param("page", 1, false)
        .build()
        .expect("Valid request");
    let second = factory.create().build().expect("Valid request");

    assert_eq!(first.url().query(), "page=1&apikey=secret");
    assert_eq!(second.url().query(), "apikey=secret");
}

#[test]
fn test_defaults_from_toml() {
    let defaults = HttpDefaults::from_toml_str(
        r#"
        accept = "application/json"
        suppressed_status_codes = [409]
        log_http_error = false

        [headers]
        user-agent = "Mediarr/1.0"
        "#,
    )
    .expect("Valid toml");

    let base_url = HttpUri::parse("http://localhost:8989/api").expect("Valid uri");
    let request = RequestBuilderFactory::with_defaults(base_url, &defaults)
        .create()
        .resource("series")
        .build()
        .expect("Valid request");

    assert_eq!(request.headers()["accept"], "application/json");
    assert_eq!(request.headers()["user-agent"], "Mediarr/1.0");
    assert!(request.is_status_suppressed(StatusCode::CONFLICT));
    assert!(!request.log_http_error());
    assert_eq!(request.url(), "http://localhost:8989/api/series");
}

#[test]
fn test_response_from_text_roundtrip() {
    let request = factory().create().build().expect("Valid request");
    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=iso-8859-1"),
    );

    let response = mediarr_http::Response::from_text(
        request,
        headers,
        "Léon",
        StatusCode::OK,
        Version::HTTP_11,
    );

    assert_eq!(response.response_data(), &[0x4C, 0xE9, 0x6F, 0x6E]);
    assert_eq!(response.content(), "Léon");
}
