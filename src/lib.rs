mod async_connection;
mod async_connection_factory;
mod body;
mod config;
mod connection;
mod error;
mod http_response;
mod request;
mod response;
mod timeout;
mod tls;

use std::collections::HashMap;

use futures_lite::future;

use async_connection::Target;
use async_connection_factory::AsyncConnectionFactory;
use connection::StdConnection;

pub use config::ClientConfig;
pub use error::{Diagnostic, DiagnosticBody, HttpCallError, HttpCallResult};
pub use http::{HeaderMap, Method};
pub use http_response::{HttpResponse, ResponseBody};
pub use request::CallRequest;
pub use tls::TlsTrustPolicy;

/// Blocking request/response calls. A status >= 400 comes back as a normal
/// response; only transport-level failures are errors.
pub trait HttpClient {
    fn send_request(
        &self,
        method: Method,
        url: &str,
        body: Option<&str>,
        content_type: &str,
    ) -> HttpCallResult<HttpResponse> {
        self.send_request_with_headers(method, url, body, content_type, &HashMap::new())
    }

    /// Like [`HttpClient::send_request`]; `headers` are applied after the content
    /// type, so a `Content-Type` entry replaces `content_type`.
    fn send_request_with_headers(
        &self,
        method: Method,
        url: &str,
        body: Option<&str>,
        content_type: &str,
        headers: &HashMap<String, String>,
    ) -> HttpCallResult<HttpResponse>;
}

/// Opens a fresh connection per call and closes it before returning.
#[derive(Debug, Clone, Default)]
pub struct HttpCallClient {
    config: ClientConfig,
}

impl HttpCallClient {
    /// No timeouts: connects and reads wait as long as the peer takes.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeouts(connect_timeout_millis: u64, read_timeout_millis: u64) -> Self {
        Self::from_config(ClientConfig::with_timeouts(connect_timeout_millis, read_timeout_millis))
    }

    pub fn from_config(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn execute(&self, request: &CallRequest) -> HttpCallResult<HttpResponse> {
        future::block_on(self.execute_async(request))
    }

    async fn execute_async(&self, request: &CallRequest) -> HttpCallResult<HttpResponse> {
        // Everything that can be rejected up front is, before any socket is opened
        let target = Target::parse(&request.url)?;
        let request_headers = request.request_headers(&target)?;

        let stream = AsyncConnectionFactory::connect(
            &target,
            &self.config.tls_trust_policy,
            self.config.connect_timeout,
        )
        .await?;

        let mut connection = StdConnection::new(stream, self.config.read_timeout);
        let result = connection.send_request(request, &target, &request_headers).await;
        connection.disconnect().await;

        match &result {
            Ok(response) => log::debug!("{} {} -> {}", request.method, request.url, response.code()),
            Err(e) => log::debug!("{} {} failed: {e}", request.method, request.url),
        }
        result
    }
}

impl HttpClient for HttpCallClient {
    fn send_request_with_headers(
        &self,
        method: Method,
        url: &str,
        body: Option<&str>,
        content_type: &str,
        headers: &HashMap<String, String>,
    ) -> HttpCallResult<HttpResponse> {
        let request = CallRequest {
            method,
            url: url.to_string(),
            body: body.map(str::to_string),
            content_type: content_type.to_string(),
            headers: headers.clone(),
        };
        self.execute(&request)
    }
}
