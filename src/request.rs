use std::collections::HashMap;

use http::header::{ACCEPT, CONNECTION, CONTENT_LENGTH, CONTENT_TYPE, HOST, USER_AGENT};
use http::{HeaderMap, HeaderName, HeaderValue, Method};

use crate::async_connection::Target;
use crate::error::{HttpCallResult, IntoConfigurationError};

const DEFAULT_USER_AGENT: &str = concat!("http_call/", env!("CARGO_PKG_VERSION"));

/// One outbound call. Built fresh for every `send_request`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<String>,
    pub content_type: String,
    pub headers: HashMap<String, String>,
}

impl CallRequest {
    pub fn new(method: Method, url: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            body: None,
            content_type: content_type.into(),
            headers: HashMap::new(),
        }
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// GET never carries a body, whatever was supplied.
    pub fn sends_body(&self) -> bool {
        self.method != Method::GET
    }

    /// Bytes that go on the wire after the head.
    pub fn outbound_body(&self) -> &[u8] {
        if self.sends_body() {
            self.body.as_deref().unwrap_or_default().as_bytes()
        } else {
            &[]
        }
    }

    /// The body as the caller gave it, for echoing into responses and errors.
    pub fn echoed_body(&self) -> Option<String> {
        self.body.clone()
    }

    // Content type first, then caller headers (names compare case-insensitively,
    // last write wins), then whatever the transport needs that the caller left out
    pub(crate) fn request_headers(&self, target: &Target) -> HttpCallResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_str(&self.content_type).into_configuration_error()?,
        );

        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).into_configuration_error()?;
            let value = HeaderValue::from_str(value).into_configuration_error()?;
            headers.insert(name, value);
        }

        if !headers.contains_key(HOST) {
            headers.insert(
                HOST,
                HeaderValue::from_str(&target.host_header()).into_configuration_error()?,
            );
        }
        if !headers.contains_key(USER_AGENT) {
            headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
        }
        if !headers.contains_key(ACCEPT) {
            headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        }
        // One exchange per connection, so the body can always be read to close
        headers.insert(CONNECTION, HeaderValue::from_static("close"));

        if self.sends_body() {
            headers.insert(CONTENT_LENGTH, HeaderValue::from(self.outbound_body().len()));
        } else {
            headers.remove(CONTENT_LENGTH);
        }

        Ok(headers)
    }
}

// Serializes the request line and headers into the bytes sent before the body
pub fn serialize_request_head(
    method: &Method,
    target: &Target,
    headers: &HeaderMap,
) -> HttpCallResult<String> {
    let mut head = format!("{method} {} HTTP/1.1\r\n", target.path_and_query());

    for (name, value) in headers {
        let value = value.to_str().into_configuration_error()?;
        head.push_str(&format!("{}: {}\r\n", name.as_str(), value));
    }

    head.push_str("\r\n");

    Ok(head)
}
