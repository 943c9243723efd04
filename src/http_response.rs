use http::{HeaderMap, Method};

/// Either decoded text or the raw bytes of an octet-stream, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseBody {
    Text(String),
    Binary(Vec<u8>),
}

/// The outcome of one call. Failure statuses (>= 400) are ordinary responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    method: Method,
    url: String,
    request_body: Option<String>,
    code: u16,
    headers: HeaderMap,
    body: ResponseBody,
}

impl HttpResponse {
    pub(crate) fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            request_body: None,
            code: 0,
            headers: HeaderMap::new(),
            body: ResponseBody::Text(String::new()),
        }
    }

    pub(crate) fn with_request_body(mut self, request_body: Option<String>) -> Self {
        self.request_body = request_body;
        self
    }

    pub(crate) fn with_code(mut self, code: u16) -> Self {
        self.code = code;
        self
    }

    pub(crate) fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub(crate) fn with_body(mut self, body: ResponseBody) -> Self {
        self.body = body;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// The body the caller passed, `None` if it passed none.
    pub fn request_body(&self) -> Option<&str> {
        self.request_body.as_deref()
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn is_success(&self) -> bool {
        self.code < 400
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// All values received for `name`, in arrival order. Values that are not
    /// visible ASCII are skipped.
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .get_all(name)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect()
    }

    /// The text body, `None` for octet-stream responses.
    pub fn body(&self) -> Option<&str> {
        match &self.body {
            ResponseBody::Text(text) => Some(text),
            ResponseBody::Binary(_) => None,
        }
    }

    /// The raw bytes of an octet-stream response, `None` for text responses.
    pub fn binary_body(&self) -> Option<&[u8]> {
        match &self.body {
            ResponseBody::Binary(bytes) => Some(bytes),
            ResponseBody::Text(_) => None,
        }
    }

    pub fn into_body(self) -> ResponseBody {
        self.body
    }
}
