use std::io;
use std::time::Duration;

use futures_lite::{io::BufReader, AsyncRead, AsyncWriteExt};
use http::{HeaderMap, Method};

use crate::async_connection::{AsyncConnection, Target};
use crate::body;
use crate::error::{Diagnostic, DiagnosticBody, HttpCallError, HttpCallResult};
use crate::http_response::{HttpResponse, ResponseBody};
use crate::request::{self, CallRequest};
use crate::response::{self, ResponseHead};
use crate::timeout::IdleTimeout;

/// One open connection carrying exactly one exchange. Every read, write and
/// the final close may wait at most `read_timeout` without progress.
pub struct StdConnection {
    stream: IdleTimeout<Box<dyn AsyncConnection>>,
}

impl StdConnection {
    pub fn new(stream: Box<dyn AsyncConnection>, read_timeout: Option<Duration>) -> Self {
        Self {
            stream: IdleTimeout::new(stream, read_timeout),
        }
    }

    async fn write_request(&mut self, head: &str, body: &[u8]) -> io::Result<()> {
        self.stream.write_all(head.as_bytes()).await?;
        if !body.is_empty() {
            self.stream.write_all(body).await?;
        }
        self.stream.flush().await
    }

    pub async fn send_request(
        &mut self,
        request: &CallRequest,
        target: &Target,
        request_headers: &HeaderMap,
    ) -> HttpCallResult<HttpResponse> {
        let serialized_head = request::serialize_request_head(&request.method, target, request_headers)?;
        log::debug!("serialized_request = {serialized_head}");

        // Non-GET requests send head and body up front; a failure here is reported
        // together with whatever the server managed to answer
        if request.sends_body() {
            let body = request.outbound_body();
            if let Err(source) = self.write_request(&serialized_head, body).await {
                log::debug!("writing request body to {} failed: {source}", request.url);
                let diagnostic = diagnose(&mut self.stream, &request.method).await;
                return Err(HttpCallError::RequestBodyWrite {
                    url: request.url.clone(),
                    request_body: request.echoed_body(),
                    diagnostic,
                    source,
                });
            }
        }

        // GET requests send their head only when the status is asked for
        let mut reader = BufReader::new(&mut self.stream);
        let head = async {
            if !request.sends_body() {
                let stream = reader.get_mut();
                stream.write_all(serialized_head.as_bytes()).await?;
                stream.flush().await?;
            }
            response::read_response_head(&mut reader).await
        }
        .await
        .map_err(|source| HttpCallError::ResponseCodeRead { source })?;

        let ResponseHead { status, headers } = head;
        let success = status.as_u16() < 400;

        let read_error = |source: io::Error| HttpCallError::ResponseRead {
            url: request.url.clone(),
            source,
        };
        let raw_body = if response::has_body(&request.method, status) {
            response::read_response_body(&mut reader, &headers)
                .await
                .map_err(read_error)?
        } else {
            Vec::new()
        };
        log::debug!("response_body = {} bytes", raw_body.len());

        // Error payloads are always treated as text
        let response_body = if success && body::is_octet_stream(&headers) {
            ResponseBody::Binary(raw_body)
        } else {
            ResponseBody::Text(body::decode_text(&headers, raw_body).map_err(read_error)?)
        };

        Ok(HttpResponse::new(request.method.clone(), request.url.clone())
            .with_request_body(request.echoed_body())
            .with_code(status.as_u16())
            .with_headers(headers)
            .with_body(response_body))
    }

    /// Closes the connection. Taking `self` makes this the last thing that touches it.
    pub async fn disconnect(mut self) {
        if let Err(e) = self.stream.close().await {
            log::debug!("closing connection: {e}");
        }
    }
}

/// Best-effort read of the status and body after a request body failed to send.
/// Never fails: missing pieces come back as `None` / `DiagnosticBody::Unavailable`.
pub async fn diagnose<S>(stream: S, method: &Method) -> Diagnostic
where
    S: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);

    let head = match response::read_response_head(&mut reader).await {
        Ok(head) => head,
        Err(e) => {
            log::debug!("no diagnostic status available: {e}");
            return Diagnostic::unavailable();
        }
    };
    let status = Some(head.status.as_u16());

    if body::is_octet_stream(&head.headers) {
        return Diagnostic {
            status,
            body: DiagnosticBody::Binary,
        };
    }
    if !response::has_body(method, head.status) {
        return Diagnostic {
            status,
            body: DiagnosticBody::Text(String::new()),
        };
    }

    let text = match response::read_response_body(&mut reader, &head.headers).await {
        Ok(raw) => body::decode_text(&head.headers, raw),
        Err(e) => Err(e),
    };
    let body = match text {
        Ok(text) => DiagnosticBody::Text(text),
        Err(e) => {
            log::debug!("no diagnostic body available: {e}");
            DiagnosticBody::Unavailable
        }
    };

    Diagnostic { status, body }
}
