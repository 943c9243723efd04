use std::net::TcpStream;

use async_io::Async;
use async_tls::client::TlsStream;
use futures_lite::{AsyncRead, AsyncWrite};
use http::Uri;

use crate::error::{HttpCallError, HttpCallResult, IntoConfigurationError};

/// A byte stream to one server, owned by a single call.
pub trait AsyncConnection: AsyncRead + AsyncWrite + Send + Sync + Unpin {
    fn is_encrypted(&self) -> bool;
}

impl AsyncConnection for Async<TcpStream> {
    fn is_encrypted(&self) -> bool {
        false
    }
}

impl AsyncConnection for TlsStream<Async<TcpStream>> {
    fn is_encrypted(&self) -> bool {
        true
    }
}

/// Where a call goes, taken apart from its absolute URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub uri: Uri,
    pub host: String,
    pub port: u16,
    pub secure: bool,
}

impl Target {
    pub fn parse(url: &str) -> HttpCallResult<Self> {
        let uri = url.parse::<Uri>().into_configuration_error()?;
        let scheme = uri
            .scheme_str()
            .ok_or_else(|| HttpCallError::configuration(format!("no scheme in url: {url}")))?;
        let authority = uri
            .authority()
            .ok_or_else(|| HttpCallError::configuration(format!("no host in url: {url}")))?;

        let secure = match scheme {
            "http" => false,
            "https" => true,
            other => {
                return Err(HttpCallError::configuration(format!(
                    "unsupported url scheme: {other}"
                )))
            }
        };
        let port = authority.port_u16().unwrap_or(if secure { 443 } else { 80 });
        let host = authority.host().trim_start_matches('[').trim_end_matches(']').to_string();

        Ok(Self {
            uri,
            host,
            port,
            secure,
        })
    }

    /// Value for the `Host` request header.
    pub fn host_header(&self) -> String {
        let host = self.uri.host().unwrap_or(&self.host);
        match self.uri.port_u16() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }

    pub fn path_and_query(&self) -> &str {
        self.uri.path_and_query().map_or("/", |pq| pq.as_str())
    }
}
