use std::fmt;
use std::io;

use http::header::{InvalidHeaderName, InvalidHeaderValue, ToStrError};
use http::uri::InvalidUri;
use thiserror::Error;

pub type HttpCallResult<T> = Result<T, HttpCallError>;

/// Every way a call can fail. A status >= 400 is not one of them.
#[derive(Debug, Error)]
pub enum HttpCallError {
    #[error("failed to connect to url: {url}. reason: {source}")]
    Connection {
        url: String,
        #[source]
        source: io::Error,
    },

    #[error(
        "failed to call api endpoint [{}], input: [{}], {}",
        .url,
        .request_body.as_deref().unwrap_or("<none>"),
        .diagnostic
    )]
    RequestBodyWrite {
        url: String,
        request_body: Option<String>,
        diagnostic: Diagnostic,
        #[source]
        source: io::Error,
    },

    #[error("can't get response code, assuming failure")]
    ResponseCodeRead {
        #[source]
        source: io::Error,
    },

    #[error("can't read response from api call to {url}")]
    ResponseRead {
        url: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid client configuration: {0}")]
    Configuration(String),
}

impl HttpCallError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

/// What could be recovered from the server after a request body failed to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub status: Option<u16>,
    pub body: DiagnosticBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticBody {
    Text(String),
    Binary,
    Unavailable,
}

impl Diagnostic {
    pub fn unavailable() -> Self {
        Self {
            status: None,
            body: DiagnosticBody::Unavailable,
        }
    }

    /// The status as reported in messages, `-1` when none was read.
    pub fn status_code(&self) -> i32 {
        self.status.map_or(-1, i32::from)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "status: [{}], response: {}", self.status_code(), self.body)
    }
}

impl fmt::Display for DiagnosticBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticBody::Text(text) => f.write_str(text),
            DiagnosticBody::Binary => f.write_str("Binary Content"),
            DiagnosticBody::Unavailable => f.write_str("<unavailable>"),
        }
    }
}

pub trait IntoConfigurationError<T> {
    fn into_configuration_error(self) -> HttpCallResult<T>;
}

impl<T> IntoConfigurationError<T> for Result<T, InvalidUri> {
    fn into_configuration_error(self) -> HttpCallResult<T> {
        self.map_err(|e| HttpCallError::configuration(format!("malformed url: {e}")))
    }
}

impl<T> IntoConfigurationError<T> for Result<T, InvalidHeaderName> {
    fn into_configuration_error(self) -> HttpCallResult<T> {
        self.map_err(|e| HttpCallError::configuration(e.to_string()))
    }
}

impl<T> IntoConfigurationError<T> for Result<T, InvalidHeaderValue> {
    fn into_configuration_error(self) -> HttpCallResult<T> {
        self.map_err(|e| HttpCallError::configuration(e.to_string()))
    }
}

impl<T> IntoConfigurationError<T> for Result<T, ToStrError> {
    fn into_configuration_error(self) -> HttpCallResult<T> {
        self.map_err(|e| HttpCallError::configuration(e.to_string()))
    }
}

impl<T> IntoConfigurationError<T> for Result<T, miniserde::Error> {
    fn into_configuration_error(self) -> HttpCallResult<T> {
        self.map_err(|e| HttpCallError::configuration(format!("malformed client config: {e}")))
    }
}
