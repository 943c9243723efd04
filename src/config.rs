use std::time::Duration;

use miniserde::{json, Deserialize};

use crate::error::{HttpCallResult, IntoConfigurationError};
use crate::tls::TlsTrustPolicy;

/// Fixed at client construction. A missing or zero timeout means no limit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientConfig {
    pub connect_timeout: Option<Duration>,
    pub read_timeout: Option<Duration>,
    pub tls_trust_policy: TlsTrustPolicy,
}

// On-disk shape, e.g. `{"connect_timeout_ms": 2000, "read_timeout_ms": 5000}`
#[derive(Deserialize)]
struct RawClientConfig {
    connect_timeout_ms: Option<u64>,
    read_timeout_ms: Option<u64>,
    dangerous_accept_any_certificate: Option<bool>,
}

impl ClientConfig {
    pub fn with_timeouts(connect_timeout_millis: u64, read_timeout_millis: u64) -> Self {
        Self::default()
            .connect_timeout(Duration::from_millis(connect_timeout_millis))
            .read_timeout(Duration::from_millis(read_timeout_millis))
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = non_zero(timeout);
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = non_zero(timeout);
        self
    }

    pub fn tls_trust_policy(mut self, policy: TlsTrustPolicy) -> Self {
        self.tls_trust_policy = policy;
        self
    }

    pub fn from_json(source: &str) -> HttpCallResult<Self> {
        let raw: RawClientConfig = json::from_str(source).into_configuration_error()?;

        let mut config = Self::default();
        if let Some(millis) = raw.connect_timeout_ms {
            config = config.connect_timeout(Duration::from_millis(millis));
        }
        if let Some(millis) = raw.read_timeout_ms {
            config = config.read_timeout(Duration::from_millis(millis));
        }
        if raw.dangerous_accept_any_certificate.unwrap_or(false) {
            config = config.tls_trust_policy(TlsTrustPolicy::DangerousAcceptAnyCertificate);
        }
        Ok(config)
    }
}

fn non_zero(timeout: Duration) -> Option<Duration> {
    (!timeout.is_zero()).then_some(timeout)
}
