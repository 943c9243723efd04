use std::sync::Arc;
use std::time::SystemTime;

use async_tls::TlsConnector;
use rustls::client::{ServerCertVerified, ServerCertVerifier};
use rustls::{Certificate, ClientConfig, ServerName};

use crate::error::{HttpCallError, HttpCallResult};

/// How server certificates are checked on `https` URLs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TlsTrustPolicy {
    /// Chain checked against the webpki roots, hostname checked against the certificate.
    #[default]
    Verified,
    /// Any certificate chain and any hostname are accepted.
    ///
    /// This removes all protection TLS gives against an active attacker. Only use it
    /// against hosts you control, e.g. test servers with self-signed certificates.
    DangerousAcceptAnyCertificate,
}

impl TlsTrustPolicy {
    pub fn connector(&self) -> HttpCallResult<TlsConnector> {
        match self {
            TlsTrustPolicy::Verified => Ok(TlsConnector::new()),
            TlsTrustPolicy::DangerousAcceptAnyCertificate => {
                log::warn!("certificate and hostname verification disabled for this connection");
                let config = ClientConfig::builder()
                    .with_safe_default_cipher_suites()
                    .with_safe_default_kx_groups()
                    .with_safe_default_protocol_versions()
                    .map_err(|e| HttpCallError::configuration(format!("tls context: {e}")))?
                    .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert))
                    .with_no_client_auth();
                Ok(TlsConnector::from(Arc::new(config)))
            }
        }
    }

    pub fn is_dangerous(&self) -> bool {
        matches!(self, TlsTrustPolicy::DangerousAcceptAnyCertificate)
    }
}

// Hostname matching lives in the verifier in rustls, so this covers both checks.
struct AcceptAnyServerCert;

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &Certificate,
        _intermediates: &[Certificate],
        _server_name: &ServerName,
        _scts: &mut dyn Iterator<Item = &[u8]>,
        _ocsp_response: &[u8],
        _now: SystemTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_any_verifier_ignores_chain_and_name() {
        let verifier = AcceptAnyServerCert;
        let garbage = Certificate(vec![0xde, 0xad, 0xbe, 0xef]);
        let name = ServerName::try_from("not-the-right-host.example").expect("valid dns name");

        let verified = verifier.verify_server_cert(
            &garbage,
            &[],
            &name,
            &mut std::iter::empty(),
            &[],
            SystemTime::UNIX_EPOCH,
        );
        assert!(verified.is_ok());
    }

    #[test]
    fn verified_is_the_default() {
        assert_eq!(TlsTrustPolicy::default(), TlsTrustPolicy::Verified);
        assert!(!TlsTrustPolicy::default().is_dangerous());
    }

    #[test]
    fn both_policies_build_a_connector() {
        assert!(TlsTrustPolicy::Verified.connector().is_ok());
        assert!(TlsTrustPolicy::DangerousAcceptAnyCertificate.connector().is_ok());
    }
}
