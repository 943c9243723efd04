use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use async_io::Async;

use crate::async_connection::{AsyncConnection, Target};
use crate::error::{HttpCallError, HttpCallResult};
use crate::timeout;
use crate::tls::TlsTrustPolicy;

pub struct AsyncConnectionFactory;

impl AsyncConnectionFactory {
    // Resolves the host off the executor so the connect timeout covers lookup too
    async fn resolve(target: &Target) -> io::Result<Vec<SocketAddr>> {
        let host = target.host.clone();
        let port = target.port;
        blocking::unblock(move || {
            (host.as_str(), port)
                .to_socket_addrs()
                .map(|addrs| addrs.collect::<Vec<_>>())
        })
        .await
    }

    // Tries each resolved address in turn, keeping the last failure
    async fn connect_tcp(target: &Target) -> io::Result<Async<TcpStream>> {
        let addrs = Self::resolve(target).await?;

        let mut last_error = io::Error::new(
            io::ErrorKind::NotFound,
            format!("failed to resolve host {}", target.host),
        );
        for addr in addrs {
            log::debug!("connecting to {addr}");
            match Async::<TcpStream>::connect(addr).await {
                Ok(stream) => return Ok(stream),
                Err(e) => last_error = e,
            }
        }
        Err(last_error)
    }

    async fn open(
        target: &Target,
        tls_trust_policy: &TlsTrustPolicy,
    ) -> HttpCallResult<Box<dyn AsyncConnection>> {
        let connection_error = |source: io::Error| HttpCallError::Connection {
            url: target.uri.to_string(),
            source,
        };

        // The trust policy is built before dialing so a bad TLS setup never opens a socket
        let tls_connector = if target.secure {
            Some(tls_trust_policy.connector()?)
        } else {
            None
        };

        let stream = Self::connect_tcp(target).await.map_err(connection_error)?;

        let stream: Box<dyn AsyncConnection> = match tls_connector {
            Some(tls_connector) => Box::new(
                tls_connector
                    .connect(&target.host, stream)
                    .await
                    .map_err(connection_error)?,
            ),
            None => Box::new(stream),
        };

        log::debug!(
            "connected to {}:{} (encrypted = {})",
            target.host,
            target.port,
            stream.is_encrypted()
        );
        Ok(stream)
    }

    /// Opens a plain or TLS connection to `target`, bounded by `connect_timeout`.
    pub async fn connect(
        target: &Target,
        tls_trust_policy: &TlsTrustPolicy,
        connect_timeout: Option<Duration>,
    ) -> HttpCallResult<Box<dyn AsyncConnection>> {
        log::debug!("target = {target:?}");

        timeout::within(connect_timeout, async {
            Ok(Self::open(target, tls_trust_policy).await)
        })
        .await
        .unwrap_or_else(|source| {
            Err(HttpCallError::Connection {
                url: target.uri.to_string(),
                source,
            })
        })
    }
}
