/*
 * tls.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Portacarte, a mutual-TLS object storage upload client.
 *
 * Portacarte is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Portacarte is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Portacarte.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Mutual-TLS session construction with rustls. A session combines one
//! identity (client key + chain, presented on handshake) with one trust set
//! (the only anchors the peer is validated against) and a hostname policy.
//! The configuration is scoped to the owning client, never installed as a
//! process-wide default, and is shareable read-only across callers.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use tokio_rustls::rustls::client::WebPkiServerVerifier;
use tokio_rustls::rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use tokio_rustls::rustls::{
    CertificateError, ClientConfig, DigitallySignedStruct, Error as TlsError, RootCertStore,
    SignatureScheme,
};
use tokio_rustls::TlsConnector;

use crate::error::UploadError;
use crate::keystore::KeyMaterial;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Server host name checking. `Verify` is the default; `AcceptAnyName` still
/// validates the certificate chain against the trust set but ignores the host
/// name, and must be selected explicitly at the call site.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HostnamePolicy {
    #[default]
    Verify,
    AcceptAnyName,
}

/// Reusable client TLS configuration. Built once per client; each `connect`
/// opens one fresh connection.
#[derive(Clone)]
pub struct TlsSession {
    config: Arc<ClientConfig>,
}

impl std::fmt::Debug for TlsSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsSession").finish_non_exhaustive()
    }
}

impl TlsSession {
    /// Combine an identity handle and a trust handle into a client config.
    /// Fails with Configuration when a handle is the wrong kind or rustls
    /// rejects the material.
    pub fn build(
        identity: KeyMaterial,
        trust: KeyMaterial,
        hostname_policy: HostnamePolicy,
    ) -> Result<Self, UploadError> {
        let (key, chain) = match identity {
            KeyMaterial::Identity { key, chain } => (key, chain),
            KeyMaterial::TrustSet { .. } => {
                return Err(UploadError::Configuration(
                    "identity handle is a trust set, not an identity".to_string(),
                ))
            }
        };
        let certs = match trust {
            KeyMaterial::TrustSet { certs } => certs,
            KeyMaterial::Identity { .. } => {
                return Err(UploadError::Configuration(
                    "trust handle is an identity, not a trust set".to_string(),
                ))
            }
        };

        let mut roots = RootCertStore::empty();
        let mut rejected = 0usize;
        for cert in certs {
            if roots.add(cert).is_err() {
                rejected += 1;
            }
        }
        if roots.is_empty() {
            return Err(UploadError::Configuration(
                "trust set contains no usable trust anchors".to_string(),
            ));
        }
        if rejected > 0 {
            tracing::debug!(rejected, "trust certificates not usable as anchors");
        }

        let builder = ClientConfig::builder();
        let config = match hostname_policy {
            HostnamePolicy::Verify => builder
                .with_root_certificates(roots)
                .with_client_auth_cert(chain, key),
            HostnamePolicy::AcceptAnyName => {
                let inner = WebPkiServerVerifier::builder(Arc::new(roots))
                    .build()
                    .map_err(|e| {
                        UploadError::Configuration(format!("server verifier build failed: {}", e))
                    })?;
                builder
                    .dangerous()
                    .with_custom_certificate_verifier(Arc::new(AnyNameVerifier { inner }))
                    .with_client_auth_cert(chain, key)
            }
        }
        .map_err(|e| UploadError::Configuration(format!("TLS client configuration rejected: {}", e)))?;

        tracing::debug!(policy = ?hostname_policy, "TLS session built");
        Ok(Self {
            config: Arc::new(config),
        })
    }

    /// Open one TLS connection: TCP connect then handshake, each bounded by a
    /// connect timeout. Every failure, including rejection of the server
    /// certificate by the trust set, surfaces as Connection.
    pub async fn connect(&self, host: &str, port: u16) -> Result<TlsStream<TcpStream>, UploadError> {
        let addr = format!("{}:{}", host, port);
        let tcp = timeout(CONNECT_TIMEOUT, TcpStream::connect(&addr))
            .await
            .map_err(|_| UploadError::Connection(format!("TCP connect to {} timed out", addr)))?
            .map_err(|e| UploadError::Connection(format!("TCP connect to {} failed: {}", addr, e)))?;
        let server_name = ServerName::try_from(host.to_string())
            .map_err(|_| UploadError::Connection(format!("invalid server name: {}", host)))?;
        let connector = TlsConnector::from(self.config.clone());
        let tls = timeout(CONNECT_TIMEOUT, connector.connect(server_name, tcp))
            .await
            .map_err(|_| UploadError::Connection(format!("TLS handshake with {} timed out", addr)))?
            .map_err(|e| UploadError::Connection(format!("TLS handshake with {} failed: {}", addr, e)))?;
        tracing::debug!(%addr, "TLS connection established");
        Ok(tls)
    }
}

/// Delegates chain validation to the webpki verifier and tolerates only a
/// host-name mismatch. Used by HostnamePolicy::AcceptAnyName.
#[derive(Debug)]
struct AnyNameVerifier {
    inner: Arc<WebPkiServerVerifier>,
}

impl ServerCertVerifier for AnyNameVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, TlsError> {
        match self
            .inner
            .verify_server_cert(end_entity, intermediates, server_name, ocsp_response, now)
        {
            Err(TlsError::InvalidCertificate(CertificateError::NotValidForName)) => {
                Ok(ServerCertVerified::assertion())
            }
            Err(TlsError::InvalidCertificate(CertificateError::NotValidForNameContext { .. })) => {
                Ok(ServerCertVerified::assertion())
            }
            other => other,
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}
