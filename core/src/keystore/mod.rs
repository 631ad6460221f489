/*
 * mod.rs
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

//! Credential container loading. A container file (PKCS#12 or JKS, selected by
//! a format tag) decodes into key material: either a client identity (private
//! key plus certificate chain) or a trust set (CA certificates). Codecs are
//! looked up in a registry, so new container formats slot in without touching
//! call sites.

mod jks;
mod pkcs12;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer};

use crate::error::UploadError;

/// Key material decoded from a credential container. An identity presents the
/// chain and signs with the key during the TLS handshake; a trust set anchors
/// validation of the peer. A container never yields a partially usable handle:
/// classification happens at load time or the load fails.
pub enum KeyMaterial {
    Identity {
        key: PrivateKeyDer<'static>,
        chain: Vec<CertificateDer<'static>>,
    },
    TrustSet {
        certs: Vec<CertificateDer<'static>>,
    },
}

// Key bytes stay out of logs and panic messages.
impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyMaterial::Identity { chain, .. } => f
                .debug_struct("Identity")
                .field("chain_len", &chain.len())
                .finish_non_exhaustive(),
            KeyMaterial::TrustSet { certs } => f
                .debug_struct("TrustSet")
                .field("certs", &certs.len())
                .finish(),
        }
    }
}

impl KeyMaterial {
    pub fn is_identity(&self) -> bool {
        matches!(self, KeyMaterial::Identity { .. })
    }

    pub fn is_trust_set(&self) -> bool {
        matches!(self, KeyMaterial::TrustSet { .. })
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            KeyMaterial::Identity { .. } => "identity",
            KeyMaterial::TrustSet { .. } => "trust set",
        }
    }
}

/// Raw entries pulled out of one container: PKCS#8 private keys and DER
/// certificates. Classified into KeyMaterial by `load`.
#[derive(Debug)]
pub(crate) struct DecodedContainer {
    pub(crate) keys: Vec<Vec<u8>>,
    pub(crate) certs: Vec<Vec<u8>>,
}

/// One container encoding. Implementations decode the whole container with the
/// supplied passphrase; they must verify container integrity against the
/// passphrase before returning any entry.
pub(crate) trait ContainerCodec: Send + Sync {
    /// Format tag this codec answers to (matched case-insensitively).
    fn format(&self) -> &'static str;

    fn decode(&self, data: &[u8], passphrase: &str) -> Result<DecodedContainer, UploadError>;
}

static CODECS: [&(dyn ContainerCodec); 2] = [&pkcs12::Pkcs12Codec, &jks::JksCodec];

fn codec_for(format: &str) -> Option<&'static dyn ContainerCodec> {
    CODECS
        .iter()
        .copied()
        .find(|c| c.format().eq_ignore_ascii_case(format.trim()))
}

/// Format tags of all registered codecs, for diagnostics.
pub fn supported_formats() -> Vec<&'static str> {
    CODECS.iter().map(|c| c.format()).collect()
}

/// Read a credential container from `source` to completion and decode it.
/// Fails with CredentialFormat for an unknown tag, Io if the source cannot be
/// drained, and CredentialDecode for a wrong passphrase, corrupt bytes, or a
/// container that is neither a whole identity nor a trust set. The source is
/// consumed and dropped; nothing is retained.
pub async fn load<R>(format: &str, mut source: R, passphrase: &str) -> Result<KeyMaterial, UploadError>
where
    R: AsyncRead + Unpin,
{
    let codec = codec_for(format).ok_or_else(|| UploadError::CredentialFormat(format.to_string()))?;
    let mut data = Vec::new();
    source.read_to_end(&mut data).await?;
    let decoded = codec.decode(&data, passphrase)?;
    tracing::debug!(
        format = codec.format(),
        keys = decoded.keys.len(),
        certs = decoded.certs.len(),
        "decoded credential container"
    );
    classify(decoded)
}

/// Keys plus certificates make an identity (first key, full chain); certificates
/// alone make a trust set; anything else is a malformed container.
fn classify(decoded: DecodedContainer) -> Result<KeyMaterial, UploadError> {
    let DecodedContainer { mut keys, certs } = decoded;
    match (keys.len(), certs.len()) {
        (0, 0) => Err(UploadError::CredentialDecode(
            "container holds no key or certificate entries".to_string(),
        )),
        (0, _) => Ok(KeyMaterial::TrustSet {
            certs: certs.into_iter().map(CertificateDer::from).collect(),
        }),
        (_, 0) => Err(UploadError::CredentialDecode(
            "container holds a private key but no certificate chain".to_string(),
        )),
        (n, _) => {
            if n > 1 {
                tracing::debug!(keys = n, "container holds multiple keys; using the first");
            }
            Ok(KeyMaterial::Identity {
                key: PrivateKeyDer::Pkcs8(keys.remove(0).into()),
                chain: certs.into_iter().map(CertificateDer::from).collect(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_format_is_credential_format_error() {
        let err = load("PEM", &b"whatever"[..], "pw").await.unwrap_err();
        assert!(matches!(err, UploadError::CredentialFormat(f) if f == "PEM"));
    }

    #[test]
    fn format_lookup_is_case_insensitive() {
        assert!(codec_for("pkcs12").is_some());
        assert!(codec_for(" JKS ").is_some());
        assert!(codec_for("JCEKS").is_none());
    }

    #[test]
    fn registry_lists_both_required_formats() {
        let formats = supported_formats();
        assert!(formats.contains(&"PKCS12"));
        assert!(formats.contains(&"JKS"));
    }

    #[test]
    fn certs_only_classifies_as_trust_set() {
        let m = classify(DecodedContainer {
            keys: vec![],
            certs: vec![vec![0x30, 0x03, 0x02, 0x01, 0x01]],
        })
        .unwrap();
        assert!(m.is_trust_set());
        assert_eq!(m.kind_name(), "trust set");
    }

    #[test]
    fn key_and_cert_classifies_as_identity() {
        let m = classify(DecodedContainer {
            keys: vec![vec![1, 2, 3]],
            certs: vec![vec![4, 5, 6]],
        })
        .unwrap();
        assert!(m.is_identity());
    }

    #[test]
    fn key_without_chain_is_rejected() {
        let err = classify(DecodedContainer {
            keys: vec![vec![1, 2, 3]],
            certs: vec![],
        })
        .unwrap_err();
        assert!(matches!(err, UploadError::CredentialDecode(_)));
    }

    #[test]
    fn empty_container_is_rejected() {
        let err = classify(DecodedContainer {
            keys: vec![],
            certs: vec![],
        })
        .unwrap_err();
        assert!(matches!(err, UploadError::CredentialDecode(_)));
    }
}
