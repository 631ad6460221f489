/*
 * client.rs
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

//! Upload client: load credentials once, then one object-creation exchange per
//! call. Each exchange opens its own connection, streams the metadata part and
//! the file part, and returns the server's status code. No phase is retried;
//! sources and the connection are dropped on every exit path.

use std::path::PathBuf;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout;

use crate::error::UploadError;
use crate::http::{ChunkedWriter, ParseState, StatusParser};
use crate::keystore::{self, KeyMaterial};
use crate::multipart::{self, Boundary, Part};
use crate::tls::{HostnamePolicy, TlsSession};
use crate::uri::{parse_endpoint, Endpoint};

const RESPONSE_TIMEOUT: Duration = Duration::from_secs(30);

/// One credential container on disk: format tag, path, passphrase.
#[derive(Debug, Clone)]
pub struct CredentialFile {
    pub format: String,
    pub path: PathBuf,
    pub passphrase: String,
}

impl CredentialFile {
    pub fn new(format: impl Into<String>, path: impl Into<PathBuf>, passphrase: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            path: path.into(),
            passphrase: passphrase.into(),
        }
    }
}

/// Client for one object-drive endpoint. Credentials are read and the TLS
/// session built once in `open`; the session is immutable afterwards and safe
/// to share across concurrent `create_object` calls, each of which opens its
/// own connection.
pub struct Client {
    endpoint: Endpoint,
    session: TlsSession,
}

impl Client {
    /// Load the identity and trust containers, build the TLS session, and
    /// parse the endpoint base URL.
    pub async fn open(
        endpoint: &str,
        identity: &CredentialFile,
        trust: &CredentialFile,
        hostname_policy: HostnamePolicy,
    ) -> Result<Self, UploadError> {
        let endpoint = parse_endpoint(endpoint)?;
        tracing::debug!(file = %identity.path.display(), format = %identity.format, "loading identity container");
        let identity = load_credential_file(identity).await?;
        tracing::debug!(file = %trust.path.display(), format = %trust.format, "loading trust container");
        let trust = load_credential_file(trust).await?;
        let session = TlsSession::build(identity, trust, hostname_policy)?;
        Ok(Self { endpoint, session })
    }

    /// Upload one object: POST <base>/objects with a two-part multipart body,
    /// `ObjectMetadata` (JSON) then `filestream` (the file content, carrying
    /// `name` as its filename). Returns the response status code.
    ///
    /// The exchange is a fixed phase sequence: connect (fresh connection and
    /// boundary), send headers, stream both parts through the chunked sink,
    /// then flush and await the status line. A failure in any phase surfaces
    /// immediately; nothing is retried and the connection is never reused.
    pub async fn create_object<'a>(
        &self,
        name: &str,
        mime_type: &str,
        metadata: impl AsyncRead + Send + Unpin + 'a,
        content: impl AsyncRead + Send + Unpin + 'a,
    ) -> Result<u16, UploadError> {
        // connect
        let mut stream = self.session.connect(&self.endpoint.host, self.endpoint.port).await?;
        let boundary = Boundary::generate();

        // headers
        let head = request_head(&self.endpoint, &boundary);
        stream.write_all(head.as_bytes()).await?;

        // stream the body
        let parts = vec![
            Part::field("ObjectMetadata", "application/json", metadata),
            Part::file("filestream", mime_type, name, content),
        ];
        let mut body = ChunkedWriter::new(&mut stream);
        multipart::encode(parts, &boundary, &mut body).await?;
        body.finish().await?;

        // await the response status
        let code = timeout(RESPONSE_TIMEOUT, read_status(&mut stream))
            .await
            .map_err(|_| {
                UploadError::Io(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "timed out waiting for response status",
                ))
            })??;
        tracing::debug!(name, status = code, "object created");
        Ok(code)
    }
}

/// Request head for the object-creation POST. The body is chunked because part
/// sources carry no length; caching is disabled and the connection is one-shot.
fn request_head(endpoint: &Endpoint, boundary: &Boundary) -> String {
    let host_header = if endpoint.port != 443 {
        format!("{}:{}", endpoint.host, endpoint.port)
    } else {
        endpoint.host.clone()
    };
    format!(
        "POST {}/objects HTTP/1.1\r\n\
         Host: {}\r\n\
         Content-Type: multipart/form-data; boundary={}\r\n\
         Transfer-Encoding: chunked\r\n\
         Cache-Control: no-cache\r\n\
         Connection: close\r\n\
         \r\n",
        endpoint.base_path,
        host_header,
        boundary.as_str()
    )
}

/// Read until the response header block is complete and return the status code.
async fn read_status<S>(stream: &mut S) -> Result<u16, UploadError>
where
    S: AsyncRead + Unpin,
{
    let mut parser = StatusParser::new();
    let mut read_buf = BytesMut::with_capacity(8192);
    loop {
        let mut tmp = [0u8; 8192];
        let n = stream.read(&mut tmp).await?;
        if n == 0 {
            return Err(UploadError::Protocol(
                "connection closed before response status".to_string(),
            ));
        }
        read_buf.extend_from_slice(&tmp[..n]);
        parser.receive(&mut read_buf)?;
        if parser.state() == ParseState::Complete {
            // status_code is set once the status line parses; Complete implies it.
            return parser
                .status_code()
                .ok_or_else(|| UploadError::Protocol("response status missing".to_string()));
        }
    }
}

async fn load_credential_file(file: &CredentialFile) -> Result<KeyMaterial, UploadError> {
    let source = tokio::fs::File::open(&file.path).await?;
    keystore::load(&file.format, source, &file.passphrase).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_head_targets_objects_path() {
        let endpoint = parse_endpoint("https://host:8080/services/object-drive/0.0").unwrap();
        let head = request_head(&endpoint, &Boundary::from_token("_bound_1_1"));
        assert!(head.starts_with("POST /services/object-drive/0.0/objects HTTP/1.1\r\n"));
        assert!(head.contains("Host: host:8080\r\n"));
        assert!(head.contains("Content-Type: multipart/form-data; boundary=_bound_1_1\r\n"));
        assert!(head.contains("Transfer-Encoding: chunked\r\n"));
        assert!(head.contains("Connection: close\r\n"));
        assert!(head.ends_with("\r\n\r\n"));
    }

    #[test]
    fn request_head_omits_default_port_in_host() {
        let endpoint = parse_endpoint("https://host/api").unwrap();
        let head = request_head(&endpoint, &Boundary::from_token("_bound_1_2"));
        assert!(head.contains("Host: host\r\n"));
        assert!(head.contains("POST /api/objects"));
    }

    #[tokio::test]
    async fn read_status_returns_code() {
        let raw: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok";
        let code = read_status(&mut &raw[..]).await.unwrap();
        assert_eq!(code, 200);
    }

    #[tokio::test]
    async fn read_status_eof_is_protocol_error() {
        let raw: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Le";
        let err = read_status(&mut &raw[..]).await.unwrap_err();
        assert!(matches!(err, UploadError::Protocol(_)));
    }

    #[tokio::test]
    async fn missing_credential_file_is_io_error() {
        let cred = CredentialFile::new("PKCS12", "/nonexistent/id.p12", "pw");
        let err = load_credential_file(&cred).await.unwrap_err();
        assert!(matches!(err, UploadError::Io(_)));
    }
}
