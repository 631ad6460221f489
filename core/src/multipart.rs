/*
 * multipart.rs
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

//! multipart/form-data framing: named parts with a content type, optional
//! filename, and an async byte source, written to a sink in supplied order.
//! Sources are copied through a fixed-size buffer, so arbitrarily large parts
//! stream with bounded memory.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::UploadError;

/// Copy buffer between a part source and the sink. Correctness does not depend
/// on source lengths being a multiple of this.
pub const COPY_BUFFER_SIZE: usize = 32 * 1024;

static BOUNDARY_SEQ: AtomicU64 = AtomicU64::new(0);

/// Part delimiter token, unique to one upload: wall-clock milliseconds plus a
/// process-wide counter, so two uploads differ even within one millisecond.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boundary(String);

impl Boundary {
    pub fn generate() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let seq = BOUNDARY_SEQ.fetch_add(1, Ordering::Relaxed);
        Boundary(format!("_bound_{}_{}", millis, seq))
    }

    #[cfg(test)]
    pub(crate) fn from_token(token: &str) -> Self {
        Boundary(token.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One segment of the outgoing body. Constructed just before an upload,
/// consumed exactly once by `encode`.
pub struct Part<'a> {
    name: String,
    content_type: String,
    filename: Option<String>,
    source: Box<dyn AsyncRead + Send + Unpin + 'a>,
}

impl<'a> Part<'a> {
    /// A form field part (no filename attribute).
    pub fn field(
        name: impl Into<String>,
        content_type: impl Into<String>,
        source: impl AsyncRead + Send + Unpin + 'a,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            filename: None,
            source: Box::new(source),
        }
    }

    /// A file part; `filename` becomes the Content-Disposition filename attribute.
    pub fn file(
        name: impl Into<String>,
        content_type: impl Into<String>,
        filename: impl Into<String>,
        source: impl AsyncRead + Send + Unpin + 'a,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            filename: Some(filename.into()),
            source: Box::new(source),
        }
    }
}

/// Write the parts to `sink` in order, each framed as
/// `--boundary CRLF headers CRLF CRLF content`, with `CRLF --boundary-- CRLF`
/// after the last. Part content streams through a COPY_BUFFER_SIZE buffer.
/// Fails with Io when a source or the sink fails; bytes already flushed are
/// not rolled back. Part names, filenames, and content types are validated
/// before the first byte is written.
pub async fn encode<'a, W>(parts: Vec<Part<'a>>, boundary: &Boundary, sink: &mut W) -> Result<(), UploadError>
where
    W: AsyncWrite + Unpin,
{
    let mut headers = Vec::with_capacity(parts.len());
    for part in &parts {
        headers.push(part_headers(part, boundary)?);
    }

    let mut buf = vec![0u8; COPY_BUFFER_SIZE];
    let mut wrote_part = false;
    for (part, head) in parts.into_iter().zip(headers) {
        let open = if wrote_part {
            format!("\r\n--{}\r\n", boundary.as_str())
        } else {
            format!("--{}\r\n", boundary.as_str())
        };
        wrote_part = true;
        sink.write_all(open.as_bytes()).await?;
        sink.write_all(head.as_bytes()).await?;

        let mut source = part.source;
        let mut copied = 0u64;
        loop {
            let n = source.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            sink.write_all(&buf[..n]).await?;
            copied += n as u64;
        }
        tracing::debug!(part = %part.name, bytes = copied, "part streamed");
    }

    let close = if wrote_part {
        format!("\r\n--{}--\r\n", boundary.as_str())
    } else {
        format!("--{}--\r\n", boundary.as_str())
    };
    sink.write_all(close.as_bytes()).await?;
    Ok(())
}

/// Content-Disposition and Content-Type lines plus the blank separator line.
fn part_headers(part: &Part<'_>, boundary: &Boundary) -> Result<String, UploadError> {
    let name = quoted_value("part name", &part.name, boundary)?;
    let content_type = plain_value("content type", &part.content_type, boundary)?;
    let mut head = format!("Content-Disposition: form-data; name=\"{}\"", name);
    if let Some(filename) = &part.filename {
        let filename = quoted_value("filename", filename, boundary)?;
        head.push_str(&format!("; filename=\"{}\"", filename));
    }
    head.push_str("\r\n");
    head.push_str(&format!("Content-Type: {}\r\n\r\n", content_type));
    Ok(head)
}

/// Quoted-string attribute value: backslash-escape backslash and quote; CR, LF,
/// and NUL cannot be represented and are rejected, as is a value containing the
/// boundary token.
fn quoted_value(label: &str, value: &str, boundary: &Boundary) -> Result<String, UploadError> {
    check_value(label, value, boundary)?;
    Ok(value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Bare header value (not quoted): same rejections, no escaping.
fn plain_value<'v>(label: &str, value: &'v str, boundary: &Boundary) -> Result<&'v str, UploadError> {
    check_value(label, value, boundary)?;
    Ok(value)
}

fn check_value(label: &str, value: &str, boundary: &Boundary) -> Result<(), UploadError> {
    if value.bytes().any(|b| b == b'\r' || b == b'\n' || b == 0) {
        return Err(UploadError::Part(format!("{} contains control characters", label)));
    }
    if value.contains(boundary.as_str()) {
        return Err(UploadError::Part(format!("{} contains the boundary token", label)));
    }
    Ok(())
}
