/*
 * chunked.rs
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

//! Chunked transfer-encoding sink: each write becomes one HTTP/1.1 chunk
//! (hex length, CRLF, data, CRLF). The multipart encoder writes through this
//! when the request carries no Content-Length. `finish` emits the terminal
//! zero chunk. One frame is buffered at a time, so memory stays bounded by
//! the caller's write size.

use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncWrite, AsyncWriteExt};

pub struct ChunkedWriter<W> {
    inner: W,
    pending: BytesMut,
}

impl<W: AsyncWrite + Unpin> ChunkedWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            pending: BytesMut::new(),
        }
    }

    /// Drive the buffered frame into the inner sink.
    fn poll_drain(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        while !self.pending.is_empty() {
            let n = ready!(Pin::new(&mut self.inner).poll_write(cx, &self.pending))?;
            if n == 0 {
                return Poll::Ready(Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "chunk sink accepted no bytes",
                )));
            }
            self.pending.advance(n);
        }
        Poll::Ready(Ok(()))
    }

    /// Write the terminal zero-length chunk and flush. Consumes the writer;
    /// the inner sink is returned for the response phase.
    pub async fn finish(mut self) -> io::Result<W> {
        self.flush().await?;
        self.inner.write_all(b"0\r\n\r\n").await?;
        self.inner.flush().await?;
        Ok(self.inner)
    }
}

impl<W: AsyncWrite + Unpin> AsyncWrite for ChunkedWriter<W> {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        // A zero-length chunk would terminate the body early.
        if buf.is_empty() {
            return Poll::Ready(Ok(0));
        }
        let this = self.get_mut();
        ready!(this.poll_drain(cx))?;
        this.pending
            .extend_from_slice(format!("{:x}\r\n", buf.len()).as_bytes());
        this.pending.extend_from_slice(buf);
        this.pending.extend_from_slice(b"\r\n");
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        ready!(this.poll_drain(cx))?;
        Pin::new(&mut this.inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        ready!(this.poll_drain(cx))?;
        Pin::new(&mut this.inner).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frames_each_write_as_one_chunk() {
        let mut w = ChunkedWriter::new(std::io::Cursor::new(Vec::new()));
        w.write_all(b"hello").await.unwrap();
        w.write_all(b"world!").await.unwrap();
        let inner = w.finish().await.unwrap();
        assert_eq!(inner.into_inner(), b"5\r\nhello\r\n6\r\nworld!\r\n0\r\n\r\n");
    }

    #[tokio::test]
    async fn hex_lengths_above_nine() {
        let mut w = ChunkedWriter::new(std::io::Cursor::new(Vec::new()));
        let data = [0x61u8; 26];
        w.write_all(&data).await.unwrap();
        let inner = w.finish().await.unwrap();
        let out = inner.into_inner();
        assert!(out.starts_with(b"1a\r\n"));
        assert!(out.ends_with(b"\r\n0\r\n\r\n"));
    }

    #[tokio::test]
    async fn empty_write_emits_no_frame() {
        let mut w = ChunkedWriter::new(std::io::Cursor::new(Vec::new()));
        w.write_all(b"").await.unwrap();
        let inner = w.finish().await.unwrap();
        assert_eq!(inner.into_inner(), b"0\r\n\r\n");
    }
}
