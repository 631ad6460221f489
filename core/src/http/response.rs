/*
 * response.rs
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

//! HTTP/1.1 response push parser: status line and headers only. Feed bytes via
//! `receive`; parsing stops at the blank line ending the header block.

use bytes::BytesMut;

use crate::error::UploadError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    StatusLine,
    Headers,
    Complete,
}

/// Push parser for the response head. Partial data stays in the caller's
/// buffer between calls.
pub struct StatusParser {
    state: ParseState,
    code: Option<u16>,
    headers: Vec<(String, String)>,
}

impl StatusParser {
    pub fn new() -> Self {
        Self {
            state: ParseState::StatusLine,
            code: None,
            headers: Vec::new(),
        }
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    /// Status code, once the status line has been parsed.
    pub fn status_code(&self) -> Option<u16> {
        self.code
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Find CRLF in buf; returns the offset of the '\r', or None if incomplete.
    fn find_crlf(buf: &[u8]) -> Option<usize> {
        buf.windows(2).position(|w| w == b"\r\n")
    }

    /// Consume and parse as much of buf as possible. Fails with Protocol on a
    /// malformed status line or header line.
    pub fn receive(&mut self, buf: &mut BytesMut) -> Result<(), UploadError> {
        while self.state != ParseState::Complete {
            let line_end = match Self::find_crlf(buf) {
                Some(n) => n,
                None => return Ok(()),
            };
            let line = buf.split_to(line_end + 2);
            let line = &line[..line_end];
            match self.state {
                ParseState::StatusLine => {
                    let line = std::str::from_utf8(line)
                        .map_err(|_| UploadError::Protocol("status line is not UTF-8".to_string()))?;
                    // HTTP/1.1 200 OK (reason phrase optional)
                    let mut words = line.splitn(3, ' ');
                    let version = words.next().unwrap_or("");
                    if !version.starts_with("HTTP/") {
                        return Err(UploadError::Protocol(format!("malformed status line: {:?}", line)));
                    }
                    let code = words
                        .next()
                        .and_then(|s| s.parse::<u16>().ok())
                        .ok_or_else(|| UploadError::Protocol(format!("malformed status line: {:?}", line)))?;
                    self.code = Some(code);
                    self.state = ParseState::Headers;
                }
                ParseState::Headers => {
                    if line.is_empty() {
                        self.state = ParseState::Complete;
                        break;
                    }
                    let line = std::str::from_utf8(line)
                        .map_err(|_| UploadError::Protocol("header line is not UTF-8".to_string()))?;
                    let (name, value) = line
                        .split_once(':')
                        .ok_or_else(|| UploadError::Protocol(format!("malformed header line: {:?}", line)))?;
                    self.headers.push((name.trim().to_string(), value.trim().to_string()));
                }
                ParseState::Complete => unreachable!(),
            }
        }
        Ok(())
    }
}
