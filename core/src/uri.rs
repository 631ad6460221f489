/*
 * uri.rs
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

//! Endpoint URL parsing. The service base URL is always https (mutual TLS);
//! the object-creation path is appended by the client, e.g.
//! https://host:8443/services/object-drive/0.0 -> POST .../objects.

use crate::error::UploadError;

/// Parsed endpoint base URL: host, port, and base path without a trailing slash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub base_path: String,
}

/// Parse an https endpoint base URL. Default port is 443. The base path may be
/// empty; a trailing slash is dropped so paths can be appended with "/".
pub fn parse_endpoint(url: &str) -> Result<Endpoint, UploadError> {
    let rest = url
        .strip_prefix("https://")
        .ok_or_else(|| UploadError::Configuration(format!("endpoint must be an https:// URL: {}", url)))?;
    let (authority, path) = match rest.find('/') {
        Some(i) => (&rest[..i], rest[i..].trim_end_matches('/')),
        None => (rest, ""),
    };
    let (host, port) = split_authority(authority)
        .ok_or_else(|| UploadError::Configuration(format!("invalid endpoint authority: {}", authority)))?;
    if host.is_empty() {
        return Err(UploadError::Configuration(format!("endpoint has no host: {}", url)));
    }
    Ok(Endpoint {
        host: host.to_string(),
        port,
        base_path: path.to_string(),
    })
}

/// Split host[:port]. IPv6 literals use brackets: [::1]:8443.
fn split_authority(authority: &str) -> Option<(&str, u16)> {
    if let Some(rest) = authority.strip_prefix('[') {
        let end = rest.find(']')?;
        let host = &rest[..end];
        match rest[end + 1..].strip_prefix(':') {
            Some(p) => Some((host, p.parse().ok()?)),
            None if rest[end + 1..].is_empty() => Some((host, 443)),
            None => None,
        }
    } else {
        match authority.rsplit_once(':') {
            Some((host, p)) => Some((host, p.parse().ok()?)),
            None => Some((authority, 443)),
        }
    }
}
