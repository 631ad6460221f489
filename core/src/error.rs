/*
 * error.rs
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

//! Upload client errors. One variant per failure class so callers can tell a
//! bad passphrase from an unreachable server from a failed disk read.

use thiserror::Error;

/// Errors from keystore loading, TLS session construction, or an upload exchange.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The credential container format tag is not a registered codec.
    #[error("unknown credential container format: {0}")]
    CredentialFormat(String),

    /// The container bytes did not decode: wrong passphrase or corrupt data.
    #[error("credential container decode failed: {0}")]
    CredentialDecode(String),

    /// The TLS client configuration could not be built from the loaded material.
    #[error("TLS configuration failed: {0}")]
    Configuration(String),

    /// TCP connect or TLS handshake failed. Includes rejection of the server
    /// certificate by the loaded trust set.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Read or write failure while draining a byte source or streaming the
    /// request/response.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A part descriptor that cannot be framed: control characters in the
    /// name or filename, or a value containing the boundary token.
    #[error("invalid part: {0}")]
    Part(String),

    /// Unexpected response framing from the server.
    #[error("protocol error: {0}")]
    Protocol(String),
}

pub type Result<T> = std::result::Result<T, UploadError>;
