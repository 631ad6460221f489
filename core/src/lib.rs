/*
 * lib.rs
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

//! Portacarte core: upload a file plus its JSON metadata to an object-drive
//! endpoint over mutual TLS. Credential containers (PKCS#12, JKS) decode into
//! key material; one identity and one trust set make a client-scoped TLS
//! session; uploads stream a two-part multipart/form-data body through a
//! fixed-size buffer, one connection per call.

pub mod client;
pub mod error;
pub mod http;
pub mod keystore;
pub mod multipart;
pub mod tls;
pub mod uri;

pub use client::{Client, CredentialFile};
pub use error::UploadError;
pub use keystore::KeyMaterial;
pub use multipart::{Boundary, Part};
pub use tls::{HostnamePolicy, TlsSession};
