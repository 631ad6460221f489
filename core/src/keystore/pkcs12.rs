/*
 * pkcs12.rs
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

//! PKCS#12 (PFX) container codec. The MAC is verified against the passphrase
//! before any bag is opened, so a wrong passphrase never yields entries.

use p12::PFX;

use super::{ContainerCodec, DecodedContainer};
use crate::error::UploadError;

pub(crate) struct Pkcs12Codec;

impl ContainerCodec for Pkcs12Codec {
    fn format(&self) -> &'static str {
        "PKCS12"
    }

    fn decode(&self, data: &[u8], passphrase: &str) -> Result<DecodedContainer, UploadError> {
        let pfx = PFX::parse(data)
            .map_err(|e| UploadError::CredentialDecode(format!("not a PKCS#12 container: {:?}", e)))?;
        if !pfx.verify_mac(passphrase) {
            return Err(UploadError::CredentialDecode(
                "PKCS#12 MAC check failed (wrong passphrase?)".to_string(),
            ));
        }
        let keys = pfx
            .key_bags(passphrase)
            .map_err(|e| UploadError::CredentialDecode(format!("PKCS#12 key bags: {:?}", e)))?;
        let certs = pfx
            .cert_x509_bags(passphrase)
            .map_err(|e| UploadError::CredentialDecode(format!("PKCS#12 certificate bags: {:?}", e)))?;
        Ok(DecodedContainer { keys, certs })
    }
}
