/*
 * jks.rs
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

//! Java keystore (JKS) container codec: magic 0xFEEDFEED, versions 1 and 2,
//! trusted-certificate and private-key entries. Private keys are protected
//! with the Sun keystore cipher (OID 1.3.6.1.4.1.42.2.17.1.1, SHA-1
//! keystream); the whole file carries a SHA-1 integrity digest keyed on the
//! passphrase, checked before any entry is decoded.

use sha1::{Digest, Sha1};

use super::{ContainerCodec, DecodedContainer};
use crate::error::UploadError;

const JKS_MAGIC: u32 = 0xFEED_FEED;
const JCEKS_MAGIC: u32 = 0xCECE_CECE;
const DIGEST_LEN: usize = 20;
/// Keyed into the integrity digest between passphrase and file bytes.
const INTEGRITY_SALT: &[u8] = b"Mighty Aphrodite";
/// 1.3.6.1.4.1.42.2.17.1.1 (Sun proprietary key protection).
const SUN_KEY_PROTECTOR_OID: &[u8] = &[0x2b, 0x06, 0x01, 0x04, 0x01, 0x2a, 0x02, 0x11, 0x01, 0x01];

pub(crate) struct JksCodec;

impl ContainerCodec for JksCodec {
    fn format(&self) -> &'static str {
        "JKS"
    }

    fn decode(&self, data: &[u8], passphrase: &str) -> Result<DecodedContainer, UploadError> {
        if data.len() < 12 + DIGEST_LEN {
            return Err(decode_err("truncated keystore"));
        }
        let passwd = password_bytes(passphrase);
        let (body, stored) = data.split_at(data.len() - DIGEST_LEN);
        let computed = sha1_concat(&[&passwd[..], INTEGRITY_SALT, body]);
        if &computed[..] != stored {
            return Err(decode_err("integrity check failed (wrong passphrase or corrupt file)"));
        }

        let mut r = Reader { data: body, pos: 0 };
        match r.u32()? {
            JKS_MAGIC => {}
            JCEKS_MAGIC => return Err(decode_err("JCEKS keystores are not supported")),
            _ => return Err(decode_err("not a JKS keystore")),
        }
        let version = r.u32()?;
        if version != 1 && version != 2 {
            return Err(decode_err(&format!("unsupported keystore version {}", version)));
        }
        let count = r.u32()?;

        let mut keys = Vec::new();
        let mut certs = Vec::new();
        for _ in 0..count {
            let tag = r.u32()?;
            let alias = r.utf()?;
            let _timestamp = r.u64()?;
            match tag {
                // private key entry: encrypted key then certificate chain
                1 => {
                    let key_len = r.u32()? as usize;
                    let protected = r.take(key_len)?;
                    keys.push(decrypt_sun_key(protected, &passwd)?);
                    let chain_len = r.u32()?;
                    for _ in 0..chain_len {
                        certs.push(read_cert(&mut r, version)?);
                    }
                }
                // trusted certificate entry
                2 => {
                    certs.push(read_cert(&mut r, version)?);
                }
                t => {
                    return Err(decode_err(&format!(
                        "unsupported entry tag {} for alias {:?}",
                        t, alias
                    )))
                }
            }
        }
        Ok(DecodedContainer { keys, certs })
    }
}

fn decode_err(msg: &str) -> UploadError {
    UploadError::CredentialDecode(format!("JKS: {}", msg))
}

/// Version 2 prefixes each certificate with its type string; version 1 is X.509 implicitly.
fn read_cert(r: &mut Reader<'_>, version: u32) -> Result<Vec<u8>, UploadError> {
    if version == 2 {
        let cert_type = r.utf()?;
        if cert_type != "X.509" {
            return Err(decode_err(&format!("unsupported certificate type {:?}", cert_type)));
        }
    }
    let len = r.u32()? as usize;
    Ok(r.take(len)?.to_vec())
}

/// Passphrase as Java encodes it for keystore digests: UTF-16 big-endian.
fn password_bytes(passphrase: &str) -> Vec<u8> {
    passphrase.encode_utf16().flat_map(|u| u.to_be_bytes()).collect()
}

fn sha1_concat(parts: &[&[u8]]) -> [u8; 20] {
    let mut h = Sha1::new();
    for p in parts {
        h.update(p);
    }
    h.finalize().into()
}

/// Undo the Sun key protection: the entry is an EncryptedPrivateKeyInfo whose
/// data is salt(20) || ciphertext || check(20). The keystream is a SHA-1 block
/// chain seeded with the salt and keyed on the passphrase; the trailing check
/// digest detects a wrong passphrase.
fn decrypt_sun_key(protected: &[u8], passwd: &[u8]) -> Result<Vec<u8>, UploadError> {
    let (alg_oid, data) = parse_encrypted_key_info(protected)?;
    if alg_oid != SUN_KEY_PROTECTOR_OID {
        return Err(decode_err("unsupported key protection algorithm"));
    }
    if data.len() < 2 * DIGEST_LEN {
        return Err(decode_err("protected key too short"));
    }
    let salt = &data[..DIGEST_LEN];
    let ciphertext = &data[DIGEST_LEN..data.len() - DIGEST_LEN];
    let check = &data[data.len() - DIGEST_LEN..];

    let mut plain = Vec::with_capacity(ciphertext.len());
    let mut block: [u8; 20] = salt.try_into().expect("salt length");
    for chunk in ciphertext.chunks(DIGEST_LEN) {
        block = sha1_concat(&[passwd, &block[..]]);
        for (c, k) in chunk.iter().zip(block.iter()) {
            plain.push(c ^ k);
        }
    }
    if &sha1_concat(&[passwd, &plain[..]])[..] != check {
        return Err(decode_err("private key check failed (wrong passphrase?)"));
    }
    Ok(plain)
}

/// EncryptedPrivateKeyInfo ::= SEQUENCE { SEQUENCE { OID, params? }, OCTET STRING }.
/// Returns the algorithm OID content and the octet-string data.
fn parse_encrypted_key_info(der: &[u8]) -> Result<(&[u8], &[u8]), UploadError> {
    let (tag, outer, _) = der_tlv(der, 0)?;
    if tag != 0x30 {
        return Err(decode_err("malformed protected key (expected SEQUENCE)"));
    }
    let (tag, alg, next) = der_tlv(outer, 0)?;
    if tag != 0x30 {
        return Err(decode_err("malformed algorithm identifier"));
    }
    let (tag, oid, _) = der_tlv(alg, 0)?;
    if tag != 0x06 {
        return Err(decode_err("malformed algorithm OID"));
    }
    let (tag, data, _) = der_tlv(outer, next)?;
    if tag != 0x04 {
        return Err(decode_err("malformed protected key data"));
    }
    Ok((oid, data))
}

/// One DER TLV at `pos`: returns (tag, content, position after). Definite
/// lengths only, up to four length bytes.
fn der_tlv(data: &[u8], pos: usize) -> Result<(u8, &[u8], usize), UploadError> {
    let err = || decode_err("malformed DER");
    let tag = *data.get(pos).ok_or_else(err)?;
    let first = *data.get(pos + 1).ok_or_else(err)?;
    let (len, content_at) = if first < 0x80 {
        (first as usize, pos + 2)
    } else {
        let n = (first & 0x7f) as usize;
        if n == 0 || n > 4 {
            return Err(err());
        }
        let mut len = 0usize;
        for i in 0..n {
            len = (len << 8) | *data.get(pos + 2 + i).ok_or_else(err)? as usize;
        }
        (len, pos + 2 + n)
    };
    let end = content_at.checked_add(len).ok_or_else(err)?;
    if end > data.len() {
        return Err(err());
    }
    Ok((tag, &data[content_at..end], end))
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], UploadError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&e| e <= self.data.len())
            .ok_or_else(|| decode_err("truncated keystore"))?;
        let s = &self.data[self.pos..end];
        self.pos = end;
        Ok(s)
    }

    fn u16(&mut self) -> Result<u16, UploadError> {
        Ok(u16::from_be_bytes(self.take(2)?.try_into().expect("u16 slice")))
    }

    fn u32(&mut self) -> Result<u32, UploadError> {
        Ok(u32::from_be_bytes(self.take(4)?.try_into().expect("u32 slice")))
    }

    fn u64(&mut self) -> Result<u64, UploadError> {
        Ok(u64::from_be_bytes(self.take(8)?.try_into().expect("u64 slice")))
    }

    /// Java writeUTF string: u16 byte length then (modified) UTF-8. Aliases in
    /// practice are ASCII; supplementary-plane aliases are not supported.
    fn utf(&mut self) -> Result<String, UploadError> {
        let len = self.u16()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| decode_err("malformed UTF string"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CERT_DER: &[u8] = &[0x30, 0x03, 0x02, 0x01, 0x2a];
    const PLAIN_KEY: &[u8] = &[0x30, 0x2e, 0x02, 0x01, 0x00, 0x04, 0x29, 0x11, 0x22, 0x33];

    fn put_utf(out: &mut Vec<u8>, s: &str) {
        out.extend_from_slice(&(s.len() as u16).to_be_bytes());
        out.extend_from_slice(s.as_bytes());
    }

    fn der(tag: u8, content: &[u8]) -> Vec<u8> {
        let mut out = vec![tag];
        let len = content.len();
        if len < 0x80 {
            out.push(len as u8);
        } else if len < 0x100 {
            out.push(0x81);
            out.push(len as u8);
        } else {
            out.push(0x82);
            out.extend_from_slice(&(len as u16).to_be_bytes());
        }
        out.extend_from_slice(content);
        out
    }

    /// Inverse of decrypt_sun_key, for fixtures.
    fn protect_key(plain: &[u8], passwd: &[u8]) -> Vec<u8> {
        let salt = [0x55u8; 20];
        let mut ciphertext = Vec::with_capacity(plain.len());
        let mut block = salt;
        for chunk in plain.chunks(DIGEST_LEN) {
            block = sha1_concat(&[passwd, &block[..]]);
            for (p, k) in chunk.iter().zip(block.iter()) {
                ciphertext.push(p ^ k);
            }
        }
        let mut data = salt.to_vec();
        data.extend_from_slice(&ciphertext);
        data.extend_from_slice(&sha1_concat(&[passwd, plain]));
        let alg = der(0x30, &der(0x06, SUN_KEY_PROTECTOR_OID));
        let mut inner = alg;
        inner.extend_from_slice(&der(0x04, &data));
        der(0x30, &inner)
    }

    fn build_jks(version: u32, entries: &[Vec<u8>], passphrase: &str) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&JKS_MAGIC.to_be_bytes());
        out.extend_from_slice(&version.to_be_bytes());
        out.extend_from_slice(&(entries.len() as u32).to_be_bytes());
        for e in entries {
            out.extend_from_slice(e);
        }
        let passwd = password_bytes(passphrase);
        let digest = sha1_concat(&[&passwd[..], INTEGRITY_SALT, &out[..]]);
        out.extend_from_slice(&digest);
        out
    }

    fn trusted_entry(alias: &str, cert: &[u8], version: u32) -> Vec<u8> {
        let mut e = Vec::new();
        e.extend_from_slice(&2u32.to_be_bytes());
        put_utf(&mut e, alias);
        e.extend_from_slice(&0u64.to_be_bytes());
        if version == 2 {
            put_utf(&mut e, "X.509");
        }
        e.extend_from_slice(&(cert.len() as u32).to_be_bytes());
        e.extend_from_slice(cert);
        e
    }

    fn key_entry(alias: &str, plain_key: &[u8], chain: &[&[u8]], passphrase: &str) -> Vec<u8> {
        let protected = protect_key(plain_key, &password_bytes(passphrase));
        let mut e = Vec::new();
        e.extend_from_slice(&1u32.to_be_bytes());
        put_utf(&mut e, alias);
        e.extend_from_slice(&0u64.to_be_bytes());
        e.extend_from_slice(&(protected.len() as u32).to_be_bytes());
        e.extend_from_slice(&protected);
        e.extend_from_slice(&(chain.len() as u32).to_be_bytes());
        for cert in chain {
            put_utf(&mut e, "X.509");
            e.extend_from_slice(&(cert.len() as u32).to_be_bytes());
            e.extend_from_slice(cert);
        }
        e
    }

    #[test]
    fn trusted_only_store_decodes_certs() {
        let store = build_jks(2, &[trusted_entry("ca", CERT_DER, 2)], "pw2");
        let decoded = JksCodec.decode(&store, "pw2").unwrap();
        assert!(decoded.keys.is_empty());
        assert_eq!(decoded.certs, vec![CERT_DER.to_vec()]);
    }

    #[test]
    fn key_entry_decrypts_to_original_key() {
        let store = build_jks(2, &[key_entry("id", PLAIN_KEY, &[CERT_DER], "pw1")], "pw1");
        let decoded = JksCodec.decode(&store, "pw1").unwrap();
        assert_eq!(decoded.keys, vec![PLAIN_KEY.to_vec()]);
        assert_eq!(decoded.certs, vec![CERT_DER.to_vec()]);
    }

    #[test]
    fn version_1_has_no_cert_type_strings() {
        let store = build_jks(1, &[trusted_entry("ca", CERT_DER, 1)], "pw");
        let decoded = JksCodec.decode(&store, "pw").unwrap();
        assert_eq!(decoded.certs, vec![CERT_DER.to_vec()]);
    }

    #[test]
    fn wrong_passphrase_fails_integrity_check() {
        let store = build_jks(2, &[trusted_entry("ca", CERT_DER, 2)], "pw2");
        let err = JksCodec.decode(&store, "wrong").unwrap_err();
        assert!(matches!(err, UploadError::CredentialDecode(_)));
    }

    #[test]
    fn truncated_store_is_rejected() {
        let store = build_jks(2, &[trusted_entry("ca", CERT_DER, 2)], "pw2");
        let err = JksCodec.decode(&store[..store.len() - 25], "pw2").unwrap_err();
        assert!(matches!(err, UploadError::CredentialDecode(_)));
    }

    #[test]
    fn jceks_magic_is_rejected() {
        let mut store = build_jks(2, &[], "pw");
        store[..4].copy_from_slice(&JCEKS_MAGIC.to_be_bytes());
        let body_len = store.len() - DIGEST_LEN;
        let passwd = password_bytes("pw");
        let digest = sha1_concat(&[&passwd[..], INTEGRITY_SALT, &store[..body_len]]);
        store[body_len..].copy_from_slice(&digest);
        let err = JksCodec.decode(&store, "pw").unwrap_err();
        assert!(matches!(err, UploadError::CredentialDecode(m) if m.contains("JCEKS")));
    }
}
