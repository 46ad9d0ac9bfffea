//! Hashing and signature verification primitives
//!
//! One shared verification-only secp256k1 context backs every signature
//! check. `initialize` builds it eagerly so the first CHECKSIG in a hot
//! path does not pay the precomputation cost; calling it is optional and
//! idempotent.

use std::sync::OnceLock;

use ripemd::Ripemd160;
use secp256k1::ecdsa::Signature;
use secp256k1::{All, Message, PublicKey, Secp256k1};
use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::error::{Result, ScriptError};
use crate::types::Hash;

static SECP: OnceLock<Secp256k1<All>> = OnceLock::new();

/// Build the shared secp256k1 context ahead of first use.
pub fn initialize() {
    let _ = context();
}

fn context() -> &'static Secp256k1<All> {
    SECP.get_or_init(Secp256k1::new)
}

pub fn sha1(data: &[u8]) -> [u8; 20] {
    Sha1::digest(data).into()
}

pub fn sha256(data: &[u8]) -> Hash {
    Sha256::digest(data).into()
}

pub fn ripemd160(data: &[u8]) -> [u8; 20] {
    Ripemd160::digest(data).into()
}

/// Double SHA-256, the transaction and sighash digest.
pub fn hash256(data: &[u8]) -> Hash {
    sha256(&sha256(data))
}

/// SHA-256 then RIPEMD-160, the address digest.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    ripemd160(&sha256(data))
}

/// Strict public key encoding: 33-byte compressed with an 0x02/0x03 tag or
/// 65-byte uncompressed with an 0x04 tag.
pub fn is_strict_public_key(bytes: &[u8]) -> bool {
    match bytes.first() {
        Some(0x02) | Some(0x03) => bytes.len() == 33,
        Some(0x04) => bytes.len() == 65,
        _ => false,
    }
}

/// Parse a DER signature. Strict mode (BIP66) uses the library's exact DER
/// parser; lax mode additionally accepts the historical BER variants found
/// in pre-fork signatures.
pub fn parse_signature(der: &[u8], strict: bool) -> Result<Signature> {
    if strict {
        Signature::from_der(der).map_err(|_| ScriptError::SigDer)
    } else {
        Signature::from_der_lax(der).map_err(|_| ScriptError::SigDer)
    }
}

/// True when the S component is in the lower half of the curve order.
pub fn is_low_s(signature: &Signature) -> bool {
    let mut normalized = *signature;
    normalized.normalize_s();
    normalized == *signature
}

/// Verify an ECDSA signature over a sighash digest.
///
/// The signature is normalized before verification; high-S rejection is a
/// separate policy check applied before this point.
pub fn verify_signature(signature: &Signature, public_key: &[u8], sighash: &Hash) -> bool {
    let Ok(key) = PublicKey::from_slice(public_key) else {
        return false;
    };
    let Ok(message) = Message::from_digest_slice(sighash) else {
        return false;
    };
    let mut normalized = *signature;
    normalized.normalize_s();
    context().verify_ecdsa(&message, &normalized, &key).is_ok()
}
