//! Compact recoverable signatures over serialized transactions.
//!
//! # Algorithm
//! ```text
//! digest = SHA256(chain_id ‖ serialized[..len-1])
//! for attempt in 0..:
//!     k = RFC6979(d, digest, extra = SHA256(digest ‖ attempt))
//!     (r, s) = sign(d, k); retry unless both encode as exactly 32 bytes
//! i = first of 0..4 whose recovered Q verifies and equals the signer's key
//! output = hex(31 + i ‖ r ‖ s)
//! ```

use std::fmt;
use std::str::FromStr;

use k256::elliptic_curve::sec1::ToEncodedPoint;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::blockchain::ecc::{self, RawSignature};
use crate::blockchain::types::ChainId;
use crate::blockchain::wallet::PrivateKey;
use crate::error::{ClientError, ClientResult};
use crate::observability::metrics;

/// Header for "compact, compressed public key" with recovery id 0.
pub const COMPACT_HEADER_BASE: u8 = 31;

/// Upper bound on nonce attempts before giving up.
const MAX_NONCE_ATTEMPTS: u64 = 1024;

/// 65 bytes: header ‖ r ‖ s. Serialized as 130 hex chars.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct CompactSignature([u8; 65]);

impl CompactSignature {
    fn new(recovery_id: u8, sig: &RawSignature) -> Self {
        let mut bytes = [0u8; 65];
        bytes[0] = COMPACT_HEADER_BASE + recovery_id;
        bytes[1..33].copy_from_slice(&sig.r);
        bytes[33..].copy_from_slice(&sig.s);
        Self(bytes)
    }

    pub fn header(&self) -> u8 {
        self.0[0]
    }

    /// 0..=3 for a well-formed compact signature.
    pub fn recovery_id(&self) -> ClientResult<u8> {
        match self.header() {
            h @ 31..=34 => Ok(h - COMPACT_HEADER_BASE),
            h => Err(ClientError::Crypto(format!("unsupported signature header {}", h))),
        }
    }

    pub fn raw(&self) -> RawSignature {
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&self.0[1..33]);
        s.copy_from_slice(&self.0[33..]);
        RawSignature { r, s }
    }

    pub fn as_bytes(&self) -> &[u8; 65] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for CompactSignature {
    type Err = ClientError;

    fn from_str(s: &str) -> ClientResult<Self> {
        let raw = hex::decode(s)
            .map_err(|e| ClientError::Crypto(format!("signature is not hex: {}", e)))?;
        let bytes: [u8; 65] = raw
            .try_into()
            .map_err(|_| ClientError::Crypto("signature must be 65 bytes".into()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for CompactSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for CompactSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompactSignature({})", self.to_hex())
    }
}

impl Serialize for CompactSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for CompactSignature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// `SHA256(chain_id ‖ serialized)`, dropping the serializer's trailing byte.
pub fn signature_digest(chain_id: &ChainId, serialized_hex: &str) -> ClientResult<[u8; 32]> {
    let trimmed = serialized_hex.trim();
    if trimmed.len() < 2 || trimmed.len() % 2 != 0 {
        return Err(ClientError::Serialization(format!(
            "serialized transaction has {} hex chars",
            trimmed.len()
        )));
    }
    let body = hex::decode(&trimmed[..trimmed.len() - 2])
        .map_err(|e| ClientError::Serialization(format!("serialized transaction: {}", e)))?;

    let mut hasher = Sha256::new();
    hasher.update(chain_id.as_bytes());
    hasher.update(&body);
    Ok(hasher.finalize().into())
}

/// Transaction id: first 20 bytes of SHA256 over the full serialization.
pub fn transaction_id(serialized_hex: &str) -> ClientResult<String> {
    let bytes = hex::decode(serialized_hex.trim())
        .map_err(|e| ClientError::Serialization(format!("serialized transaction: {}", e)))?;
    let hash = Sha256::digest(&bytes);
    Ok(hex::encode(&hash[..20]))
}

/// Which of the four candidates reproduces `key`'s public key.
pub fn find_recovery_id(digest: &[u8; 32], sig: &RawSignature, key: &PrivateKey) -> ClientResult<u8> {
    let compressed = key.public_key_compressed();
    let uncompressed = key.public_key_uncompressed();

    for recovery_id in 0..4u8 {
        let Some(q) = ecc::recover_point(digest, sig, recovery_id) else {
            continue;
        };
        if !ecc::verify(digest, sig, &q) {
            continue;
        }
        if q.to_encoded_point(true).as_bytes() == compressed.as_slice()
            || q.to_encoded_point(false).as_bytes() == uncompressed.as_slice()
        {
            return Ok(recovery_id);
        }
    }
    Err(ClientError::Crypto(
        "no recovery id reproduces the signing key".into(),
    ))
}

/// Sign a digest. Returns the signature and how many non-canonical
/// candidates were discarded.
pub fn sign_digest(digest: &[u8; 32], key: &PrivateKey) -> ClientResult<(CompactSignature, u64)> {
    let d = key.scalar();
    let d_bytes = key.secret_bytes();
    let mut discarded = 0u64;

    for attempt in 0..MAX_NONCE_ATTEMPTS {
        let mut hasher = Sha256::new();
        hasher.update(digest);
        hasher.update(attempt.to_be_bytes());
        let extra: [u8; 32] = hasher.finalize().into();

        let k = ecc::rfc6979_nonce(&d_bytes, digest, &extra)?;
        let Some(sig) = ecc::sign_with_nonce(&d, digest, &k) else {
            discarded += 1;
            continue;
        };
        if !ecc::is_canonical(&sig) {
            discarded += 1;
            continue;
        }

        let recovery_id = find_recovery_id(digest, &sig, key)?;
        return Ok((CompactSignature::new(recovery_id, &sig), discarded));
    }

    Err(ClientError::Crypto(format!(
        "no canonical signature after {} nonces",
        MAX_NONCE_ATTEMPTS
    )))
}

/// One signature per key, in key order.
pub fn sign_transaction(
    chain_id: &ChainId,
    serialized_hex: &str,
    keys: &[&PrivateKey],
) -> ClientResult<Vec<CompactSignature>> {
    let digest = signature_digest(chain_id, serialized_hex)?;

    let mut signatures = Vec::with_capacity(keys.len());
    for key in keys {
        let (signature, discarded) = sign_digest(&digest, key)?;
        metrics::record_signature_retries(discarded);
        debug!(discarded = discarded, header = signature.header(), "Signed transaction digest");
        signatures.push(signature);
    }
    Ok(signatures)
}

/// Compressed SEC1 public key recovered from a compact signature.
pub fn recover_public_key(digest: &[u8; 32], signature: &CompactSignature) -> ClientResult<Vec<u8>> {
    let recovery_id = signature.recovery_id()?;
    let raw = signature.raw();
    let point = ecc::recover_point(digest, &raw, recovery_id)
        .filter(|q| ecc::verify(digest, &raw, q))
        .ok_or_else(|| ClientError::Crypto("signature does not recover a public key".into()))?;
    Ok(point.to_encoded_point(true).as_bytes().to_vec())
}
