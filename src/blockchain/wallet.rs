//! Private keys and the per-role key ring.
//!
//! # Security
//! - Keys come from environment variables or are inserted programmatically,
//!   never from the config file
//! - Keys are never logged; `Debug` is redacted

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{AffinePoint, Scalar, SecretKey};
use sha2::{Digest, Sha256};

use crate::blockchain::authority::AuthorityRole;
use crate::error::{ClientError, ClientResult};

const WIF_VERSION: u8 = 0x80;

/// Environment variable holding the key for `role`.
pub fn key_env_var(role: AuthorityRole) -> &'static str {
    match role {
        AuthorityRole::Owner => "HIVE_OWNER_KEY",
        AuthorityRole::Active => "HIVE_ACTIVE_KEY",
        AuthorityRole::Posting => "HIVE_POSTING_KEY",
        AuthorityRole::Memo => "HIVE_MEMO_KEY",
    }
}

fn double_sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(Sha256::digest(data)).into()
}

/// A secp256k1 private key.
#[derive(Clone)]
pub struct PrivateKey {
    secret: SecretKey,
}

impl PrivateKey {
    pub fn from_bytes(bytes: &[u8; 32]) -> ClientResult<Self> {
        let secret = SecretKey::from_slice(bytes)
            .map_err(|_| ClientError::Configuration("private key out of range".into()))?;
        Ok(Self { secret })
    }

    /// Base58 WIF: `0x80 ‖ key ‖ checksum[..4]`.
    pub fn from_wif(wif: &str) -> ClientResult<Self> {
        let raw = bs58::decode(wif.trim())
            .into_vec()
            .map_err(|e| ClientError::Configuration(format!("WIF is not base58: {}", e)))?;
        if raw.len() != 37 {
            return Err(ClientError::Configuration(format!(
                "WIF decodes to {} bytes, expected 37",
                raw.len()
            )));
        }
        let (payload, checksum) = raw.split_at(33);
        if payload[0] != WIF_VERSION {
            return Err(ClientError::Configuration(format!(
                "WIF version byte 0x{:02x}, expected 0x80",
                payload[0]
            )));
        }
        if double_sha256(payload)[..4] != *checksum {
            return Err(ClientError::Configuration("WIF checksum mismatch".into()));
        }

        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&payload[1..]);
        Self::from_bytes(&bytes)
    }

    /// 64 hex characters.
    pub fn from_hex(text: &str) -> ClientResult<Self> {
        let raw = hex::decode(text.trim())
            .map_err(|e| ClientError::Configuration(format!("private key is not hex: {}", e)))?;
        let bytes: [u8; 32] = raw
            .try_into()
            .map_err(|_| ClientError::Configuration("hex private key must be 32 bytes".into()))?;
        Self::from_bytes(&bytes)
    }

    pub fn to_wif(&self) -> String {
        let mut payload = Vec::with_capacity(37);
        payload.push(WIF_VERSION);
        payload.extend_from_slice(&self.secret.to_bytes());
        let checksum = double_sha256(&payload);
        payload.extend_from_slice(&checksum[..4]);
        bs58::encode(payload).into_string()
    }

    pub(crate) fn scalar(&self) -> Scalar {
        *self.secret.to_nonzero_scalar()
    }

    pub(crate) fn secret_bytes(&self) -> [u8; 32] {
        self.secret.to_bytes().into()
    }

    pub fn public_point(&self) -> AffinePoint {
        *self.secret.public_key().as_affine()
    }

    /// 33-byte SEC1 compressed public key.
    pub fn public_key_compressed(&self) -> Vec<u8> {
        self.public_point().to_encoded_point(true).as_bytes().to_vec()
    }

    /// 65-byte SEC1 uncompressed public key.
    pub fn public_key_uncompressed(&self) -> Vec<u8> {
        self.public_point().to_encoded_point(false).as_bytes().to_vec()
    }
}

impl FromStr for PrivateKey {
    type Err = ClientError;

    /// Hex if it is 64 hex chars, WIF otherwise.
    fn from_str(s: &str) -> ClientResult<Self> {
        let s = s.trim();
        if s.len() == 64 && s.chars().all(|c| c.is_ascii_hexdigit()) {
            Self::from_hex(s)
        } else {
            Self::from_wif(s)
        }
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// At most one key per role.
#[derive(Debug, Clone, Default)]
pub struct KeyRing {
    keys: BTreeMap<AuthorityRole, PrivateKey>,
}

impl KeyRing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_key(mut self, role: AuthorityRole, key: PrivateKey) -> Self {
        self.insert(role, key);
        self
    }

    /// Replaces any existing key for `role`.
    pub fn insert(&mut self, role: AuthorityRole, key: PrivateKey) -> Option<PrivateKey> {
        self.keys.insert(role, key)
    }

    pub fn get(&self, role: AuthorityRole) -> Option<&PrivateKey> {
        self.keys.get(&role)
    }

    pub fn contains(&self, role: AuthorityRole) -> bool {
        self.keys.contains_key(&role)
    }

    pub fn roles(&self) -> impl Iterator<Item = AuthorityRole> + '_ {
        self.keys.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Read `HIVE_{OWNER,ACTIVE,POSTING,MEMO}_KEY`. Unset variables are
    /// skipped; a set but invalid one is an error.
    pub fn from_env() -> ClientResult<Self> {
        let mut ring = Self::new();
        for role in AuthorityRole::ALL {
            let var = key_env_var(role);
            if let Ok(value) = std::env::var(var) {
                let key = value.parse::<PrivateKey>().map_err(|e| {
                    ClientError::Configuration(format!("{}: {}", var, e))
                })?;
                ring.insert(role, key);
            }
        }

        tracing::info!(
            roles = ?ring.roles().map(|r| r.as_str()).collect::<Vec<_>>(),
            "Key ring loaded"
        );
        Ok(ring)
    }
}
