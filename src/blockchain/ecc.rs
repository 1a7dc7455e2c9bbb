//! secp256k1 primitives for compact recoverable signatures.
//!
//! Pure functions over k256 field/scalar/point types. No global context,
//! curve parameters are explicit constants.

use hmac::{Hmac, Mac};
use k256::elliptic_curve::ff::PrimeField;
use k256::elliptic_curve::ops::Reduce;
use k256::elliptic_curve::point::{AffineCoordinates, DecompressPoint};
use k256::elliptic_curve::scalar::IsHigh;
use k256::elliptic_curve::subtle::Choice;
use k256::{AffinePoint, FieldBytes, ProjectivePoint, Scalar, U256};
use sha2::Sha256;

use crate::error::{ClientError, ClientResult};

type HmacSha256 = Hmac<Sha256>;

/// Group order `n`, big-endian.
pub const CURVE_ORDER: [u8; 32] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe,
    0xba, 0xae, 0xdc, 0xe6, 0xaf, 0x48, 0xa0, 0x3b, 0xbf, 0xd2, 0x5e, 0x8c, 0xd0, 0x36, 0x41, 0x41,
];

/// Field prime `p`, big-endian.
pub const FIELD_PRIME: [u8; 32] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe, 0xff, 0xff, 0xfc, 0x2f,
];

/// `(r, s)` as fixed-width big-endian integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSignature {
    pub r: [u8; 32],
    pub s: [u8; 32],
}

/// Scalar from big-endian bytes; `None` when the value is not below `n`.
pub fn scalar_from_bytes(bytes: &[u8; 32]) -> Option<Scalar> {
    Option::from(Scalar::from_repr(FieldBytes::from(*bytes)))
}

/// Message digest as a scalar, reduced mod `n`.
pub fn digest_scalar(digest: &[u8; 32]) -> Scalar {
    <Scalar as Reduce<U256>>::reduce_bytes(&FieldBytes::from(*digest))
}

/// 256-bit big-endian addition. `None` on overflow.
fn add_be(a: &[u8; 32], b: &[u8; 32]) -> Option<[u8; 32]> {
    let mut out = [0u8; 32];
    let mut carry = 0u16;
    for i in (0..32).rev() {
        let sum = a[i] as u16 + b[i] as u16 + carry;
        out[i] = sum as u8;
        carry = sum >> 8;
    }
    if carry == 0 {
        Some(out)
    } else {
        None
    }
}

fn hmac(key: &[u8], parts: &[&[u8]]) -> ClientResult<[u8; 32]> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| ClientError::Crypto(format!("HMAC key: {}", e)))?;
    for part in parts {
        mac.update(part);
    }
    Ok(mac.finalize().into_bytes().into())
}

/// RFC 6979 nonce (HMAC-SHA256) with additional data `extra` (section 3.6).
///
/// Changing `extra` yields an independent nonce for the same key and digest.
pub fn rfc6979_nonce(secret: &[u8; 32], digest: &[u8; 32], extra: &[u8; 32]) -> ClientResult<[u8; 32]> {
    let h: [u8; 32] = digest_scalar(digest).to_bytes().into();

    let mut v = [0x01u8; 32];
    let mut k = [0x00u8; 32];

    k = hmac(&k, &[&v, &[0x00], secret, &h, extra])?;
    v = hmac(&k, &[&v])?;
    k = hmac(&k, &[&v, &[0x01], secret, &h, extra])?;
    v = hmac(&k, &[&v])?;

    loop {
        v = hmac(&k, &[&v])?;
        if let Some(candidate) = scalar_from_bytes(&v) {
            if !bool::from(candidate.is_zero()) {
                return Ok(v);
            }
        }
        k = hmac(&k, &[&v, &[0x00]])?;
        v = hmac(&k, &[&v])?;
    }
}

/// Sign `digest` with secret `d` and nonce `k`. `s` is normalized to the low half.
///
/// `None` when `k` is unusable or `r`/`s` comes out zero; the caller picks a
/// new nonce.
pub fn sign_with_nonce(d: &Scalar, digest: &[u8; 32], k_bytes: &[u8; 32]) -> Option<RawSignature> {
    let k = scalar_from_bytes(k_bytes)?;
    if bool::from(k.is_zero()) {
        return None;
    }

    let big_r = (ProjectivePoint::GENERATOR * k).to_affine();
    let r = <Scalar as Reduce<U256>>::reduce_bytes(&big_r.x());
    if bool::from(r.is_zero()) {
        return None;
    }

    let e = digest_scalar(digest);
    let k_inv: Scalar = Option::from(k.invert())?;
    let mut s = k_inv * (e + r * d);
    if bool::from(s.is_zero()) {
        return None;
    }
    if bool::from(s.is_high()) {
        s = -s;
    }

    Some(RawSignature {
        r: r.to_bytes().into(),
        s: s.to_bytes().into(),
    })
}

/// Both components encode as exactly 32 bytes in DER: no sign-padding byte
/// needed and no leading zero byte to strip.
pub fn is_canonical(sig: &RawSignature) -> bool {
    fn component_ok(c: &[u8; 32]) -> bool {
        c[0] & 0x80 == 0 && !(c[0] == 0 && c[1] & 0x80 == 0)
    }
    component_ok(&sig.r) && component_ok(&sig.s)
}

/// Public key candidate `Q = r⁻¹(sR − eG)` for recovery id `recovery_id` (0..=3).
pub fn recover_point(digest: &[u8; 32], sig: &RawSignature, recovery_id: u8) -> Option<AffinePoint> {
    if recovery_id > 3 {
        return None;
    }
    let r = scalar_from_bytes(&sig.r)?;
    let s = scalar_from_bytes(&sig.s)?;
    if bool::from(r.is_zero()) || bool::from(s.is_zero()) {
        return None;
    }

    // x = r + (i / 2) * n, which must still be a field element.
    let x = if recovery_id >= 2 {
        add_be(&sig.r, &CURVE_ORDER)?
    } else {
        sig.r
    };
    if x >= FIELD_PRIME {
        return None;
    }

    let y_is_odd = Choice::from(recovery_id & 1);
    let big_r: AffinePoint = Option::from(AffinePoint::decompress(&FieldBytes::from(x), y_is_odd))?;

    let e = digest_scalar(digest);
    let r_inv: Scalar = Option::from(r.invert())?;
    let q = (ProjectivePoint::from(big_r) * s - ProjectivePoint::GENERATOR * e) * r_inv;
    if q == ProjectivePoint::IDENTITY {
        return None;
    }
    Some(q.to_affine())
}

/// Plain ECDSA verification. Accepts either half of `s`.
pub fn verify(digest: &[u8; 32], sig: &RawSignature, public: &AffinePoint) -> bool {
    let (r, s) = match (scalar_from_bytes(&sig.r), scalar_from_bytes(&sig.s)) {
        (Some(r), Some(s)) => (r, s),
        _ => return false,
    };
    if bool::from(r.is_zero()) || bool::from(s.is_zero()) {
        return false;
    }
    let s_inv: Scalar = match Option::from(s.invert()) {
        Some(inv) => inv,
        None => return false,
    };

    let e = digest_scalar(digest);
    let u1 = e * s_inv;
    let u2 = r * s_inv;
    let point = ProjectivePoint::GENERATOR * u1 + ProjectivePoint::from(*public) * u2;
    if point == ProjectivePoint::IDENTITY {
        return false;
    }
    let x = <Scalar as Reduce<U256>>::reduce_bytes(&point.to_affine().x());
    x == r
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::Digest;

    fn secret() -> Scalar {
        let bytes: [u8; 32] = Sha256::digest(b"ecc test key").into();
        scalar_from_bytes(&bytes).unwrap()
    }

    fn digest(msg: &[u8]) -> [u8; 32] {
        Sha256::digest(msg).into()
    }

    #[test]
    fn test_constants_match_curve() {
        // n - 1 is a valid scalar, n is not.
        let mut n_minus_one = CURVE_ORDER;
        n_minus_one[31] -= 1;
        assert!(scalar_from_bytes(&n_minus_one).is_some());
        assert!(scalar_from_bytes(&CURVE_ORDER).is_none());
        assert!(FIELD_PRIME > CURVE_ORDER);
    }

    #[test]
    fn test_add_be_overflow() {
        let mut one = [0u8; 32];
        one[31] = 1;
        assert_eq!(add_be(&[0xff; 32], &one), None);
        let mut two = [0u8; 32];
        two[31] = 2;
        assert_eq!(add_be(&one, &one), Some(two));
    }

    #[test]
    fn test_nonce_is_deterministic_and_extra_sensitive() {
        let d: [u8; 32] = secret().to_bytes().into();
        let h = digest(b"message");
        let a = rfc6979_nonce(&d, &h, &[0u8; 32]).unwrap();
        let b = rfc6979_nonce(&d, &h, &[0u8; 32]).unwrap();
        let c = rfc6979_nonce(&d, &h, &[1u8; 32]).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_sign_verify_and_recover() {
        let d = secret();
        let public = (ProjectivePoint::GENERATOR * d).to_affine();
        let h = digest(b"payload");
        let d_bytes: [u8; 32] = d.to_bytes().into();
        let k = rfc6979_nonce(&d_bytes, &h, &[0u8; 32]).unwrap();
        let sig = sign_with_nonce(&d, &h, &k).unwrap();

        assert!(verify(&h, &sig, &public));
        assert!(!verify(&digest(b"other"), &sig, &public));

        let matches: Vec<u8> = (0..4)
            .filter(|&i| recover_point(&h, &sig, i).map(|q| q == public).unwrap_or(false))
            .collect();
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn test_low_s() {
        let d = secret();
        let h = digest(b"low s");
        let d_bytes: [u8; 32] = d.to_bytes().into();
        for n in 0u8..8 {
            let k = rfc6979_nonce(&d_bytes, &h, &[n; 32]).unwrap();
            let sig = sign_with_nonce(&d, &h, &k).unwrap();
            let s = scalar_from_bytes(&sig.s).unwrap();
            assert!(!bool::from(s.is_high()));
        }
    }

    #[test]
    fn test_canonical_rule() {
        let mut sig = RawSignature { r: [0x11; 32], s: [0x22; 32] };
        assert!(is_canonical(&sig));
        sig.r[0] = 0x80;
        assert!(!is_canonical(&sig));
        sig.r[0] = 0x00;
        sig.r[1] = 0x7f;
        assert!(!is_canonical(&sig));
        sig.r[1] = 0x80;
        assert!(is_canonical(&sig));
    }

    #[test]
    fn test_recover_rejects_bad_input() {
        let sig = RawSignature { r: [0u8; 32], s: [1u8; 32] };
        assert!(recover_point(&[0u8; 32], &sig, 0).is_none());
        let sig = RawSignature { r: [1u8; 32], s: [1u8; 32] };
        assert!(recover_point(&[0u8; 32], &sig, 4).is_none());
    }
}
