//! Tracker webhook signature verification using HMAC-SHA256.
//!
//! The tracker signs each delivery with HMAC-SHA256 over the raw request
//! body using a shared secret, and sends the digest hex-encoded in a
//! signature header.
//!
//! Verification fails closed: an empty secret (unconfigured deployment),
//! an empty or malformed signature, and a digest mismatch all yield
//! `false`. No input combination errors or panics.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Computes the HMAC-SHA256 signature of a payload using the given secret.
///
/// This is useful for testing purposes (generating expected signatures).
pub fn compute_signature(payload: &[u8], secret: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

/// Hex-encodes a signature the way the tracker sends it in the header.
pub fn encode_signature(signature: &[u8]) -> String {
    hex::encode(signature)
}

/// Verifies a webhook signature against the payload and secret.
///
/// Returns `true` only when `signature_hex` decodes to the exact
/// HMAC-SHA256 digest of `payload` under `secret`. Comparison is
/// constant-time via the HMAC library.
///
/// Fails closed: an empty secret or empty signature returns `false`
/// without computing anything.
///
/// # Examples
///
/// ```
/// use kickoff_bot::webhooks::{compute_signature, encode_signature, verify_signature};
///
/// let payload = b"{\"action\":\"update\"}";
/// let secret = b"shared-secret";
///
/// let header = encode_signature(&compute_signature(payload, secret));
/// assert!(verify_signature(payload, &header, secret));
///
/// // Fail closed on missing configuration or missing header
/// assert!(!verify_signature(payload, &header, b""));
/// assert!(!verify_signature(payload, "", secret));
/// ```
pub fn verify_signature(payload: &[u8], signature_hex: &str, secret: &[u8]) -> bool {
    // An unconfigured secret must never verify anything.
    if secret.is_empty() || signature_hex.is_empty() {
        return false;
    }

    let claimed = match hex::decode(signature_hex) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    let mut mac = match HmacSha256::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(payload);

    // Constant-time comparison via the HMAC library
    mac.verify_slice(&claimed).is_ok()
}
