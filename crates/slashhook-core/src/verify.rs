//! Webhook signature verification.
//!
//! Every interaction request is signed by the platform with Ed25519 over
//! `timestamp || body`. Requests that fail verification must be rejected
//! with 401 before anything else looks at the body.

use ed25519_dalek::{Signature, Verifier, VerifyingKey, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};

/// Header carrying the hex-encoded signature.
pub const SIGNATURE_HEADER: &str = "x-signature-ed25519";
/// Header carrying the decimal Unix timestamp that was signed with the body.
pub const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

/// Verify an interaction signature.
///
/// Returns `false` for any malformed envelope field: empty signature or
/// timestamp, non-hex or wrong-length signature or key, or a key that is not
/// a valid curve point. Never panics.
pub fn verify(raw_body: &[u8], signature_hex: &str, timestamp: &str, public_key_hex: &str) -> bool {
    if signature_hex.is_empty() || timestamp.is_empty() {
        return false;
    }

    let Some(signature) = decode_fixed::<SIGNATURE_LENGTH>(signature_hex) else {
        tracing::debug!(target: "slashhook::verify", "Rejecting malformed signature");
        return false;
    };
    let Some(key_bytes) = decode_fixed::<PUBLIC_KEY_LENGTH>(public_key_hex) else {
        tracing::warn!(target: "slashhook::verify", "Configured public key is not {} hex-encoded bytes", PUBLIC_KEY_LENGTH);
        return false;
    };
    let Ok(key) = VerifyingKey::from_bytes(&key_bytes) else {
        tracing::warn!(target: "slashhook::verify", "Configured public key is not a valid Ed25519 point");
        return false;
    };

    let mut message = Vec::with_capacity(timestamp.len() + raw_body.len());
    message.extend_from_slice(timestamp.as_bytes());
    message.extend_from_slice(raw_body);

    key.verify(&message, &Signature::from_bytes(&signature)).is_ok()
}

fn decode_fixed<const N: usize>(hex_str: &str) -> Option<[u8; N]> {
    let bytes = hex::decode(hex_str).ok()?;
    bytes.try_into().ok()
}
