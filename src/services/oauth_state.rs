// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Signed OAuth `state` parameter carrying the staff member id.
//!
//! Format before base64: `staff_id|timestamp_hex|signature_hex`, where the
//! signature is HMAC-SHA256 over `staff_id|timestamp_hex`.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::time_utils::now_epoch_millis;

type HmacSha256 = Hmac<Sha256>;

/// How long a consent round trip may take before the state is rejected.
const STATE_MAX_AGE_MILLIS: i64 = 15 * 60 * 1000;

#[derive(Clone)]
pub struct OAuthStateCodec {
    mac: HmacSha256,
}

impl OAuthStateCodec {
    pub fn new(secret: &[u8]) -> anyhow::Result<Self> {
        let mac = HmacSha256::new_from_slice(secret)
            .map_err(|e| anyhow::anyhow!("HMAC init failed: {}", e))?;
        Ok(Self { mac })
    }

    fn sign(&self, payload: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Encode and sign `staff_id` for the vendor to echo back.
    pub fn encode(&self, staff_id: &str) -> String {
        self.encode_at(staff_id, now_epoch_millis())
    }

    fn encode_at(&self, staff_id: &str, timestamp_millis: i64) -> String {
        let payload = format!("{}|{:x}", staff_id, timestamp_millis);
        let signed = format!("{}|{}", payload, self.sign(&payload));
        URL_SAFE_NO_PAD.encode(signed.as_bytes())
    }

    /// Verify the signature and age, returning the staff id.
    pub fn decode(&self, state: &str) -> Option<String> {
        let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
        let state_str = String::from_utf8(bytes).ok()?;

        // Split from the right: staff ids are opaque and may contain '|'.
        let mut parts = state_str.rsplitn(3, '|');
        let signature_hex = parts.next()?;
        let timestamp_hex = parts.next()?;
        let staff_id = parts.next()?;

        let payload = format!("{}|{}", staff_id, timestamp_hex);
        let expected = self.sign(&payload);
        if !bool::from(expected.as_bytes().ct_eq(signature_hex.as_bytes())) {
            tracing::error!("OAuth state signature mismatch! Potential tampering.");
            return None;
        }

        let issued_at = i64::from_str_radix(timestamp_hex, 16).ok()?;
        let age = now_epoch_millis() - issued_at;
        if !(0..=STATE_MAX_AGE_MILLIS).contains(&age) {
            tracing::warn!(age_millis = age, "OAuth state expired");
            return None;
        }

        if staff_id.is_empty() {
            return None;
        }
        Some(staff_id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> OAuthStateCodec {
        OAuthStateCodec::new(b"secret_key").unwrap()
    }

    #[test]
    fn roundtrip_staff_id() {
        let codec = codec();
        let state = codec.encode("staff-123");
        assert_eq!(codec.decode(&state), Some("staff-123".to_string()));
    }

    #[test]
    fn staff_id_with_separator() {
        let codec = codec();
        let state = codec.encode("tenant|staff");
        assert_eq!(codec.decode(&state), Some("tenant|staff".to_string()));
    }

    #[test]
    fn state_is_url_safe() {
        let state = codec().encode("staff+/=");
        assert!(!state.contains('+'));
        assert!(!state.contains('/'));
        assert!(!state.contains('='));
    }

    #[test]
    fn wrong_secret_rejected() {
        let state = codec().encode("staff-123");
        let other = OAuthStateCodec::new(b"wrong_key").unwrap();
        assert_eq!(other.decode(&state), None);
    }

    #[test]
    fn tampered_staff_id_rejected() {
        let codec = codec();
        let state = codec.encode("staff-123");
        let raw = String::from_utf8(URL_SAFE_NO_PAD.decode(&state).unwrap()).unwrap();
        let forged = URL_SAFE_NO_PAD.encode(raw.replacen("staff-123", "staff-999", 1));
        assert_eq!(codec.decode(&forged), None);
    }

    #[test]
    fn expired_state_rejected() {
        let codec = codec();
        let old = now_epoch_millis() - STATE_MAX_AGE_MILLIS - 1_000;
        let state = codec.encode_at("staff-123", old);
        assert_eq!(codec.decode(&state), None);
    }

    #[test]
    fn malformed_state_rejected() {
        let codec = codec();
        assert_eq!(codec.decode("not-valid-base64!!!"), None);
        assert_eq!(codec.decode(&URL_SAFE_NO_PAD.encode("invalid|format")), None);
    }
}
