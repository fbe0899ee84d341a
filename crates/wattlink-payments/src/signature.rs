//! Checkout signature: hex HMAC-SHA256 of `"{order_id}|{payment_id}"` keyed by the key secret.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn keyed(secret: &str, order_id: &str, payment_id: &str) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    Some(mac)
}

/// Lowercase hex signature the provider would send for this order/payment pair.
pub fn compute_signature(secret: &str, order_id: &str, payment_id: &str) -> String {
    keyed(secret, order_id, payment_id)
        .map(|mac| hex::encode(mac.finalize().into_bytes()))
        .unwrap_or_default()
}

/// Constant-time check of a provider signature. Malformed hex never verifies.
pub fn verify_signature(secret: &str, order_id: &str, payment_id: &str, signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    keyed(secret, order_id, payment_id).is_some_and(|mac| mac.verify_slice(&expected).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_hex_sha256() {
        let sig = compute_signature("secret", "order_1", "pay_1");
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn verify_accepts_valid_signature() {
        let sig = compute_signature("s3cret", "order_ABC", "pay_XYZ");
        assert!(verify_signature("s3cret", "order_ABC", "pay_XYZ", &sig));
    }

    #[test]
    fn verify_accepts_uppercase_hex() {
        let sig = compute_signature("s3cret", "order_ABC", "pay_XYZ").to_uppercase();
        assert!(verify_signature("s3cret", "order_ABC", "pay_XYZ", &sig));
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let sig = compute_signature("other", "order_ABC", "pay_XYZ");
        assert!(!verify_signature("s3cret", "order_ABC", "pay_XYZ", &sig));
    }

    #[test]
    fn verify_rejects_swapped_ids() {
        let sig = compute_signature("s3cret", "pay_XYZ", "order_ABC");
        assert!(!verify_signature("s3cret", "order_ABC", "pay_XYZ", &sig));
    }

    #[test]
    fn verify_rejects_garbage() {
        assert!(!verify_signature("s3cret", "o", "p", "not-hex"));
        assert!(!verify_signature("s3cret", "o", "p", ""));
        assert!(!verify_signature("s3cret", "o", "p", "abcd"));
    }
}
