//! URL signing with HMAC-SHA256
//!
//! The remote image proxy accepts a request only when the first path
//! segment is a valid signature over the rest of the path:
//!
//! ```text
//! signature = base64url(HMAC-SHA256(key, salt + path))
//! ```
//!
//! Key and salt are shared with the proxy as hex strings and decoded to
//! raw bytes before use.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Decode a hex-encoded secret into raw bytes
///
/// Invalid hex decodes to an empty byte string rather than an error;
/// signing with empty material yields an empty signature, so a bad
/// secret degrades to an unverifiable URL instead of a panic.
pub fn decode_hex_secret(hex_str: &str) -> Vec<u8> {
    hex::decode(hex_str.trim()).unwrap_or_default()
}

/// Sign an unsigned proxy path
///
/// Returns the URL-safe, unpadded base64 encoding of the 32-byte HMAC
/// digest, or the empty string when key or salt bytes are empty.
pub fn sign_path(key: &[u8], salt: &[u8], path: &str) -> String {
    if key.is_empty() || salt.is_empty() {
        return String::new();
    }

    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(salt);
    mac.update(path.as_bytes());

    URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
}

/// Verify a signature produced by [`sign_path`]
///
/// Verification is the proxy's job, not this crate's, but the helper
/// makes round-trip testing possible without reimplementing the scheme.
pub fn verify_path(key: &[u8], salt: &[u8], path: &str, signature: &str) -> bool {
    let expected = sign_path(key, salt, path);
    if expected.is_empty() {
        return false;
    }

    // Use constant-time comparison to prevent timing attacks
    constant_time_compare(signature, &expected)
}

/// Constant-time string comparison to prevent timing attacks
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_hex_secret() {
        assert_eq!(decode_hex_secret("abcd"), vec![0xab, 0xcd]);
        assert_eq!(decode_hex_secret(" ef01 "), vec![0xef, 0x01]);
    }

    #[test]
    fn test_decode_invalid_hex_is_empty() {
        assert!(decode_hex_secret("not-hex").is_empty());
        assert!(decode_hex_secret("abc").is_empty()); // odd length
        assert!(decode_hex_secret("").is_empty());
    }

    #[test]
    fn test_sign_path_is_deterministic() {
        let key = decode_hex_secret("abcd");
        let salt = decode_hex_secret("ef01");
        let first = sign_path(&key, &salt, "/rt:fit/w:640/h:0/q:65/f:avif/plain/a.jpg");
        let second = sign_path(&key, &salt, "/rt:fit/w:640/h:0/q:65/f:avif/plain/a.jpg");
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn test_sign_path_empty_material_yields_empty_signature() {
        assert_eq!(sign_path(&[], &[0xef], "/path"), "");
        assert_eq!(sign_path(&[0xab], &[], "/path"), "");
    }

    #[test]
    fn test_signature_is_url_safe_without_padding() {
        let key = decode_hex_secret("deadbeef");
        let salt = decode_hex_secret("cafe");
        let sig = sign_path(&key, &salt, "/rt:fit/w:100/h:0/q:65/f:avif/plain/x");
        assert!(!sig.contains('+'));
        assert!(!sig.contains('/'));
        assert!(!sig.contains('='));
        // 32-byte digest -> 43 base64 chars without padding
        assert_eq!(sig.len(), 43);
    }

    #[test]
    fn test_verify_path_round_trip() {
        let key = decode_hex_secret("abcd");
        let salt = decode_hex_secret("ef01");
        let sig = sign_path(&key, &salt, "/some/path");
        assert!(verify_path(&key, &salt, "/some/path", &sig));
        assert!(!verify_path(&key, &salt, "/other/path", &sig));
        assert!(!verify_path(&key, &salt, "/some/path", "forged"));
    }

    #[test]
    fn test_verify_path_rejects_empty_material() {
        assert!(!verify_path(&[], &[], "/some/path", ""));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("hello", "hello"));
        assert!(!constant_time_compare("hello", "world"));
        assert!(!constant_time_compare("hello", "hell"));
    }
}
