//! Temporary credentials for accounts created through approval.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

/// Generate a random URL-safe password from `bytes` bytes of entropy.
pub fn generate_temporary_password(bytes: usize) -> String {
    let mut rng = rand::rng();
    let raw: Vec<u8> = (0..bytes.max(12))
        .map(|_| rand::Rng::random::<u8>(&mut rng))
        .collect();
    URL_SAFE_NO_PAD.encode(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passwords_are_unique_and_url_safe() {
        let a = generate_temporary_password(18);
        let b = generate_temporary_password(18);
        assert_ne!(a, b);
        assert_eq!(a.len(), 24);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn short_requests_are_padded_to_minimum_entropy() {
        assert_eq!(generate_temporary_password(0).len(), 16);
    }
}
