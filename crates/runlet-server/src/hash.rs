//! Content identity for uploaded source text.

use sha2::{Digest, Sha256};

/// Computes the stable identity of a source text: lowercase hex SHA-256.
///
/// The id doubles as the public reference returned to the client on upload,
/// which is what makes re-uploading identical source an idempotent cache
/// hit.
pub fn script_id(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_source_same_id() {
        assert_eq!(script_id("function f() {}"), script_id("function f() {}"));
    }

    #[test]
    fn different_source_different_id() {
        assert_ne!(script_id("function f() {}"), script_id("function g() {}"));
    }

    #[test]
    fn id_is_hex_sha256() {
        let id = script_id("");
        assert_eq!(id.len(), 64);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        // SHA-256 of the empty string
        assert_eq!(
            id,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
