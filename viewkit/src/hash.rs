//! Hashing utilities.

use sha2::{Digest, Sha256};
use subtle_encoding::hex;

/// Compute the SHA256 hash of the given bytes and return its lowercase
/// hexadecimal representation.
pub fn sha256<B: AsRef<[u8]>>(b: B) -> String {
    let digest = Sha256::digest(b.as_ref());
    // Hex output is always valid ASCII.
    String::from_utf8_lossy(&hex::encode(digest)).into_owned()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sha256_of_empty_input() {
        assert_eq!(
            sha256(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
