use sha1::{Digest, Sha1};

/// Content hash of a raw input blob, compatible with git's blob hashing:
/// `sha1("blob " + decimal_length + "\0" + content)`, lower-hex.
///
/// The digest doubles as a durable external identifier for a file's exact
/// bytes, so the framing must not change.
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(b"blob ");
    hasher.update(bytes.len().to_string().as_bytes());
    hasher.update([0u8]);
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_blob_matches_git() {
        assert_eq!(
            fingerprint(b""),
            "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391"
        );
    }

    #[test]
    fn test_known_blob_matches_git() {
        assert_eq!(
            fingerprint(b"foobar\n"),
            "323fae03f4606ea9991df8befbb2fca795e648fa"
        );
    }

    #[test]
    fn test_deterministic() {
        let bytes = "El Título".as_bytes();
        assert_eq!(fingerprint(bytes), fingerprint(bytes));
    }

    #[test]
    fn test_single_byte_change_is_unrelated() {
        assert_ne!(fingerprint(b"foobar\n"), fingerprint(b"foobaz\n"));
    }
}
