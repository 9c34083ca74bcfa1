//! Salted password digests.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};
use strum::{AsRefStr, Display, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DigestAlgorithm {
    Sha256,
    Sha512,
    Blake3,
}

/// Hex digest of `prepend_salt + plain + append_salt`.
pub fn digest(
    plain: &str,
    algorithm: DigestAlgorithm,
    prepend_salt: Option<&str>,
    append_salt: Option<&str>,
) -> String {
    let mut input = String::with_capacity(
        plain.len() + prepend_salt.map_or(0, str::len) + append_salt.map_or(0, str::len),
    );
    input.push_str(prepend_salt.unwrap_or_default());
    input.push_str(plain);
    input.push_str(append_salt.unwrap_or_default());

    match algorithm {
        DigestAlgorithm::Sha256 => hex::encode(Sha256::digest(input.as_bytes())),
        DigestAlgorithm::Sha512 => hex::encode(Sha512::digest(input.as_bytes())),
        DigestAlgorithm::Blake3 => blake3::hash(input.as_bytes()).to_hex().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_known_value() {
        assert_eq!(
            digest("password", DigestAlgorithm::Sha256, None, None),
            "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8"
        );
    }

    #[test]
    fn salts_wrap_the_plain_text() {
        let salted = digest("word", DigestAlgorithm::Sha512, Some("pass"), None);
        assert_eq!(salted, digest("password", DigestAlgorithm::Sha512, None, None));

        let both = digest("ss", DigestAlgorithm::Blake3, Some("pa"), Some("word"));
        assert_eq!(both, digest("password", DigestAlgorithm::Blake3, None, None));
    }

    #[test]
    fn output_is_lowercase_hex_of_expected_width() {
        for (algo, width) in [
            (DigestAlgorithm::Sha256, 64),
            (DigestAlgorithm::Sha512, 128),
            (DigestAlgorithm::Blake3, 64),
        ] {
            let out = digest("hunter2", algo, None, None);
            assert_eq!(out.len(), width);
            assert!(out.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        }
    }
}
