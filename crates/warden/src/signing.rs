//! HMAC-SHA256 integrity tags and secret strength checks.
//!
//! Tags are full-length (256-bit, 64 hex chars). Comparisons never exit early:
//! every position is visited and the length difference is folded into the
//! result, so timing does not reveal how much of a forged tag was correct.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use stillwater_common::StillwaterError;
use stillwater_common::constants::MIN_SECRET_LEN;

type HmacSha256 = Hmac<Sha256>;

/// Longest substring period checked for repetition
const MAX_REPEAT_PERIOD: usize = 16;

/// Minimum number of distinct characters in a secret
const MIN_DISTINCT_CHARS: usize = 10;

/// Keyed tag generator
#[derive(Clone)]
pub struct Signer {
    mac: HmacSha256,
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Signer { .. }")
    }
}

impl Signer {
    /// Build a signer after checking the secret is long and non-repetitive
    pub fn new(name: &str, secret: &str) -> Result<Self, StillwaterError> {
        validate_secret(secret)
            .map_err(|reason| StillwaterError::Config(format!("{name}: {reason}")))?;
        Self::with_key(secret.as_bytes())
    }

    fn with_key(key: &[u8]) -> Result<Self, StillwaterError> {
        let mac = HmacSha256::new_from_slice(key)
            .map_err(|e| StillwaterError::Config(format!("invalid HMAC key: {e}")))?;
        Ok(Self { mac })
    }

    /// Hex-encoded HMAC-SHA256 of `payload`
    pub fn sign(&self, payload: &[u8]) -> String {
        let mut mac = self.mac.clone();
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    /// Recompute the tag for `payload` and compare it with `tag` in constant time
    pub fn verify(&self, payload: &[u8], tag: &str) -> bool {
        let expected = self.sign(payload);
        constant_time_eq(expected.as_bytes(), tag.as_bytes())
    }
}

/// Compare two byte strings without early exit.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let len = a.len().max(b.len());
    let mut diff = a.len() ^ b.len();
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        diff |= usize::from(x ^ y);
    }
    diff == 0
}

/// Reject secrets that are short, dominated by a repeated unit, or low in variety
pub fn validate_secret(secret: &str) -> Result<(), String> {
    let chars: Vec<char> = secret.chars().collect();

    if chars.len() < MIN_SECRET_LEN {
        return Err(format!(
            "secret must be at least {MIN_SECRET_LEN} characters (got {})",
            chars.len()
        ));
    }

    let half = chars.len() / 2;
    if longest_repeat(&chars, 1) > half {
        return Err("a single repeated character covers more than half of the secret".to_string());
    }
    for period in 2..=MAX_REPEAT_PERIOD {
        if longest_repeat(&chars, period) > half {
            return Err(format!(
                "a repeated {period}-character substring covers more than half of the secret"
            ));
        }
    }

    let mut distinct = chars.clone();
    distinct.sort_unstable();
    distinct.dedup();
    if distinct.len() < MIN_DISTINCT_CHARS {
        return Err(format!(
            "secret uses only {} distinct characters",
            distinct.len()
        ));
    }

    Ok(())
}

/// Length of the longest stretch that repeats with the given period, counting the first unit
fn longest_repeat(chars: &[char], period: usize) -> usize {
    if chars.len() <= period {
        return 0;
    }

    let mut longest = 0;
    let mut current = 0;
    for i in period..chars.len() {
        if chars[i] == chars[i - period] {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }

    if longest == 0 { 0 } else { longest + period }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const TEST_SECRET: &str =
        "q3Vx9LmZ2rT8wYp4KcN7bHs1JdF6gQa0uEo5iRt2yWx8zVb3nMk7jLh4gFd9sAp1";

    #[test]
    fn test_rfc4231_vector() {
        let signer = Signer::with_key(b"Jefe").unwrap();
        assert_eq!(
            signer.sign(b"what do ya want for nothing?"),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_tags_are_full_length_and_verify() {
        let signer = Signer::new("TEST", TEST_SECRET).unwrap();
        let tag = signer.sign(b"payload");
        assert_eq!(tag.len(), 64);
        assert!(signer.verify(b"payload", &tag));
        assert!(!signer.verify(b"payload2", &tag));
        assert!(!signer.verify(b"payload", &tag[..63]));
    }

    #[test]
    fn test_constant_time_eq_folds_length() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abc\0"));
        assert!(!constant_time_eq(b"", b"a"));
        assert!(constant_time_eq(b"", b""));
    }

    #[test]
    fn test_secret_validation() {
        assert!(validate_secret(TEST_SECRET).is_ok());
        assert!(validate_secret("short").is_err());
        assert!(validate_secret(&"ab".repeat(40)).is_err());
        assert!(validate_secret(&"change-me-".repeat(8)).is_err());
        assert!(validate_secret(&"a".repeat(70)).is_err());

        let err = Signer::new("SHARE_SECRET", "too-short").unwrap_err();
        assert!(matches!(err, StillwaterError::Config(_)));
    }

    #[test]
    fn test_secret_with_dominant_character_run() {
        let secret = "a".repeat(40) + "bcdefghijklmnopqrstuvwxyz";
        let err = validate_secret(&secret).unwrap_err();
        assert!(err.contains("single repeated character"));

        // A shorter run is fine
        let secret = "a".repeat(8) + TEST_SECRET;
        assert!(validate_secret(&secret).is_ok());
    }

    #[test]
    fn test_secret_with_repeated_prefix() {
        let secret = "abcd".repeat(12) + "Q7x!mZ2pL9#kR4vW";
        let err = validate_secret(&secret).unwrap_err();
        assert!(err.contains("4-character substring"));

        let secret = "change-me-".repeat(5) + "Q7x!mZ2pL9#kR4vW";
        assert!(validate_secret(&secret).is_err());
    }

    #[test]
    fn test_longest_repeat() {
        let chars: Vec<char> = "xyzabcabcabq".chars().collect();
        assert_eq!(longest_repeat(&chars, 3), 8);
        assert_eq!(longest_repeat(&chars, 1), 0);
        assert_eq!(longest_repeat(&['a'], 1), 0);
    }
}
