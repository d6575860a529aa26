//! Query fingerprint for analytics. Only the hash leaves this module.

use std::hash::Hasher;

use twox_hash::XxHash64;

const PATTERN_SEED: u64 = 0x6361_7265_6c69_6e6b;

/// Order-independent fingerprint of a token set: tokens are sorted and
/// deduplicated, then hashed with XxHash64. Rendered as 16 hex digits.
pub fn detect_query_pattern<S: AsRef<str>>(tokens: &[S]) -> String {
    let mut sorted: Vec<&str> = tokens.iter().map(AsRef::as_ref).collect();
    sorted.sort_unstable();
    sorted.dedup();

    let mut hasher = XxHash64::with_seed(PATTERN_SEED);
    for token in sorted {
        hasher.write(token.as_bytes());
        // Separator keeps ["ab", "c"] distinct from ["a", "bc"].
        hasher.write_u8(0xff);
    }
    format!("{:016x}", hasher.finish())
}
