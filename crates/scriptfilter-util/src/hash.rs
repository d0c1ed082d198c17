/// Length of the abbreviated digests returned by [`short_hash`].
pub const SHORT_HASH_LEN: usize = 12;

/// Compute the BLAKE3 hash of a byte slice, returning the hex-encoded digest.
#[must_use]
pub fn blake3_bytes(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

/// Abbreviated BLAKE3 digest, handy as a correlation id in log lines.
#[must_use]
pub fn short_hash(data: &[u8]) -> String {
    let mut hex = blake3_bytes(data);
    hex.truncate(SHORT_HASH_LEN);
    hex
}
