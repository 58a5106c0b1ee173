//! Hex text form of node payloads.
//!
//! Payloads travel through the ledger's JSON interface as hex strings
//! (`"DEAD"` for the sentinel). These helpers convert between that form and
//! raw bytes; the store itself only ever sees bytes.

use crate::error::TypeError;

/// Encode a payload as lowercase hex.
pub fn encode_hex(data: &[u8]) -> String {
    hex::encode(data)
}

/// Decode a hex payload.
///
/// Accepts either case, an optional `0x` prefix, and surrounding or
/// embedded ASCII whitespace (as produced by `xxd -p`).
pub fn decode_hex(text: &str) -> Result<Vec<u8>, TypeError> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let compact: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    hex::decode(&compact).map_err(|e| TypeError::InvalidHex(e.to_string()))
}
