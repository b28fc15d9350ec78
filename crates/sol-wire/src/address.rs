//! Base58 address encoding.
//!
//! On-chain addresses are Base58-encoded 32-byte values (Ed25519 public keys
//! or program-derived addresses). There is no hashing or checksum step; the
//! raw 32 bytes ARE the address bytes.

use crate::error::WireError;

/// Decode a Base58 address string into its 32-byte form.
///
/// Fails if the string is not valid Base58 or does not decode to exactly
/// 32 bytes.
pub fn address_to_bytes(address: &str) -> Result<[u8; 32], WireError> {
    let bytes = bs58::decode(address)
        .into_vec()
        .map_err(|e| WireError::InvalidAddress(format!("base58 decode failed: {e}")))?;

    bytes.try_into().map_err(|v: Vec<u8>| {
        WireError::InvalidAddress(format!("expected 32 bytes, got {}", v.len()))
    })
}

/// Encode 32 bytes as a Base58 address string.
pub fn bytes_to_address(bytes: &[u8; 32]) -> String {
    bs58::encode(bytes).into_string()
}
