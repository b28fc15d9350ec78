//! Program Derived Address (PDA) derivation.
//!
//! On-chain program state lives at addresses derived from seeds plus the
//! owning program's id. A PDA has no private key, so the derived point must
//! NOT lie on the Ed25519 curve; the derivation searches bump seeds from 255
//! down to 0 until it lands off-curve.

use sha2::{Digest, Sha256};

use crate::error::WireError;

/// The marker string appended during PDA derivation.
const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// Find the canonical PDA for the given seeds and program.
///
/// Computes `SHA-256(seed_0 || seed_1 || ... || bump || program_id ||
/// "ProgramDerivedAddress")` for bump seeds 255 down to 0 and returns the
/// first result that is NOT a valid Ed25519 point, together with the bump
/// that produced it.
pub fn find_program_address(
    seeds: &[&[u8]],
    program_id: &[u8; 32],
) -> Result<([u8; 32], u8), WireError> {
    for bump in (0u8..=255).rev() {
        if let Some(address) = try_create_program_address(seeds, &[bump], program_id) {
            return Ok((address, bump));
        }
    }

    Err(WireError::InvalidAddress(
        "could not find valid PDA bump seed".into(),
    ))
}

/// Attempt to create a PDA from seeds + bump + program_id.
///
/// Returns `Some(address)` if the derived point is OFF the Ed25519 curve,
/// `None` if it falls on the curve (invalid PDA, try next bump).
fn try_create_program_address(
    seeds: &[&[u8]],
    bump_seed: &[u8],
    program_id: &[u8; 32],
) -> Option<[u8; 32]> {
    let mut hasher = Sha256::new();

    for seed in seeds {
        hasher.update(seed);
    }
    hasher.update(bump_seed);
    hasher.update(program_id);
    hasher.update(PDA_MARKER);

    let hash: [u8; 32] = hasher.finalize().into();

    // A valid PDA must NOT be on the Ed25519 curve.
    if is_on_curve(&hash) {
        return None;
    }

    Some(hash)
}

/// Check if 32 bytes represent a valid Ed25519 curve point.
///
/// Uses `curve25519-dalek` to attempt decompression. If it succeeds, the
/// point is on the curve.
fn is_on_curve(bytes: &[u8; 32]) -> bool {
    curve25519_dalek::edwards::CompressedEdwardsY(*bytes)
        .decompress()
        .is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_pda_is_off_curve() {
        let program = [0xABu8; 32];
        let (pda, _bump) = find_program_address(&[b"counter"], &program).unwrap();
        assert!(!is_on_curve(&pda), "PDA must NOT be on the Ed25519 curve");
    }

    #[test]
    fn derivation_is_deterministic() {
        let program = [0x11u8; 32];
        let id: u64 = 7;
        let seeds: &[&[u8]] = &[b"poll", &id.to_le_bytes()];

        let (a, bump_a) = find_program_address(seeds, &program).unwrap();
        let (b, bump_b) = find_program_address(seeds, &program).unwrap();
        assert_eq!(a, b);
        assert_eq!(bump_a, bump_b);
    }

    #[test]
    fn different_seeds_give_different_addresses() {
        let program = [0x11u8; 32];
        let id_a: u64 = 0;
        let id_b: u64 = 1;

        let (a, _) = find_program_address(&[b"poll", &id_a.to_le_bytes()], &program).unwrap();
        let (b, _) = find_program_address(&[b"poll", &id_b.to_le_bytes()], &program).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn different_programs_give_different_addresses() {
        let (a, _) = find_program_address(&[b"counter"], &[0x11u8; 32]).unwrap();
        let (b, _) = find_program_address(&[b"counter"], &[0x22u8; 32]).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn is_on_curve_accepts_basepoint() {
        // The Ed25519 basepoint (compressed form).
        let basepoint: [u8; 32] = [
            0x58, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66,
            0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66,
            0x66, 0x66, 0x66, 0x66,
        ];
        assert!(is_on_curve(&basepoint));
    }

    #[test]
    fn is_on_curve_rejects_non_point_bytes() {
        // y = 0x0202...02 has no matching x on the curve.
        let not_a_point: [u8; 32] = [0x02; 32];
        assert!(!is_on_curve(&not_a_point));
    }
}
