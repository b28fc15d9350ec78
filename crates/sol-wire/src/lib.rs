//! Solana wire primitives for the poll client.
//!
//! This crate handles Base58 addresses, manual transaction wire format
//! serialization, account data decoding, and PDA derivation, all without
//! pulling in `solana-sdk` (which drags in tokio and 200+ transitive
//! dependencies).
//!
//! Instead we implement Solana's compact binary wire format by hand, using
//! `ed25519-dalek` for Ed25519 signing, `curve25519-dalek` for the PDA
//! off-curve check, and `bs58` for Base58 encoding.

pub mod address;
pub mod codec;
pub mod error;
pub mod pda;
pub mod transaction;

// Re-export key public types for ergonomic imports.
pub use address::{address_to_bytes, bytes_to_address};
pub use codec::ByteReader;
pub use error::WireError;
pub use pda::find_program_address;
pub use transaction::{
    compile_transaction, decode_transaction, encode_compact_u16, read_compact_u16,
    serialize_message, sign_transaction, AccountMeta, CompiledInstruction, DecodedInstruction,
    DecodedTransaction, Instruction, Transaction, SYSTEM_PROGRAM_ID,
};
