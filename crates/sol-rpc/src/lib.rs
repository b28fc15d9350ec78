//! Ledger RPC access for the poll client.
//!
//! A thin JSON-RPC layer over `reqwest`: the [`LedgerRpc`] trait is the seam
//! between poll client logic and the network, and [`HttpRpc`] is the
//! production implementation. Each handle is pinned to one commitment level
//! at construction, so every read and broadcast in a session observes the
//! ledger at the same depth.

pub mod client;
pub mod error;
pub mod types;

// Re-export key public types for ergonomic imports.
pub use client::{HttpRpc, LedgerRpc};
pub use error::RpcError;
pub use types::{Account, Commitment, MemcmpFilter, PREFLIGHT_FAILURE};
