//! Client-side interaction layer for the on-chain poll program: endpoint
//! resolution, wallet-bound and read-only program clients, typed state
//! reads, transaction submission, and the `PollSession` a UI drives.
//!
//! Everything network-facing sits behind the `LedgerRpc` trait, so every
//! flow in this crate runs unchanged against the in-tree `MockLedger`.

pub mod client;
pub mod config;
pub mod datetime;
pub mod error;
pub mod mock_ledger;
pub mod program;
pub mod reader;
pub mod session;
pub mod submit;
pub mod telemetry;

pub use client::{
    connect, readonly_client, signer_client, LocalWallet, ReadonlyClient, SignerClient,
    WalletSigner,
};
pub use config::{resolve_endpoint, ClientConfig, DEFAULT_RPC_URL, RPC_URL_ENV};
pub use error::CoreError;
pub use program::{Counter, Poll, PROGRAM_ADDRESS};
pub use reader::{read_all_polls, read_counter, read_poll, CounterState};
pub use session::{PollSession, SessionPhase, SubmitStatus};
