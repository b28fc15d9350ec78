//! Shared types for the RPC layer.

use serde::{Deserialize, Serialize};

/// JSON-RPC error code the node returns when transaction preflight
/// simulation fails.
pub const PREFLIGHT_FAILURE: i64 = -32002;

/// How settled a ledger state must be before we trust it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    Confirmed,
    Finalized,
}

impl Commitment {
    /// The string the JSON-RPC API expects.
    pub fn as_str(self) -> &'static str {
        match self {
            Commitment::Processed => "processed",
            Commitment::Confirmed => "confirmed",
            Commitment::Finalized => "finalized",
        }
    }

    /// Parse a `confirmationStatus` value from a signature status response.
    pub fn from_status_str(s: &str) -> Option<Self> {
        match s {
            "processed" => Some(Commitment::Processed),
            "confirmed" => Some(Commitment::Confirmed),
            "finalized" => Some(Commitment::Finalized),
            _ => None,
        }
    }

    /// Whether this level settles at least as deep as `required`.
    pub fn satisfies(self, required: Commitment) -> bool {
        self.rank() >= required.rank()
    }

    fn rank(self) -> u8 {
        match self {
            Commitment::Processed => 0,
            Commitment::Confirmed => 1,
            Commitment::Finalized => 2,
        }
    }
}

impl Default for Commitment {
    fn default() -> Self {
        Commitment::Confirmed
    }
}

/// An on-chain account as returned by the node, with data already decoded
/// from its base64 wrapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub lamports: u64,
    pub owner: [u8; 32],
    pub data: Vec<u8>,
}

/// A `memcmp` filter for program account scans: match accounts whose data
/// starts with `bytes` at `offset`.
#[derive(Debug, Clone)]
pub struct MemcmpFilter {
    pub offset: usize,
    pub bytes: Vec<u8>,
}

impl MemcmpFilter {
    pub fn new(offset: usize, bytes: Vec<u8>) -> Self {
        Self { offset, bytes }
    }

    /// The JSON shape `getProgramAccounts` expects; bytes go out base58.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "memcmp": {
                "offset": self.offset,
                "bytes": bs58::encode(&self.bytes).into_string(),
            }
        })
    }
}
