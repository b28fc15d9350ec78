//! JSON-RPC client for Solana nodes.
//!
//! Speaks the handful of methods the poll client needs: account reads,
//! program account scans, blockhash fetch, transaction broadcast, and
//! signature confirmation polling. Everything goes through the [`LedgerRpc`]
//! trait so callers never depend on the HTTP transport directly.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{json, Value};
use tracing::{debug, trace};

use crate::error::RpcError;
use crate::types::{Account, Commitment, MemcmpFilter, PREFLIGHT_FAILURE};

/// Per-request HTTP timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How many times to poll for signature confirmation before giving up.
const CONFIRM_ATTEMPTS: u32 = 75;

/// Delay between confirmation polls. 75 * 400ms gives the transaction about
/// 30 seconds to land, comfortably past blockhash expiry.
const CONFIRM_POLL_INTERVAL: Duration = Duration::from_millis(400);

/// Interface to a ledger RPC node.
///
/// Implementations must be safe to share across tasks; all methods take
/// `&self` and the handle is expected to live behind an `Arc`.
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// Fetch a single account. `Ok(None)` means the account does not exist
    /// at the configured commitment level.
    async fn get_account(&self, pubkey: &[u8; 32]) -> Result<Option<Account>, RpcError>;

    /// Scan all accounts owned by `program_id`, optionally narrowed by a
    /// `memcmp` filter on the account data prefix.
    async fn get_program_accounts(
        &self,
        program_id: &[u8; 32],
        filter: Option<MemcmpFilter>,
    ) -> Result<Vec<([u8; 32], Account)>, RpcError>;

    /// Fetch a recent blockhash for transaction building.
    async fn latest_blockhash(&self) -> Result<[u8; 32], RpcError>;

    /// Broadcast signed wire bytes. Returns the transaction signature.
    async fn send_transaction(&self, wire: &[u8]) -> Result<String, RpcError>;

    /// Block until `signature` reaches the configured commitment level,
    /// the node reports it failed, or the polling window runs out.
    async fn confirm_signature(&self, signature: &str) -> Result<(), RpcError>;
}

/// [`LedgerRpc`] over HTTP JSON-RPC.
pub struct HttpRpc {
    http: reqwest::Client,
    url: String,
    commitment: Commitment,
    next_id: AtomicU64,
}

impl HttpRpc {
    /// Build a client for `url`, pinning every request to `commitment`.
    pub fn new(url: impl Into<String>, commitment: Commitment) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RpcError::Transport(format!("failed to build http client: {e}")))?;

        Ok(Self {
            http,
            url: url.into(),
            commitment,
            next_id: AtomicU64::new(1),
        })
    }

    /// Issue one JSON-RPC call and unwrap the envelope down to `result`.
    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = request_body(method, params, id);
        trace!(method, id, "rpc request");

        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        let payload: Value = response
            .json()
            .await
            .map_err(|e| RpcError::InvalidResponse(e.to_string()))?;

        if let Some(err) = payload.get("error") {
            let code = err.get("code").and_then(Value::as_i64).unwrap_or(0);
            let message = err
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            return Err(RpcError::Node { code, message });
        }

        payload
            .get("result")
            .cloned()
            .ok_or_else(|| invalid("response has neither result nor error"))
    }
}

#[async_trait]
impl LedgerRpc for HttpRpc {
    async fn get_account(&self, pubkey: &[u8; 32]) -> Result<Option<Account>, RpcError> {
        let address = bs58::encode(pubkey).into_string();
        let result = self
            .call(
                "getAccountInfo",
                json!([address, {
                    "encoding": "base64",
                    "commitment": self.commitment.as_str(),
                }]),
            )
            .await?;
        parse_account_info(&result)
    }

    async fn get_program_accounts(
        &self,
        program_id: &[u8; 32],
        filter: Option<MemcmpFilter>,
    ) -> Result<Vec<([u8; 32], Account)>, RpcError> {
        let address = bs58::encode(program_id).into_string();
        let mut config = json!({
            "encoding": "base64",
            "commitment": self.commitment.as_str(),
        });
        if let Some(filter) = filter {
            config["filters"] = json!([filter.to_json()]);
        }

        let result = self
            .call("getProgramAccounts", json!([address, config]))
            .await?;
        parse_keyed_accounts(&result)
    }

    async fn latest_blockhash(&self) -> Result<[u8; 32], RpcError> {
        let result = self
            .call(
                "getLatestBlockhash",
                json!([{ "commitment": self.commitment.as_str() }]),
            )
            .await?;
        parse_blockhash(&result)
    }

    async fn send_transaction(&self, wire: &[u8]) -> Result<String, RpcError> {
        let encoded = BASE64.encode(wire);
        let result = self
            .call(
                "sendTransaction",
                json!([encoded, {
                    "encoding": "base64",
                    "preflightCommitment": self.commitment.as_str(),
                }]),
            )
            .await;

        let result = match result {
            // Preflight simulation failures are transaction rejections, not
            // node faults.
            Err(RpcError::Node { code, message }) if code == PREFLIGHT_FAILURE => {
                return Err(RpcError::TransactionFailed(message));
            }
            other => other?,
        };

        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| invalid("sendTransaction result is not a string"))
    }

    async fn confirm_signature(&self, signature: &str) -> Result<(), RpcError> {
        poll_for_confirmation(signature, self.commitment, move || {
            self.call(
                "getSignatureStatuses",
                json!([[signature], { "searchTransactionHistory": false }]),
            )
        })
        .await
    }
}

// ---------------------------------------------------------------------------
// Confirmation polling
// ---------------------------------------------------------------------------

/// Drive `fetch` until the reported status satisfies `target`, the node says
/// the transaction failed, or the polling window runs out. Sleeps between
/// polls, not after the final one.
async fn poll_for_confirmation<F, Fut>(
    signature: &str,
    target: Commitment,
    mut fetch: F,
) -> Result<(), RpcError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Value, RpcError>>,
{
    for attempt in 0..CONFIRM_ATTEMPTS {
        let result = fetch().await?;

        match parse_signature_status(&result)? {
            SignatureStatus::Failed(err) => {
                return Err(RpcError::TransactionFailed(err));
            }
            SignatureStatus::Landed(level) if level.satisfies(target) => {
                debug!(signature, attempt, "transaction confirmed");
                return Ok(());
            }
            _ => {}
        }

        if attempt + 1 < CONFIRM_ATTEMPTS {
            tokio::time::sleep(CONFIRM_POLL_INTERVAL).await;
        }
    }

    Err(RpcError::ConfirmationTimeout(signature.to_string()))
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Where a broadcast signature currently stands.
enum SignatureStatus {
    /// The node has not seen it (yet).
    Unknown,
    /// Landed but the transaction errored.
    Failed(String),
    /// Landed at the given commitment level.
    Landed(Commitment),
}

fn invalid(msg: &str) -> RpcError {
    RpcError::InvalidResponse(msg.to_string())
}

fn request_body(method: &str, params: Value, id: u64) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params,
    })
}

fn decode_b58_32(encoded: &str) -> Result<[u8; 32], RpcError> {
    let bytes = bs58::decode(encoded)
        .into_vec()
        .map_err(|e| RpcError::InvalidResponse(format!("invalid base58 in response: {e}")))?;
    bytes
        .try_into()
        .map_err(|_| invalid("base58 value is not 32 bytes"))
}

/// Unwrap a `getAccountInfo` result; `value: null` means the account does
/// not exist.
fn parse_account_info(result: &Value) -> Result<Option<Account>, RpcError> {
    let value = result
        .get("value")
        .ok_or_else(|| invalid("getAccountInfo response missing value"))?;
    if value.is_null() {
        return Ok(None);
    }
    parse_account(value).map(Some)
}

fn parse_account(value: &Value) -> Result<Account, RpcError> {
    let lamports = value
        .get("lamports")
        .and_then(Value::as_u64)
        .ok_or_else(|| invalid("account missing lamports"))?;

    let owner = value
        .get("owner")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("account missing owner"))
        .and_then(decode_b58_32)?;

    // Account data arrives as ["<base64>", "base64"].
    let data_b64 = value
        .get("data")
        .and_then(|d| d.get(0))
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("account missing data"))?;
    let data = BASE64
        .decode(data_b64)
        .map_err(|e| RpcError::InvalidResponse(format!("account data is not valid base64: {e}")))?;

    Ok(Account {
        lamports,
        owner,
        data,
    })
}

fn parse_keyed_accounts(result: &Value) -> Result<Vec<([u8; 32], Account)>, RpcError> {
    let entries = result
        .as_array()
        .ok_or_else(|| invalid("getProgramAccounts result is not an array"))?;

    let mut accounts = Vec::with_capacity(entries.len());
    for entry in entries {
        let pubkey = entry
            .get("pubkey")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("keyed account missing pubkey"))
            .and_then(decode_b58_32)?;
        let account = entry
            .get("account")
            .ok_or_else(|| invalid("keyed account missing account"))
            .and_then(parse_account)?;
        accounts.push((pubkey, account));
    }

    Ok(accounts)
}

fn parse_blockhash(result: &Value) -> Result<[u8; 32], RpcError> {
    result
        .get("value")
        .and_then(|v| v.get("blockhash"))
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("getLatestBlockhash response missing blockhash"))
        .and_then(decode_b58_32)
}

fn parse_signature_status(result: &Value) -> Result<SignatureStatus, RpcError> {
    let value = result
        .get("value")
        .and_then(Value::as_array)
        .ok_or_else(|| invalid("getSignatureStatuses response missing value array"))?;

    let status = match value.first() {
        None => return Err(invalid("getSignatureStatuses value array is empty")),
        Some(Value::Null) => return Ok(SignatureStatus::Unknown),
        Some(status) => status,
    };

    if let Some(err) = status.get("err") {
        if !err.is_null() {
            return Ok(SignatureStatus::Failed(err.to_string()));
        }
    }

    let level = status
        .get("confirmationStatus")
        .and_then(Value::as_str)
        .and_then(Commitment::from_status_str);

    Ok(match level {
        Some(level) => SignatureStatus::Landed(level),
        None => SignatureStatus::Unknown,
    })
}
