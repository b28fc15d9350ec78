//! In-memory ledger for tests and offline development.
//!
//! Implements [`LedgerRpc`] against a map of accounts and enforces the poll
//! program's actual transition rules: `initialize` refuses a second counter,
//! `create_poll` refuses a stale id, and every accepted creation increments
//! the counter atomically with the poll account write. Submitted wire bytes
//! go through full decoding, signature verification, and header
//! write-permission checks on every account the program mutates, so anything
//! that would not survive a real node's sanitization and execution fails
//! here too.
//!
//! Blockhash freshness and rent are not modeled.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use sol_rpc::{Account, LedgerRpc, MemcmpFilter, RpcError};
use sol_wire::codec::ByteReader;
use sol_wire::transaction::{decode_transaction, DecodedTransaction};

use crate::program::{
    counter_pda, create_poll_discriminator, initialize_discriminator, poll_pda, Counter, Poll,
    MAX_DESCRIPTION_LEN, PROGRAM_ID,
};

/// Blockhash the mock hands out. Constant; freshness is not modeled.
const MOCK_BLOCKHASH: [u8; 32] = [0xBB; 32];

const MOCK_LAMPORTS: u64 = 1_000_000;

/// A failure to inject into the next request.
#[derive(Debug, Clone)]
pub enum MockFault {
    /// The connection drops.
    Transport,
    /// The node refuses the request with the given message.
    Reject(String),
}

impl MockFault {
    fn into_error(self) -> RpcError {
        match self {
            MockFault::Transport => RpcError::Transport("injected transport failure".into()),
            MockFault::Reject(msg) => RpcError::TransactionFailed(msg),
        }
    }
}

#[derive(Default)]
struct LedgerState {
    accounts: HashMap<[u8; 32], Account>,
    confirmed: HashSet<String>,
    requests: u64,
    fail_next: Option<MockFault>,
}

/// In-memory [`LedgerRpc`] with poll program semantics.
#[derive(Default)]
pub struct MockLedger {
    state: Mutex<LedgerState>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place raw account bytes at `pubkey`, owned by the poll program.
    pub async fn seed_account(&self, pubkey: [u8; 32], data: Vec<u8>) {
        let mut state = self.state.lock().await;
        state.accounts.insert(
            pubkey,
            Account {
                lamports: MOCK_LAMPORTS,
                owner: PROGRAM_ID,
                data,
            },
        );
    }

    /// Place a well-formed counter account.
    pub async fn seed_counter(&self, count: u64) {
        let address = counter_pda().unwrap_or([0u8; 32]);
        self.seed_account(address, Counter { count }.encode()).await;
    }

    /// Place a well-formed poll account at its derived address.
    pub async fn seed_poll(&self, poll: &Poll) {
        let address = poll_pda(poll.id).unwrap_or([0u8; 32]);
        self.seed_account(address, poll.encode()).await;
    }

    /// Raw bytes currently stored at `pubkey`, if any.
    pub async fn account_data(&self, pubkey: &[u8; 32]) -> Option<Vec<u8>> {
        let state = self.state.lock().await;
        state.accounts.get(pubkey).map(|a| a.data.clone())
    }

    /// Total requests served so far, across all methods.
    pub async fn request_count(&self) -> u64 {
        self.state.lock().await.requests
    }

    /// Make the next request fail with `fault`.
    pub async fn fail_next(&self, fault: MockFault) {
        self.state.lock().await.fail_next = Some(fault);
    }
}

fn reject(msg: impl Into<String>) -> RpcError {
    RpcError::TransactionFailed(msg.into())
}

/// Whether the signed message header grants write access to `key`.
fn header_grants_write(tx: &DecodedTransaction, key: &[u8; 32]) -> bool {
    tx.account_index(key).is_some_and(|i| tx.is_writable(i))
}

impl LedgerState {
    fn begin(&mut self) -> Result<(), RpcError> {
        self.requests += 1;
        match self.fail_next.take() {
            Some(fault) => Err(fault.into_error()),
            None => Ok(()),
        }
    }

    /// Execute `initialize`: create the counter, once.
    fn execute_initialize(
        &mut self,
        tx: &DecodedTransaction,
        instruction_accounts: &[[u8; 32]],
    ) -> Result<(), RpcError> {
        let counter_address = counter_pda().map_err(|e| reject(e.to_string()))?;
        let fee_payer = tx.fee_payer();

        if instruction_accounts.first() != Some(&fee_payer) {
            return Err(reject("authority must be the fee payer"));
        }
        if !header_grants_write(tx, &fee_payer) {
            return Err(reject("authority account is not writable"));
        }
        if !header_grants_write(tx, &counter_address) {
            return Err(reject("counter account is not writable"));
        }
        if self.accounts.contains_key(&counter_address) {
            return Err(reject("counter account already in use"));
        }

        self.accounts.insert(
            counter_address,
            Account {
                lamports: MOCK_LAMPORTS,
                owner: PROGRAM_ID,
                data: Counter { count: 0 }.encode(),
            },
        );
        Ok(())
    }

    /// Execute `create_poll`: validate against the live counter, create the
    /// poll account, and increment the counter in the same step.
    fn execute_create_poll(
        &mut self,
        tx: &DecodedTransaction,
        data: &[u8],
    ) -> Result<(), RpcError> {
        let fee_payer = tx.fee_payer();
        let mut reader = ByteReader::new(data);
        let id = reader
            .read_u64_le()
            .map_err(|_| reject("create_poll: missing id"))?;
        let description = reader
            .read_string()
            .map_err(|_| reject("create_poll: malformed description"))?;
        let start = reader
            .read_i64_le()
            .map_err(|_| reject("create_poll: missing start"))?;
        let end = reader
            .read_i64_le()
            .map_err(|_| reject("create_poll: missing end"))?;

        if description.len() > MAX_DESCRIPTION_LEN {
            return Err(reject("create_poll: description too long"));
        }
        if start >= end {
            return Err(reject("create_poll: invalid timeframe"));
        }

        let counter_address = counter_pda().map_err(|e| reject(e.to_string()))?;
        if !header_grants_write(tx, &fee_payer) {
            return Err(reject("creator account is not writable"));
        }
        if !header_grants_write(tx, &counter_address) {
            return Err(reject("counter account is not writable"));
        }

        let counter = match self.accounts.get(&counter_address) {
            Some(account) => {
                Counter::decode(&account.data).map_err(|e| reject(e.to_string()))?
            }
            None => return Err(reject("create_poll: counter not initialized")),
        };
        if id != counter.count {
            return Err(reject(format!(
                "create_poll: id {id} does not match counter {}",
                counter.count
            )));
        }

        let poll_address = poll_pda(id).map_err(|e| reject(e.to_string()))?;
        if !header_grants_write(tx, &poll_address) {
            return Err(reject("poll account is not writable"));
        }
        if self.accounts.contains_key(&poll_address) {
            return Err(reject("poll account already in use"));
        }

        let poll = Poll {
            id,
            description,
            start,
            end,
            candidate_count: 0,
            owner: fee_payer,
        };
        self.accounts.insert(
            poll_address,
            Account {
                lamports: MOCK_LAMPORTS,
                owner: PROGRAM_ID,
                data: poll.encode(),
            },
        );

        let next = Counter {
            count: counter.count + 1,
        };
        self.accounts.insert(
            counter_address,
            Account {
                lamports: MOCK_LAMPORTS,
                owner: PROGRAM_ID,
                data: next.encode(),
            },
        );
        Ok(())
    }
}

#[async_trait]
impl LedgerRpc for MockLedger {
    async fn get_account(&self, pubkey: &[u8; 32]) -> Result<Option<Account>, RpcError> {
        let mut state = self.state.lock().await;
        state.begin()?;
        Ok(state.accounts.get(pubkey).cloned())
    }

    async fn get_program_accounts(
        &self,
        program_id: &[u8; 32],
        filter: Option<MemcmpFilter>,
    ) -> Result<Vec<([u8; 32], Account)>, RpcError> {
        let mut state = self.state.lock().await;
        state.begin()?;

        let matches = |account: &Account| match &filter {
            None => true,
            Some(f) => account
                .data
                .get(f.offset..f.offset + f.bytes.len())
                .is_some_and(|window| window == f.bytes),
        };

        Ok(state
            .accounts
            .iter()
            .filter(|(_, account)| account.owner == *program_id && matches(account))
            .map(|(pubkey, account)| (*pubkey, account.clone()))
            .collect())
    }

    async fn latest_blockhash(&self) -> Result<[u8; 32], RpcError> {
        let mut state = self.state.lock().await;
        state.begin()?;
        Ok(MOCK_BLOCKHASH)
    }

    async fn send_transaction(&self, wire: &[u8]) -> Result<String, RpcError> {
        let mut state = self.state.lock().await;
        state.begin()?;

        let tx = decode_transaction(wire)
            .map_err(|e| reject(format!("transaction sanitization failed: {e}")))?;
        tx.verify_signatures()
            .map_err(|e| reject(format!("signature verification failed: {e}")))?;

        let instruction = match tx.instructions.as_slice() {
            [single] => single,
            _ => return Err(reject("expected exactly one instruction")),
        };
        if instruction.program_id != PROGRAM_ID {
            return Err(reject("unknown program"));
        }

        let data = &instruction.data;
        if data.len() < 8 {
            return Err(reject("instruction data too short"));
        }
        let (tag, args) = data.split_at(8);

        if tag == initialize_discriminator().as_slice() {
            state.execute_initialize(&tx, &instruction.accounts)?;
        } else if tag == create_poll_discriminator().as_slice() {
            state.execute_create_poll(&tx, args)?;
        } else {
            return Err(reject("unknown instruction"));
        }

        let signature = bs58::encode(&tx.signatures[0]).into_string();
        state.confirmed.insert(signature.clone());
        Ok(signature)
    }

    async fn confirm_signature(&self, signature: &str) -> Result<(), RpcError> {
        let mut state = self.state.lock().await;
        state.begin()?;
        if state.confirmed.contains(signature) {
            Ok(())
        } else {
            Err(RpcError::ConfirmationTimeout(signature.to_string()))
        }
    }
}
