//! State reads: the global counter and the poll listing.

use serde::Serialize;
use tracing::warn;

use sol_rpc::MemcmpFilter;

use crate::client::ReadonlyClient;
use crate::error::CoreError;
use crate::program::{self, Counter, Poll};

/// What the counter account told us.
///
/// Absence of the account is a state, not an error: it means the program has
/// never been bootstrapped, which is distinct from a counter reading zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CounterState {
    Uninitialized,
    Initialized { count: u64 },
}

impl CounterState {
    pub fn is_initialized(self) -> bool {
        matches!(self, CounterState::Initialized { .. })
    }

    /// The poll count, when the program is initialized.
    pub fn count(self) -> Option<u64> {
        match self {
            CounterState::Uninitialized => None,
            CounterState::Initialized { count } => Some(count),
        }
    }
}

/// Fetch and decode the counter account.
///
/// A malformed counter is fatal here; the initialized/uninitialized decision
/// hangs on this account and must not be guessed.
pub async fn read_counter(client: &ReadonlyClient) -> Result<CounterState, CoreError> {
    let address = program::counter_pda()?;

    match client.rpc.get_account(&address).await? {
        None => Ok(CounterState::Uninitialized),
        Some(account) => {
            let counter = Counter::decode(&account.data)?;
            Ok(CounterState::Initialized {
                count: counter.count,
            })
        }
    }
}

/// Fetch and decode every poll account owned by the program.
///
/// Retrieval order carries no meaning; callers sort if they need an order.
/// One undecodable account is skipped and logged rather than failing the
/// whole listing.
pub async fn read_all_polls(client: &ReadonlyClient) -> Result<Vec<Poll>, CoreError> {
    let filter = MemcmpFilter::new(0, program::poll_discriminator().to_vec());
    let accounts = client
        .rpc
        .get_program_accounts(&program::PROGRAM_ID, Some(filter))
        .await?;

    let mut polls = Vec::with_capacity(accounts.len());
    for (pubkey, account) in accounts {
        match Poll::decode(&account.data) {
            Ok(poll) => polls.push(poll),
            Err(err) => {
                let address = bs58::encode(&pubkey).into_string();
                warn!(%address, %err, "skipping undecodable poll account");
            }
        }
    }

    Ok(polls)
}

/// Fetch one poll by id. `Ok(None)` when no poll with that id exists.
pub async fn read_poll(client: &ReadonlyClient, poll_id: u64) -> Result<Option<Poll>, CoreError> {
    let address = program::poll_pda(poll_id)?;

    match client.rpc.get_account(&address).await? {
        None => Ok(None),
        Some(account) => Ok(Some(Poll::decode(&account.data)?)),
    }
}
