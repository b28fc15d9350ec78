//! Transaction submission: compile, sign, broadcast, confirm.

use tracing::{debug, info};

use sol_wire::transaction::{compile_transaction, Instruction};

use crate::client::SignerClient;
use crate::error::CoreError;
use crate::program;

/// Submit the one-time `initialize` transaction and return its signature.
///
/// The program refuses a second initialization; that surfaces here as
/// [`CoreError::Rejected`].
pub async fn initialize(client: &SignerClient) -> Result<String, CoreError> {
    let authority = client.public_key();
    let instruction = program::initialize_instruction(&authority)?;
    send_instruction(client, instruction, "initialize").await
}

/// Submit a `create_poll` transaction and return its signature.
///
/// `id` must equal the counter value when the program executes the
/// transaction; a concurrent creator winning the race turns this into
/// [`CoreError::Rejected`], after which the caller re-reads and retries.
pub async fn create_poll(
    client: &SignerClient,
    id: u64,
    description: &str,
    start: i64,
    end: i64,
) -> Result<String, CoreError> {
    let creator = client.public_key();
    let instruction = program::create_poll_instruction(&creator, id, description, start, end)?;
    send_instruction(client, instruction, "create_poll").await
}

/// Shared submit pipeline. A fresh blockhash is fetched per submission so a
/// retry never reuses an expired one.
async fn send_instruction(
    client: &SignerClient,
    instruction: Instruction,
    op: &'static str,
) -> Result<String, CoreError> {
    let fee_payer = client.public_key();

    let blockhash = client.rpc.latest_blockhash().await?;
    debug!(op, "fetched recent blockhash");

    let transaction = compile_transaction(&[instruction], &fee_payer, &blockhash)?;
    let wire = client.wallet.sign_transaction(&transaction).await?;
    debug!(op, bytes = wire.len(), "transaction signed");

    let signature = client.rpc.send_transaction(&wire).await?;
    debug!(op, %signature, "transaction broadcast");

    client.rpc.confirm_signature(&signature).await?;
    info!(op, %signature, "transaction confirmed");

    Ok(signature)
}
