//! Client handles: the wallet capability and the read-only / signer-bound
//! program handles built from it.
//!
//! Handles fix their identity at construction and are rebuilt, never
//! mutated, when the signer changes. The RPC connection behind them is
//! shared via `Arc`.

use std::sync::Arc;

use async_trait::async_trait;
use ed25519_dalek::SigningKey;
use tracing::info;
use zeroize::Zeroize;

use sol_rpc::{HttpRpc, LedgerRpc};
use sol_wire::transaction::Transaction;

use crate::config::ClientConfig;
use crate::error::CoreError;

/// A connected wallet identity: one public key plus the ability to sign.
///
/// Broadcasting is the connection's job, not the wallet's; implementations
/// return fully signed wire bytes and never touch the network.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    fn public_key(&self) -> [u8; 32];

    /// Sign `tx` as its fee payer and return broadcast-ready wire bytes.
    async fn sign_transaction(&self, tx: &Transaction) -> Result<Vec<u8>, CoreError>;
}

/// Keypair-backed [`WalletSigner`] for embedders that hold their own key.
pub struct LocalWallet {
    key: SigningKey,
}

impl LocalWallet {
    /// Build from a 32-byte Ed25519 seed. The caller's copy is wiped.
    pub fn from_seed(mut seed: [u8; 32]) -> Self {
        let key = SigningKey::from_bytes(&seed);
        seed.zeroize();
        Self { key }
    }
}

#[async_trait]
impl WalletSigner for LocalWallet {
    fn public_key(&self) -> [u8; 32] {
        self.key.verifying_key().to_bytes()
    }

    async fn sign_transaction(&self, tx: &Transaction) -> Result<Vec<u8>, CoreError> {
        let mut seed = self.key.to_bytes();
        let result = sol_wire::sign_transaction(tx, &seed);
        seed.zeroize();
        Ok(result?)
    }
}

/// Program handle without a signing identity. Cheap to clone and share.
#[derive(Clone)]
pub struct ReadonlyClient {
    pub rpc: Arc<dyn LedgerRpc>,
}

/// Program handle bound to one signer. Owned by the path that requested it.
#[derive(Clone)]
pub struct SignerClient {
    pub rpc: Arc<dyn LedgerRpc>,
    pub wallet: Arc<dyn WalletSigner>,
}

impl SignerClient {
    pub fn public_key(&self) -> [u8; 32] {
        self.wallet.public_key()
    }
}

/// Build the production RPC connection for `config`.
pub fn connect(config: &ClientConfig) -> Result<Arc<dyn LedgerRpc>, CoreError> {
    let endpoint = config.endpoint();
    info!(%endpoint, commitment = ?config.commitment, "connecting to ledger rpc");
    let rpc = HttpRpc::new(endpoint, config.commitment)?;
    Ok(Arc::new(rpc))
}

/// Handle for reads. No signing identity required.
pub fn readonly_client(rpc: Arc<dyn LedgerRpc>) -> ReadonlyClient {
    ReadonlyClient { rpc }
}

/// Handle for writes. `None` when no wallet is connected, which is a valid
/// state rather than an error; callers decide what a missing signer means.
pub fn signer_client(
    rpc: Arc<dyn LedgerRpc>,
    wallet: Option<Arc<dyn WalletSigner>>,
) -> Option<SignerClient> {
    wallet.map(|wallet| SignerClient { rpc, wallet })
}
