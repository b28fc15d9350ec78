use thiserror::Error;

use sol_rpc::RpcError;
use sol_wire::WireError;

/// Error taxonomy for poll client operations.
///
/// Every failure a caller can see is classified into one of these buckets so
/// the UI layer can decide between "fix your input", "check your
/// connection", and "refresh and retry" without string matching.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A state-changing operation was attempted without a connected signer.
    #[error("No signer connected")]
    NoSigner,

    /// Malformed user input, caught before any network traffic.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// The network or node could not be reached, or answered garbage.
    #[error("Network error: {0}")]
    Network(String),

    /// The ledger program refused the transaction (duplicate id,
    /// already initialized, failed on-chain).
    #[error("Rejected by program: {0}")]
    Rejected(String),

    /// Account bytes did not match the expected layout.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Transaction construction or signing failed locally.
    #[error("Transaction build failed: {0}")]
    Wire(String),
}

impl CoreError {
    /// A short message fit for direct display to the user.
    pub fn user_message(&self) -> String {
        match self {
            CoreError::NoSigner => "Please connect your wallet first".to_string(),
            CoreError::Validation(msg) => msg.clone(),
            CoreError::Network(_) => {
                "Network error, please check your connection and retry".to_string()
            }
            CoreError::Rejected(_) => {
                "The program rejected the transaction, refresh and retry".to_string()
            }
            CoreError::Decode(_) | CoreError::Wire(_) => "Something went wrong".to_string(),
        }
    }
}

impl From<WireError> for CoreError {
    fn from(e: WireError) -> Self {
        CoreError::Wire(e.to_string())
    }
}

impl From<RpcError> for CoreError {
    fn from(e: RpcError) -> Self {
        match e {
            // Ledger-side refusals: the caller should refresh state and
            // retry with fresh inputs.
            RpcError::TransactionFailed(msg) => CoreError::Rejected(msg),
            RpcError::Node { code, message } if code == sol_rpc::PREFLIGHT_FAILURE => {
                CoreError::Rejected(message)
            }
            // Everything else is transport trouble of one kind or another.
            RpcError::Transport(msg) | RpcError::InvalidResponse(msg) => CoreError::Network(msg),
            RpcError::Node { code, message } => {
                CoreError::Network(format!("node error {code}: {message}"))
            }
            RpcError::ConfirmationTimeout(sig) => {
                CoreError::Network(format!("confirmation timed out for {sig}"))
            }
        }
    }
}
