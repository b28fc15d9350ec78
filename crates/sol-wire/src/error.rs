use thiserror::Error;

/// Wire-level errors: address parsing, transaction building, signing,
/// and (de)serialization of the compact binary format.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("transaction build error: {0}")]
    TransactionBuild(String),

    #[error("signing error: {0}")]
    Signing(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}
