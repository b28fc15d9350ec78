//! Error types for the RPC layer.

use thiserror::Error;

/// Errors from talking to a ledger RPC node.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The HTTP request itself failed (connection refused, DNS, timeout).
    #[error("transport error: {0}")]
    Transport(String),

    /// The node answered with a JSON-RPC error object.
    #[error("rpc node error {code}: {message}")]
    Node { code: i64, message: String },

    /// The node answered 200 but the payload did not have the expected shape.
    #[error("invalid rpc response: {0}")]
    InvalidResponse(String),

    /// The transaction was rejected by the node or failed on chain.
    #[error("transaction failed: {0}")]
    TransactionFailed(String),

    /// The transaction was broadcast but never reached the requested
    /// commitment within the polling window.
    #[error("confirmation timed out: {0}")]
    ConfirmationTimeout(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formats() {
        assert_eq!(
            RpcError::Transport("connection refused".into()).to_string(),
            "transport error: connection refused"
        );
        assert_eq!(
            RpcError::Node {
                code: -32002,
                message: "Transaction simulation failed".into()
            }
            .to_string(),
            "rpc node error -32002: Transaction simulation failed"
        );
        assert_eq!(
            RpcError::InvalidResponse("missing result".into()).to_string(),
            "invalid rpc response: missing result"
        );
        assert_eq!(
            RpcError::TransactionFailed("custom program error: 0x0".into()).to_string(),
            "transaction failed: custom program error: 0x0"
        );
        assert_eq!(
            RpcError::ConfirmationTimeout("abc123".into()).to_string(),
            "confirmation timed out: abc123"
        );
    }
}
