//! Error type shared by every stage of a contract invocation.

use thiserror::Error;

/// Failures raised while loading, binding or invoking the contract.
///
/// Every variant is fatal for the invocation sequence; callers never resume
/// after one of these is returned.
#[derive(Debug, Error)]
pub enum InvokeError {
    /// Invalid or missing configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The signing credential could not be loaded or does not match the sender.
    #[error("Credential error: {0}")]
    Credential(String),

    /// The RPC endpoint did not answer the connectivity probe.
    #[error("Connection to {endpoint} failed: {reason}")]
    ConnectionFailure { endpoint: String, reason: String },

    /// The artifact file does not exist.
    #[error("Artifact not found: {path}")]
    ArtifactNotFound { path: String },

    /// The artifact exists but is unreadable or has no usable `abi` section.
    #[error("Failed to parse artifact {path}: {reason}")]
    ArtifactParse { path: String, reason: String },

    /// The artifact lacks functions the caller depends on.
    #[error("Artifact is missing required functions: {0}")]
    MissingFunction(String),

    /// No function with this name (and arity) exists in the interface.
    #[error("Unknown contract function: {0}")]
    UnknownFunction(String),

    /// Arguments do not match the function's input types.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Return data does not match the function's output types.
    #[error("Decoding error: {0}")]
    Decoding(String),

    /// The contract rejected the sender for lack of a role or ownership.
    #[error("Insufficient permission: {0}")]
    InsufficientPermission(String),

    /// The sender cannot pay for gas.
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    /// The node rejected the transaction nonce.
    #[error("Nonce conflict: {0}")]
    NonceConflict(String),

    /// The contract reverted for any other reason.
    #[error("Transaction reverted: {}", reason.as_deref().unwrap_or("no reason given"))]
    Revert { reason: Option<String> },

    /// Transport or node error that is not a contract failure.
    #[error("RPC error: {0}")]
    Rpc(String),
}

impl InvokeError {
    /// True for failures reported by the chain for a submitted or simulated transaction.
    pub fn is_transaction_failure(&self) -> bool {
        matches!(
            self,
            InvokeError::InsufficientPermission(_)
                | InvokeError::InsufficientFunds(_)
                | InvokeError::NonceConflict(_)
                | InvokeError::Revert { .. }
        )
    }
}

impl From<serde_json::Error> for InvokeError {
    fn from(err: serde_json::Error) -> Self {
        InvokeError::Decoding(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_revert_with_reason() {
        let err = InvokeError::Revert { reason: Some("Caller is not a breeder".to_string()) };
        assert_eq!(format!("{}", err), "Transaction reverted: Caller is not a breeder");
    }

    #[test]
    fn test_display_revert_without_reason() {
        let err = InvokeError::Revert { reason: None };
        assert_eq!(format!("{}", err), "Transaction reverted: no reason given");
    }

    #[test]
    fn test_display_connection_failure() {
        let err = InvokeError::ConnectionFailure {
            endpoint: "http://127.0.0.1:8545".to_string(),
            reason: "connection refused".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Connection to http://127.0.0.1:8545 failed: connection refused"
        );
    }

    #[test]
    fn test_transaction_failure_grouping() {
        assert!(InvokeError::InsufficientFunds("x".into()).is_transaction_failure());
        assert!(InvokeError::NonceConflict("x".into()).is_transaction_failure());
        assert!(InvokeError::Revert { reason: None }.is_transaction_failure());
        assert!(!InvokeError::Rpc("x".into()).is_transaction_failure());
        assert!(!InvokeError::ArtifactNotFound { path: "a".into() }.is_transaction_failure());
    }
}
