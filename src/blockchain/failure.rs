//! Mapping node and contract failures onto `InvokeError`.

use ethers::providers::MiddlewareError;

use crate::contract::ContractHandle;
use crate::core::errors::InvokeError;

const PERMISSION_MARKERS: &[&str] = &[
    "accesscontrolunauthorizedaccount",
    "accesscontrol:",
    "missing role",
    "caller is not",
    "does not own",
    "unauthorized",
];

const NONCE_MARKERS: &[&str] = &[
    "nonce too low",
    "nonce too high",
    "nonce has already been used",
    "already known",
    "replacement transaction underpriced",
    "invalid nonce",
];

/// Classify a failure from its message and, when the node returned it, the revert payload.
pub fn classify_failure(message: &str, revert_data: Option<&[u8]>, handle: &ContractHandle) -> InvokeError {
    let lower = message.to_lowercase();
    let decoded = revert_data.filter(|d| !d.is_empty()).and_then(|d| handle.describe_revert(d));

    if decoded.is_some() || lower.contains("revert") {
        let reason = decoded.or_else(|| extract_reason(message));
        let haystack = reason.as_deref().unwrap_or(message).to_lowercase();
        if PERMISSION_MARKERS.iter().any(|m| haystack.contains(m)) {
            return InvokeError::InsufficientPermission(reason.unwrap_or_else(|| message.to_string()));
        }
        return InvokeError::Revert { reason };
    }
    if lower.contains("insufficient funds") {
        return InvokeError::InsufficientFunds(message.to_string());
    }
    if NONCE_MARKERS.iter().any(|m| lower.contains(m)) {
        return InvokeError::NonceConflict(message.to_string());
    }
    InvokeError::Rpc(message.to_string())
}

/// Classify any ethers middleware/provider error, pulling revert data out of the JSON-RPC error.
pub fn from_middleware_error<E: MiddlewareError>(err: &E, handle: &ContractHandle) -> InvokeError {
    let revert = err.as_error_response().and_then(|resp| resp.as_revert_data());
    let message = match err.as_error_response() {
        Some(resp) => resp.message.clone(),
        None => err.to_string(),
    };
    classify_failure(&message, revert.as_deref(), handle)
}

/// Pull the revert reason out of node messages such as Hardhat's
/// `reverted with reason string 'X'` or geth's `execution reverted: X`.
fn extract_reason(message: &str) -> Option<String> {
    for marker in ["reason string '", "custom error '"] {
        if let Some(start) = message.find(marker) {
            let rest = &message[start + marker.len()..];
            let end = rest.rfind('\'').unwrap_or(rest.len());
            return Some(rest[..end].to_string());
        }
    }
    if let Some(start) = message.find("execution reverted: ") {
        let reason = message[start + "execution reverted: ".len()..].trim();
        return (!reason.is_empty()).then(|| reason.to_string());
    }
    if let Some(start) = message.find("reverted with ") {
        return Some(message[start + "reverted with ".len()..].trim().to_string());
    }
    None
}
