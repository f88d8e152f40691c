use async_trait::async_trait;
use ethers::abi::Token;
use ethers::types::Address;

use crate::contract::ContractHandle;
use crate::core::domain::{ConnectionStatus, Invocation, TransactionOutcome};
use crate::core::errors::InvokeError;
use crate::security::AccountCredential;

/// Everything the invocation sequence needs from a chain connection.
#[async_trait]
pub trait ContractInvoker: Send + Sync {
    /// The endpoint this invoker talks to, for log and error messages.
    fn endpoint(&self) -> &str;

    /// Probes the node. Never fails; an unreachable node is reported in the status.
    async fn connection_status(&self) -> ConnectionStatus;

    /// Gets the current block number.
    async fn block_number(&self) -> Result<u64, InvokeError>;

    /// Gets the current nonce for an address.
    async fn get_nonce(&self, address: Address) -> Result<u64, InvokeError>;

    /// Signs `invocation` with `credential`, submits it and waits for the receipt.
    async fn send_transaction(
        &self,
        handle: &ContractHandle,
        invocation: &Invocation,
        credential: &AccountCredential,
    ) -> Result<TransactionOutcome, InvokeError>;

    /// Runs `invocation` as a read-only `eth_call` and decodes the output.
    async fn call(&self, handle: &ContractHandle, invocation: &Invocation) -> Result<Vec<Token>, InvokeError>;
}
