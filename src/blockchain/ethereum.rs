use async_trait::async_trait;
use ethers::{
    abi::Token,
    middleware::SignerMiddleware,
    providers::{Http, JsonRpcClient, Middleware, Provider},
    types::{
        transaction::eip2718::TypedTransaction, Address, Eip1559TransactionRequest, TransactionRequest, U256,
        U64,
    },
};
use once_cell::sync::OnceCell;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::failure::from_middleware_error;
use super::traits::ContractInvoker;
use crate::contract::ContractHandle;
use crate::core::config::TransportConfig;
use crate::core::domain::{ConnectionStatus, Invocation, TransactionOutcome};
use crate::core::errors::InvokeError;
use crate::security::AccountCredential;

const ONE_GWEI: u64 = 1_000_000_000;

#[derive(Clone)]
pub struct EthereumClient<P: JsonRpcClient + Clone = Http> {
    provider: Provider<P>,
    endpoint: String,
    chain_id: OnceCell<u64>,
}

impl EthereumClient<Http> {
    /// Build an HTTP client for `rpc_url`. No request is sent until the first call.
    pub fn new(rpc_url: &str, transport: &TransportConfig) -> Result<Self, InvokeError> {
        let rpc_url_clean = rpc_url.trim();
        let parsed_url = reqwest::Url::parse(rpc_url_clean)
            .map_err(|e| InvokeError::Config(format!("Invalid RPC URL '{}': {}", rpc_url_clean, e)))?;
        if !matches!(parsed_url.scheme(), "http" | "https") {
            return Err(InvokeError::Config(format!(
                "Invalid RPC URL '{}': only http and https are supported",
                rpc_url_clean
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(transport.timeout_secs))
            .build()
            .map_err(|e| InvokeError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let provider = Provider::new(Http::new_with_client(parsed_url, client))
            .interval(Duration::from_millis(transport.poll_interval_ms));

        debug!(endpoint = rpc_url_clean, timeout_secs = transport.timeout_secs, "Built RPC client");
        Ok(Self::new_with_provider(provider, rpc_url_clean))
    }
}

impl<P> EthereumClient<P>
where
    P: JsonRpcClient + Clone + Send + Sync,
{
    /// Creates a new EthereumClient with a given provider.
    /// This is useful for testing with a `MockProvider`.
    pub fn new_with_provider(provider: Provider<P>, endpoint: &str) -> EthereumClient<P> {
        EthereumClient { provider, endpoint: endpoint.to_string(), chain_id: OnceCell::new() }
    }

    /// Pin the chain id instead of asking the node; the probe then verifies it.
    pub fn with_chain_id(self, chain_id: u64) -> Self {
        let cell = OnceCell::new();
        let _ = cell.set(chain_id);
        Self { chain_id: cell, ..self }
    }

    pub fn chain_id(&self) -> Option<u64> {
        self.chain_id.get().copied()
    }

    async fn resolve_chain_id(&self) -> Result<u64, InvokeError> {
        if let Some(id) = self.chain_id.get() {
            return Ok(*id);
        }
        let id = self
            .provider
            .get_chainid()
            .await
            .map_err(|e| InvokeError::Rpc(format!("Failed to get chain ID: {}", e)))?
            .as_u64();
        Ok(*self.chain_id.get_or_init(|| id))
    }

    pub async fn get_gas_price(&self) -> Result<U256, InvokeError> {
        let price = self
            .provider
            .get_gas_price()
            .await
            .map_err(|e| InvokeError::Rpc(format!("Failed to get gas price: {}", e)))?;
        debug!("get_gas_price got = 0x{:x}", price);
        Ok(price)
    }
}

/// EIP-1559 caps derived from the legacy gas price: twice the price as the
/// ceiling and a tenth (at least 1 gwei) as the tip, never above the ceiling.
pub fn fee_caps(gas_price: U256) -> (U256, U256) {
    let max_fee_per_gas = gas_price.saturating_mul(U256::from(2u64));
    let max_priority_fee_per_gas =
        (gas_price / U256::from(10u64)).max(U256::from(ONE_GWEI)).min(max_fee_per_gas);
    (max_fee_per_gas, max_priority_fee_per_gas)
}

#[async_trait]
impl<P> ContractInvoker for EthereumClient<P>
where
    P: JsonRpcClient + Clone + 'static + Send + Sync,
{
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn connection_status(&self) -> ConnectionStatus {
        info!(endpoint = %self.endpoint, "Probing RPC endpoint");
        let reported = match self.provider.get_chainid().await {
            Ok(id) => id.as_u64(),
            Err(e) => {
                warn!(endpoint = %self.endpoint, error = %e, "RPC endpoint unreachable");
                return ConnectionStatus::Unreachable { reason: e.to_string() };
            }
        };
        match self.chain_id.get() {
            Some(&pinned) if pinned != reported => ConnectionStatus::Unreachable {
                reason: format!("node reports chain ID {} but {} is configured", reported, pinned),
            },
            _ => {
                let chain_id = *self.chain_id.get_or_init(|| reported);
                info!(endpoint = %self.endpoint, chain_id, "Connected");
                ConnectionStatus::Connected { chain_id }
            }
        }
    }

    async fn block_number(&self) -> Result<u64, InvokeError> {
        let block = self
            .provider
            .get_block_number()
            .await
            .map_err(|e| InvokeError::Rpc(format!("Failed to get block number: {}", e)))?;
        Ok(block.as_u64())
    }

    async fn get_nonce(&self, address: Address) -> Result<u64, InvokeError> {
        debug!(address = ?address, "Getting nonce");
        let nonce = self
            .provider
            .get_transaction_count(address, None)
            .await
            .map_err(|e| InvokeError::Rpc(format!("Failed to get nonce: {}", e)))?;
        Ok(nonce.as_u64())
    }

    async fn send_transaction(
        &self,
        handle: &ContractHandle,
        invocation: &Invocation,
        credential: &AccountCredential,
    ) -> Result<TransactionOutcome, InvokeError> {
        if let Some(from) = invocation.from {
            credential.ensure_sender(from)?;
        }
        info!(
            function = %invocation.function,
            contract = ?handle.address(),
            sender = ?credential.address(),
            "Sending transaction"
        );

        let data = handle.encode_call(&invocation.function, &invocation.args)?;
        let chain_id = self.resolve_chain_id().await?;
        let wallet = credential.signer(chain_id)?;

        let gas_price = self.get_gas_price().await?;
        let (max_fee_per_gas, max_priority_fee_per_gas) = fee_caps(gas_price);

        // Nonce and gas limit are filled by the signer middleware.
        let tx = Eip1559TransactionRequest::new()
            .from(credential.address())
            .to(handle.address())
            .data(data)
            .chain_id(chain_id)
            .max_fee_per_gas(max_fee_per_gas)
            .max_priority_fee_per_gas(max_priority_fee_per_gas);

        let client = SignerMiddleware::new(self.provider.clone(), wallet);
        let pending = client
            .send_transaction(tx, None)
            .await
            .map_err(|e| from_middleware_error(&e, handle))?;

        let tx_hash = format!("0x{}", hex::encode(pending.tx_hash().as_bytes()));
        info!(tx_hash = %tx_hash, "Transaction sent, waiting for receipt");

        let receipt = pending
            .await
            .map_err(|e| from_middleware_error(&e, handle))?
            .ok_or_else(|| InvokeError::Rpc(format!("Transaction {} was dropped from the mempool", tx_hash)))?;

        if receipt.status == Some(U64::zero()) {
            warn!(tx_hash = %tx_hash, "Transaction mined but reverted");
            return Err(InvokeError::Revert { reason: None });
        }

        let outcome = TransactionOutcome {
            tx_hash,
            block_number: receipt.block_number.map(|b| b.as_u64()),
            gas_used: receipt.gas_used,
        };
        info!(
            tx_hash = %outcome.tx_hash,
            block = ?outcome.block_number,
            gas_used = ?outcome.gas_used,
            "Transaction confirmed"
        );
        Ok(outcome)
    }

    async fn call(&self, handle: &ContractHandle, invocation: &Invocation) -> Result<Vec<Token>, InvokeError> {
        debug!(function = %invocation.function, contract = ?handle.address(), "eth_call");
        let data = handle.encode_call(&invocation.function, &invocation.args)?;

        let mut request = TransactionRequest::new().to(handle.address()).data(data);
        if let Some(from) = invocation.from {
            request = request.from(from);
        }
        let tx: TypedTransaction = request.into();

        let raw = self.provider.call(&tx, None).await.map_err(|e| from_middleware_error(&e, handle))?;
        handle.decode_output(&invocation.function, invocation.args.len(), &raw)
    }
}
