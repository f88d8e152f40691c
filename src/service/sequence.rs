//! The BC24 invocation flow: connect, mint a token, attach breeding data, read it back.

use ethers::abi::Token;
use ethers::types::{Address, U256};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::blockchain::{ContractInvoker, EthereumClient};
use crate::contract::artifact::is_read_only;
use crate::contract::{ContractHandle, InterfaceDescription};
use crate::core::config::InvocationConfig;
use crate::core::domain::{
    token_to_json, BreedingInfo, ConnectionStatus, Invocation, InvocationResult, TransactionOutcome,
};
use crate::core::errors::InvokeError;
use crate::security::AccountCredential;

/// Functions the sequence calls; an artifact without them is rejected up front.
pub const REQUIRED_FUNCTIONS: &[&str] = &["createToken", "addBreedingInfo", "getMetaData"];

/// Inputs of one sequence run.
#[derive(Debug, Clone, PartialEq)]
pub struct BreedingScenario {
    /// Recipient of the new token; the sender when unset.
    pub token_owner: Option<Address>,
    pub token_id: U256,
    pub info: BreedingInfo,
}

impl Default for BreedingScenario {
    fn default() -> Self {
        Self {
            token_owner: None,
            token_id: U256::zero(),
            info: BreedingInfo {
                species: "Cow".to_string(),
                location: "Zurich".to_string(),
                sex: "male".to_string(),
                weight: U256::from(300u64),
                health_status: "healthy".to_string(),
            },
        }
    }
}

/// What a completed sequence produced.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceReport {
    pub chain_id: u64,
    pub create_token: TransactionOutcome,
    pub add_breeding_info: TransactionOutcome,
    /// Raw `getMetaData` output.
    pub metadata: Vec<Token>,
    /// `metadata` read as a breeding record, when it has that shape.
    pub breeding_info: Option<BreedingInfo>,
}

impl SequenceReport {
    pub fn to_json(&self) -> Value {
        json!({
            "chain_id": self.chain_id,
            "create_token": self.create_token,
            "add_breeding_info": self.add_breeding_info,
            "metadata": self.metadata.iter().map(token_to_json).collect::<Vec<_>>(),
        })
    }
}

/// Call or send `invocation` depending on the function's state mutability.
///
/// Read-only functions go through `eth_call` and need no credential; anything
/// else is signed and fails with `Credential` when none is given.
pub async fn invoke<I>(
    invoker: &I,
    handle: &ContractHandle,
    invocation: &Invocation,
    credential: Option<&AccountCredential>,
) -> Result<InvocationResult, InvokeError>
where
    I: ContractInvoker + ?Sized,
{
    let function = handle.interface().overload(&invocation.function, invocation.args.len())?;
    if is_read_only(function) {
        let tokens = invoker.call(handle, invocation).await?;
        return Ok(InvocationResult::Call(tokens));
    }
    let credential = credential.ok_or_else(|| {
        InvokeError::Credential(format!("{} changes state and needs a signing key", invocation.function))
    })?;
    let outcome = invoker.send_transaction(handle, invocation, credential).await?;
    Ok(InvocationResult::Transaction(outcome))
}

/// Run the fixed sequence. The first failing step ends the run.
pub async fn run_sequence<I>(
    invoker: &I,
    handle: &ContractHandle,
    credential: &AccountCredential,
    scenario: &BreedingScenario,
) -> Result<SequenceReport, InvokeError>
where
    I: ContractInvoker + ?Sized,
{
    let chain_id = match invoker.connection_status().await {
        ConnectionStatus::Connected { chain_id } => chain_id,
        ConnectionStatus::Unreachable { reason } => {
            warn!(endpoint = invoker.endpoint(), "Aborting: node unreachable");
            return Err(InvokeError::ConnectionFailure { endpoint: invoker.endpoint().to_string(), reason });
        }
    };

    let owner = scenario.token_owner.unwrap_or_else(|| credential.address());
    info!(owner = ?owner, "Step 1/3: createToken");
    let create = Invocation::new("createToken", vec![Token::Address(owner)]);
    let create_token = invoker.send_transaction(handle, &create, credential).await?;

    info!(token_id = %scenario.token_id, "Step 2/3: addBreedingInfo");
    let add = Invocation::new("addBreedingInfo", scenario.info.to_call_args(scenario.token_id));
    let add_breeding_info = invoker.send_transaction(handle, &add, credential).await?;

    info!(token_id = %scenario.token_id, "Step 3/3: getMetaData");
    let read = Invocation::new("getMetaData", vec![Token::Uint(scenario.token_id)]).with_sender(credential.address());
    let metadata = invoker.call(handle, &read).await?;

    let breeding_info = BreedingInfo::from_tokens(&metadata);
    if breeding_info.is_none() {
        warn!("getMetaData output is not a breeding record");
    }
    Ok(SequenceReport { chain_id, create_token, add_breeding_info, metadata, breeding_info })
}

/// Load the artifact named by `config` and bind it to the configured address.
pub fn bind_contract(config: &InvocationConfig) -> Result<ContractHandle, InvokeError> {
    let interface = InterfaceDescription::load(&config.artifact_path)?;
    Ok(ContractHandle::bind(config.contract_address, Arc::new(interface)))
}

/// Build the RPC client for `config`. No request is sent.
pub fn connect(config: &InvocationConfig) -> Result<EthereumClient, InvokeError> {
    let client = EthereumClient::new(&config.endpoint, &config.transport)?;
    Ok(match config.chain_id {
        Some(chain_id) => client.with_chain_id(chain_id),
        None => client,
    })
}

/// Entry point for the whole flow.
///
/// The artifact and the credential are checked before the node is contacted,
/// so a wrong path or a missing key never costs a network round trip.
pub async fn run(config: &InvocationConfig, scenario: &BreedingScenario) -> Result<SequenceReport, InvokeError> {
    let handle = bind_contract(config)?;
    handle.interface().require_functions(REQUIRED_FUNCTIONS)?;
    let credential = AccountCredential::from_env(&config.private_key_env, config.sender)?;
    let client = connect(config)?;
    info!(endpoint = %config.endpoint, contract = ?config.contract_address, "Running BC24 sequence");
    run_sequence(&client, &handle, &credential, scenario).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    /// Records every request and answers from a scripted state.
    struct FakeInvoker {
        status: ConnectionStatus,
        fail_on: Option<(&'static str, fn() -> InvokeError)>,
        calls: Mutex<Vec<String>>,
        stored: Mutex<Vec<Token>>,
    }

    impl FakeInvoker {
        fn connected() -> Self {
            Self {
                status: ConnectionStatus::Connected { chain_id: 31337 },
                fail_on: None,
                calls: Mutex::new(Vec::new()),
                stored: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn check(&self, function: &str) -> Result<(), InvokeError> {
            match self.fail_on {
                Some((name, make)) if name == function => Err(make()),
                _ => Ok(()),
            }
        }
    }

    #[async_trait]
    impl ContractInvoker for FakeInvoker {
        fn endpoint(&self) -> &str {
            "fake://node"
        }

        async fn connection_status(&self) -> ConnectionStatus {
            self.calls.lock().unwrap().push("eth_chainId".into());
            self.status.clone()
        }

        async fn block_number(&self) -> Result<u64, InvokeError> {
            Ok(1)
        }

        async fn get_nonce(&self, _address: Address) -> Result<u64, InvokeError> {
            Ok(0)
        }

        async fn send_transaction(
            &self,
            handle: &ContractHandle,
            invocation: &Invocation,
            _credential: &AccountCredential,
        ) -> Result<TransactionOutcome, InvokeError> {
            handle.encode_call(&invocation.function, &invocation.args)?;
            self.calls.lock().unwrap().push(format!("send:{}", invocation.function));
            self.check(&invocation.function)?;
            if invocation.function == "addBreedingInfo" {
                *self.stored.lock().unwrap() = invocation.args[1..].to_vec();
            }
            let n = self.calls.lock().unwrap().len();
            Ok(TransactionOutcome { tx_hash: format!("0x{:064x}", n), block_number: Some(n as u64), gas_used: None })
        }

        async fn call(&self, handle: &ContractHandle, invocation: &Invocation) -> Result<Vec<Token>, InvokeError> {
            handle.encode_call(&invocation.function, &invocation.args)?;
            self.calls.lock().unwrap().push(format!("call:{}", invocation.function));
            self.check(&invocation.function)?;
            Ok(vec![Token::Tuple(self.stored.lock().unwrap().clone())])
        }
    }

    fn not_a_breeder() -> InvokeError {
        InvokeError::InsufficientPermission("Caller is not a breeder".into())
    }

    fn no_such_token() -> InvokeError {
        InvokeError::Revert { reason: Some("Token does not exist".into()) }
    }

    fn handle() -> ContractHandle {
        let iface =
            InterfaceDescription::from_json_str(include_str!("../../tests/fixtures/BC24.json"), "BC24.json")
                .unwrap();
        ContractHandle::bind(Address::from_low_u64_be(0x24), Arc::new(iface))
    }

    fn credential() -> AccountCredential {
        AccountCredential::from_hex(DEV_KEY).unwrap()
    }

    #[tokio::test]
    async fn test_sequence_order_and_readback() {
        let fake = FakeInvoker::connected();
        let report = run_sequence(&fake, &handle(), &credential(), &BreedingScenario::default()).await.unwrap();

        assert_eq!(
            fake.calls(),
            vec!["eth_chainId", "send:createToken", "send:addBreedingInfo", "call:getMetaData"]
        );
        assert_eq!(report.chain_id, 31337);
        assert_eq!(report.breeding_info, Some(BreedingScenario::default().info));
        assert_eq!(
            crate::core::domain::render_tokens(&report.metadata),
            r#"["Cow","Zurich","male",300,"healthy"]"#
        );
    }

    #[tokio::test]
    async fn test_unreachable_node_stops_before_any_transaction() {
        let mut fake = FakeInvoker::connected();
        fake.status = ConnectionStatus::Unreachable { reason: "connection refused".into() };

        let err = run_sequence(&fake, &handle(), &credential(), &BreedingScenario::default()).await.unwrap_err();
        assert!(matches!(err, InvokeError::ConnectionFailure { ref endpoint, .. } if endpoint == "fake://node"));
        assert_eq!(fake.calls(), vec!["eth_chainId"]);
    }

    #[tokio::test]
    async fn test_permission_failure_aborts_sequence() {
        let mut fake = FakeInvoker::connected();
        fake.fail_on = Some(("createToken", not_a_breeder as fn() -> InvokeError));

        let err = run_sequence(&fake, &handle(), &credential(), &BreedingScenario::default()).await.unwrap_err();
        assert!(matches!(err, InvokeError::InsufficientPermission(_)));
        assert_eq!(fake.calls(), vec!["eth_chainId", "send:createToken"]);
    }

    #[tokio::test]
    async fn test_failed_add_skips_read() {
        let mut fake = FakeInvoker::connected();
        fake.fail_on = Some(("addBreedingInfo", no_such_token as fn() -> InvokeError));

        let err = run_sequence(&fake, &handle(), &credential(), &BreedingScenario::default()).await.unwrap_err();
        assert!(err.is_transaction_failure());
        assert!(!fake.calls().contains(&"call:getMetaData".to_string()));
    }

    #[tokio::test]
    async fn test_invoke_dispatches_by_mutability() {
        let fake = FakeInvoker::connected();
        let h = handle();
        let cred = credential();

        let read = Invocation::new("getMetaData", vec![Token::Uint(U256::zero())]);
        assert!(matches!(invoke(&fake, &h, &read, None).await.unwrap(), InvocationResult::Call(_)));

        let write = Invocation::new("createToken", vec![Token::Address(cred.address())]);
        let err = invoke(&fake, &h, &write, None).await.unwrap_err();
        assert!(matches!(err, InvokeError::Credential(_)));
        assert!(matches!(
            invoke(&fake, &h, &write, Some(&cred)).await.unwrap(),
            InvocationResult::Transaction(_)
        ));
        assert_eq!(fake.calls(), vec!["call:getMetaData", "send:createToken"]);
    }

    #[test]
    fn test_report_json() {
        let outcome = TransactionOutcome { tx_hash: "0x01".into(), block_number: Some(1), gas_used: None };
        let report = SequenceReport {
            chain_id: 31337,
            create_token: outcome.clone(),
            add_breeding_info: outcome,
            metadata: vec![Token::Uint(U256::from(7))],
            breeding_info: None,
        };
        let value = report.to_json();
        assert_eq!(value["chain_id"], 31337);
        assert_eq!(value["metadata"], json!([7]));
        assert_eq!(value["create_token"]["tx_hash"], "0x01");
    }
}
