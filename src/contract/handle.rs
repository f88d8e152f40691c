use ethers::abi::token::{LenientTokenizer, Tokenizer};
use ethers::abi::{self, ParamType, Token};
use ethers::types::{Address, Bytes};
use std::sync::Arc;

use super::artifact::InterfaceDescription;
use crate::core::abi::{canonical_signature, decode_standard_revert, selector_from_signature, split_selector};
use crate::core::domain::token_to_json;
use crate::core::errors::InvokeError;

/// A deployed address paired with the interface used to talk to it.
///
/// Binding performs no I/O and no check that code exists at `address`; a
/// mismatch only shows up when a call is made.
#[derive(Debug, Clone)]
pub struct ContractHandle {
    address: Address,
    interface: Arc<InterfaceDescription>,
}

impl ContractHandle {
    pub fn bind(address: Address, interface: Arc<InterfaceDescription>) -> Self {
        Self { address, interface }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn interface(&self) -> &InterfaceDescription {
        &self.interface
    }

    /// ABI-encode a call to `function` with `args` (selector + arguments).
    pub fn encode_call(&self, function: &str, args: &[Token]) -> Result<Bytes, InvokeError> {
        let f = self.interface.overload(function, args.len())?;
        let data = f
            .encode_input(args)
            .map_err(|e| InvokeError::Encoding(format!("{}: {}", f.signature(), e)))?;
        Ok(Bytes::from(data))
    }

    /// Decode `eth_call` return data for the overload of `function` with `arity` inputs.
    pub fn decode_output(&self, function: &str, arity: usize, data: &[u8]) -> Result<Vec<Token>, InvokeError> {
        let f = self.interface.overload(function, arity)?;
        if data.is_empty() && !f.outputs.is_empty() {
            return Err(InvokeError::Decoding(format!(
                "{} returned no data; is the contract deployed at {:?}?",
                function, self.address
            )));
        }
        f.decode_output(data).map_err(|e| InvokeError::Decoding(format!("{}: {}", function, e)))
    }

    /// Turn command-line strings into tokens typed by the function's inputs.
    pub fn tokenize_args(&self, function: &str, raw: &[String]) -> Result<Vec<Token>, InvokeError> {
        let f = self.interface.overload(function, raw.len())?;
        f.inputs
            .iter()
            .zip(raw)
            .map(|(param, value)| {
                LenientTokenizer::tokenize(&param.kind, value).map_err(|e| {
                    InvokeError::Encoding(format!(
                        "argument '{}' ({}) of {}: {}",
                        param.name, param.kind, function, e
                    ))
                })
            })
            .collect()
    }

    /// Human-readable form of revert data, naming custom errors from the interface.
    pub fn describe_revert(&self, data: &[u8]) -> Option<String> {
        if let Some(reason) = decode_standard_revert(data) {
            return Some(reason);
        }
        let (selector, body) = split_selector(data)?;
        for error in self.interface.custom_errors() {
            let kinds: Vec<ParamType> = error.inputs.iter().map(|p| p.kind.clone()).collect();
            if selector_from_signature(&canonical_signature(&error.name, &kinds)) != selector {
                continue;
            }
            let rendered = match abi::decode(&kinds, body) {
                Ok(tokens) => tokens.iter().map(|t| token_to_json(t).to_string()).collect::<Vec<_>>().join(", "),
                Err(_) => format!("0x{}", hex::encode(body)),
            };
            return Some(format!("{}({})", error.name, rendered));
        }
        Some(format!("unrecognized revert data 0x{}", hex::encode(data)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::U256;
    use std::str::FromStr;

    const FIXTURE: &str = include_str!("../../tests/fixtures/BC24.json");
    const OWNER: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    fn handle() -> ContractHandle {
        let iface = InterfaceDescription::from_json_str(FIXTURE, "BC24.json").unwrap();
        ContractHandle::bind(Address::from_low_u64_be(0x24), Arc::new(iface))
    }

    #[test]
    fn test_encode_create_token() {
        let owner = Address::from_str(OWNER).unwrap();
        let data = handle().encode_call("createToken", &[Token::Address(owner)]).unwrap();
        assert_eq!(data.len(), 4 + 32);
        assert_eq!(&data[..4], &selector_from_signature("createToken(address)"));
        assert_eq!(&data[16..36], owner.as_bytes());
    }

    #[test]
    fn test_encode_rejects_wrong_types_and_arity() {
        let h = handle();
        let err = h.encode_call("createToken", &[Token::String("nope".into())]).unwrap_err();
        assert!(matches!(err, InvokeError::Encoding(_)));
        let err = h.encode_call("createToken", &[]).unwrap_err();
        assert!(matches!(err, InvokeError::Encoding(_)));
        let err = h.encode_call("mint", &[]).unwrap_err();
        assert!(matches!(err, InvokeError::UnknownFunction(_)));
    }

    #[test]
    fn test_decode_get_metadata_output() {
        let record = Token::Tuple(vec![
            Token::String("Cow".into()),
            Token::String("Zurich".into()),
            Token::String("male".into()),
            Token::Uint(U256::from(300)),
            Token::String("healthy".into()),
        ]);
        let encoded = abi::encode(&[record.clone()]);
        let decoded = handle().decode_output("getMetaData", 1, &encoded).unwrap();
        assert_eq!(decoded, vec![record]);
    }

    #[test]
    fn test_decode_empty_return_data() {
        let err = handle().decode_output("getMetaData", 1, &[]).unwrap_err();
        assert!(err.to_string().contains("deployed"));
    }

    #[test]
    fn test_tokenize_cli_args() {
        let raw: Vec<String> = ["0", "Cow", "Zurich", "male", "300", "healthy"].iter().map(|s| s.to_string()).collect();
        let tokens = handle().tokenize_args("addBreedingInfo", &raw).unwrap();
        assert_eq!(tokens[0], Token::Uint(U256::zero()));
        assert_eq!(tokens[1], Token::String("Cow".into()));
        assert_eq!(tokens[4], Token::Uint(U256::from(300)));

        let bad = vec!["not-an-address".to_string()];
        assert!(matches!(handle().tokenize_args("createToken", &bad), Err(InvokeError::Encoding(_))));
    }

    #[test]
    fn test_describe_custom_error() {
        let account = Address::from_str(OWNER).unwrap();
        let role = [0x11u8; 32];
        let mut data =
            selector_from_signature("AccessControlUnauthorizedAccount(address,bytes32)").to_vec();
        data.extend(abi::encode(&[Token::Address(account), Token::FixedBytes(role.to_vec())]));

        let described = handle().describe_revert(&data).unwrap();
        assert!(described.starts_with("AccessControlUnauthorizedAccount("), "{}", described);
        assert!(described.contains(OWNER));
    }

    #[test]
    fn test_describe_unknown_revert() {
        let described = handle().describe_revert(&[0xca, 0xfe, 0xba, 0xbe]).unwrap();
        assert_eq!(described, "unrecognized revert data 0xcafebabe");
        assert!(handle().describe_revert(&[0x01]).is_none());
    }
}
