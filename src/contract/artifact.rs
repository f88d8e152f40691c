//! Loading the contract interface from a compiled artifact.

use ethers::abi::ethabi::AbiError;
use ethers::abi::{Abi, Function, StateMutability};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

use crate::core::errors::InvokeError;

/// Shape shared by Hardhat and Foundry artifacts; only the fields we read.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArtifactFile {
    contract_name: Option<String>,
    source_name: Option<String>,
    abi: Option<Value>,
}

/// Parsed `abi` section of an artifact plus the metadata that came with it.
#[derive(Debug, Clone)]
pub struct InterfaceDescription {
    abi: Abi,
    contract_name: Option<String>,
    source_name: Option<String>,
}

impl InterfaceDescription {
    /// Read and parse the artifact at `path`.
    pub fn load(path: &Path) -> Result<Self, InvokeError> {
        let shown = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => InvokeError::ArtifactNotFound { path: shown.clone() },
            _ => InvokeError::ArtifactParse { path: shown.clone(), reason: e.to_string() },
        })?;
        let interface = Self::from_json_str(&content, &shown)?;
        info!(
            path = %shown,
            contract = interface.contract_name().unwrap_or("<unnamed>"),
            functions = interface.abi.functions.len(),
            "Loaded contract interface"
        );
        Ok(interface)
    }

    /// Parse an artifact object (`{"abi": [...]}`) or a bare ABI array.
    pub fn from_json_str(content: &str, origin: &str) -> Result<Self, InvokeError> {
        let parse_err = |reason: String| InvokeError::ArtifactParse { path: origin.to_string(), reason };

        let root: Value = serde_json::from_str(content).map_err(|e| parse_err(e.to_string()))?;
        let (abi_value, contract_name, source_name) = match root {
            Value::Array(_) => (root, None, None),
            Value::Object(_) => {
                let artifact: ArtifactFile =
                    serde_json::from_value(root).map_err(|e| parse_err(e.to_string()))?;
                let abi = artifact.abi.ok_or_else(|| parse_err("missing `abi` field".to_string()))?;
                (abi, artifact.contract_name, artifact.source_name)
            }
            _ => return Err(parse_err("expected a JSON object or array".to_string())),
        };

        let abi: Abi =
            serde_json::from_value(abi_value).map_err(|e| parse_err(format!("invalid abi: {}", e)))?;
        if abi.functions.is_empty() {
            return Err(parse_err("abi declares no functions".to_string()));
        }
        debug!(origin, functions = ?abi.functions.keys().collect::<Vec<_>>(), "Parsed abi");

        Ok(Self { abi, contract_name, source_name })
    }

    /// Wrap an already-parsed ABI.
    pub fn from_abi(abi: Abi) -> Self {
        Self { abi, contract_name: None, source_name: None }
    }

    pub fn abi(&self) -> &Abi {
        &self.abi
    }

    pub fn contract_name(&self) -> Option<&str> {
        self.contract_name.as_deref()
    }

    pub fn source_name(&self) -> Option<&str> {
        self.source_name.as_deref()
    }

    /// Function names in lexical order, one entry per name.
    pub fn function_names(&self) -> Vec<&str> {
        self.abi.functions.keys().map(String::as_str).collect()
    }

    /// All functions including overloads.
    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.abi.functions.values().flatten()
    }

    /// Custom errors declared by the contract.
    pub fn custom_errors(&self) -> impl Iterator<Item = &AbiError> {
        self.abi.errors.values().flatten()
    }

    /// First function with this name.
    pub fn function(&self, name: &str) -> Result<&Function, InvokeError> {
        self.abi
            .functions
            .get(name)
            .and_then(|overloads| overloads.first())
            .ok_or_else(|| InvokeError::UnknownFunction(name.to_string()))
    }

    /// The overload of `name` taking exactly `arity` arguments.
    pub fn overload(&self, name: &str, arity: usize) -> Result<&Function, InvokeError> {
        let overloads =
            self.abi.functions.get(name).ok_or_else(|| InvokeError::UnknownFunction(name.to_string()))?;
        overloads.iter().find(|f| f.inputs.len() == arity).ok_or_else(|| {
            let expected: Vec<String> = overloads.iter().map(|f| f.inputs.len().to_string()).collect();
            InvokeError::Encoding(format!(
                "{} takes {} argument(s), {} given",
                name,
                expected.join(" or "),
                arity
            ))
        })
    }

    /// View and pure functions are served by `eth_call`; everything else needs a transaction.
    pub fn is_read_only(&self, name: &str) -> Result<bool, InvokeError> {
        Ok(is_read_only(self.function(name)?))
    }

    /// Fail unless every name in `required` is declared.
    pub fn require_functions(&self, required: &[&str]) -> Result<(), InvokeError> {
        let missing: Vec<&str> =
            required.iter().copied().filter(|name| !self.abi.functions.contains_key(*name)).collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(InvokeError::MissingFunction(missing.join(", ")))
        }
    }
}

pub fn is_read_only(function: &Function) -> bool {
    matches!(function.state_mutability, StateMutability::View | StateMutability::Pure)
}
