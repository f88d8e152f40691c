use ethers::abi::Token;
use ethers::types::{Address, U256};
use ethers::utils::to_checksum;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One contract function invocation: name, ABI arguments and an optional explicit sender.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub function: String,
    pub args: Vec<Token>,
    /// `from` for read calls; transactions always use the signing credential.
    pub from: Option<Address>,
}

impl Invocation {
    pub fn new(function: impl Into<String>, args: Vec<Token>) -> Self {
        Self { function: function.into(), args, from: None }
    }

    pub fn with_sender(mut self, sender: Address) -> Self {
        self.from = Some(sender);
        self
    }
}

/// Result of a mined transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionOutcome {
    /// 0x-prefixed transaction hash
    pub tx_hash: String,
    pub block_number: Option<u64>,
    pub gas_used: Option<U256>,
}

/// Either a mined transaction or decoded call output.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationResult {
    Transaction(TransactionOutcome),
    Call(Vec<Token>),
}

/// Outcome of the connectivity probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected { chain_id: u64 },
    Unreachable { reason: String },
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected { .. })
    }
}

/// Breeding metadata attached to an animal token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreedingInfo {
    pub species: String,
    pub location: String,
    pub sex: String,
    pub weight: U256,
    pub health_status: String,
}

impl BreedingInfo {
    /// Arguments for `addBreedingInfo(id, species, location, sex, weight, healthStatus)`.
    pub fn to_call_args(&self, token_id: U256) -> Vec<Token> {
        vec![
            Token::Uint(token_id),
            Token::String(self.species.clone()),
            Token::String(self.location.clone()),
            Token::String(self.sex.clone()),
            Token::Uint(self.weight),
            Token::String(self.health_status.clone()),
        ]
    }

    /// Read the record back from `getMetaData` output.
    ///
    /// Accepts a single struct (tuple) token or flat outputs; only the first
    /// five fields are interpreted.
    pub fn from_tokens(tokens: &[Token]) -> Option<Self> {
        let fields = match tokens {
            [Token::Tuple(inner)] => inner.as_slice(),
            flat => flat,
        };
        match fields {
            [Token::String(species), Token::String(location), Token::String(sex), Token::Uint(weight), Token::String(health_status), ..] => {
                Some(Self {
                    species: species.clone(),
                    location: location.clone(),
                    sex: sex.clone(),
                    weight: *weight,
                    health_status: health_status.clone(),
                })
            }
            _ => None,
        }
    }
}

/// Convert a decoded ABI token into JSON for display.
pub fn token_to_json(token: &Token) -> Value {
    match token {
        Token::Address(a) => Value::String(to_checksum(a, None)),
        Token::FixedBytes(b) | Token::Bytes(b) => Value::String(format!("0x{}", hex::encode(b))),
        Token::Int(v) => Value::String(ethers::types::I256::from_raw(*v).to_string()),
        Token::Uint(v) => {
            if *v <= U256::from(u64::MAX) {
                Value::from(v.as_u64())
            } else {
                Value::String(v.to_string())
            }
        }
        Token::Bool(b) => Value::Bool(*b),
        Token::String(s) => Value::String(s.clone()),
        Token::FixedArray(items) | Token::Array(items) | Token::Tuple(items) => {
            Value::Array(items.iter().map(token_to_json).collect())
        }
    }
}

/// Render call output on one line, e.g. `["Cow","Zurich","male",300,"healthy"]`.
pub fn render_tokens(tokens: &[Token]) -> String {
    let value = match tokens {
        [single] => token_to_json(single),
        many => Value::Array(many.iter().map(token_to_json).collect()),
    };
    value.to_string()
}
