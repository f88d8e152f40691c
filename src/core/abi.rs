use ethers::abi::{self, ParamType, Token};
use sha3::{Digest, Keccak256};

/// Selector of the built-in `Error(string)` revert payload.
pub const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];
/// Selector of the built-in `Panic(uint256)` revert payload.
pub const PANIC_SELECTOR: [u8; 4] = [0x4e, 0x48, 0x7b, 0x71];

/// Compute the first 4 bytes (function selector) from a signature string, e.g. "transfer(address,uint256)".
pub fn selector_from_signature(signature: &str) -> [u8; 4] {
    let mut keccak = Keccak256::new();
    keccak.update(signature.as_bytes());
    let out = keccak.finalize();
    [out[0], out[1], out[2], out[3]]
}

/// Canonical signature string, e.g. `AccessControlUnauthorizedAccount(address,bytes32)`.
pub fn canonical_signature(name: &str, kinds: &[ParamType]) -> String {
    let params: Vec<String> = kinds.iter().map(|k| k.to_string()).collect();
    format!("{}({})", name, params.join(","))
}

/// Split revert or calldata into its selector and the encoded body.
pub fn split_selector(data: &[u8]) -> Option<([u8; 4], &[u8])> {
    if data.len() < 4 {
        return None;
    }
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&data[..4]);
    Some((selector, &data[4..]))
}

/// Decode the two revert payloads every Solidity contract can emit.
///
/// Returns `None` when `data` carries a custom error or garbage; custom errors
/// need the contract interface to be named.
pub fn decode_standard_revert(data: &[u8]) -> Option<String> {
    let (selector, body) = split_selector(data)?;
    if selector == ERROR_STRING_SELECTOR {
        return match abi::decode(&[ParamType::String], body).ok()?.pop()? {
            Token::String(reason) => Some(reason),
            _ => None,
        };
    }
    if selector == PANIC_SELECTOR {
        let code = match abi::decode(&[ParamType::Uint(256)], body).ok()?.pop()? {
            Token::Uint(code) => code,
            _ => return None,
        };
        let meaning = match code.low_u64() {
            0x01 => "assertion failed",
            0x11 => "arithmetic overflow or underflow",
            0x12 => "division or modulo by zero",
            0x21 => "invalid enum value",
            0x31 => "pop on empty array",
            0x32 => "array index out of bounds",
            0x41 => "out of memory",
            0x51 => "call to zero-initialized function",
            _ => "unknown panic",
        };
        return Some(format!("panic 0x{:02x} ({})", code.low_u64(), meaning));
    }
    None
}
