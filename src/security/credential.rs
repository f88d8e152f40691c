//! Signing credential for the sender account.
//!
//! The key is read from an environment variable at startup, kept in a
//! zeroize-on-drop buffer and only exposed inside a closure when a wallet has
//! to be built for signing.

use ethers::signers::{LocalWallet, Signer};
use ethers::types::Address;
use secrecy::{ExposeSecret, Secret};
use std::fmt;
use zeroize::Zeroizing;

use crate::core::errors::InvokeError;

/// 32-byte secp256k1 secret key.
pub struct PrivateKey(Secret<[u8; 32]>);

impl PrivateKey {
    /// Try to construct a PrivateKey from a byte slice (must be 32 bytes).
    pub fn try_from_slice(slice: &[u8]) -> Result<Self, InvokeError> {
        if slice.len() != 32 {
            return Err(InvokeError::Credential(format!(
                "Private key must be 32 bytes, got {}",
                slice.len()
            )));
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(slice);
        let key = PrivateKey(Secret::new(arr));
        zeroize::Zeroize::zeroize(&mut arr);
        Ok(key)
    }

    /// Scoped access to the underlying secret bytes.
    pub fn with_secret<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&[u8; 32]) -> R,
    {
        f(self.0.expose_secret())
    }
}

/// Sender address and the key that signs for it.
pub struct AccountCredential {
    address: Address,
    key: PrivateKey,
}

impl AccountCredential {
    /// Parse a hex private key, with or without `0x`.
    pub fn from_hex(raw: &str) -> Result<Self, InvokeError> {
        let trimmed = raw.trim();
        let hex_part = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = Zeroizing::new(
            hex::decode(hex_part)
                .map_err(|_| InvokeError::Credential("Private key is not valid hex".to_string()))?,
        );
        let key = PrivateKey::try_from_slice(&bytes)?;
        let address = key.with_secret(|b| build_wallet(b))?.address();
        Ok(Self { address, key })
    }

    /// Load the key from the environment variable `var`.
    ///
    /// When `expected` is set the derived address must match it, so a
    /// configured sender can never sign with somebody else's key.
    pub fn from_env(var: &str, expected: Option<Address>) -> Result<Self, InvokeError> {
        let raw = Zeroizing::new(std::env::var(var).map_err(|_| {
            InvokeError::Credential(format!("Environment variable {} is not set", var))
        })?);
        let credential = Self::from_hex(&raw)?;
        if let Some(expected) = expected {
            credential.ensure_sender(expected)?;
        }
        tracing::info!(sender = ?credential.address, key_env = var, "Loaded signing credential");
        Ok(credential)
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn ensure_sender(&self, expected: Address) -> Result<(), InvokeError> {
        if self.address != expected {
            return Err(InvokeError::Credential(format!(
                "Private key belongs to {:?}, not the configured sender {:?}",
                self.address, expected
            )));
        }
        Ok(())
    }

    /// Build a wallet bound to `chain_id` for signing one or more transactions.
    pub fn signer(&self, chain_id: u64) -> Result<LocalWallet, InvokeError> {
        Ok(self.key.with_secret(|b| build_wallet(b))?.with_chain_id(chain_id))
    }
}

impl fmt::Debug for AccountCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountCredential")
            .field("address", &self.address)
            .field("key", &"<redacted>")
            .finish()
    }
}

fn build_wallet(key: &[u8; 32]) -> Result<LocalWallet, InvokeError> {
    LocalWallet::from_bytes(key).map_err(|e| InvokeError::Credential(format!("Invalid private key: {}", e)))
}
