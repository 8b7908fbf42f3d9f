use std::fmt;
use std::str::FromStr;

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use thiserror::Error;

/// Environment variable holding the hex-encoded signing key
pub const PRIVATE_KEY_ENV: &str = "PRIVATE_KEY";

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Private key not set: export {0} or add it to .env")]
    MissingKey(String),
    #[error("Invalid private key: {0}")]
    InvalidKey(String),
    #[error("Private key controls {actual}, but config wallet_address is {expected}")]
    AddressMismatch { expected: Address, actual: Address },
}

/// Wallet manager holding the local signing key.
///
/// The key only ever lives in memory; `Debug` prints the address.
#[derive(Clone)]
pub struct WalletManager {
    signer: PrivateKeySigner,
}

impl WalletManager {
    /// Load the key from `PRIVATE_KEY`
    pub fn from_env() -> Result<Self, WalletError> {
        let key = std::env::var(PRIVATE_KEY_ENV)
            .map_err(|_| WalletError::MissingKey(PRIVATE_KEY_ENV.to_string()))?;
        Self::from_hex(&key)
    }

    /// Parse a 32-byte hex key, with or without `0x`
    pub fn from_hex(key: &str) -> Result<Self, WalletError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(WalletError::MissingKey(PRIVATE_KEY_ENV.to_string()));
        }
        // Error text from the parser never includes the key itself
        let signer = PrivateKeySigner::from_str(key)
            .map_err(|e| WalletError::InvalidKey(e.to_string()))?;
        Ok(Self { signer })
    }

    /// Create a new random key (for testing)
    pub fn new_random() -> Self {
        Self {
            signer: PrivateKeySigner::random(),
        }
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }

    /// Guard against trading from a different account than the one configured
    pub fn verify_address(&self, expected: Address) -> Result<(), WalletError> {
        let actual = self.address();
        if actual != expected {
            return Err(WalletError::AddressMismatch { expected, actual });
        }
        Ok(())
    }
}

impl fmt::Debug for WalletManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletManager")
            .field("address", &self.address())
            .finish()
    }
}
