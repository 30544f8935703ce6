use containers::types::keccak256;
use containers::{Address, Bytes};
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("cannot read key file: {0}")]
    Io(#[from] std::io::Error),
    #[error("key is not valid hex: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("invalid secp256k1 key or signature: {0}")]
    Ecdsa(#[from] k256::ecdsa::Error),
}

/// Signing identity of the client.
pub trait Wallet: Send + Sync {
    fn address(&self) -> Address;

    /// 65-byte `r || s || v` signature over the keccak-256 digest of
    /// `message`.
    fn sign(&self, message: &[u8]) -> Result<Bytes, WalletError>;
}

/// Wallet holding a secp256k1 key in memory.
pub struct LocalWallet {
    signing_key: SigningKey,
    address: Address,
}

impl LocalWallet {
    pub fn from_bytes(secret: &[u8]) -> Result<Self, WalletError> {
        let signing_key = SigningKey::from_slice(secret)?;
        let address = address_of(signing_key.verifying_key());
        Ok(Self {
            signing_key,
            address,
        })
    }

    pub fn from_hex(secret: &str) -> Result<Self, WalletError> {
        let trimmed = secret.trim();
        let trimmed = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        Self::from_bytes(&hex::decode(trimmed)?)
    }

    /// Load a hex-encoded private key from `path`.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, WalletError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let wallet = Self::from_hex(&contents)?;
        info!(path = ?path.as_ref(), address = %wallet.address, "Loaded wallet key");
        Ok(wallet)
    }
}

impl Wallet for LocalWallet {
    fn address(&self) -> Address {
        self.address
    }

    fn sign(&self, message: &[u8]) -> Result<Bytes, WalletError> {
        let digest = keccak256(message);
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(digest.as_slice())?;
        let mut bytes = signature.to_bytes().to_vec();
        bytes.push(recovery_id.to_byte() + 27);
        Ok(Bytes::from(bytes))
    }
}

/// Ethereum address of a public key: the low 20 bytes of the keccak-256 of
/// its uncompressed encoding.
pub fn address_of(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

/// Address that produced `signature` over `message`.
pub fn recover_signer(message: &[u8], signature: &[u8]) -> Result<Address, WalletError> {
    if signature.len() != 65 {
        return Err(WalletError::Ecdsa(k256::ecdsa::Error::new()));
    }
    let digest = keccak256(message);
    let parsed = Signature::from_slice(&signature[..64])?;
    let recovery_id = RecoveryId::from_byte(signature[64].wrapping_sub(27))
        .ok_or_else(k256::ecdsa::Error::new)?;
    let key = VerifyingKey::recover_from_prehash(digest.as_slice(), &parsed, recovery_id)?;
    Ok(address_of(&key))
}
