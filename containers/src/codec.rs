//! Encoding of values exchanged with the aggregator.
//!
//! Components receive a [`Coder`] at construction instead of reaching for a
//! process-wide encoder.

use crate::merkle::InclusionProof;
use crate::property::Property;
use crate::state_update::StateUpdate;
use crate::transaction::{Transaction, TransactionBody, TransactionReceipt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid hex payload: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("cannot encode {kind}: {source}")]
    Encode {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

pub trait Coder: Send + Sync {
    fn encode_state_update(&self, state_update: &StateUpdate) -> Result<Vec<u8>, CodecError>;
    fn decode_state_update(&self, bytes: &[u8]) -> Result<StateUpdate, CodecError>;
    fn encode_transaction(&self, transaction: &Transaction) -> Result<Vec<u8>, CodecError>;
    /// Bytes the sender signs.
    fn encode_transaction_body(&self, body: &TransactionBody) -> Result<Vec<u8>, CodecError>;
    fn decode_receipt(&self, bytes: &[u8]) -> Result<TransactionReceipt, CodecError>;
    fn decode_inclusion_proof(&self, bytes: &[u8]) -> Result<InclusionProof, CodecError>;
    /// State object carried by checkpoint logs.
    fn decode_property(&self, bytes: &[u8]) -> Result<Property, CodecError>;
}

/// Canonical JSON encoding.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonCoder;

impl JsonCoder {
    fn encode<T: Serialize>(kind: &'static str, value: &T) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(value).map_err(|source| CodecError::Encode { kind, source })
    }

    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl Coder for JsonCoder {
    fn encode_state_update(&self, state_update: &StateUpdate) -> Result<Vec<u8>, CodecError> {
        Self::encode("state update", state_update)
    }

    fn decode_state_update(&self, bytes: &[u8]) -> Result<StateUpdate, CodecError> {
        Self::decode(bytes)
    }

    fn encode_transaction(&self, transaction: &Transaction) -> Result<Vec<u8>, CodecError> {
        Self::encode("transaction", transaction)
    }

    fn encode_transaction_body(&self, body: &TransactionBody) -> Result<Vec<u8>, CodecError> {
        Self::encode("transaction body", body)
    }

    fn decode_receipt(&self, bytes: &[u8]) -> Result<TransactionReceipt, CodecError> {
        Self::decode(bytes)
    }

    fn decode_inclusion_proof(&self, bytes: &[u8]) -> Result<InclusionProof, CodecError> {
        Self::decode(bytes)
    }

    fn decode_property(&self, bytes: &[u8]) -> Result<Property, CodecError> {
        Self::decode(bytes)
    }
}

/// `0x`-prefixed hex, the aggregator's transport form for encoded values.
pub fn to_hex_string(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

pub fn from_hex_string(value: &str) -> Result<Vec<u8>, CodecError> {
    let trimmed = value.strip_prefix("0x").unwrap_or(value);
    Ok(hex::decode(trimmed)?)
}
