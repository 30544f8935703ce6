pub mod block_number;
pub mod checkpoint;
pub mod codec;
pub mod config;
pub mod merkle;
pub mod property;
pub mod range;
pub mod state_update;
pub mod transaction;
pub mod types;

pub use block_number::BlockNumber;
pub use checkpoint::Checkpoint;
pub use codec::{Coder, CodecError, JsonCoder};
pub use config::{ClientConfig, TokenConfig};
pub use merkle::{InclusionProof, KeccakMerkleVerifier, MerkleVerifier};
pub use property::{
    ownership_owner, ownership_property, PredicateTable, Property, PropertyInput,
};
pub use range::{InvalidRange, Range};
pub use state_update::{StateUpdate, StateUpdateRecord};
pub use transaction::{ReceiptStatus, Transaction, TransactionBody, TransactionReceipt};
pub use types::{Address, Bytes, Bytes32, DepositContract, U256};
