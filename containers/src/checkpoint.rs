use crate::property::{Property, PropertyInput};
use crate::range::Range;
use crate::types::{coin_key, keccak256, Bytes32};
use serde::{Deserialize, Serialize};

/// Finalized commitment of a range's ownership.
///
/// Once a checkpoint is finalized on the deposit contract, the history of
/// `range` before it no longer needs to be kept by the client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub range: Range,
    pub state_object: Property,
}

impl Checkpoint {
    pub fn new(range: Range, state_object: Property) -> Self {
        Self {
            range,
            state_object,
        }
    }

    /// Content-derived identity: keccak-256 over the range bounds and the
    /// state object's digest.
    pub fn id(&self) -> Bytes32 {
        let mut preimage = Vec::with_capacity(96);
        preimage.extend_from_slice(&coin_key(self.range.start()));
        preimage.extend_from_slice(&coin_key(self.range.end()));
        preimage.extend_from_slice(property_digest(&self.state_object).as_slice());
        keccak256(preimage)
    }
}

/// Structural digest of a property tree. Each input is tagged so that
/// different input kinds with equal payloads never collide.
pub fn property_digest(property: &Property) -> Bytes32 {
    let mut preimage = Vec::new();
    preimage.extend_from_slice(property.decider.as_slice());
    for input in &property.inputs {
        match input {
            PropertyInput::Bytes(bytes) => {
                preimage.push(0);
                preimage.extend_from_slice(&(bytes.len() as u64).to_be_bytes());
                preimage.extend_from_slice(bytes);
            }
            PropertyInput::Address(address) => {
                preimage.push(1);
                preimage.extend_from_slice(address.as_slice());
            }
            PropertyInput::Variable(name) => {
                preimage.push(2);
                preimage.extend_from_slice(&(name.len() as u64).to_be_bytes());
                preimage.extend_from_slice(name.as_bytes());
            }
            PropertyInput::Property(inner) => {
                preimage.push(3);
                preimage.extend_from_slice(property_digest(inner).as_slice());
            }
        }
    }
    keccak256(preimage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Address, Bytes};

    fn checkpoint(start: u64, end: u64) -> Checkpoint {
        Checkpoint::new(
            Range::from_u64(start, end).unwrap(),
            Property::new(Address::ZERO, vec![PropertyInput::Bytes(Bytes::from_static(b"x"))]),
        )
    }

    #[test]
    fn test_id_is_content_derived() {
        assert_eq!(checkpoint(0, 10).id(), checkpoint(0, 10).id());
        assert_ne!(checkpoint(0, 10).id(), checkpoint(0, 11).id());
    }

    #[test]
    fn test_digest_distinguishes_input_kinds() {
        let as_variable = Property::new(Address::ZERO, vec![PropertyInput::Variable("tx".into())]);
        let as_bytes = Property::new(
            Address::ZERO,
            vec![PropertyInput::Bytes(Bytes::from_static(b"tx"))],
        );
        assert_ne!(property_digest(&as_variable), property_digest(&as_bytes));
    }
}
