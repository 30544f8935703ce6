//! Ownership-condition expressions.
//!
//! A [`Property`] is an opaque claim evaluated by an external decider
//! contract. The client never evaluates properties; it only needs to build
//! the ownership shape for outgoing transfers and to recognize that shape on
//! incoming state updates to learn who owns a range.

use crate::types::{Address, Bytes};
use serde::{Deserialize, Serialize};

const TX_HINT: &str = "tx,key";
const SIG_HINT: &str = "sig,key";
const TX_VARIABLE: &str = "tx";
const SIG_VARIABLE: &str = "sig";
const SIGNATURE_SCHEME: &str = "secp256k1";

/// One argument of a [`Property`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum PropertyInput {
    Bytes(Bytes),
    Address(Address),
    /// Placeholder bound by an enclosing quantifier.
    Variable(String),
    Property(Box<Property>),
}

/// A decider address applied to a list of inputs.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub decider: Address,
    pub inputs: Vec<PropertyInput>,
}

/// Decider contract addresses the client knows how to recognize.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PredicateTable {
    pub there_exists: Address,
    pub is_valid_signature: Address,
    /// Decider of the state-update property wrapping every state object.
    pub state_update: Address,
}

impl Property {
    pub fn new(decider: Address, inputs: Vec<PropertyInput>) -> Self {
        Self { decider, inputs }
    }

    /// Nested property stored at `index`, if that input is a property.
    pub fn child(&self, index: usize) -> Option<&Property> {
        match self.inputs.get(index)? {
            PropertyInput::Property(inner) => Some(inner),
            _ => None,
        }
    }

    pub fn address_at(&self, index: usize) -> Option<Address> {
        match self.inputs.get(index)? {
            PropertyInput::Address(address) => Some(*address),
            _ => None,
        }
    }
}

fn bytes_input(value: &str) -> PropertyInput {
    PropertyInput::Bytes(Bytes::copy_from_slice(value.as_bytes()))
}

/// Build the ownership property that lets `owner` spend a range by signing
/// the spending transaction.
pub fn ownership_property(owner: Address, predicates: &PredicateTable) -> Property {
    let is_valid_signature = Property::new(
        predicates.is_valid_signature,
        vec![
            PropertyInput::Variable(TX_VARIABLE.to_string()),
            PropertyInput::Variable(SIG_VARIABLE.to_string()),
            PropertyInput::Address(owner),
            bytes_input(SIGNATURE_SCHEME),
        ],
    );
    let exists_sig = Property::new(
        predicates.there_exists,
        vec![
            bytes_input(SIG_HINT),
            bytes_input(SIG_VARIABLE),
            PropertyInput::Property(Box::new(is_valid_signature)),
        ],
    );
    Property::new(
        predicates.there_exists,
        vec![
            bytes_input(TX_HINT),
            bytes_input(TX_VARIABLE),
            PropertyInput::Property(Box::new(exists_sig)),
        ],
    )
}

/// Extract the owner from an ownership-shaped property.
///
/// Only the decider chain `ThereExists → ThereExists → IsValidSignature` is
/// inspected, with the quantified body at input 2 of each quantifier and the
/// owner at input 2 of the signature check. Anything else yields `None`.
pub fn ownership_owner(property: &Property, predicates: &PredicateTable) -> Option<Address> {
    if property.decider != predicates.there_exists {
        return None;
    }
    let exists_sig = property.child(2)?;
    if exists_sig.decider != predicates.there_exists {
        return None;
    }
    let signature_check = exists_sig.child(2)?;
    if signature_check.decider != predicates.is_valid_signature {
        return None;
    }
    signature_check.address_at(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    fn predicates() -> PredicateTable {
        PredicateTable {
            there_exists: address!("0x1000000000000000000000000000000000000001"),
            is_valid_signature: address!("0x1000000000000000000000000000000000000002"),
            state_update: address!("0x1000000000000000000000000000000000000003"),
        }
    }

    #[test]
    fn test_owner_round_trips_through_builder() {
        let owner = address!("0x00000000000000000000000000000000000000aa");
        let property = ownership_property(owner, &predicates());

        assert_eq!(ownership_owner(&property, &predicates()), Some(owner));
    }

    #[test]
    fn test_foreign_decider_is_not_ownership() {
        let owner = address!("0x00000000000000000000000000000000000000aa");
        let mut property = ownership_property(owner, &predicates());
        property.decider = Address::ZERO;

        assert_eq!(ownership_owner(&property, &predicates()), None);
    }

    #[test]
    fn test_truncated_tree_is_not_ownership() {
        let property = Property::new(
            predicates().there_exists,
            vec![bytes_input(TX_HINT), bytes_input(TX_VARIABLE)],
        );
        assert_eq!(ownership_owner(&property, &predicates()), None);
    }

    #[test]
    fn test_inner_signature_check_must_match() {
        let owner = address!("0x00000000000000000000000000000000000000aa");
        let mut property = ownership_property(owner, &predicates());
        if let Some(PropertyInput::Property(exists_sig)) = property.inputs.get_mut(2) {
            if let Some(PropertyInput::Property(check)) = exists_sig.inputs.get_mut(2) {
                check.decider = predicates().state_update;
            }
        }
        assert_eq!(ownership_owner(&property, &predicates()), None);
    }
}
