use crate::block_number::BlockNumber;
use crate::property::{ownership_owner, PredicateTable, Property};
use crate::range::Range;
use crate::types::{Address, DepositContract, U256};
use serde::{Deserialize, Serialize};

/// Assertion that `state_object` decides who may spend `range` of the
/// deposit contract's coin space, as of `block_number`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateUpdate {
    /// Decider of the state-update claim itself.
    pub predicate: Address,
    pub deposit_contract: DepositContract,
    pub range: Range,
    pub block_number: BlockNumber,
    pub state_object: Property,
}

/// Storage form of a [`StateUpdate`]: everything except the range, which is
/// carried by the range-store key. Splitting a stored range therefore never
/// needs to rewrite the record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateUpdateRecord {
    pub predicate: Address,
    pub deposit_contract: DepositContract,
    pub block_number: BlockNumber,
    pub state_object: Property,
}

impl StateUpdate {
    pub fn new(
        predicate: Address,
        deposit_contract: DepositContract,
        range: Range,
        block_number: BlockNumber,
        state_object: Property,
    ) -> Self {
        Self {
            predicate,
            deposit_contract,
            range,
            block_number,
            state_object,
        }
    }

    pub fn amount(&self) -> U256 {
        self.range.amount()
    }

    /// Same claim restricted to another range.
    pub fn with_range(&self, range: Range) -> Self {
        Self {
            range,
            ..self.clone()
        }
    }

    pub fn to_record(&self) -> StateUpdateRecord {
        StateUpdateRecord {
            predicate: self.predicate,
            deposit_contract: self.deposit_contract,
            block_number: self.block_number,
            state_object: self.state_object.clone(),
        }
    }

    pub fn from_record(record: StateUpdateRecord, range: Range) -> Self {
        Self {
            predicate: record.predicate,
            deposit_contract: record.deposit_contract,
            range,
            block_number: record.block_number,
            state_object: record.state_object,
        }
    }

    pub fn is_ownership_state(&self, predicates: &PredicateTable) -> bool {
        self.owner(predicates).is_some()
    }

    pub fn owner(&self, predicates: &PredicateTable) -> Option<Address> {
        ownership_owner(&self.state_object, predicates)
    }
}
