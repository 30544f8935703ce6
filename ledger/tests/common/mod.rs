//! Shared fixtures for ledger tests

use containers::*;
use ledger::{InMemoryKeyValueStore, KeyValueStore, StateLedger};
use std::sync::Arc;

pub fn deposit_contract() -> DepositContract {
    Address::repeat_byte(0xdc)
}

pub fn other_deposit_contract() -> DepositContract {
    Address::repeat_byte(0xdd)
}

pub fn predicates() -> PredicateTable {
    PredicateTable {
        there_exists: Address::repeat_byte(0x01),
        is_valid_signature: Address::repeat_byte(0x02),
        state_update: Address::repeat_byte(0x03),
    }
}

pub fn owner() -> Address {
    Address::repeat_byte(0xaa)
}

pub fn range(start: u64, end: u64) -> Range {
    Range::from_u64(start, end).unwrap()
}

pub fn state_update(start: u64, end: u64, block: u64) -> StateUpdate {
    StateUpdate::new(
        predicates().state_update,
        deposit_contract(),
        range(start, end),
        BlockNumber(block),
        ownership_property(owner(), &predicates()),
    )
}

pub fn new_store() -> Arc<dyn KeyValueStore> {
    Arc::new(InMemoryKeyValueStore::new())
}

pub fn new_ledger() -> StateLedger {
    StateLedger::new(new_store())
}

pub fn ranges(updates: &[StateUpdate]) -> Vec<Range> {
    updates.iter().map(|su| su.range).collect()
}
