//! Sync tracker persistence

use containers::*;
use ledger::{LedgerError, SyncTracker};
use pretty_assertions::assert_eq;

mod common;
use common::*;

fn root(byte: u8) -> Bytes32 {
    Bytes32::repeat_byte(byte)
}

#[test]
fn test_never_synced_reports_none() {
    let tracker = SyncTracker::new(new_store());
    assert_eq!(tracker.latest_synced_block_number().unwrap(), None);
}

#[test]
fn test_first_advance_accepts_any_block() {
    let tracker = SyncTracker::new(new_store());

    tracker.advance(BlockNumber(12), root(12)).unwrap();

    assert_eq!(tracker.latest_synced_block_number().unwrap(), Some(BlockNumber(12)));
}

#[test]
fn test_advance_requires_successor() {
    let tracker = SyncTracker::new(new_store());
    tracker.advance(BlockNumber(0), root(0)).unwrap();
    tracker.advance(BlockNumber(1), root(1)).unwrap();

    let skipped = tracker.advance(BlockNumber(3), root(3));
    assert!(matches!(
        skipped,
        Err(LedgerError::NonSequentialBlock { latest: 1, got: 3 })
    ));

    let repeated = tracker.advance(BlockNumber(1), root(1));
    assert!(matches!(repeated, Err(LedgerError::NonSequentialBlock { .. })));

    assert_eq!(tracker.latest_synced_block_number().unwrap(), Some(BlockNumber(1)));
    assert_eq!(tracker.root_for(BlockNumber(3)).unwrap(), None);
}

#[test]
fn test_state_survives_new_handle_on_same_store() {
    let store = new_store();
    SyncTracker::new(store.clone())
        .advance(BlockNumber(0), root(7))
        .unwrap();

    let reopened = SyncTracker::new(store);

    assert_eq!(reopened.latest_synced_block_number().unwrap(), Some(BlockNumber(0)));
    assert_eq!(reopened.root_for(BlockNumber(0)).unwrap(), Some(root(7)));
}

#[test]
fn test_tracker_does_not_collide_with_state_ledger() {
    let store = new_store();
    let ledger = ledger::StateLedger::new(store.clone());
    let tracker = SyncTracker::new(store);

    ledger
        .insert(ledger::StateKind::Verified, &deposit_contract(), &state_update(0, 10, 0))
        .unwrap();
    tracker.advance(BlockNumber(0), root(1)).unwrap();

    assert_eq!(
        ledger
            .all(ledger::StateKind::Verified, &deposit_contract())
            .unwrap()
            .len(),
        1
    );
}
