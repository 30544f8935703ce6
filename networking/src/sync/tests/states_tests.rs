use crate::sync::SyncState;
use rstest::rstest;

#[rstest]
#[case(SyncState::Idle, SyncState::CatchingUp, true)]
#[case(SyncState::Idle, SyncState::LiveVerifying, false)]
#[case(SyncState::CatchingUp, SyncState::LiveVerifying, true)]
#[case(SyncState::CatchingUp, SyncState::Idle, true)]
#[case(SyncState::LiveVerifying, SyncState::CatchingUp, true)]
#[case(SyncState::LiveVerifying, SyncState::Idle, false)]
fn test_transitions(#[case] from: SyncState, #[case] to: SyncState, #[case] allowed: bool) {
    assert_eq!(from.can_transition_to(to), allowed);
}

#[test]
fn test_default_is_idle() {
    assert_eq!(SyncState::default(), SyncState::Idle);
}
