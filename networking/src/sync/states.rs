/// Sync engine state machine.
///
/// There is no terminal state: a live engine keeps handling submissions
/// until it is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    /// Not started, or the last catch-up failed.
    #[default]
    Idle,

    /// Replaying every block between the latest synced block and a target.
    CatchingUp,

    /// Following block submissions as they arrive and re-checking pending
    /// state updates after each one.
    LiveVerifying,
}

impl SyncState {
    /// Check if a transition to the target state is valid.
    pub fn can_transition_to(&self, target: SyncState) -> bool {
        match self {
            SyncState::Idle => matches!(target, SyncState::CatchingUp),
            SyncState::CatchingUp => matches!(target, SyncState::LiveVerifying | SyncState::Idle),
            SyncState::LiveVerifying => matches!(target, SyncState::CatchingUp),
        }
    }
}
