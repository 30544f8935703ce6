use containers::{
    ownership_owner, Address, BlockNumber, Bytes32, Checkpoint, ClientConfig, Coder,
    DepositContract, InclusionProof, MerkleVerifier, PredicateTable, StateUpdate,
};
use futures::future::join_all;
use ledger::{
    CheckpointKind, CheckpointRegistry, KeyValueStore, StateKind, StateLedger, SyncTracker,
    TokenRegistry,
};
use metrics::SharedMetrics;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{
    config::{MAX_CONCURRENT_PROOF_REQUESTS, MODE_CATCH_UP, MODE_LIVE},
    errors::SyncError,
    states::SyncState,
};
use crate::{aggregator::Aggregator, contract::CommitmentContract, types::ContractEvent};

/// External services the engine talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub aggregator: Arc<dyn Aggregator>,
    pub contract: Arc<dyn CommitmentContract>,
    pub verifier: Arc<dyn MerkleVerifier>,
    pub coder: Arc<dyn Coder>,
}

/// Clears the in-flight flag when a block sync ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn enter(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
struct Counters {
    blocks_synced: u64,
    failed_syncs: u64,
    pending_confirmed: u64,
    checkpoints_adopted: u64,
}

/// Sync engine coordinating the ledger with the aggregator and the
/// commitment contract.
///
/// Every operation that writes the ledger or the tracker runs under one
/// exclusive guard, so overlapping triggers (a live submission arriving while
/// catch-up is still running) are processed one after the other. The
/// `*_locked` helpers expect the guard to be held by the caller.
pub struct SyncEngine {
    address: Address,
    predicates: PredicateTable,
    genesis_block: BlockNumber,
    ledger: StateLedger,
    tracker: SyncTracker,
    checkpoints: CheckpointRegistry,
    tokens: TokenRegistry,
    collaborators: Collaborators,
    metrics: Option<SharedMetrics>,
    guard: tokio::sync::Mutex<()>,
    syncing: AtomicBool,
    state: Mutex<SyncState>,
    counters: Mutex<Counters>,
}

impl SyncEngine {
    pub fn new(
        address: Address,
        config: &ClientConfig,
        store: Arc<dyn KeyValueStore>,
        tokens: TokenRegistry,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            address,
            predicates: config.predicates,
            genesis_block: config.genesis_block,
            ledger: StateLedger::new(store.clone()),
            tracker: SyncTracker::new(store.clone()),
            checkpoints: CheckpointRegistry::new(store),
            tokens,
            collaborators,
            metrics: None,
            guard: tokio::sync::Mutex::new(()),
            syncing: AtomicBool::new(false),
            state: Mutex::new(SyncState::default()),
            counters: Mutex::new(Counters::default()),
        }
    }

    pub fn with_metrics(mut self, metrics: SharedMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn ledger(&self) -> &StateLedger {
        &self.ledger
    }

    pub fn tracker(&self) -> &SyncTracker {
        &self.tracker
    }

    pub fn checkpoints(&self) -> &CheckpointRegistry {
        &self.checkpoints
    }

    /// Hold the engine's exclusive guard, e.g. to move state updates between
    /// partitions without racing a block sync.
    pub async fn exclusive(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.guard.lock().await
    }

    /// Get current sync state.
    pub fn state(&self) -> SyncState {
        *self.state.lock()
    }

    /// Whether a block sync is in progress. Observational only.
    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::SeqCst)
    }

    fn transition(&self, target: SyncState) {
        let mut state = self.state.lock();
        if *state == target {
            return;
        }
        if !state.can_transition_to(target) {
            warn!(from = ?*state, to = ?target, "Invalid state transition attempted");
            return;
        }
        info!(from = ?*state, to = ?target, "Sync state transition");
        *state = target;
    }

    /// Catch up to the contract head, then follow block submissions.
    ///
    /// Submissions are delivered to `events`; feed the matching receiver to
    /// [`SyncEngine::run`].
    pub async fn start(
        &self,
        events: mpsc::UnboundedSender<ContractEvent>,
    ) -> Result<(), SyncError> {
        let head = self
            .collaborators
            .contract
            .current_block()
            .await
            .map_err(SyncError::Contract)?;
        info!(head = head.0, "Starting sync");

        self.transition(SyncState::CatchingUp);
        {
            let _guard = self.guard.lock().await;
            if let Err(err) = self.sync_until_locked(head, MODE_CATCH_UP).await {
                self.transition(SyncState::Idle);
                return Err(err);
            }
        }
        self.transition(SyncState::LiveVerifying);

        self.collaborators
            .contract
            .subscribe(events)
            .await
            .map_err(SyncError::Contract)
    }

    /// Handle contract events until the channel closes.
    pub async fn run(&self, mut events: mpsc::UnboundedReceiver<ContractEvent>) {
        while let Some(event) = events.recv().await {
            let block = event.block_number();
            if let Err(err) = self.handle_event(event).await {
                warn!(block = block.0, error = %err, "Failed to handle contract event");
            }
        }
        debug!("Contract event channel closed");
    }

    pub async fn handle_event(&self, event: ContractEvent) -> Result<(), SyncError> {
        match event {
            ContractEvent::BlockSubmitted { block_number, root } => {
                self.on_block_submitted(block_number, root).await
            }
            ContractEvent::CheckpointClaimed {
                checkpoint_id,
                deposit_contract,
                checkpoint,
                ..
            } => {
                self.on_checkpoint_claimed(checkpoint_id, deposit_contract, checkpoint)
                    .await
            }
            ContractEvent::CheckpointFinalized {
                checkpoint_id,
                deposit_contract,
                block_number,
                checkpoint,
            } => {
                self.on_checkpoint_finalized(
                    checkpoint_id,
                    deposit_contract,
                    block_number,
                    checkpoint,
                )
                .await
            }
        }
    }

    /// Sync every block after the latest synced one up to `target`.
    ///
    /// Fails without touching the ledger when local history is already past
    /// `target`, and aborts when the contract has no root for a submitted
    /// block. A block whose root cannot be read, or whose state cannot be
    /// fetched or stored, ends the run early; it is retried on the next
    /// trigger.
    pub async fn sync_until(&self, target: BlockNumber) -> Result<(), SyncError> {
        let _guard = self.guard.lock().await;
        self.sync_until_locked(target, MODE_CATCH_UP).await
    }

    /// Sync a single block. Returns whether the tracker advanced.
    pub async fn sync_state(&self, block_number: BlockNumber, root: Bytes32) -> bool {
        let _guard = self.guard.lock().await;
        self.sync_state_locked(block_number, root, MODE_LIVE).await
    }

    /// Re-check every pending state update against the root of
    /// `block_number`.
    pub async fn verify_pending(&self, block_number: BlockNumber) -> usize {
        let _guard = self.guard.lock().await;
        self.verify_pending_locked(block_number).await
    }

    /// Live handler: sync the submitted block, then re-check pending updates.
    pub async fn on_block_submitted(
        &self,
        block_number: BlockNumber,
        root: Bytes32,
    ) -> Result<(), SyncError> {
        let _guard = self.guard.lock().await;
        debug!(block = block_number.0, root = %root, "Block submitted");

        let mut expected = self.next_block_to_sync()?;
        if block_number > expected {
            // Missed submissions, e.g. while the subscription was being set up.
            if let Some(previous) = block_number.prev() {
                info!(from = expected.0, to = previous.0, "Catching up before live block");
                self.transition(SyncState::CatchingUp);
                let caught_up = self.sync_until_locked(previous, MODE_CATCH_UP).await;
                self.transition(SyncState::LiveVerifying);
                caught_up?;
            }
            expected = self.next_block_to_sync()?;
        }

        if block_number == expected {
            self.sync_state_locked(block_number, root, MODE_LIVE).await;
        } else if block_number < expected {
            debug!(block = block_number.0, "Block already synced");
        }

        self.verify_pending_locked(block_number).await;
        Ok(())
    }

    /// Record a claimed checkpoint while its challenge period runs.
    pub async fn on_checkpoint_claimed(
        &self,
        checkpoint_id: Bytes32,
        deposit_contract: DepositContract,
        checkpoint: Checkpoint,
    ) -> Result<(), SyncError> {
        let _guard = self.guard.lock().await;

        let id = self
            .checkpoints
            .insert(CheckpointKind::Pending, &deposit_contract, &checkpoint)?;
        if id != checkpoint_id {
            warn!(reported = %checkpoint_id, derived = %id, "Checkpoint id mismatch");
        }
        self.inc_checkpoints("claimed");
        debug!(range = %checkpoint.range, id = %id, "Checkpoint claimed");
        Ok(())
    }

    /// Record a finalized checkpoint and adopt its range when this client is
    /// the owner.
    pub async fn on_checkpoint_finalized(
        &self,
        checkpoint_id: Bytes32,
        deposit_contract: DepositContract,
        block_number: BlockNumber,
        checkpoint: Checkpoint,
    ) -> Result<(), SyncError> {
        let _guard = self.guard.lock().await;

        let id = self
            .checkpoints
            .insert(CheckpointKind::Verified, &deposit_contract, &checkpoint)?;
        if id != checkpoint_id {
            warn!(reported = %checkpoint_id, derived = %id, "Checkpoint id mismatch");
        }
        self.checkpoints
            .remove(CheckpointKind::Pending, &deposit_contract, &id)?;

        let owner = ownership_owner(&checkpoint.state_object, &self.predicates);
        self.ledger
            .remove(StateKind::Verified, &deposit_contract, &checkpoint.range)?;

        if owner == Some(self.address) {
            let state_update = StateUpdate::new(
                self.predicates.state_update,
                deposit_contract,
                checkpoint.range,
                block_number,
                checkpoint.state_object,
            );
            self.ledger
                .insert(StateKind::Verified, &deposit_contract, &state_update)?;
            self.counters.lock().checkpoints_adopted += 1;
            self.inc_checkpoints("adopted");
            info!(
                range = %state_update.range,
                block = block_number.0,
                "Adopted finalized checkpoint"
            );
        } else {
            self.inc_checkpoints("foreign");
            debug!(range = %checkpoint.range, owner = ?owner, "Checkpoint owned by someone else");
        }
        Ok(())
    }

    fn next_block_to_sync(&self) -> Result<BlockNumber, SyncError> {
        Ok(match self.tracker.latest_synced_block_number()? {
            Some(latest) => latest.next(),
            None => self.genesis_block,
        })
    }

    async fn sync_until_locked(&self, target: BlockNumber, mode: &str) -> Result<(), SyncError> {
        let latest = self.tracker.latest_synced_block_number()?;
        if let Some(synced) = latest {
            if synced > target {
                return Err(SyncError::AheadOfTarget { synced, target });
            }
        }

        let mut next = self.next_block_to_sync()?;
        debug!(from = next.0, target = target.0, "Syncing blocks");

        while next <= target {
            let root = match self.collaborators.contract.block_root(next).await {
                Ok(Some(root)) => root,
                Ok(None) => return Err(SyncError::MissingRoot(next)),
                Err(err) => {
                    warn!(block = next.0, error = %err, "Failed to read block root");
                    self.record_failure("root");
                    break;
                }
            };

            if !self.sync_state_locked(next, root, mode).await {
                warn!(block = next.0, target = target.0, "Stopping sync at failed block");
                break;
            }
            next = next.next();
        }
        Ok(())
    }

    async fn sync_state_locked(
        &self,
        block_number: BlockNumber,
        root: Bytes32,
        mode: &str,
    ) -> bool {
        let _in_flight = InFlight::enter(&self.syncing);
        let started = Instant::now();

        let state_updates = match self
            .collaborators
            .aggregator
            .sync_state(self.address, block_number)
            .await
        {
            Ok(state_updates) => state_updates,
            Err(err) => {
                warn!(block = block_number.0, error = %err, "Failed to fetch state updates");
                self.record_failure("fetch");
                return false;
            }
        };

        for state_update in &state_updates {
            if let Err(err) = self.store_verified(state_update) {
                warn!(
                    block = block_number.0,
                    range = %state_update.range,
                    error = %err,
                    "Failed to store state update"
                );
                self.record_failure("store");
                return false;
            }
        }

        if let Err(err) = self.tracker.advance(block_number, root) {
            warn!(block = block_number.0, error = %err, "Failed to advance tracker");
            self.record_failure("advance");
            return false;
        }

        self.counters.lock().blocks_synced += 1;
        if let Some(metrics) = &self.metrics {
            metrics.set_latest_synced_block(block_number.0 as i64);
            metrics.inc_blocks_synced(mode);
            metrics.observe_block_sync_time(started.elapsed().as_secs_f64());
        }
        info!(
            block = block_number.0,
            state_updates = state_updates.len(),
            "Synced block"
        );
        true
    }

    /// Replace whatever Verified holds at the update's range. Re-syncing the
    /// same block is therefore harmless, and newer updates win.
    fn store_verified(&self, state_update: &StateUpdate) -> ledger::Result<()> {
        let deposit_contract = state_update.deposit_contract;
        self.ledger
            .remove(StateKind::Verified, &deposit_contract, &state_update.range)?;
        self.ledger
            .insert(StateKind::Verified, &deposit_contract, state_update)
    }

    async fn verify_pending_locked(&self, block_number: BlockNumber) -> usize {
        let mut candidates = Vec::new();
        for deposit_contract in self.tokens.deposit_contracts() {
            match self.ledger.all(StateKind::Pending, &deposit_contract) {
                Ok(pending) => candidates.extend(pending),
                Err(err) => warn!(
                    deposit_contract = %deposit_contract,
                    error = %err,
                    "Failed to read pending state updates"
                ),
            }
        }
        if candidates.is_empty() {
            self.set_pending_records(0);
            return 0;
        }

        let root = match self.tracker.root_for(block_number) {
            Ok(Some(root)) => root,
            Ok(None) => {
                debug!(block = block_number.0, "No root recorded, pending updates stay");
                self.inc_pending_checks("unknown_root");
                self.set_pending_records(candidates.len() as i64);
                return 0;
            }
            Err(err) => {
                warn!(block = block_number.0, error = %err, "Failed to read block root");
                self.inc_pending_checks("error");
                self.set_pending_records(candidates.len() as i64);
                return 0;
            }
        };

        debug!(
            block = block_number.0,
            pending = candidates.len(),
            "Verifying pending state updates"
        );

        let mut confirmed = 0;
        for chunk in candidates.chunks(MAX_CONCURRENT_PROOF_REQUESTS) {
            let aggregator = &self.collaborators.aggregator;
            let proofs = join_all(
                chunk
                    .iter()
                    .map(|state_update| aggregator.inclusion_proof(state_update)),
            )
            .await;

            for (state_update, proof) in chunk.iter().zip(proofs) {
                if self.confirm_pending(state_update, &root, proof) {
                    confirmed += 1;
                }
            }
        }

        self.counters.lock().pending_confirmed += confirmed as u64;
        self.set_pending_records((candidates.len() - confirmed) as i64);
        if confirmed > 0 {
            info!(block = block_number.0, confirmed, "Confirmed pending state updates");
        }
        confirmed
    }

    fn confirm_pending(
        &self,
        state_update: &StateUpdate,
        root: &Bytes32,
        proof: anyhow::Result<Option<InclusionProof>>,
    ) -> bool {
        let range = state_update.range;
        let proof = match proof {
            Ok(Some(proof)) => proof,
            Ok(None) => {
                debug!(range = %range, "Inclusion proof not found yet");
                self.inc_pending_checks("not_found");
                return false;
            }
            Err(err) => {
                warn!(range = %range, error = %err, "Failed to fetch inclusion proof");
                self.inc_pending_checks("error");
                return false;
            }
        };

        let leaf = match self.collaborators.coder.encode_state_update(state_update) {
            Ok(leaf) => leaf,
            Err(err) => {
                warn!(range = %range, error = %err, "Failed to encode pending state update");
                self.inc_pending_checks("error");
                return false;
            }
        };
        if !self
            .collaborators
            .verifier
            .verify(&leaf, &range, root, &proof)
        {
            warn!(range = %range, root = %root, "Inclusion proof rejected");
            self.inc_pending_checks("invalid");
            return false;
        }

        if let Err(err) =
            self.ledger
                .remove(StateKind::Pending, &state_update.deposit_contract, &range)
        {
            warn!(range = %range, error = %err, "Failed to clear confirmed state update");
            self.inc_pending_checks("error");
            return false;
        }

        self.inc_pending_checks("confirmed");
        true
    }

    fn record_failure(&self, stage: &str) {
        self.counters.lock().failed_syncs += 1;
        if let Some(metrics) = &self.metrics {
            metrics.inc_sync_failures(stage);
        }
    }

    fn inc_pending_checks(&self, result: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.inc_pending_checks(result);
        }
    }

    fn set_pending_records(&self, count: i64) {
        if let Some(metrics) = &self.metrics {
            metrics.set_pending_records(count);
        }
    }

    fn inc_checkpoints(&self, result: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.inc_checkpoints(result);
        }
    }

    /// Get sync statistics.
    pub fn get_stats(&self) -> SyncStats {
        let counters = self.counters.lock();
        SyncStats {
            state: self.state(),
            latest_synced_block: self.tracker.latest_synced_block_number().ok().flatten(),
            is_syncing: self.is_syncing(),
            blocks_synced: counters.blocks_synced,
            failed_syncs: counters.failed_syncs,
            pending_confirmed: counters.pending_confirmed,
            checkpoints_adopted: counters.checkpoints_adopted,
        }
    }
}

/// Statistics about the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncStats {
    pub state: SyncState,
    pub latest_synced_block: Option<BlockNumber>,
    pub is_syncing: bool,
    pub blocks_synced: u64,
    pub failed_syncs: u64,
    pub pending_confirmed: u64,
    pub checkpoints_adopted: u64,
}
