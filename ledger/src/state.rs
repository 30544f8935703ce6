use crate::errors::{LedgerError, Result};
use crate::kvs::{Bucket, KeyValueStore};
use crate::range_db::{RangeDb, RangeRecord};
use containers::{DepositContract, Range, StateUpdate, StateUpdateRecord, U256};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Lifecycle partition of a state update.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StateKind {
    /// Owned, confirmed by sync.
    Verified,
    /// Spent by an accepted transfer whose inclusion is not yet proven.
    Pending,
    /// Reported but not yet checked against history.
    Unverified,
}

impl StateKind {
    pub const ALL: [StateKind; 3] = [
        StateKind::Verified,
        StateKind::Pending,
        StateKind::Unverified,
    ];

    pub fn bucket_name(&self) -> &'static str {
        match self {
            StateKind::Verified => "Verified",
            StateKind::Pending => "Pending",
            StateKind::Unverified => "Unverified",
        }
    }
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.bucket_name())
    }
}

/// Range-indexed record of what this client owns, per partition and per
/// deposit contract.
///
/// Layout: `<kind>/<deposit contract>/<range end>` → record without range.
#[derive(Clone)]
pub struct StateLedger {
    root: Bucket,
}

impl StateLedger {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_bucket(Bucket::root(store))
    }

    pub fn with_bucket(root: Bucket) -> Self {
        Self { root }
    }

    fn range_db(&self, kind: StateKind, deposit_contract: &DepositContract) -> RangeDb {
        RangeDb::new(
            self.root
                .bucket(kind.bucket_name().as_bytes())
                .bucket(deposit_contract.as_slice()),
        )
    }

    fn decode(record: RangeRecord) -> Result<StateUpdate> {
        let stored: StateUpdateRecord = serde_json::from_slice(&record.value)?;
        Ok(StateUpdate::from_record(stored, record.range))
    }

    /// Stored state updates intersecting `range`, ascending by range.
    pub fn get(
        &self,
        kind: StateKind,
        deposit_contract: &DepositContract,
        range: &Range,
    ) -> Result<Vec<StateUpdate>> {
        self.range_db(kind, deposit_contract)
            .get(range)?
            .into_iter()
            .map(Self::decode)
            .collect()
    }

    /// Every state update of the collection, ascending by range.
    pub fn all(
        &self,
        kind: StateKind,
        deposit_contract: &DepositContract,
    ) -> Result<Vec<StateUpdate>> {
        self.range_db(kind, deposit_contract)
            .iter_from(U256::ZERO)?
            .into_iter()
            .map(Self::decode)
            .collect()
    }

    /// Store `state_update` at its own range. Fails with
    /// [`LedgerError::Overlap`] if the collection already holds any part of
    /// that range.
    pub fn insert(
        &self,
        kind: StateKind,
        deposit_contract: &DepositContract,
        state_update: &StateUpdate,
    ) -> Result<()> {
        let value = serde_json::to_vec(&state_update.to_record())?;
        self.range_db(kind, deposit_contract)
            .put(&state_update.range, &value)?;
        debug!(
            kind = %kind,
            deposit_contract = %deposit_contract,
            range = %state_update.range,
            block = state_update.block_number.0,
            "Inserted state update"
        );
        Ok(())
    }

    /// Remove exactly `range`, splitting partially covered records.
    pub fn remove(
        &self,
        kind: StateKind,
        deposit_contract: &DepositContract,
        range: &Range,
    ) -> Result<()> {
        self.range_db(kind, deposit_contract).del(range)?;
        debug!(kind = %kind, deposit_contract = %deposit_contract, range = %range, "Removed range");
        Ok(())
    }

    /// Sum of all amounts in the collection.
    pub fn total(&self, kind: StateKind, deposit_contract: &DepositContract) -> Result<U256> {
        Ok(self
            .range_db(kind, deposit_contract)
            .iter_from(U256::ZERO)?
            .iter()
            .fold(U256::ZERO, |sum, record| sum + record.range.amount()))
    }

    /// Pick Verified state updates covering exactly `amount` coins.
    ///
    /// Records are taken in ascending range order starting at coin 0. The
    /// record that reaches the requested amount is truncated to its lowest
    /// coins. If the Verified balance is lower than `amount`, nothing is
    /// returned and [`LedgerError::InsufficientFunds`] reports the balance.
    /// The ledger is never mutated.
    pub fn resolve(
        &self,
        deposit_contract: &DepositContract,
        amount: U256,
    ) -> Result<Vec<StateUpdate>> {
        let mut resolved = Vec::new();
        if amount.is_zero() {
            return Ok(resolved);
        }

        let mut covered = U256::ZERO;
        for record in self.range_db(StateKind::Verified, deposit_contract).iter_from(U256::ZERO)? {
            let remaining = amount - covered;
            let state_update = Self::decode(record)?;
            if state_update.amount() >= remaining {
                let range = state_update.range.take_lowest(remaining).ok_or_else(|| {
                    LedgerError::Corrupted(format!(
                        "cannot take {remaining} from {}",
                        state_update.range
                    ))
                })?;
                resolved.push(state_update.with_range(range));
                return Ok(resolved);
            }
            covered += state_update.amount();
            resolved.push(state_update);
        }

        Err(LedgerError::InsufficientFunds {
            requested: amount,
            available: covered,
        })
    }
}
