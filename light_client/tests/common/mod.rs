//! Shared fixtures for light client tests

use anyhow::{anyhow, Result};
use containers::*;
use ledger::InMemoryKeyValueStore;
use light_client::wallet::LocalWallet;
use light_client::LightClient;
use networking::{Aggregator, Collaborators, CommitmentContract, ContractEvent};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::mpsc;

pub const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

pub fn deposit_contract() -> DepositContract {
    Address::repeat_byte(0xdc)
}

pub fn token() -> Address {
    Address::repeat_byte(0x70)
}

pub fn recipient() -> Address {
    Address::repeat_byte(0xbb)
}

pub fn predicates() -> PredicateTable {
    PredicateTable {
        there_exists: Address::repeat_byte(0x01),
        is_valid_signature: Address::repeat_byte(0x02),
        state_update: Address::repeat_byte(0x03),
    }
}

pub fn range(start: u64, end: u64) -> Range {
    Range::from_u64(start, end).unwrap()
}

pub fn wallet() -> LocalWallet {
    LocalWallet::from_hex(DEV_KEY).unwrap()
}

pub fn owned_update(start: u64, end: u64, block: u64) -> StateUpdate {
    use light_client::wallet::Wallet;
    StateUpdate::new(
        predicates().state_update,
        deposit_contract(),
        range(start, end),
        BlockNumber(block),
        ownership_property(wallet().address(), &predicates()),
    )
}

pub fn test_config() -> ClientConfig {
    ClientConfig {
        aggregator_url: "http://localhost:3000".to_string(),
        rpc_url: "http://localhost:8545".to_string(),
        commitment_contract: Address::repeat_byte(0xcc),
        predicates: predicates(),
        tokens: vec![TokenConfig {
            token: token(),
            deposit_contract: deposit_contract(),
        }],
        genesis_block: BlockNumber(0),
        poll_interval_ms: 10,
        data_dir: std::path::PathBuf::from("unused"),
    }
}

#[derive(Default)]
pub struct MockAggregator {
    pub state_updates: Mutex<HashMap<u64, Vec<StateUpdate>>>,
    pub receipts: Mutex<VecDeque<ReceiptStatus>>,
    pub sent: Mutex<Vec<Transaction>>,
}

#[async_trait::async_trait]
impl Aggregator for MockAggregator {
    async fn sync_state(
        &self,
        _address: Address,
        block_number: BlockNumber,
    ) -> Result<Vec<StateUpdate>> {
        Ok(self
            .state_updates
            .lock()
            .get(&block_number.0)
            .cloned()
            .unwrap_or_default())
    }

    async fn inclusion_proof(&self, _state_update: &StateUpdate) -> Result<Option<InclusionProof>> {
        Ok(None)
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<TransactionReceipt> {
        self.sent.lock().push(transaction.clone());
        let status = self
            .receipts
            .lock()
            .pop_front()
            .ok_or_else(|| anyhow!("aggregator unreachable"))?;
        Ok(TransactionReceipt {
            status,
            transaction_hash: Bytes32::ZERO,
        })
    }
}

pub struct MockContract {
    pub head: u64,
}

#[async_trait::async_trait]
impl CommitmentContract for MockContract {
    async fn current_block(&self) -> Result<BlockNumber> {
        Ok(BlockNumber(self.head))
    }

    async fn block_root(&self, block_number: BlockNumber) -> Result<Option<Bytes32>> {
        Ok((block_number.0 <= self.head).then(|| Bytes32::repeat_byte(block_number.0 as u8 + 1)))
    }

    async fn subscribe(&self, _events: mpsc::UnboundedSender<ContractEvent>) -> Result<()> {
        Ok(())
    }
}

pub struct Harness {
    pub client: LightClient,
    pub aggregator: Arc<MockAggregator>,
}

pub fn harness(aggregator: MockAggregator, head: u64) -> Harness {
    let aggregator = Arc::new(aggregator);
    let collaborators = Collaborators {
        aggregator: aggregator.clone(),
        contract: Arc::new(MockContract { head }),
        verifier: Arc::new(KeccakMerkleVerifier),
        coder: Arc::new(JsonCoder),
    };
    let client = LightClient::new(
        Arc::new(wallet()),
        test_config(),
        Arc::new(InMemoryKeyValueStore::new()),
        collaborators,
        None,
    );
    Harness { client, aggregator }
}

/// Client that has synced blocks `0..=1` and owns `[0,10)` and `[20,30)`.
pub async fn funded() -> Harness {
    let aggregator = MockAggregator::default();
    aggregator
        .state_updates
        .lock()
        .insert(1, vec![owned_update(0, 10, 1), owned_update(20, 30, 1)]);
    let h = harness(aggregator, 1);
    h.client.start().await.unwrap();
    h
}
