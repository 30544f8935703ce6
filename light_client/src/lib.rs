// Plasma light client: wallet, local ledger and block sync behind one handle
use std::sync::Arc;

use containers::{
    ownership_property, Address, BlockNumber, ClientConfig, CodecError, DepositContract, Property,
    Range, StateUpdate, Transaction, TransactionReceipt, U256,
};
use futures::future::join_all;
use ledger::{KeyValueStore, LedgerError, StateKind, StateLedger, TokenRegistry};
use metrics::SharedMetrics;
use networking::{Collaborators, ContractEvent, SyncEngine, SyncError};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};

pub mod wallet;

use wallet::{Wallet, WalletError};

/// Blocks after the next unsynced block during which a transfer may still be
/// included.
pub const TRANSFER_VALIDITY_BLOCKS: u64 = 10;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: U256, available: U256 },

    /// The aggregator answered with a failure receipt. The range stays in
    /// the verified partition.
    #[error("transaction for range {range} was rejected")]
    Rejected { range: Range },

    #[error("aggregator: {0:#}")]
    Aggregator(anyhow::Error),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Ledger(LedgerError),
}

impl From<LedgerError> for TransferError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientFunds { requested, available } => {
                TransferError::InsufficientFunds { requested, available }
            }
            other => TransferError::Ledger(other),
        }
    }
}

/// Verified balance of one registered token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBalance {
    pub token: Address,
    pub deposit_contract: DepositContract,
    pub amount: U256,
}

pub struct LightClient {
    wallet: Arc<dyn Wallet>,
    config: ClientConfig,
    tokens: TokenRegistry,
    engine: Arc<SyncEngine>,
    collaborators: Collaborators,
    metrics: Option<SharedMetrics>,
}

impl LightClient {
    pub fn new(
        wallet: Arc<dyn Wallet>,
        config: ClientConfig,
        store: Arc<dyn KeyValueStore>,
        collaborators: Collaborators,
        metrics: Option<SharedMetrics>,
    ) -> Self {
        let tokens = TokenRegistry::from_config(&config.tokens);
        let mut engine = SyncEngine::new(
            wallet.address(),
            &config,
            store,
            tokens.clone(),
            collaborators.clone(),
        );
        if let Some(metrics) = &metrics {
            engine = engine.with_metrics(metrics.clone());
        }

        info!(
            address = %wallet.address(),
            tokens = config.tokens.len(),
            "Light client initialized"
        );

        Self {
            wallet,
            tokens,
            engine: Arc::new(engine),
            collaborators,
            config,
            metrics,
        }
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    pub fn engine(&self) -> &Arc<SyncEngine> {
        &self.engine
    }

    fn ledger(&self) -> &StateLedger {
        self.engine.ledger()
    }

    /// Track `token`, whose coins live in `deposit_contract`.
    pub fn register_token(&self, token: Address, deposit_contract: DepositContract) {
        if let Some(previous) = self.tokens.register(token, deposit_contract) {
            if previous != deposit_contract {
                warn!(token = %token, previous = %previous, "Replacing deposit contract of token");
            }
        }
        info!(token = %token, deposit_contract = %deposit_contract, "Token registered");
    }

    /// Verified balance of every registered token.
    pub async fn balance(&self) -> Result<Vec<TokenBalance>, LedgerError> {
        let ledger = self.ledger();
        let lookups = self.tokens.tokens().into_iter().map(|(token, deposit_contract)| async move {
            ledger
                .total(StateKind::Verified, &deposit_contract)
                .map(|amount| TokenBalance {
                    token,
                    deposit_contract,
                    amount,
                })
        });
        join_all(lookups).await.into_iter().collect()
    }

    /// Send `amount` coins of `deposit_contract` to `to`.
    ///
    /// One transaction is sent per resolved state update, lowest coins
    /// first. Each accepted transaction moves its range from Verified to
    /// Pending; the first rejection stops the transfer and leaves the
    /// remaining ranges untouched.
    pub async fn transfer(
        &self,
        amount: U256,
        deposit_contract: DepositContract,
        to: Address,
    ) -> Result<Vec<TransactionReceipt>, TransferError> {
        let _guard = self.engine.exclusive().await;

        let resolved = self.ledger().resolve(&deposit_contract, amount)?;
        let max_block_number = self.max_block_number()?;
        let next_state_object = ownership_property(to, &self.config.predicates);
        info!(
            amount = %amount,
            deposit_contract = %deposit_contract,
            to = %to,
            ranges = resolved.len(),
            "Transferring"
        );

        let mut receipts = Vec::with_capacity(resolved.len());
        for state_update in resolved {
            let receipt = self
                .send_range(&state_update, max_block_number, next_state_object.clone())
                .await?;
            if !receipt.is_success() {
                self.inc_transfers("rejected");
                warn!(range = %state_update.range, "Transaction rejected");
                return Err(TransferError::Rejected {
                    range: state_update.range,
                });
            }
            self.move_to_pending(&state_update)?;
            self.inc_transfers("accepted");
            receipts.push(receipt);
        }
        Ok(receipts)
    }

    async fn send_range(
        &self,
        state_update: &StateUpdate,
        max_block_number: BlockNumber,
        next_state_object: Property,
    ) -> Result<TransactionReceipt, TransferError> {
        let mut transaction = Transaction::new(
            state_update.deposit_contract,
            state_update.range,
            max_block_number,
            next_state_object,
            self.address(),
        );
        let body = self
            .collaborators
            .coder
            .encode_transaction_body(&transaction.body())?;
        transaction.signature = self.wallet.sign(&body)?;

        self.collaborators
            .aggregator
            .send_transaction(&transaction)
            .await
            .map_err(|err| {
                self.inc_transfers("error");
                TransferError::Aggregator(err)
            })
    }

    fn move_to_pending(&self, state_update: &StateUpdate) -> Result<(), LedgerError> {
        let deposit_contract = state_update.deposit_contract;
        self.ledger()
            .remove(StateKind::Verified, &deposit_contract, &state_update.range)?;
        self.ledger()
            .remove(StateKind::Pending, &deposit_contract, &state_update.range)?;
        self.ledger()
            .insert(StateKind::Pending, &deposit_contract, state_update)
    }

    fn max_block_number(&self) -> Result<BlockNumber, LedgerError> {
        let next = match self.engine.tracker().latest_synced_block_number()? {
            Some(latest) => latest.next(),
            None => self.config.genesis_block,
        };
        Ok(BlockNumber(next.0.saturating_add(TRANSFER_VALIDITY_BLOCKS)))
    }

    fn inc_transfers(&self, result: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.inc_transfers(result);
        }
    }

    /// Catch up with the commitment contract and subscribe to new blocks.
    /// Returns the receiver to hand to [`LightClient::run`].
    pub async fn start(&self) -> Result<mpsc::UnboundedReceiver<ContractEvent>, SyncError> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.engine.start(sender).await?;
        Ok(receiver)
    }

    /// Follow contract events until the subscription ends.
    pub async fn run(&self, events: mpsc::UnboundedReceiver<ContractEvent>) {
        self.engine.run(events).await;
    }
}
