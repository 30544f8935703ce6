//! Client side of the aggregator HTTP API.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use containers::codec::{from_hex_string, to_hex_string};
use containers::{
    Address, BlockNumber, Coder, InclusionProof, StateUpdate, Transaction, TransactionReceipt,
};
use reqwest::StatusCode;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Source of state updates and inclusion proofs, and sink for transactions.
///
/// Abstracts the transport so the sync engine can be tested with mocks.
#[async_trait]
pub trait Aggregator: Send + Sync {
    /// State updates owned by `address` that were committed in `block_number`.
    async fn sync_state(
        &self,
        address: Address,
        block_number: BlockNumber,
    ) -> Result<Vec<StateUpdate>>;

    /// Inclusion proof of `state_update` in its own block, `None` when the
    /// aggregator has none.
    async fn inclusion_proof(
        &self,
        state_update: &StateUpdate,
    ) -> Result<Option<InclusionProof>>;

    async fn send_transaction(&self, transaction: &Transaction) -> Result<TransactionReceipt>;
}

#[derive(Serialize)]
struct SendTxRequest {
    data: String,
}

/// [`Aggregator`] speaking JSON over HTTP. Payloads are hex strings of the
/// coder's encoding.
pub struct HttpAggregator {
    client: reqwest::Client,
    base_url: String,
    coder: Arc<dyn Coder>,
}

impl HttpAggregator {
    pub fn new(base_url: impl Into<String>, coder: Arc<dyn Coder>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, coder)
    }

    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        coder: Arc<dyn Coder>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            coder,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

#[async_trait]
impl Aggregator for HttpAggregator {
    async fn sync_state(
        &self,
        address: Address,
        block_number: BlockNumber,
    ) -> Result<Vec<StateUpdate>> {
        let payloads: Vec<String> = self
            .client
            .get(self.url("sync_state"))
            .query(&[
                ("address", address.to_string()),
                ("blockNumber", block_number.to_string()),
            ])
            .send()
            .await
            .context("sync_state request failed")?
            .error_for_status()?
            .json()
            .await
            .context("sync_state response is not a list of payloads")?;

        debug!(block = block_number.0, count = payloads.len(), "Fetched state updates");

        payloads
            .iter()
            .map(|payload| -> Result<StateUpdate> {
                let bytes = from_hex_string(payload)?;
                Ok(self.coder.decode_state_update(&bytes)?)
            })
            .collect()
    }

    async fn inclusion_proof(
        &self,
        state_update: &StateUpdate,
    ) -> Result<Option<InclusionProof>> {
        let encoded = to_hex_string(&self.coder.encode_state_update(state_update)?);
        let response = self
            .client
            .get(self.url("inclusion_proof"))
            .query(&[
                ("blockNumber", state_update.block_number.to_string()),
                ("stateUpdate", encoded),
            ])
            .send()
            .await
            .context("inclusion_proof request failed")?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let payload: String = response.error_for_status()?.json().await?;
        let proof = self.coder.decode_inclusion_proof(&from_hex_string(&payload)?)?;
        Ok(Some(proof))
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<TransactionReceipt> {
        if !transaction.is_signed() {
            bail!("refusing to send an unsigned transaction");
        }
        let request = SendTxRequest {
            data: to_hex_string(&self.coder.encode_transaction(transaction)?),
        };
        let response = self
            .client
            .post(self.url("send_tx"))
            .json(&request)
            .send()
            .await
            .context("send_tx request failed")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("aggregator rejected send_tx with status {status}"));
        }

        let payload: String = response.json().await?;
        Ok(self.coder.decode_receipt(&from_hex_string(&payload)?)?)
    }
}
