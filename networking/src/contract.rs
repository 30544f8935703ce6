//! Commitment contract access.
//!
//! The engine reads block roots and listens for submissions and checkpoint
//! logs. The RPC implementation polls `currentBlock()`, reads `blocks(n)`
//! through `eth_call`, and pulls checkpoint logs of the registered deposit
//! contracts with `eth_getLogs`.

use crate::types::ContractEvent;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use containers::codec::{from_hex_string, to_hex_string};
use containers::types::{coin_key, keccak256};
use containers::{Address, BlockNumber, Bytes32, Checkpoint, Coder, Range, U256};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// `CheckpointClaimed(bytes32 indexed checkpointId, uint256 start, uint256 end,
/// uint256 blockNumber, bytes stateObject)`.
const CHECKPOINT_CLAIMED: &str = "CheckpointClaimed(bytes32,uint256,uint256,uint256,bytes)";
/// Same layout as [`CHECKPOINT_CLAIMED`].
const CHECKPOINT_FINALIZED: &str = "CheckpointFinalized(bytes32,uint256,uint256,uint256,bytes)";

#[async_trait]
pub trait CommitmentContract: Send + Sync {
    /// Latest block the operator has submitted.
    async fn current_block(&self) -> Result<BlockNumber>;

    /// Root committed for `block_number`, `None` if nothing was submitted.
    async fn block_root(&self, block_number: BlockNumber) -> Result<Option<Bytes32>>;

    /// Deliver future contract events to `events` until the receiver is
    /// dropped. Returns once the subscription is installed.
    async fn subscribe(&self, events: mpsc::UnboundedSender<ContractEvent>) -> Result<()>;
}

fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

fn event_topic(signature: &str) -> Bytes32 {
    keccak256(signature.as_bytes())
}

fn current_block_calldata() -> Vec<u8> {
    selector("currentBlock()").to_vec()
}

fn blocks_calldata(block_number: BlockNumber) -> Vec<u8> {
    let mut data = selector("blocks(uint256)").to_vec();
    data.extend_from_slice(&coin_key(U256::from(block_number.0)));
    data
}

fn decode_word(output: &[u8]) -> Result<[u8; 32]> {
    output
        .get(..32)
        .and_then(|word| word.try_into().ok())
        .ok_or_else(|| anyhow!("expected a 32-byte word, got {} bytes", output.len()))
}

/// ABI word at byte `offset` as an unsigned integer that fits in 64 bits.
fn word_u64(data: &[u8], offset: usize) -> Result<u64> {
    let value = U256::from_be_bytes(decode_word(data.get(offset..).unwrap_or_default())?);
    value
        .try_into()
        .map_err(|_| anyhow!("ABI word {value} does not fit in 64 bits"))
}

fn quantity(value: u64) -> String {
    format!("0x{value:x}")
}

fn parse_quantity(value: &str) -> Result<u64> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    u64::from_str_radix(digits, 16).with_context(|| format!("invalid quantity {value}"))
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Clone, Debug, Deserialize)]
struct RpcLog {
    address: Address,
    topics: Vec<Bytes32>,
    data: String,
}

/// Turn a checkpoint log emitted by a deposit contract into an event.
fn decode_checkpoint_log(log: &RpcLog, coder: &dyn Coder) -> Result<ContractEvent> {
    let topic = log
        .topics
        .first()
        .ok_or_else(|| anyhow!("log without topics"))?;
    let checkpoint_id = *log
        .topics
        .get(1)
        .ok_or_else(|| anyhow!("checkpoint log without id topic"))?;

    let data = from_hex_string(&log.data)?;
    let start = U256::from_be_bytes(decode_word(&data)?);
    let end = U256::from_be_bytes(decode_word(data.get(32..).unwrap_or_default())?);
    let block_number = BlockNumber(word_u64(&data, 64)?);
    let offset = usize::try_from(word_u64(&data, 96)?)?;
    let len = usize::try_from(word_u64(&data, offset)?)?;
    let payload = offset
        .checked_add(32)
        .and_then(|from| data.get(from..from.checked_add(len)?))
        .ok_or_else(|| anyhow!("state object runs past the end of the log data"))?;

    let checkpoint = Checkpoint::new(Range::new(start, end)?, coder.decode_property(payload)?);
    let deposit_contract = log.address;

    if *topic == event_topic(CHECKPOINT_CLAIMED) {
        Ok(ContractEvent::CheckpointClaimed {
            checkpoint_id,
            deposit_contract,
            block_number,
            checkpoint,
        })
    } else if *topic == event_topic(CHECKPOINT_FINALIZED) {
        Ok(ContractEvent::CheckpointFinalized {
            checkpoint_id,
            deposit_contract,
            block_number,
            checkpoint,
        })
    } else {
        bail!("unexpected log topic {topic}")
    }
}

/// [`CommitmentContract`] backed by an Ethereum JSON-RPC endpoint.
#[derive(Clone)]
pub struct RpcCommitmentContract {
    client: reqwest::Client,
    rpc_url: String,
    address: Address,
    poll_interval: Duration,
    coder: Arc<dyn Coder>,
    checkpoint_sources: Vec<Address>,
}

impl RpcCommitmentContract {
    pub fn new(
        rpc_url: impl Into<String>,
        address: Address,
        poll_interval: Duration,
        coder: Arc<dyn Coder>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            rpc_url: rpc_url.into(),
            address,
            poll_interval,
            coder,
            checkpoint_sources: Vec::new(),
        }
    }

    /// Also follow checkpoint logs of these deposit contracts.
    pub fn with_checkpoint_sources(mut self, sources: impl IntoIterator<Item = Address>) -> Self {
        self.checkpoint_sources = sources.into_iter().collect();
        self
    }

    async fn rpc<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        };

        let response: RpcResponse<T> = self
            .client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("{method} request failed"))?
            .error_for_status()?
            .json()
            .await
            .context("malformed JSON-RPC response")?;

        if let Some(error) = response.error {
            bail!("{method} failed with code {}: {}", error.code, error.message);
        }
        response
            .result
            .ok_or_else(|| anyhow!("JSON-RPC response carries neither result nor error"))
    }

    async fn eth_call(&self, data: Vec<u8>) -> Result<Vec<u8>> {
        let params = json!([
            { "to": self.address.to_string(), "data": to_hex_string(&data) },
            "latest"
        ]);
        let result: String = self.rpc("eth_call", params).await?;
        Ok(from_hex_string(&result)?)
    }

    async fn eth_block_number(&self) -> Result<u64> {
        let result: String = self.rpc("eth_blockNumber", json!([])).await?;
        parse_quantity(&result)
    }

    /// Emit `BlockSubmitted` for every block above `last_seen`, in order.
    async fn poll_blocks(
        &self,
        last_seen: Option<BlockNumber>,
        events: &mpsc::UnboundedSender<ContractEvent>,
    ) -> Result<Option<BlockNumber>> {
        let current = self.current_block().await?;
        let mut next = match last_seen {
            Some(seen) if seen >= current => return Ok(last_seen),
            Some(seen) => seen.next(),
            None => current,
        };

        let mut seen = last_seen;
        while next <= current {
            let Some(root) = self.block_root(next).await? else {
                // Not readable yet; retry from here on the next poll.
                break;
            };
            if events
                .send(ContractEvent::BlockSubmitted {
                    block_number: next,
                    root,
                })
                .is_err()
            {
                bail!("event receiver dropped");
            }
            seen = Some(next);
            next = next.next();
        }
        Ok(seen)
    }

    /// Emit checkpoint events logged in main-chain blocks after `last_seen`.
    /// Returns the last main-chain block covered.
    async fn poll_checkpoints(
        &self,
        last_seen: Option<u64>,
        events: &mpsc::UnboundedSender<ContractEvent>,
    ) -> Result<Option<u64>> {
        if self.checkpoint_sources.is_empty() {
            return Ok(last_seen);
        }
        let head = self.eth_block_number().await?;
        let from = match last_seen {
            Some(seen) if seen >= head => return Ok(last_seen),
            Some(seen) => seen + 1,
            None => head,
        };

        let filter = json!([{
            "fromBlock": quantity(from),
            "toBlock": quantity(head),
            "address": self.checkpoint_sources,
            "topics": [[event_topic(CHECKPOINT_CLAIMED), event_topic(CHECKPOINT_FINALIZED)]],
        }]);
        let logs: Vec<RpcLog> = self.rpc("eth_getLogs", filter).await?;
        debug!(from, to = head, logs = logs.len(), "Fetched checkpoint logs");

        for log in &logs {
            match decode_checkpoint_log(log, self.coder.as_ref()) {
                Ok(event) => {
                    if events.send(event).is_err() {
                        bail!("event receiver dropped");
                    }
                }
                Err(err) => warn!(source = %log.address, error = %err, "Skipping checkpoint log"),
            }
        }
        Ok(Some(head))
    }

    async fn poll_loop(
        self,
        mut last_block: Option<BlockNumber>,
        mut last_log_block: Option<u64>,
        events: mpsc::UnboundedSender<ContractEvent>,
    ) {
        let mut interval = tokio::time::interval(self.poll_interval);
        loop {
            interval.tick().await;
            if events.is_closed() {
                debug!("Contract subscription closed");
                return;
            }
            match self.poll_blocks(last_block, &events).await {
                Ok(seen) => last_block = seen,
                Err(err) => warn!(error = %err, "Failed to poll commitment contract"),
            }
            match self.poll_checkpoints(last_log_block, &events).await {
                Ok(seen) => last_log_block = seen,
                Err(err) => warn!(error = %err, "Failed to poll checkpoint logs"),
            }
        }
    }
}

#[async_trait]
impl CommitmentContract for RpcCommitmentContract {
    async fn current_block(&self) -> Result<BlockNumber> {
        let output = self.eth_call(current_block_calldata()).await?;
        let value = U256::from_be_bytes(decode_word(&output)?);
        let block: u64 = value
            .try_into()
            .map_err(|_| anyhow!("current block {value} does not fit in 64 bits"))?;
        Ok(BlockNumber(block))
    }

    async fn block_root(&self, block_number: BlockNumber) -> Result<Option<Bytes32>> {
        let output = self.eth_call(blocks_calldata(block_number)).await?;
        let root = Bytes32::from(decode_word(&output)?);
        Ok((!root.is_zero()).then_some(root))
    }

    async fn subscribe(&self, events: mpsc::UnboundedSender<ContractEvent>) -> Result<()> {
        let last_block = self.current_block().await.ok();
        let last_log_block = if self.checkpoint_sources.is_empty() {
            None
        } else {
            self.eth_block_number().await.ok()
        };
        info!(
            contract = %self.address,
            from = ?last_block,
            checkpoint_sources = self.checkpoint_sources.len(),
            interval_ms = self.poll_interval.as_millis() as u64,
            "Polling commitment contract"
        );
        tokio::spawn(self.clone().poll_loop(last_block, last_log_block, events));
        Ok(())
    }
}
