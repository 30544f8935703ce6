use crate::block_number::BlockNumber;
use crate::property::PredicateTable;
use crate::types::{Address, DepositContract};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// A token the client tracks, and the deposit contract that owns its coin
/// space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    pub token: Address,
    pub deposit_contract: DepositContract,
}

/// Everything the client needs to know about the network it talks to.
///
/// Passed explicitly to every component; there is no process-wide
/// configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub aggregator_url: String,
    pub rpc_url: String,
    pub commitment_contract: Address,
    pub predicates: PredicateTable,
    #[serde(default)]
    pub tokens: Vec<TokenConfig>,
    /// First block the commitment contract ever submits.
    #[serde(default)]
    pub genesis_block: BlockNumber,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Directory of the on-disk ledger.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("plasma-data")
}

impl ClientConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    pub fn deposit_contracts(&self) -> impl Iterator<Item = DepositContract> + '_ {
        self.tokens.iter().map(|token| token.deposit_contract)
    }
}
