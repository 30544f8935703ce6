use containers::{Address, DepositContract, TokenConfig};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Shared map from token contract to the deposit contract that custodies it.
#[derive(Clone, Debug, Default)]
pub struct TokenRegistry {
    inner: Arc<RwLock<BTreeMap<Address, DepositContract>>>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(tokens: &[TokenConfig]) -> Self {
        let registry = Self::new();
        for token in tokens {
            registry.register(token.token, token.deposit_contract);
        }
        registry
    }

    /// Returns the deposit contract previously registered for `token`.
    pub fn register(
        &self,
        token: Address,
        deposit_contract: DepositContract,
    ) -> Option<DepositContract> {
        self.inner.write().insert(token, deposit_contract)
    }

    pub fn deposit_contract(&self, token: &Address) -> Option<DepositContract> {
        self.inner.read().get(token).copied()
    }

    pub fn deposit_contracts(&self) -> Vec<DepositContract> {
        let mut contracts: Vec<_> = self.inner.read().values().copied().collect();
        contracts.sort();
        contracts.dedup();
        contracts
    }

    pub fn tokens(&self) -> Vec<(Address, DepositContract)> {
        self.inner.read().iter().map(|(t, d)| (*t, *d)).collect()
    }
}
