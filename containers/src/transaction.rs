use crate::block_number::BlockNumber;
use crate::property::Property;
use crate::range::Range;
use crate::types::{Address, Bytes, Bytes32, DepositContract};
use serde::{Deserialize, Serialize};

/// Signed request to hand `range` over to `next_state_object`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub deposit_contract: DepositContract,
    pub range: Range,
    /// Latest block in which the aggregator may include this transaction.
    pub max_block_number: BlockNumber,
    pub next_state_object: Property,
    pub from: Address,
    #[serde(default)]
    pub signature: Bytes,
}

/// Part of a [`Transaction`] covered by the sender's signature.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionBody {
    pub deposit_contract: DepositContract,
    pub range: Range,
    pub max_block_number: BlockNumber,
    pub next_state_object: Property,
    pub from: Address,
}

impl Transaction {
    pub fn new(
        deposit_contract: DepositContract,
        range: Range,
        max_block_number: BlockNumber,
        next_state_object: Property,
        from: Address,
    ) -> Self {
        Self {
            deposit_contract,
            range,
            max_block_number,
            next_state_object,
            from,
            signature: Bytes::new(),
        }
    }

    pub fn body(&self) -> TransactionBody {
        TransactionBody {
            deposit_contract: self.deposit_contract,
            range: self.range,
            max_block_number: self.max_block_number,
            next_state_object: self.next_state_object.clone(),
            from: self.from,
        }
    }

    pub fn is_signed(&self) -> bool {
        !self.signature.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptStatus {
    Failure,
    Success,
}

impl ReceiptStatus {
    /// Numeric status as reported by the aggregator (`1` = success).
    pub fn from_code(code: u8) -> Self {
        if code == 1 {
            ReceiptStatus::Success
        } else {
            ReceiptStatus::Failure
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            ReceiptStatus::Failure => 0,
            ReceiptStatus::Success => 1,
        }
    }
}

/// Aggregator's answer to a submitted transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub status: ReceiptStatus,
    #[serde(default)]
    pub transaction_hash: Bytes32,
}

impl TransactionReceipt {
    pub fn is_success(&self) -> bool {
        self.status == ReceiptStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_excludes_signature() {
        let mut tx = Transaction::new(
            Address::ZERO,
            Range::from_u64(0, 5).unwrap(),
            BlockNumber(10),
            Property::new(Address::ZERO, vec![]),
            Address::ZERO,
        );
        let unsigned_body = tx.body();
        tx.signature = Bytes::from_static(&[1, 2, 3]);

        assert!(tx.is_signed());
        assert_eq!(tx.body(), unsigned_body);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ReceiptStatus::from_code(1), ReceiptStatus::Success);
        assert_eq!(ReceiptStatus::from_code(0), ReceiptStatus::Failure);
        assert_eq!(ReceiptStatus::from_code(7), ReceiptStatus::Failure);
        assert_eq!(ReceiptStatus::Success.code(), 1);
    }
}
