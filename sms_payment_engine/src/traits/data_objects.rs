use std::fmt::Display;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::db_types::{Order, Transaction};

/// The result of trying to claim an order on behalf of a new transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClaimResult {
    /// The order moved from pending to paid, and the transaction was recorded against it.
    Claimed { order: Order, transaction: Transaction },
    /// The order was no longer pending when the claim was made. Nothing was written.
    Lost,
    /// A transaction with the same id has already been recorded. Nothing was written.
    Duplicate,
}

impl Display for ClaimResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClaimResult::Claimed { order, transaction } => {
                write!(f, "Order {} claimed by transaction {}", order.order_id, transaction.transaction_id)
            },
            ClaimResult::Lost => write!(f, "Claim lost"),
            ClaimResult::Duplicate => write!(f, "Duplicate transaction"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderCounts {
    pub total: i64,
    pub pending: i64,
    pub paid: i64,
    pub cancelled: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct TransactionCounts {
    pub total: i64,
    pub matched: i64,
    pub unmatched: i64,
}
