use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Amount, Order, Provider, Transaction},
    spe_api::reconciliation_objects::OrderSummary,
};

/// Emitted when an order is paid by an incoming transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
}

impl OrderPaidEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// Emitted once for every transaction that is recorded, whether or not it matched an order. Duplicates do not
/// produce an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionProcessedEvent {
    pub transaction_id: String,
    pub amount: Amount,
    pub provider: Provider,
    pub matched: bool,
    pub order: Option<OrderSummary>,
    pub timestamp: DateTime<Utc>,
}

impl TransactionProcessedEvent {
    pub fn new(transaction: &Transaction, order: Option<OrderSummary>) -> Self {
        Self {
            transaction_id: transaction.transaction_id.clone(),
            amount: transaction.amount,
            provider: transaction.provider,
            matched: order.is_some(),
            order,
            timestamp: Utc::now(),
        }
    }
}
