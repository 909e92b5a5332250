use thiserror::Error;

use crate::{
    db_types::{Amount, NewTransaction, Order, OrderId, Provider, Transaction},
    traits::{
        data_objects::{ClaimResult, OrderCounts, TransactionCounts},
        OrderManagement,
    },
};

/// This trait defines the highest level of behaviour for backends supporting the reconciliation engine.
///
/// This behaviour includes:
/// * Selecting the orders that a payment could settle
/// * Claiming an order for a payment with a compare-and-set on the order status
/// * Recording transactions exactly once per provider transaction id
#[allow(async_fn_in_trait)]
pub trait ReconciliationDatabase: Clone + OrderManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Fetches all pending orders for exactly `amount` that expect payment via `provider`.
    ///
    /// The orders are returned oldest first (by `created_at`), with ties broken by `order_id`.
    async fn fetch_pending_orders(&self, amount: Amount, provider: Provider)
        -> Result<Vec<Order>, ReconciliationError>;

    /// Marks the order as paid by `transaction_id`, if and only if it is still pending.
    ///
    /// Returns the updated order, or `None` if the order was not pending at the moment of the update.
    async fn claim_order(&self, order_id: &OrderId, transaction_id: &str)
        -> Result<Option<Order>, ReconciliationError>;

    /// In a single atomic transaction,
    /// * marks the order as paid by the transaction, if and only if it is still pending, and
    /// * records the transaction as matched to the order.
    ///
    /// If the order was not pending, [`ClaimResult::Lost`] is returned. If the transaction id has already been
    /// recorded, the claim is rolled back and [`ClaimResult::Duplicate`] is returned. In neither case is anything
    /// written.
    async fn claim_order_for_transaction(
        &self,
        order_id: &OrderId,
        transaction: NewTransaction,
    ) -> Result<ClaimResult, ReconciliationError>;

    /// Fetches the transaction with the given provider transaction id.
    async fn fetch_transaction(&self, transaction_id: &str) -> Result<Option<Transaction>, ReconciliationError>;

    /// Records an unmatched transaction.
    ///
    /// If the transaction id already exists, [`ReconciliationError::TransactionAlreadyExists`] is returned and
    /// nothing is written.
    async fn insert_transaction(&self, transaction: NewTransaction) -> Result<Transaction, ReconciliationError>;

    async fn fetch_order_counts(&self) -> Result<OrderCounts, ReconciliationError>;

    async fn fetch_transaction_counts(&self) -> Result<TransactionCounts, ReconciliationError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), ReconciliationError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum ReconciliationError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("Cannot insert transaction, since it already exists with txid {0}")]
    TransactionAlreadyExists(String),
}

impl From<sqlx::Error> for ReconciliationError {
    fn from(e: sqlx::Error) -> Self {
        ReconciliationError::DatabaseError(e.to_string())
    }
}
