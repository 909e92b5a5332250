use thiserror::Error;

use crate::db_types::{NewOrder, Order, OrderId, OrderStatusType, Transaction};

#[derive(Debug, Clone, Error)]
pub enum OrderApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Order {0} already exists with different details")]
    OrderAlreadyExists(OrderId),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Order {0} is {1}, and can no longer be changed")]
    OrderNotPending(OrderId, OrderStatusType),
    #[error("Invalid order amount: {0}")]
    InvalidAmount(String),
}

impl From<sqlx::Error> for OrderApiError {
    fn from(e: sqlx::Error) -> Self {
        OrderApiError::DatabaseError(e.to_string())
    }
}

/// The `OrderManagement` trait defines the behaviour for creating, cancelling and querying orders, and for querying
/// recorded transactions.
///
/// Orders are only ever moved from pending to paid by the [`ReconciliationDatabase`](crate::ReconciliationDatabase)
/// claim methods. The only status change exposed here is cancellation.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Stores a new order. This call is idempotent on `order_id`.
    ///
    /// Returns the stored order, and `true` if it was inserted, or `false` if an order with the same id already
    /// existed. In the latter case the existing record is returned unchanged.
    async fn insert_order(&self, order: NewOrder) -> Result<(Order, bool), OrderApiError>;

    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, OrderApiError>;

    /// Fetches the most recent orders, newest first. If `status` is given, only orders with that status are
    /// returned.
    async fn fetch_orders(&self, status: Option<OrderStatusType>, limit: u32) -> Result<Vec<Order>, OrderApiError>;

    /// Moves the order from pending to cancelled, if and only if it is still pending.
    ///
    /// Returns the cancelled order, or `None` if the order was not pending at the moment of the update.
    async fn cancel_pending_order(&self, order_id: &OrderId) -> Result<Option<Order>, OrderApiError>;

    /// Fetches the most recently received transactions, newest first.
    async fn fetch_recent_transactions(&self, limit: u32) -> Result<Vec<Transaction>, OrderApiError>;

    /// Fetches the transaction that paid for the given order, if any.
    async fn fetch_transaction_for_order(&self, order_id: &OrderId) -> Result<Option<Transaction>, OrderApiError>;
}
