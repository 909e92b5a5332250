//! The order administration boundary.
//!
//! Orders are created and cancelled here. They are paid only by the matcher in
//! [`ReconciliationApi`](crate::ReconciliationApi).
use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderStatusType, Transaction},
    traits::{OrderApiError, OrderManagement},
};

pub const DEFAULT_QUERY_LIMIT: u32 = 50;

pub struct OrderApi<B> {
    db: B,
}

impl<B: Debug> Debug for OrderApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderApi ({:?})", self.db)
    }
}

impl<B> OrderApi<B>
where B: OrderManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    /// Stores a new pending order.
    ///
    /// Resubmitting an order is harmless: if an order with the same id, amount and payment method already exists, it
    /// is returned unchanged. If the existing order differs in amount or payment method, the call fails with
    /// [`OrderApiError::OrderAlreadyExists`].
    pub async fn create_order(&self, order: NewOrder) -> Result<Order, OrderApiError> {
        if !order.amount.is_positive() {
            return Err(OrderApiError::InvalidAmount(format!(
                "Order {} has amount {}. Order amounts must be positive.",
                order.order_id, order.amount
            )));
        }
        let (amount, method) = (order.amount, order.payment_method);
        let (existing, inserted) = self.db.insert_order(order).await?;
        if inserted {
            info!("📦️ Order {} for {amount} via {method} created", existing.order_id);
            return Ok(existing);
        }
        if existing.amount != amount || existing.payment_method != method {
            warn!(
                "📦️ Order {} was resubmitted for {amount} via {method}, but it already exists for {} via {}",
                existing.order_id, existing.amount, existing.payment_method
            );
            return Err(OrderApiError::OrderAlreadyExists(existing.order_id));
        }
        debug!("📦️ Order {} already exists. Returning the existing order.", existing.order_id);
        Ok(existing)
    }

    pub async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, OrderApiError> {
        self.db.fetch_order_by_order_id(order_id).await
    }

    /// Cancels a pending order. Paid and cancelled orders cannot be cancelled.
    pub async fn cancel_order(&self, order_id: &OrderId) -> Result<Order, OrderApiError> {
        if let Some(order) = self.db.cancel_pending_order(order_id).await? {
            info!("📦️ Order {order_id} cancelled");
            return Ok(order);
        }
        match self.db.fetch_order_by_order_id(order_id).await? {
            Some(order) => {
                debug!("📦️ Order {order_id} could not be cancelled. It is {}.", order.status);
                Err(OrderApiError::OrderNotPending(order.order_id, order.status))
            },
            None => Err(OrderApiError::OrderNotFound(order_id.clone())),
        }
    }

    /// The most recent orders, newest first. If `status` is given, only orders with that status are returned.
    pub async fn orders(
        &self,
        status: Option<OrderStatusType>,
        limit: Option<u32>,
    ) -> Result<Vec<Order>, OrderApiError> {
        self.db.fetch_orders(status, limit.unwrap_or(DEFAULT_QUERY_LIMIT)).await
    }

    /// The most recently received transactions, newest first.
    pub async fn recent_transactions(&self, limit: Option<u32>) -> Result<Vec<Transaction>, OrderApiError> {
        self.db.fetch_recent_transactions(limit.unwrap_or(DEFAULT_QUERY_LIMIT)).await
    }

    /// The transaction that paid for the order, if it has been paid.
    pub async fn transaction_for_order(&self, order_id: &OrderId) -> Result<Option<Transaction>, OrderApiError> {
        self.db.fetch_transaction_for_order(order_id).await
    }
}
