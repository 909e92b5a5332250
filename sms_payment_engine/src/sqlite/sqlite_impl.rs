//! `SqliteDatabase` is a concrete implementation of a reconciliation engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`traits`] module.
//!
//! [`traits`]: crate::traits
use std::fmt::Debug;

use chrono::Utc;
use log::*;
use sqlx::SqlitePool;

use super::db::{db_url, new_pool, orders, transactions};
use crate::{
    config::EngineConfig,
    db_types::{Amount, NewOrder, NewTransaction, Order, OrderId, OrderStatusType, Provider, Transaction},
    traits::{
        ClaimResult,
        OrderApiError,
        OrderCounts,
        OrderManagement,
        ReconciliationDatabase,
        ReconciliationError,
        TransactionCounts,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl ReconciliationDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn fetch_pending_orders(
        &self,
        amount: Amount,
        provider: Provider,
    ) -> Result<Vec<Order>, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_pending_orders(amount, provider, &mut conn).await?;
        Ok(orders)
    }

    /// If `transaction_id` has already paid for another order, [`ReconciliationError::TransactionAlreadyExists`] is
    /// returned and nothing is written.
    async fn claim_order(
        &self,
        order_id: &OrderId,
        transaction_id: &str,
    ) -> Result<Option<Order>, ReconciliationError> {
        let mut tx = self.pool.begin().await?;
        let order = match orders::claim_order(order_id, transaction_id, Utc::now(), &mut tx).await {
            Ok(order) => order,
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                debug!("🗃️ Transaction {transaction_id} has already paid for another order");
                tx.rollback().await?;
                return Err(ReconciliationError::TransactionAlreadyExists(transaction_id.to_string()));
            },
            Err(e) => return Err(e.into()),
        };
        tx.commit().await?;
        match &order {
            Some(_) => debug!("🗃️ Order {order_id} marked as paid by transaction {transaction_id}"),
            None => debug!("🗃️ Order {order_id} is no longer pending. Claim by {transaction_id} lost"),
        }
        Ok(order)
    }

    /// The order update is issued first, so that the sqlite transaction takes the write lock with its first statement.
    async fn claim_order_for_transaction(
        &self,
        order_id: &OrderId,
        transaction: NewTransaction,
    ) -> Result<ClaimResult, ReconciliationError> {
        let txid = transaction.transaction_id.clone();
        let mut tx = self.pool.begin().await?;
        let claimed = match orders::claim_order(order_id, &txid, Utc::now(), &mut tx).await {
            Ok(claimed) => claimed,
            // orders.transaction_id is unique, so another claim by this transaction id has already committed
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                debug!("🗃️ Transaction {txid} has already paid for another order");
                tx.rollback().await?;
                return Ok(ClaimResult::Duplicate);
            },
            Err(e) => return Err(e.into()),
        };
        let Some(order) = claimed else {
            debug!("🗃️ Order {order_id} is no longer pending. Claim by {txid} lost");
            tx.rollback().await?;
            return Ok(ClaimResult::Lost);
        };
        match transactions::insert_transaction(transaction, Some(&order.order_id), &mut tx).await {
            Ok(transaction) => {
                tx.commit().await?;
                debug!("🗃️ Order {order_id} paid by transaction {txid}");
                Ok(ClaimResult::Claimed { order, transaction })
            },
            Err(ReconciliationError::TransactionAlreadyExists(_)) => {
                debug!("🗃️ Transaction {txid} has already been recorded. Claim on order {order_id} rolled back");
                tx.rollback().await?;
                Ok(ClaimResult::Duplicate)
            },
            Err(e) => {
                error!("🗃️ Could not record transaction {txid} against order {order_id}. {e}");
                Err(e)
            },
        }
    }

    async fn fetch_transaction(&self, transaction_id: &str) -> Result<Option<Transaction>, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        let transaction = transactions::fetch_transaction(transaction_id, &mut conn).await?;
        Ok(transaction)
    }

    async fn insert_transaction(&self, transaction: NewTransaction) -> Result<Transaction, ReconciliationError> {
        let mut tx = self.pool.begin().await?;
        let transaction = transactions::insert_transaction(transaction, None, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Unmatched transaction {} recorded with id {}", transaction.transaction_id, transaction.id);
        Ok(transaction)
    }

    async fn fetch_order_counts(&self) -> Result<OrderCounts, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        let counts = orders::order_counts(&mut conn).await?;
        Ok(counts)
    }

    async fn fetch_transaction_counts(&self) -> Result<TransactionCounts, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        let counts = transactions::transaction_counts(&mut conn).await?;
        Ok(counts)
    }

    async fn close(&mut self) -> Result<(), ReconciliationError> {
        self.pool.close().await;
        Ok(())
    }
}

impl OrderManagement for SqliteDatabase {
    async fn insert_order(&self, order: NewOrder) -> Result<(Order, bool), OrderApiError> {
        let mut tx = self.pool.begin().await?;
        let result = orders::idempotent_insert(order, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, OrderApiError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_orders(&self, status: Option<OrderStatusType>, limit: u32) -> Result<Vec<Order>, OrderApiError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders(status, limit, &mut conn).await?;
        Ok(orders)
    }

    async fn cancel_pending_order(&self, order_id: &OrderId) -> Result<Option<Order>, OrderApiError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::cancel_pending_order(order_id, &mut tx).await?;
        tx.commit().await?;
        if order.is_some() {
            debug!("🗃️ Order {order_id} cancelled");
        }
        Ok(order)
    }

    async fn fetch_recent_transactions(&self, limit: u32) -> Result<Vec<Transaction>, OrderApiError> {
        let mut conn = self.pool.acquire().await?;
        let transactions = transactions::fetch_recent_transactions(limit, &mut conn).await?;
        Ok(transactions)
    }

    async fn fetch_transaction_for_order(&self, order_id: &OrderId) -> Result<Option<Transaction>, OrderApiError> {
        let mut conn = self.pool.acquire().await?;
        let transaction = transactions::fetch_transaction_for_order(order_id, &mut conn).await?;
        Ok(transaction)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL in the `SPG_DATABASE_URL` environment variable.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn from_config(config: &EngineConfig) -> Result<Self, sqlx::Error> {
        SqliteDatabase::new_with_url(config.database_url.as_str(), config.max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Applies the embedded schema migrations.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }
}
