use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{Amount, NewOrder, Order, OrderId, OrderStatusType, Provider},
    traits::{OrderApiError, OrderCounts},
};

/// Inserts the order into the database, returning `false` in the second parameter if the order already exists.
///
/// Two concurrent inserts of the same order id are resolved by the unique constraint on `order_id`. The loser
/// fetches the winner's record.
pub async fn idempotent_insert(order: NewOrder, conn: &mut SqliteConnection) -> Result<(Order, bool), OrderApiError> {
    let order_id = order.order_id.clone();
    match insert_order(order, conn).await {
        Ok(order) => {
            debug!("📝️ Order [{}] inserted with id {}", order.order_id, order.id);
            Ok((order, true))
        },
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            let existing = fetch_order_by_order_id(&order_id, conn)
                .await?
                .ok_or_else(|| OrderApiError::DatabaseError(format!("Order {order_id} exists but cannot be fetched")))?;
            trace!("📝️ Order {order_id} already exists with id {}", existing.id);
            Ok((existing, false))
        },
        Err(e) => Err(e.into()),
    }
}

/// Inserts a new order into the database using the given connection. This is not atomic. You can embed this call
/// inside a transaction if you need to ensure atomicity, and pass `&mut *tx` as the connection argument.
///
/// New orders are always pending.
async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_id,
                customer_name,
                customer_phone,
                amount,
                payment_method,
                status,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, 'pending', $6, $6)
            RETURNING *;
        "#,
    )
    .bind(order.order_id)
    .bind(order.customer_name)
    .bind(order.customer_phone)
    .bind(order.amount)
    .bind(order.payment_method)
    .bind(order.created_at)
    .fetch_one(conn)
    .await
}

/// Returns the entry in the orders table for the corresponding `order_id`
pub async fn fetch_order_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order =
        sqlx::query_as("SELECT * FROM orders WHERE order_id = $1").bind(order_id.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

/// Fetches the pending orders that a payment of exactly `amount` via `provider` could settle, oldest first.
pub async fn fetch_pending_orders(
    amount: Amount,
    provider: Provider,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let orders: Vec<Order> = sqlx::query_as(
        r#"
            SELECT * FROM orders
            WHERE status = 'pending' AND amount = $1 AND payment_method = $2
            ORDER BY created_at ASC, order_id ASC
        "#,
    )
    .bind(amount)
    .bind(provider)
    .fetch_all(conn)
    .await?;
    trace!("📝️ {} pending {provider} orders for {amount}", orders.len());
    Ok(orders)
}

/// Fetches the most recent orders, newest first, optionally filtered by status.
pub async fn fetch_orders(
    status: Option<OrderStatusType>,
    limit: u32,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM orders ");
    if let Some(status) = status {
        builder.push("WHERE status = ");
        builder.push_bind(status);
    }
    builder.push(" ORDER BY created_at DESC, id DESC LIMIT ");
    builder.push_bind(i64::from(limit));
    trace!("📝️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    Ok(orders)
}

/// The compare-and-set at the heart of the matcher. The order is marked as paid only if it is still pending when the
/// statement executes. Returns `None` if no row was updated.
pub async fn claim_order(
    order_id: &OrderId,
    transaction_id: &str,
    paid_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders
            SET status = 'paid', transaction_id = $1, paid_at = $2, updated_at = $2
            WHERE order_id = $3 AND status = 'pending'
            RETURNING *;
        "#,
    )
    .bind(transaction_id)
    .bind(paid_at)
    .bind(order_id.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Moves the order from pending to cancelled. Returns `None` if the order was not pending.
pub async fn cancel_pending_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET status = 'cancelled', updated_at = $1
            WHERE order_id = $2 AND status = 'pending'
            RETURNING *;
        "#,
    )
    .bind(Utc::now())
    .bind(order_id.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

pub async fn order_counts(conn: &mut SqliteConnection) -> Result<OrderCounts, sqlx::Error> {
    let counts = sqlx::query_as(
        r#"
            SELECT
                COUNT(*) AS total,
                COALESCE(SUM(CASE WHEN status = 'pending' THEN 1 ELSE 0 END), 0) AS pending,
                COALESCE(SUM(CASE WHEN status = 'paid' THEN 1 ELSE 0 END), 0) AS paid,
                COALESCE(SUM(CASE WHEN status = 'cancelled' THEN 1 ELSE 0 END), 0) AS cancelled
            FROM orders
        "#,
    )
    .fetch_one(conn)
    .await?;
    Ok(counts)
}
