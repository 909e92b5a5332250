use sqlx::SqliteConnection;

use crate::{
    db_types::{NewTransaction, OrderId, Transaction, TransactionStatus},
    traits::{ReconciliationError, TransactionCounts},
};

/// Records the transaction. If `matched_order_id` is given, the transaction is recorded as matched to that order,
/// otherwise it is recorded as unmatched.
///
/// If the transaction id has already been recorded, [`ReconciliationError::TransactionAlreadyExists`] is returned.
pub async fn insert_transaction(
    transaction: NewTransaction,
    matched_order_id: Option<&OrderId>,
    conn: &mut SqliteConnection,
) -> Result<Transaction, ReconciliationError> {
    let txid = transaction.transaction_id.clone();
    let status = match matched_order_id {
        Some(_) => TransactionStatus::Matched,
        None => TransactionStatus::Unmatched,
    };
    let record = sqlx::query_as(
        r#"
            INSERT INTO transactions (
                transaction_id,
                amount,
                provider,
                raw_message,
                sender,
                matched_order_id,
                status,
                received_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *;
        "#,
    )
    .bind(transaction.transaction_id)
    .bind(transaction.amount)
    .bind(transaction.provider)
    .bind(transaction.raw_message)
    .bind(transaction.sender)
    .bind(matched_order_id.map(|o| o.as_str()))
    .bind(status)
    .bind(transaction.received_at)
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => ReconciliationError::TransactionAlreadyExists(txid),
        _ => ReconciliationError::from(e),
    })?;
    Ok(record)
}

pub async fn fetch_transaction(
    transaction_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Transaction>, sqlx::Error> {
    let transaction = sqlx::query_as("SELECT * FROM transactions WHERE transaction_id = $1")
        .bind(transaction_id)
        .fetch_optional(conn)
        .await?;
    Ok(transaction)
}

pub async fn fetch_transaction_for_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Transaction>, sqlx::Error> {
    let transaction = sqlx::query_as("SELECT * FROM transactions WHERE matched_order_id = $1")
        .bind(order_id.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(transaction)
}

/// Fetches the most recently received transactions, newest first.
pub async fn fetch_recent_transactions(
    limit: u32,
    conn: &mut SqliteConnection,
) -> Result<Vec<Transaction>, sqlx::Error> {
    let transactions = sqlx::query_as("SELECT * FROM transactions ORDER BY received_at DESC, id DESC LIMIT $1")
        .bind(i64::from(limit))
        .fetch_all(conn)
        .await?;
    Ok(transactions)
}

pub async fn transaction_counts(conn: &mut SqliteConnection) -> Result<TransactionCounts, sqlx::Error> {
    let counts = sqlx::query_as(
        r#"
            SELECT
                COUNT(*) AS total,
                COALESCE(SUM(CASE WHEN status = 'matched' THEN 1 ELSE 0 END), 0) AS matched,
                COALESCE(SUM(CASE WHEN status = 'unmatched' THEN 1 ELSE 0 END), 0) AS unmatched
            FROM transactions
        "#,
    )
    .fetch_one(conn)
    .await?;
    Ok(counts)
}
