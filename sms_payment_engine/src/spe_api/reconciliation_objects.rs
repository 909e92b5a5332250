use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Amount, Order, OrderId, Provider, Transaction},
    traits::{OrderCounts, TransactionCounts},
};

/// The fields of a paid order that are reported back to the caller and to event subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub order_id: OrderId,
    pub customer_name: String,
    pub amount: Amount,
}

impl From<&Order> for OrderSummary {
    fn from(order: &Order) -> Self {
        Self { order_id: order.order_id.clone(), customer_name: order.customer_name.clone(), amount: order.amount }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub matched: bool,
    pub order: Option<OrderSummary>,
}

impl MatchResult {
    pub fn unmatched() -> Self {
        Self { matched: false, order: None }
    }

    pub fn matched(order: &Order) -> Self {
        Self { matched: true, order: Some(order.into()) }
    }
}

impl Display for MatchResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.order {
            Some(o) => write!(f, "Matched to order {} ({}) for {}", o.order_id, o.customer_name, o.amount),
            None => write!(f, "Unmatched"),
        }
    }
}

/// The result of ingesting one raw message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IngestOutcome {
    /// The sender is not a recognised payment gateway. Nothing was written.
    Rejected,
    /// The sender was recognised, but no transaction could be read from the message. Nothing was written.
    ExtractionFailed { provider: Provider },
    /// The transaction id has been seen before. The previously recorded transaction is returned, and nothing was
    /// written.
    Duplicate { transaction: Transaction },
    /// The transaction was recorded, and matched to an order if a pending one was available.
    Recorded { transaction: Transaction, match_result: MatchResult },
}

impl IngestOutcome {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, IngestOutcome::Duplicate { .. })
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, IngestOutcome::Recorded { match_result, .. } if match_result.matched)
    }

    pub fn transaction(&self) -> Option<&Transaction> {
        match self {
            IngestOutcome::Duplicate { transaction } | IngestOutcome::Recorded { transaction, .. } => Some(transaction),
            _ => None,
        }
    }
}

impl Display for IngestOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestOutcome::Rejected => write!(f, "Rejected"),
            IngestOutcome::ExtractionFailed { provider } => write!(f, "Could not read {provider} message"),
            IngestOutcome::Duplicate { transaction } => write!(f, "Duplicate of {}", transaction.transaction_id),
            IngestOutcome::Recorded { transaction, match_result } => {
                write!(f, "Recorded {}. {match_result}", transaction.transaction_id)
            },
        }
    }
}

/// Aggregate reconciliation figures. These are derived from committed state and are never authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_orders: i64,
    pub pending_orders: i64,
    pub paid_orders: i64,
    pub cancelled_orders: i64,
    /// Paid orders as a percentage of all orders, rounded to two decimal places
    pub match_rate: f64,
    pub transactions: TransactionCounts,
}

impl Statistics {
    pub fn new(orders: OrderCounts, transactions: TransactionCounts) -> Self {
        Self {
            total_orders: orders.total,
            pending_orders: orders.pending,
            paid_orders: orders.paid,
            cancelled_orders: orders.cancelled,
            match_rate: match_rate(orders.paid, orders.total),
            transactions,
        }
    }
}

/// `paid / total` as a percentage, rounded half-up to two decimal places. Zero if there are no orders.
#[allow(clippy::cast_precision_loss)]
pub fn match_rate(paid: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    // In hundredths of a percent
    let basis_points = (paid * 20_000 + total) / (2 * total);
    basis_points as f64 / 100.0
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn match_rate_rounding() {
        assert_eq!(match_rate(0, 0), 0.0);
        assert_eq!(match_rate(0, 5), 0.0);
        assert_eq!(match_rate(5, 5), 100.0);
        assert_eq!(match_rate(1, 3), 33.33);
        assert_eq!(match_rate(2, 3), 66.67);
        assert_eq!(match_rate(1, 8), 12.5);
        assert_eq!(match_rate(1, 16), 6.25);
    }

    #[test]
    fn statistics_from_counts() {
        let orders = OrderCounts { total: 4, pending: 1, paid: 2, cancelled: 1 };
        let transactions = TransactionCounts { total: 3, matched: 2, unmatched: 1 };
        let stats = Statistics::new(orders, transactions);
        assert_eq!(stats.total_orders, 4);
        assert_eq!(stats.paid_orders, 2);
        assert_eq!(stats.cancelled_orders, 1);
        assert_eq!(stats.match_rate, 50.0);
        assert_eq!(stats.transactions.unmatched, 1);
    }

    #[test]
    fn unmatched_result() {
        let result = MatchResult::unmatched();
        assert!(!result.matched);
        assert!(result.order.is_none());
        assert_eq!(result.to_string(), "Unmatched");
    }
}
