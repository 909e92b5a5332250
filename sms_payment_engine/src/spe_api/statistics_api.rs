use std::fmt::Debug;

use log::trace;

use crate::{
    spe_api::reconciliation_objects::Statistics,
    traits::{ReconciliationDatabase, ReconciliationError},
};

/// Read-only reconciliation figures.
pub struct StatisticsApi<B> {
    db: B,
}

impl<B: Debug> Debug for StatisticsApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StatisticsApi ({:?})", self.db)
    }
}

impl<B> StatisticsApi<B>
where B: ReconciliationDatabase
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn statistics(&self) -> Result<Statistics, ReconciliationError> {
        let orders = self.db.fetch_order_counts().await?;
        let transactions = self.db.fetch_transaction_counts().await?;
        trace!("📊️ Order counts: {orders:?}. Transaction counts: {transactions:?}");
        Ok(Statistics::new(orders, transactions))
    }
}
