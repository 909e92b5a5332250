use cucumber::World;
use log::*;
use sms_payment_engine::{
    events::EventProducers,
    reconciliation_objects::IngestOutcome,
    EngineConfig,
    OrderApi,
    ReconciliationApi,
    SqliteDatabase,
};
use tokio::time::sleep;

use crate::support::prepare_env::{create_database, random_db_path};

#[derive(Default, Debug, World)]
pub struct ReconciliationWorld {
    pub system: Option<ReconciliationSystem>,
    pub last_outcome: Option<IngestOutcome>,
}

#[derive(Debug)]
pub struct ReconciliationSystem {
    pub db_path: String,
    pub api: ReconciliationApi<SqliteDatabase>,
    pub orders: OrderApi<SqliteDatabase>,
}

impl ReconciliationWorld {
    pub fn api(&self) -> &ReconciliationApi<SqliteDatabase> {
        &self.system.as_ref().expect("ReconciliationApi not initialised").api
    }

    pub fn orders(&self) -> &OrderApi<SqliteDatabase> {
        &self.system.as_ref().expect("OrderApi not initialised").orders
    }

    pub fn last_outcome(&self) -> &IngestOutcome {
        self.last_outcome.as_ref().expect("No message has been received yet")
    }
}

impl ReconciliationSystem {
    pub async fn new() -> Self {
        let url = prepare_test_env().await;
        let config = EngineConfig { database_url: url.clone(), max_connections: 1, ..EngineConfig::default() };
        let db = SqliteDatabase::from_config(&config).await.expect("Error creating connection to database");
        debug!("Created database: {url}");
        sleep(std::time::Duration::from_millis(50)).await;
        let api = ReconciliationApi::from_config(db.clone(), &config, EventProducers::default());
        let orders = OrderApi::new(db);
        Self { db_path: url, api, orders }
    }
}

pub async fn prepare_test_env() -> String {
    let path = random_db_path();
    create_database(&path).await;
    let db = SqliteDatabase::new_with_url(&path, 1).await.expect("Error creating connection to database");
    db.run_migrations().await.expect("Error running DB migrations");
    db.pool().close().await;
    path
}
