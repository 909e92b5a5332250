use log::*;
use sms_payment_engine::{
    db_types::{Amount, NewOrder, Order, OrderId, Provider},
    events::EventProducers,
    OrderApi,
    ReconciliationApi,
    ReconciliationDatabase,
    SqliteDatabase,
};
use sqlx::{migrate::MigrateDatabase, Sqlite};

pub async fn prepare_test_env(url: &str) {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    create_database(url).await;
    let db = SqliteDatabase::new_with_url(url, 1).await.expect("Error creating connection to database");
    db.run_migrations().await.expect("Error running DB migrations");
    db.pool().close().await;
}

pub fn random_db_path() -> String {
    let path = std::env::temp_dir().join(format!("spg_it_store_{}.db", rand::random::<u64>()));
    format!("sqlite://{}", path.display())
}

pub async fn create_database(url: &str) {
    if Sqlite::database_exists(url).await.unwrap_or(false) {
        let _ = Sqlite::drop_database(url).await;
    }
    Sqlite::create_database(url).await.expect("Error creating database");
    debug!("🚀️ Created Sqlite database {url}");
}

/// A fresh, migrated database with room for concurrent writers.
pub async fn fresh_database(max_connections: u32) -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, max_connections).await.expect("Error creating database")
}

pub async fn setup(producers: EventProducers) -> (ReconciliationApi<SqliteDatabase>, OrderApi<SqliteDatabase>) {
    let db = fresh_database(5).await;
    (ReconciliationApi::new(db.clone(), producers), OrderApi::new(db))
}

pub async fn tear_down(mut api: ReconciliationApi<SqliteDatabase>) {
    if let Err(e) = api.db_mut().close().await {
        error!("🚀️ Failed to close database: {e}");
    }
    let url = api.db().url().to_string();
    Sqlite::drop_database(&url).await.unwrap();
}

/// Creates a pending order whose `created_at` is `age_secs` seconds in the past.
pub async fn order_aged(
    api: &OrderApi<SqliteDatabase>,
    order_id: &str,
    amount: i64,
    method: Provider,
    age_secs: i64,
) -> Order {
    let created_at = chrono::Utc::now() - chrono::Duration::seconds(age_secs);
    let order = NewOrder::new(OrderId::from(order_id), Amount::from_major(amount), method)
        .with_customer("Rahim", "01700000000")
        .with_created_at(created_at);
    api.create_order(order).await.expect("Error creating order")
}

pub fn bkash_message(major: i64, txid: &str) -> String {
    format!("Tk {major}.00 received from 01712345678. TrxID {txid}")
}
