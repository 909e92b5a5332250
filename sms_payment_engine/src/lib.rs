//! SMS Payment Engine
//!
//! The SMS payment engine reconciles payment notifications from mobile-money gateways (bKash, Nagad, Rocket) and
//! banks against a merchant's pending orders, so that orders are marked as paid without manual bookkeeping.
//!
//! The library is divided into these main sections:
//! 1. Message reading ([`mod@sms`]). Identifies the gateway that sent a message, and extracts the transaction id,
//!    amount and counterparty from its free-form text. This part is pure and does no I/O.
//! 2. Storage contracts ([`mod@traits`]) and the SQLite backend ([`SqliteDatabase`]). The compare-and-set claim that
//!    keeps concurrent payments from settling the same order lives in the backend.
//! 3. The public API ([`ReconciliationApi`], [`OrderApi`], [`StatisticsApi`]). You should never need to access the
//!    database directly. The exception is the data types used in the database. These are defined in the `db_types`
//!    module and are public.
//!
//! The engine also emits events when transactions are recorded and when orders are paid. See [`mod@events`] for how to
//! hook into these.
pub mod config;
pub mod db_types;
pub mod events;
pub mod sms;
mod spe_api;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use config::{ConfigError, EngineConfig};
pub use spe_api::{
    order_api::OrderApi,
    reconciliation_api::ReconciliationApi,
    reconciliation_objects,
    statistics_api::StatisticsApi,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{
    ClaimResult,
    OrderApiError,
    OrderManagement,
    ReconciliationDatabase,
    ReconciliationError,
};
