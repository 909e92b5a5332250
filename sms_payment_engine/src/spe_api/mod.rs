//! # SMS payment engine public API
//!
//! * [`reconciliation_api`] is the primary API. It reads payment notifications, matches them to pending orders, and
//!   records them exactly once.
//! * [`order_api`] is the order administration boundary: creating, cancelling and listing orders, and listing
//!   transactions.
//! * [`statistics_api`] reports aggregate counts and the match rate.
//!
//! # API usage
//!
//! Each API is created by supplying a database backend that implements the backend traits it needs.
//!
//! ```rust,ignore
//! use sms_payment_engine::{events::EventProducers, ReconciliationApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/sms_payments.db", 5).await?;
//! let api = ReconciliationApi::new(db, EventProducers::default());
//! let outcome = api.process_message("Tk 500.00 received from 01712345678. TrxID BK12ABC3DEF", "bKash").await?;
//! ```
pub mod order_api;
pub mod reconciliation_api;
pub mod reconciliation_objects;
pub mod statistics_api;
