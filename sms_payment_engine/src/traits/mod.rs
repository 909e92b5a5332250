//! # Storage contracts
//!
//! This module defines the behaviour a database backend must expose in order to be used by the reconciliation engine.
//!
//! * [`ReconciliationDatabase`] covers the ingestion path: selecting candidate orders, claiming them with a
//!   compare-and-set, and recording transactions exactly once.
//! * [`OrderManagement`] covers the order administration boundary: creating, cancelling and querying orders and
//!   transactions.
//!
//! The correctness of the engine under concurrency rests on these contracts, in particular on
//! [`ReconciliationDatabase::claim_order_for_transaction`]. Backends must implement it as a single atomic operation.
mod data_objects;
mod order_management;
mod reconciliation_database;

pub use data_objects::{ClaimResult, OrderCounts, TransactionCounts};
pub use order_management::{OrderApiError, OrderManagement};
pub use reconciliation_database::{ReconciliationDatabase, ReconciliationError};
