//! Domain events for the notification layer.
//!
//! Register callbacks on [`EventHooks`], build [`EventHandlers`] from them, hand the [`EventProducers`] to the API
//! objects, and then start the handlers.
mod channel;
mod event_types;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::{OrderPaidEvent, TransactionProcessedEvent};
pub use hooks::{EventHandlers, EventHooks, EventProducers};
