mod amount;

pub mod helpers;
pub mod op;

pub use amount::{Amount, AmountConversionError, MINOR_UNITS_PER_MAJOR};
