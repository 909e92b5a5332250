//! Reading payment notifications.
//!
//! A message passes through two stages. The [`ProviderDetector`] decides which gateway sent it, using the sender
//! identifier. The provider's grammar (see [`patterns`]) then pulls out the transaction id, the amount and, where
//! available, the counterparty's phone number. [`MessageExtractor`] runs both stages.
//!
//! Everything in this module is pure and holds no mutable state.
mod detector;
mod extractor;
mod parser;
pub mod patterns;

pub use detector::{
    normalise_sender,
    ProviderDetector,
    SenderToken,
    SenderWhitelist,
    CONTENT_FALLBACK_ORDER,
    DIAGNOSTIC_SENDER_MARKERS,
};
pub use extractor::{ExtractionOutcome, MessageExtractor, ParsedTransaction};
pub use parser::{parse_message, ParsedMessage};
