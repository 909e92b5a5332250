use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Amount, NewTransaction, Provider},
    sms::{detector::ProviderDetector, parser::parse_message, ParsedMessage},
};

/// A payment notification that has been successfully read. This is everything needed to record a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedTransaction {
    pub transaction_id: String,
    pub amount: Amount,
    pub provider: Provider,
    pub counterparty_phone: Option<String>,
    pub raw_message: String,
}

impl ParsedTransaction {
    /// Converts the parsed message into a transaction record. The counterparty phone number is preferred as the
    /// sender; the gateway's sender identifier is used if no phone number was found.
    pub fn into_new_transaction(self, sender: &str) -> NewTransaction {
        let sender = self.counterparty_phone.unwrap_or_else(|| sender.trim().to_string());
        NewTransaction::new(self.transaction_id, self.amount, self.provider)
            .with_raw_message(self.raw_message)
            .with_sender(sender)
    }
}

/// The result of running a message through the extraction pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtractionOutcome {
    /// The sender is not a recognised payment gateway. The message is ignored.
    Rejected,
    /// The sender was recognised, but the message did not yield a transaction id and amount.
    Unparseable(ParsedMessage),
    Extracted(ParsedTransaction),
}

impl ExtractionOutcome {
    pub fn into_transaction(self) -> Option<ParsedTransaction> {
        match self {
            ExtractionOutcome::Extracted(t) => Some(t),
            _ => None,
        }
    }
}

/// Composes provider detection and parsing. It holds no mutable state and can be shared freely between tasks.
#[derive(Debug, Clone, Default)]
pub struct MessageExtractor {
    detector: ProviderDetector,
}

impl MessageExtractor {
    pub fn new(detector: ProviderDetector) -> Self {
        Self { detector }
    }

    pub fn detector(&self) -> &ProviderDetector {
        &self.detector
    }

    /// Reads a transaction out of `raw_message`. `None` means either the sender was rejected or the message could not
    /// be read. Use [`Self::classify`] to tell these apart.
    pub fn extract(&self, raw_message: &str, sender: &str) -> Option<ParsedTransaction> {
        self.classify(raw_message, sender).into_transaction()
    }

    pub fn classify(&self, raw_message: &str, sender: &str) -> ExtractionOutcome {
        let Some(provider) = self.detector.detect(sender, raw_message) else {
            return ExtractionOutcome::Rejected;
        };
        let parsed = parse_message(provider, raw_message);
        match parsed {
            ParsedMessage { transaction_id: Some(transaction_id), amount: Some(amount), .. }
                if !transaction_id.is_empty() =>
            {
                trace!("📩️ Extracted {provider} transaction {transaction_id} for {amount}");
                ExtractionOutcome::Extracted(ParsedTransaction {
                    transaction_id,
                    amount,
                    provider,
                    counterparty_phone: parsed.counterparty_phone,
                    raw_message: raw_message.to_string(),
                })
            },
            _ => {
                debug!(
                    "📩️ {provider} message from '{sender}' could not be read. Transaction id: {:?}. Amount: {:?}",
                    parsed.transaction_id, parsed.amount
                );
                ExtractionOutcome::Unparseable(parsed)
            },
        }
    }
}
