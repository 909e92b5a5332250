use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Amount, Provider},
    sms::patterns::{first_capture, grammar_for, ProviderGrammar},
};

/// The fields found in a message by a provider parser. Any field may be missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedMessage {
    pub provider: Provider,
    pub transaction_id: Option<String>,
    pub amount: Option<Amount>,
    pub counterparty_phone: Option<String>,
}

impl ParsedMessage {
    pub fn empty(provider: Provider) -> Self {
        Self { provider, transaction_id: None, amount: None, counterparty_phone: None }
    }

    pub fn has_transaction_id(&self) -> bool {
        self.transaction_id.as_ref().is_some_and(|id| !id.is_empty())
    }
}

/// Parses `raw_message` using the grammar for `provider`.
///
/// This is a pure function. A message that doesn't look like a payment yields a `ParsedMessage` with no fields set.
pub fn parse_message(provider: Provider, raw_message: &str) -> ParsedMessage {
    grammar_for(provider).parse(raw_message)
}

impl ProviderGrammar {
    pub fn parse(&self, raw_message: &str) -> ParsedMessage {
        if let Some(keywords) = &self.required_keywords {
            if !keywords.is_match(raw_message) {
                trace!("📩️ Message does not contain any {} transaction keywords", self.provider);
                return ParsedMessage::empty(self.provider);
            }
        }
        let transaction_id = first_capture(&self.transaction_id, raw_message).map(String::from);
        let amount = first_capture(&self.amount, raw_message).and_then(|s| match s.parse::<Amount>() {
            Ok(a) => Some(a),
            Err(e) => {
                debug!("📩️ Found an amount label in a {} message, but could not read the amount. {e}", self.provider);
                None
            },
        });
        let counterparty_phone = first_capture(&self.counterparty_phone, raw_message).map(String::from);
        ParsedMessage { provider: self.provider, transaction_id, amount, counterparty_phone }
    }
}
