use std::fmt::Display;

use log::*;
use serde::{Deserialize, Serialize};

use crate::{db_types::Provider, sms::parser::parse_message};

/// Sender identifiers that mark a message as coming from a test or diagnostic source rather than a gateway.
pub const DIAGNOSTIC_SENDER_MARKERS: [&str; 3] = ["", "test", "unknown"];

/// The parsers tried, in order, when the content fallback is enabled. Bank messages are never detected on content.
pub const CONTENT_FALLBACK_ORDER: [Provider; 3] = [Provider::Bkash, Provider::Nagad, Provider::Rocket];

//--------------------------------------     SenderToken      ---------------------------------------------------------
/// A single accepted sender identifier. Tokens are stored lower-case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SenderToken {
    /// The normalised sender must equal the token
    Exact(String),
    /// The normalised sender must contain the token
    Contains(String),
}

impl SenderToken {
    pub fn exact(token: &str) -> Self {
        Self::Exact(token.trim().to_lowercase())
    }

    pub fn contains(token: &str) -> Self {
        Self::Contains(token.trim().to_lowercase())
    }

    /// Reads a token from configuration text. `*token*` is a containment token, anything else is exact.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        match s.strip_prefix('*').and_then(|s| s.strip_suffix('*')) {
            Some("") => None,
            Some(inner) => Some(Self::contains(inner)),
            None if s.is_empty() => None,
            None => Some(Self::exact(s)),
        }
    }

    pub fn matches(&self, normalised_sender: &str) -> bool {
        match self {
            SenderToken::Exact(t) => normalised_sender == t,
            SenderToken::Contains(t) => !t.is_empty() && normalised_sender.contains(t.as_str()),
        }
    }
}

impl Display for SenderToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SenderToken::Exact(t) => write!(f, "{t}"),
            SenderToken::Contains(t) => write!(f, "*{t}*"),
        }
    }
}

//--------------------------------------   SenderWhitelist    ---------------------------------------------------------
/// Maps trusted sender identifiers to providers. Providers are checked in [`Provider::ALL`] order, and the first
/// provider with a matching token wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderWhitelist {
    entries: Vec<(Provider, Vec<SenderToken>)>,
}

impl Default for SenderWhitelist {
    fn default() -> Self {
        use SenderToken as T;
        Self {
            entries: vec![
                (Provider::Bkash, vec![T::exact("bkash"), T::contains("bkash")]),
                (Provider::Nagad, vec![T::exact("nagad"), T::exact("+8801970716167"), T::contains("nagad")]),
                (Provider::Rocket, vec![T::exact("16222"), T::contains("rocket")]),
                (Provider::Bank, vec![T::contains("ibbl"), T::contains("islami.bank"), T::contains("islamibank")]),
            ],
        }
    }
}

impl SenderWhitelist {
    /// A whitelist that accepts no senders at all.
    pub fn empty() -> Self {
        Self { entries: Provider::ALL.iter().map(|p| (*p, Vec::new())).collect() }
    }

    /// Replaces the accepted tokens for `provider`.
    pub fn with_tokens(mut self, provider: Provider, tokens: Vec<SenderToken>) -> Self {
        match self.entries.iter_mut().find(|(p, _)| *p == provider) {
            Some((_, existing)) => *existing = tokens,
            None => self.entries.push((provider, tokens)),
        }
        self
    }

    pub fn tokens_for(&self, provider: Provider) -> &[SenderToken] {
        self.entries.iter().find(|(p, _)| *p == provider).map(|(_, t)| t.as_slice()).unwrap_or_default()
    }

    pub fn provider_for(&self, sender: &str) -> Option<Provider> {
        let sender = normalise_sender(sender);
        self.entries.iter().find(|(_, tokens)| tokens.iter().any(|t| t.matches(&sender))).map(|(p, _)| *p)
    }
}

pub fn normalise_sender(sender: &str) -> String {
    sender.trim().to_lowercase()
}

//--------------------------------------   ProviderDetector   ---------------------------------------------------------
/// Decides which provider sent a message.
///
/// Detection is normally done on the sender identifier alone. When `content_fallback` is enabled, a message from an
/// empty or diagnostic sender (see [`DIAGNOSTIC_SENDER_MARKERS`]) is instead identified by trying the parsers in
/// [`CONTENT_FALLBACK_ORDER`]. Anyone who can reach the ingestion endpoint can pick their own sender identifier, so the
/// fallback must stay disabled in production.
#[derive(Debug, Clone, Default)]
pub struct ProviderDetector {
    whitelist: SenderWhitelist,
    content_fallback: bool,
}

impl ProviderDetector {
    pub fn new(whitelist: SenderWhitelist) -> Self {
        Self { whitelist, content_fallback: false }
    }

    pub fn with_content_fallback(mut self, enabled: bool) -> Self {
        self.content_fallback = enabled;
        self
    }

    pub fn whitelist(&self) -> &SenderWhitelist {
        &self.whitelist
    }

    pub fn content_fallback_enabled(&self) -> bool {
        self.content_fallback
    }

    pub fn detect(&self, sender: &str, raw_message: &str) -> Option<Provider> {
        if let Some(provider) = self.whitelist.provider_for(sender) {
            trace!("📩️ Sender '{sender}' is whitelisted for {provider}");
            return Some(provider);
        }
        let normalised = normalise_sender(sender);
        if !DIAGNOSTIC_SENDER_MARKERS.contains(&normalised.as_str()) {
            debug!("📩️ Sender '{sender}' is not whitelisted. Ignoring message.");
            return None;
        }
        if !self.content_fallback {
            debug!("📩️ Message from diagnostic sender '{sender}' ignored, since the content fallback is disabled");
            return None;
        }
        let provider = CONTENT_FALLBACK_ORDER.into_iter().find(|p| parse_message(*p, raw_message).has_transaction_id());
        match provider {
            Some(p) => warn!("📩️ Diagnostic sender '{sender}'. Message content looks like it came from {p}"),
            None => debug!("📩️ Diagnostic sender '{sender}'. No parser recognised the message content"),
        }
        provider
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const BKASH_MSG: &str = "Tk 500.00 received from 01712345678. TrxID BK12ABC3DEF";
    const NAGAD_MSG: &str = "You have received Tk. 1,000.00 from 01812345678. Trx ID: NGD123456789";
    const ROCKET_MSG: &str = "Amount: Tk 250.00. TxnId: 1234567890";
    const BANK_MSG: &str = "A/C credited with BDT 2,500.00. Ref: IB99887766.";

    #[test]
    fn default_whitelist() {
        let detector = ProviderDetector::default();
        let cases = [
            ("bKash", Some(Provider::Bkash)),
            ("  BKASH ", Some(Provider::Bkash)),
            ("bKash-Alerts", Some(Provider::Bkash)),
            ("NAGAD", Some(Provider::Nagad)),
            ("+8801970716167", Some(Provider::Nagad)),
            ("16222", Some(Provider::Rocket)),
            ("Rocket", Some(Provider::Rocket)),
            ("IBBL", Some(Provider::Bank)),
            ("Islami.Bank", Some(Provider::Bank)),
            ("IslamiBank-BD", Some(Provider::Bank)),
            ("01712345678", None),
            ("162220", None),
            ("random", None),
        ];
        for (sender, expected) in cases {
            assert_eq!(detector.detect(sender, BKASH_MSG), expected, "sender: {sender}");
        }
    }

    #[test]
    fn sender_tokens_from_config_text() {
        assert_eq!(SenderToken::parse("bKash"), Some(SenderToken::Exact("bkash".into())));
        assert_eq!(SenderToken::parse(" *Nagad* "), Some(SenderToken::Contains("nagad".into())));
        assert_eq!(SenderToken::parse("**"), None);
        assert_eq!(SenderToken::parse(""), None);
        assert_eq!(SenderToken::contains("ibbl").to_string(), "*ibbl*");
    }

    #[test]
    fn injected_whitelist_replaces_defaults() {
        let whitelist = SenderWhitelist::default().with_tokens(Provider::Bkash, vec![SenderToken::exact("247")]);
        let detector = ProviderDetector::new(whitelist);
        assert_eq!(detector.detect("bkash", BKASH_MSG), None);
        assert_eq!(detector.detect("247", BKASH_MSG), Some(Provider::Bkash));
        assert_eq!(detector.detect("nagad", NAGAD_MSG), Some(Provider::Nagad));
        assert!(ProviderDetector::new(SenderWhitelist::empty()).detect("bkash", BKASH_MSG).is_none());
    }

    #[test]
    fn content_fallback_is_off_by_default() {
        let detector = ProviderDetector::default();
        for sender in ["", "test", "UNKNOWN"] {
            assert_eq!(detector.detect(sender, BKASH_MSG), None);
        }
    }

    #[test]
    fn content_fallback_when_enabled() {
        let detector = ProviderDetector::default().with_content_fallback(true);
        assert_eq!(detector.detect("", BKASH_MSG), Some(Provider::Bkash));
        assert_eq!(detector.detect("test", ROCKET_MSG), Some(Provider::Rocket));
        assert_eq!(detector.detect(" Unknown ", ROCKET_MSG), Some(Provider::Rocket));
        // The bKash grammar also accepts "Trx ID:" labels, so it wins over Nagad
        assert_eq!(detector.detect("test", NAGAD_MSG), Some(Provider::Bkash));
        // Bank messages are never detected from content
        assert_eq!(detector.detect("test", BANK_MSG), None);
        // Untrusted senders never get the fallback
        assert_eq!(detector.detect("01712345678", BKASH_MSG), None);
    }
}
