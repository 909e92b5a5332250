//! Provider message grammars.
//!
//! Each provider is described by a [`PatternTable`]: ordered lists of regular expressions for each field the engine
//! extracts. Gateways change their wording over time, so each list holds every known variant, most specific first.
//! The first pattern in a list that matches wins; the remaining patterns in that list are not consulted.
//!
//! Every pattern captures the field value in group 1.
use once_cell::sync::Lazy;
use regex::Regex;

use crate::db_types::Provider;

/// The uncompiled description of a provider's message format.
#[derive(Debug, Clone, Copy)]
pub struct PatternTable {
    pub provider: Provider,
    /// If present, the message must match this pattern before any field is extracted.
    pub required_keywords: Option<&'static str>,
    pub transaction_id: &'static [&'static str],
    pub amount: &'static [&'static str],
    pub counterparty_phone: &'static [&'static str],
}

pub const BKASH: PatternTable = PatternTable {
    provider: Provider::Bkash,
    required_keywords: None,
    transaction_id: &[
        r"(?i)TrxID\s+([A-Z0-9]{10,15})",
        r"(?i)Trx\s*ID\s*:?\s*([A-Z0-9]{10,15})",
        r"(?i)Transaction\s*ID\s*:?\s*([A-Z0-9]{10,15})",
    ],
    amount: &[r"(?i)(?:Tk|Taka|BDT)\s*([0-9][0-9,]*\.?[0-9]*)", r"(?i)([0-9][0-9,]*\.?[0-9]*)\s*(?:Tk|Taka|BDT)"],
    counterparty_phone: &[r"(?i)(?:from|sender)\s+(01[0-9]{9})"],
};

pub const NAGAD: PatternTable = PatternTable {
    provider: Provider::Nagad,
    required_keywords: None,
    transaction_id: &[
        r"(?i)Trx\s*ID\s*:?\s*([A-Z0-9]{10,15})",
        r"(?i)TrxID\s*:?\s*([A-Z0-9]{10,15})",
        r"(?i)Transaction\s*ID\s*:?\s*([A-Z0-9]{10,15})",
    ],
    amount: &[
        r"(?i)(?:Tk|Taka)\.\s*([0-9][0-9,]*\.?[0-9]*)",
        r"(?i)([0-9][0-9,]*\.?[0-9]*)\s*(?:Tk|Taka)",
        r"(?i)(?:Tk|Taka)\s*([0-9][0-9,]*\.?[0-9]*)",
    ],
    counterparty_phone: &[r"(?i)(?:from|sender)\s+(01[0-9]{9})"],
};

pub const ROCKET: PatternTable = PatternTable {
    provider: Provider::Rocket,
    required_keywords: None,
    transaction_id: &[
        r"(?i)TxnId\s*:?\s*([A-Z0-9]{6,})",
        r"(?i)TrxID\s*:?\s*([A-Z0-9]{6,})",
        r"(?i)Transaction\s*ID\s*:?\s*([A-Z0-9]{6,})",
    ],
    amount: &[r"(?i)Amount\s*:\s*Tk\s*([0-9][0-9,]*\.?[0-9]*)", r"(?i)(?:Tk|Taka|BDT)\s*([0-9][0-9,]*\.?[0-9]*)"],
    counterparty_phone: &[r"(?i)(?:from|A/C)\s*:?\s*(01[0-9]{9})"],
};

pub const BANK: PatternTable = PatternTable {
    provider: Provider::Bank,
    required_keywords: Some(r"(?i)credit|deposit|received"),
    transaction_id: &[
        r"(?i)Trx\s*ID\s*:?\s*([A-Z0-9]{6,})",
        r"(?i)\bRef(?:erence)?\s*:?\s*([A-Z0-9]{6,})",
        r"(?i)\bTxn\s*:?\s*([A-Z0-9]{6,})",
    ],
    amount: &[r"(?i)(?:BDT|Tk)\s*\.?\s*([0-9][0-9,]*\.?[0-9]*)", r"(?i)([0-9][0-9,]*\.?[0-9]*)\s*(?:BDT|Tk)"],
    counterparty_phone: &[],
};

pub const PATTERN_TABLES: [PatternTable; 4] = [BKASH, NAGAD, ROCKET, BANK];

/// A [`PatternTable`] with its expressions compiled.
#[derive(Debug)]
pub struct ProviderGrammar {
    pub provider: Provider,
    pub required_keywords: Option<Regex>,
    pub transaction_id: Vec<Regex>,
    pub amount: Vec<Regex>,
    pub counterparty_phone: Vec<Regex>,
}

impl ProviderGrammar {
    pub fn compile(table: &PatternTable) -> Result<Self, regex::Error> {
        let compile_all = |patterns: &[&str]| patterns.iter().map(|p| Regex::new(p)).collect::<Result<Vec<_>, _>>();
        Ok(Self {
            provider: table.provider,
            required_keywords: table.required_keywords.map(Regex::new).transpose()?,
            transaction_id: compile_all(table.transaction_id)?,
            amount: compile_all(table.amount)?,
            counterparty_phone: compile_all(table.counterparty_phone)?,
        })
    }
}

/// Returns the capture of the first pattern in `patterns` that matches `text`.
pub fn first_capture<'t>(patterns: &[Regex], text: &'t str) -> Option<&'t str> {
    patterns.iter().find_map(|p| p.captures(text)).and_then(|c| c.get(1)).map(|m| m.as_str())
}

static GRAMMARS: Lazy<Vec<ProviderGrammar>> = Lazy::new(|| {
    PATTERN_TABLES
        .iter()
        .map(|t| {
            ProviderGrammar::compile(t)
                .unwrap_or_else(|e| panic!("The built-in pattern table for {} is invalid: {e}", t.provider))
        })
        .collect()
});

pub fn grammar_for(provider: Provider) -> &'static ProviderGrammar {
    // Every provider has an entry in PATTERN_TABLES, and the tables are in Provider::ALL order
    let index = Provider::ALL.iter().position(|p| *p == provider).unwrap_or_default();
    &GRAMMARS[index]
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn tables_are_in_provider_order() {
        let providers = PATTERN_TABLES.iter().map(|t| t.provider).collect::<Vec<_>>();
        assert_eq!(providers, Provider::ALL.to_vec());
        for p in Provider::ALL {
            assert_eq!(grammar_for(p).provider, p);
        }
    }

    #[test]
    fn all_patterns_compile_with_one_capture_group() {
        for table in PATTERN_TABLES {
            let grammar = ProviderGrammar::compile(&table).expect("pattern table should compile");
            let fields =
                grammar.transaction_id.iter().chain(grammar.amount.iter()).chain(grammar.counterparty_phone.iter());
            for re in fields {
                assert_eq!(re.captures_len(), 2, "{} should have exactly one capture group", re.as_str());
            }
        }
    }

    #[test]
    fn first_matching_pattern_wins() {
        let patterns = vec![Regex::new(r"A(\d)").unwrap(), Regex::new(r"B(\d)").unwrap()];
        assert_eq!(first_capture(&patterns, "B2 A1"), Some("1"));
        assert_eq!(first_capture(&patterns, "B2"), Some("2"));
        assert_eq!(first_capture(&patterns, "C3"), None);
    }

    #[test]
    fn amounts_need_a_currency_label() {
        for table in PATTERN_TABLES {
            let grammar = grammar_for(table.provider);
            assert_eq!(first_capture(&grammar.amount, "received 500.00 from 01712345678"), None);
        }
    }
}
