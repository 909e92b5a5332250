use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
pub use spg_common::Amount;
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Conversion error: {0}")]
pub struct ConversionError(String);

//--------------------------------------      Provider        ---------------------------------------------------------
/// The mobile-money or bank channel that issued a payment notification. Orders name the provider the customer is
/// expected to pay with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Bkash,
    Nagad,
    Rocket,
    Bank,
}

impl Provider {
    pub const ALL: [Provider; 4] = [Provider::Bkash, Provider::Nagad, Provider::Rocket, Provider::Bank];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Bkash => "bkash",
            Provider::Nagad => "nagad",
            Provider::Rocket => "rocket",
            Provider::Bank => "bank",
        }
    }
}

impl Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bkash" => Ok(Self::Bkash),
            "nagad" => Ok(Self::Nagad),
            "rocket" => Ok(Self::Rocket),
            "bank" => Ok(Self::Bank),
            s => Err(ConversionError(format!("Invalid provider: {s}"))),
        }
    }
}

//--------------------------------------        OrderId        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatusType {
    /// The order is waiting for a payment notification.
    Pending,
    /// A payment notification has been matched to the order. Terminal.
    Paid,
    /// The order was cancelled before it was paid. Terminal.
    Cancelled,
}

impl OrderStatusType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatusType::Pending => "pending",
            OrderStatusType::Paid => "paid",
            OrderStatusType::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatusType::Pending)
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------        Order       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_id: OrderId,
    pub customer_name: String,
    pub customer_phone: String,
    pub amount: Amount,
    pub payment_method: Provider,
    pub status: OrderStatusType,
    /// Set if, and only if, the order is paid
    pub transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

//--------------------------------------        NewOrder       ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    /// The order id as assigned by the merchant
    pub order_id: OrderId,
    pub customer_name: String,
    pub customer_phone: String,
    /// The amount the customer is expected to pay. Matching is exact.
    pub amount: Amount,
    /// The provider the customer has been asked to pay with
    pub payment_method: Provider,
    /// Orders are matched oldest-first on this timestamp
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    pub fn new(order_id: OrderId, amount: Amount, payment_method: Provider) -> Self {
        Self {
            order_id,
            customer_name: String::default(),
            customer_phone: String::default(),
            amount,
            payment_method,
            created_at: Utc::now(),
        }
    }

    pub fn with_customer(mut self, name: &str, phone: &str) -> Self {
        self.customer_name = name.to_string();
        self.customer_phone = phone.to_string();
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

//-----------------------------------------   TransactionStatus   -----------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Matched,
    Unmatched,
}

impl Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionStatus::Matched => write!(f, "matched"),
            TransactionStatus::Unmatched => write!(f, "unmatched"),
        }
    }
}

//--------------------------------------      Transaction      ---------------------------------------------------------
/// A payment notification that has been ingested. Transactions are written once and never modified.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    /// The provider-assigned reference. Unique across all transactions.
    pub transaction_id: String,
    pub amount: Amount,
    pub provider: Provider,
    pub raw_message: String,
    /// The counterparty phone number if one was found in the message, otherwise the sender identifier
    pub sender: String,
    pub matched_order_id: Option<OrderId>,
    pub status: TransactionStatus,
    pub received_at: DateTime<Utc>,
}

//--------------------------------------    NewTransaction     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub transaction_id: String,
    pub amount: Amount,
    pub provider: Provider,
    pub raw_message: String,
    pub sender: String,
    pub received_at: DateTime<Utc>,
}

impl NewTransaction {
    pub fn new(transaction_id: String, amount: Amount, provider: Provider) -> Self {
        Self {
            transaction_id,
            amount,
            provider,
            raw_message: String::default(),
            sender: String::default(),
            received_at: Utc::now(),
        }
    }

    pub fn with_raw_message(mut self, raw_message: String) -> Self {
        self.raw_message = raw_message;
        self
    }

    pub fn with_sender(mut self, sender: String) -> Self {
        self.sender = sender;
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn provider_round_trip_through_text() {
        for p in Provider::ALL {
            assert_eq!(p.to_string().parse::<Provider>().unwrap(), p);
        }
        assert_eq!(" bKash ".parse::<Provider>().unwrap(), Provider::Bkash);
        assert!("upay".parse::<Provider>().is_err());
    }

    #[test]
    fn order_status_terminality() {
        assert!(!OrderStatusType::Pending.is_terminal());
        assert!(OrderStatusType::Paid.is_terminal());
        assert!(OrderStatusType::Cancelled.is_terminal());
        assert_eq!("PAID".parse::<OrderStatusType>().unwrap(), OrderStatusType::Paid);
    }

    #[test]
    fn provider_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Provider::Bkash).unwrap(), "\"bkash\"");
    }
}
