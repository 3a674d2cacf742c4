//! Domain types returned to the orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Transaction lifecycle state as reported by the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionState {
    Pending,
    Approved,
    Declined,
    Voided,
    /// Processor-side error, or a status string this client does not know.
    Error,
}

impl TransactionState {
    /// Parse a processor status string. `None` for unknown values.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Some(TransactionState::Pending),
            "APPROVED" => Some(TransactionState::Approved),
            "DECLINED" => Some(TransactionState::Declined),
            "VOIDED" => Some(TransactionState::Voided),
            "ERROR" => Some(TransactionState::Error),
            _ => None,
        }
    }

    /// Whether the processor will not change this state again.
    pub fn is_final(&self) -> bool {
        !matches!(self, TransactionState::Pending)
    }
}

/// How a transaction was paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethodSummary {
    /// Method type as reported (e.g. "CARD", "PSE", "NEQUI").
    pub method_type: String,
    /// Card brand or financial institution, when known.
    pub processor: Option<String>,
    pub installments: Option<u32>,
}

/// Immutable snapshot of a transaction at query time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionStatus {
    pub transaction_id: String,
    pub status: TransactionState,
    pub status_message: Option<String>,
    pub amount_minor_units: i64,
    pub currency: String,
    pub reference: String,
    pub payment_method: PaymentMethodSummary,
    pub created_at: DateTime<Utc>,
    pub finalized_at: Option<DateTime<Utc>>,
    pub customer_email: Option<String>,
}

/// Payment method family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethodType {
    Card,
    Pse,
    Other,
}

/// A payment option checkout can offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethodDescriptor {
    pub method_type: PaymentMethodType,
    pub display_name: String,
    /// Card brands for CARD, bank names for PSE.
    pub processor_hints: Vec<String>,
    pub supported_currencies: Vec<String>,
    pub installments_supported: bool,
    pub max_installments: Option<u32>,
}

/// Card brands the processor accepts.
pub const CARD_BRANDS: [&str; 4] = ["VISA", "MASTERCARD", "AMEX", "DINERS"];

/// Installment ceiling for card payments.
pub const MAX_CARD_INSTALLMENTS: u32 = 36;

impl PaymentMethodDescriptor {
    pub fn card(currency: &str) -> Self {
        Self {
            method_type: PaymentMethodType::Card,
            display_name: "Credit/Debit Card".to_string(),
            processor_hints: CARD_BRANDS.iter().map(|b| b.to_string()).collect(),
            supported_currencies: vec![currency.to_string()],
            installments_supported: true,
            max_installments: Some(MAX_CARD_INSTALLMENTS),
        }
    }

    pub fn pse(currency: &str, banks: Vec<String>) -> Self {
        Self {
            method_type: PaymentMethodType::Pse,
            display_name: "PSE Bank Transfer".to_string(),
            processor_hints: banks,
            supported_currencies: vec![currency.to_string()],
            installments_supported: false,
            max_installments: None,
        }
    }

    pub fn other(name: &str, currency: &str) -> Self {
        Self {
            method_type: PaymentMethodType::Other,
            display_name: name.to_string(),
            processor_hints: Vec::new(),
            supported_currencies: vec![currency.to_string()],
            installments_supported: false,
            max_installments: None,
        }
    }
}

/// Result of payment method discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethods {
    pub methods: Vec<PaymentMethodDescriptor>,
    /// True when discovery failed and this is the static default set.
    pub is_default: bool,
    pub fetched_at: DateTime<Utc>,
}

impl PaymentMethods {
    pub fn live(methods: Vec<PaymentMethodDescriptor>) -> Self {
        Self {
            methods,
            is_default: false,
            fetched_at: Utc::now(),
        }
    }

    /// Static CARD + PSE set, PSE without a bank list.
    pub fn fallback(currency: &str) -> Self {
        Self {
            methods: vec![
                PaymentMethodDescriptor::card(currency),
                PaymentMethodDescriptor::pse(currency, Vec::new()),
            ],
            is_default: true,
            fetched_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_parsing() {
        assert_eq!(TransactionState::parse("APPROVED"), Some(TransactionState::Approved));
        assert_eq!(TransactionState::parse("voided"), Some(TransactionState::Voided));
        assert_eq!(TransactionState::parse("REFUNDED"), None);
        assert!(!TransactionState::Pending.is_final());
        assert!(TransactionState::Declined.is_final());
    }

    #[test]
    fn test_fallback_is_flagged_and_non_empty() {
        let fallback = PaymentMethods::fallback("COP");
        assert!(fallback.is_default);
        assert_eq!(fallback.methods.len(), 2);
        assert_eq!(fallback.methods[0].method_type, PaymentMethodType::Card);
        assert_eq!(fallback.methods[1].method_type, PaymentMethodType::Pse);
        assert!(fallback.methods[1].processor_hints.is_empty());
    }

    #[test]
    fn test_type_tags_serialize_upper_case() {
        assert_eq!(serde_json::to_string(&TransactionState::Approved).unwrap(), "\"APPROVED\"");
        assert_eq!(serde_json::to_string(&PaymentMethodType::Pse).unwrap(), "\"PSE\"");
    }
}
