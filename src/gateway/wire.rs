//! Processor JSON shapes and their mapping onto domain types.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::gateway::classifier::RawFailure;
use crate::gateway::types::{
    PaymentMethodDescriptor, PaymentMethodSummary, TransactionState, TransactionStatus,
};

/// Decode a response body, unwrapping the `{"data": ...}` envelope if present.
pub fn decode<T: DeserializeOwned>(body: &str) -> Result<T, RawFailure> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| RawFailure::MalformedBody(e.to_string()))?;
    let payload = match value {
        Value::Object(mut map) if map.contains_key("data") => map.remove("data").unwrap_or(Value::Null),
        other => other,
    };
    serde_json::from_value(payload).map_err(|e| RawFailure::MalformedBody(e.to_string()))
}

/// `GET /v1/transactions/{id}` payload.
#[derive(Debug, Deserialize)]
pub struct TransactionWire {
    pub id: Option<String>,
    pub status: String,
    pub status_message: Option<String>,
    pub amount_in_cents: i64,
    pub currency: String,
    #[serde(default)]
    pub reference: String,
    pub payment_method_type: Option<String>,
    pub payment_method: Option<PaymentMethodWire>,
    pub created_at: DateTime<Utc>,
    pub finalized_at: Option<DateTime<Utc>>,
    pub customer_email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentMethodWire {
    #[serde(rename = "type")]
    pub method_type: Option<String>,
    pub installments: Option<u32>,
    pub financial_institution_code: Option<String>,
    pub extra: Option<Value>,
}

impl TransactionWire {
    /// Map onto the domain snapshot. Unknown statuses become `Error` with the
    /// raw string kept in `status_message`.
    pub fn into_status(self, requested_id: &str) -> TransactionStatus {
        let (status, status_message) = match TransactionState::parse(&self.status) {
            Some(state) => (state, self.status_message),
            None => {
                tracing::warn!(
                    transaction_id = requested_id,
                    raw_status = %self.status,
                    "Unknown transaction status, reporting as ERROR"
                );
                (TransactionState::Error, Some(self.status.clone()))
            }
        };

        let method = self.payment_method;
        let method_type = method
            .as_ref()
            .and_then(|m| m.method_type.clone())
            .or(self.payment_method_type)
            .unwrap_or_else(|| "UNKNOWN".to_string());
        let processor = method.as_ref().and_then(|m| {
            m.extra
                .as_ref()
                .and_then(|extra| extra.get("brand"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| m.financial_institution_code.clone())
        });
        let installments = method.as_ref().and_then(|m| m.installments);

        TransactionStatus {
            transaction_id: self.id.unwrap_or_else(|| requested_id.to_string()),
            status,
            status_message,
            amount_minor_units: self.amount_in_cents,
            currency: self.currency,
            reference: self.reference,
            payment_method: PaymentMethodSummary {
                method_type,
                processor,
                installments,
            },
            created_at: self.created_at,
            finalized_at: self.finalized_at,
            customer_email: self.customer_email,
        }
    }
}

/// `GET /v1/merchants/{public_key}` payload.
#[derive(Debug, Deserialize)]
pub struct MerchantWire {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub accepted_payment_methods: Vec<String>,
}

impl MerchantWire {
    pub fn accepts_pse(&self) -> bool {
        self.accepted_payment_methods
            .iter()
            .any(|m| m.eq_ignore_ascii_case("PSE"))
    }
}

/// `GET /v1/pse/financial_institutions` item.
#[derive(Debug, Deserialize)]
pub struct FinancialInstitutionWire {
    pub financial_institution_code: String,
    pub financial_institution_name: String,
}

/// Build descriptors for the methods a merchant accepts.
pub fn describe_methods(
    merchant: &MerchantWire,
    banks: Option<Vec<FinancialInstitutionWire>>,
    currency: &str,
) -> Vec<PaymentMethodDescriptor> {
    let mut bank_names: Vec<String> = banks
        .unwrap_or_default()
        .into_iter()
        .filter(|b| b.financial_institution_code != "0")
        .map(|b| b.financial_institution_name)
        .collect();
    bank_names.sort();

    let mut seen = Vec::new();
    let mut methods = Vec::new();
    for raw in &merchant.accepted_payment_methods {
        let name = raw.trim().to_ascii_uppercase();
        if name.is_empty() || seen.contains(&name) {
            continue;
        }
        let descriptor = match name.as_str() {
            "CARD" => PaymentMethodDescriptor::card(currency),
            "PSE" => PaymentMethodDescriptor::pse(currency, std::mem::take(&mut bank_names)),
            other => PaymentMethodDescriptor::other(other, currency),
        };
        methods.push(descriptor);
        seen.push(name);
    }
    methods
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::types::PaymentMethodType;

    const APPROVED: &str = r#"{
        "data": {
            "id": "trans_001",
            "created_at": "2024-03-01T15:04:05.000Z",
            "finalized_at": "2024-03-01T15:04:09.000Z",
            "amount_in_cents": 50000,
            "reference": "order-42",
            "customer_email": "buyer@example.com",
            "currency": "COP",
            "payment_method_type": "CARD",
            "payment_method": {
                "type": "CARD",
                "extra": {"brand": "VISA", "last_four": "4242"},
                "installments": 2
            },
            "status": "APPROVED",
            "status_message": null
        }
    }"#;

    #[test]
    fn test_maps_enveloped_transaction() {
        let wire: TransactionWire = decode(APPROVED).unwrap();
        let status = wire.into_status("trans_001");

        assert_eq!(status.transaction_id, "trans_001");
        assert_eq!(status.status, TransactionState::Approved);
        assert_eq!(status.amount_minor_units, 50000);
        assert_eq!(status.currency, "COP");
        assert_eq!(status.reference, "order-42");
        assert_eq!(status.payment_method.processor.as_deref(), Some("VISA"));
        assert_eq!(status.payment_method.installments, Some(2));
        assert!(status.finalized_at.is_some());
        assert_eq!(status.customer_email.as_deref(), Some("buyer@example.com"));
    }

    #[test]
    fn test_accepts_bare_object_and_fills_id() {
        let body = r#"{"status":"PENDING","amount_in_cents":1200,"currency":"COP",
                       "created_at":"2024-03-01T15:04:05Z"}"#;
        let status = decode::<TransactionWire>(body).unwrap().into_status("trans_009");
        assert_eq!(status.transaction_id, "trans_009");
        assert_eq!(status.status, TransactionState::Pending);
        assert_eq!(status.payment_method.method_type, "UNKNOWN");
        assert!(status.finalized_at.is_none());
    }

    #[test]
    fn test_unknown_status_preserved_as_error() {
        let body = r#"{"status":"PARTIALLY_REFUNDED","status_message":"ignored",
                       "amount_in_cents":1,"currency":"COP","created_at":"2024-03-01T15:04:05Z"}"#;
        let status = decode::<TransactionWire>(body).unwrap().into_status("t");
        assert_eq!(status.status, TransactionState::Error);
        assert_eq!(status.status_message.as_deref(), Some("PARTIALLY_REFUNDED"));
    }

    #[test]
    fn test_malformed_bodies() {
        assert!(matches!(
            decode::<TransactionWire>("<html>bad gateway</html>"),
            Err(RawFailure::MalformedBody(_))
        ));
        assert!(matches!(
            decode::<TransactionWire>(r#"{"data":{"status":"APPROVED"}}"#),
            Err(RawFailure::MalformedBody(_))
        ));
    }

    #[test]
    fn test_pse_financial_institution_as_processor() {
        let body = r#"{"data":{"status":"DECLINED","amount_in_cents":900,"currency":"COP",
            "created_at":"2024-03-01T15:04:05Z",
            "payment_method":{"type":"PSE","financial_institution_code":"1007"}}}"#;
        let status = decode::<TransactionWire>(body).unwrap().into_status("t");
        assert_eq!(status.payment_method.method_type, "PSE");
        assert_eq!(status.payment_method.processor.as_deref(), Some("1007"));
    }

    #[test]
    fn test_describe_methods() {
        let merchant: MerchantWire = decode(
            r#"{"data":{"name":"Shop","accepted_payment_methods":["CARD","PSE","NEQUI","CARD"]}}"#,
        )
        .unwrap();
        assert!(merchant.accepts_pse());

        let banks = vec![
            FinancialInstitutionWire {
                financial_institution_code: "0".into(),
                financial_institution_name: "A continuación seleccione su banco".into(),
            },
            FinancialInstitutionWire {
                financial_institution_code: "1007".into(),
                financial_institution_name: "BANCOLOMBIA".into(),
            },
            FinancialInstitutionWire {
                financial_institution_code: "1001".into(),
                financial_institution_name: "BANCO DE BOGOTA".into(),
            },
        ];

        let methods = describe_methods(&merchant, Some(banks), "COP");
        assert_eq!(methods.len(), 3);
        assert_eq!(methods[0].method_type, PaymentMethodType::Card);
        assert_eq!(methods[1].method_type, PaymentMethodType::Pse);
        assert_eq!(methods[1].processor_hints, vec!["BANCO DE BOGOTA", "BANCOLOMBIA"]);
        assert_eq!(methods[2].method_type, PaymentMethodType::Other);
        assert_eq!(methods[2].display_name, "NEQUI");
    }
}
