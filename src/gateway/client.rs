//! Gateway client: the operations the payment orchestrator calls.
//!
//! # Responsibilities
//! - Validate caller input before any network traffic
//! - Route every processor call through the resilience pipeline
//! - Map processor payloads onto domain types
//! - Serve a default payment-method list when discovery fails
//!
//! # Design Decisions
//! - One client is shared across tasks; state lives behind `Arc`
//! - Limiter and breakers are injectable so tests build isolated instances
//! - Each logical call gets a `call_id` span for log correlation

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::{ConfigError, GatewayConfig};
use crate::gateway::classifier::{ErrorClassifier, RawFailure};
use crate::gateway::error::{GatewayError, GatewayResult, NetworkErrorKind};
use crate::gateway::transport::{AuthScope, HttpTransport, Transport};
use crate::gateway::types::{PaymentMethods, TransactionStatus};
use crate::gateway::wire::{self, FinancialInstitutionWire, MerchantWire, TransactionWire};
use crate::health::{HealthAggregator, HealthReport};
use crate::observability::metrics;
use crate::resilience::{
    CancelSignal, CircuitBreakers, EndpointGroup, RateLimiter, ResiliencePipeline, RetryPolicy,
};

const OP_TRANSACTION_STATUS: &str = "get_transaction_status";
const OP_PAYMENT_METHODS: &str = "get_payment_methods";
const OP_PSE_BANKS: &str = "get_pse_banks";

/// Resilient client for the payment processor.
#[derive(Clone)]
pub struct GatewayClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: GatewayConfig,
    transport: Arc<dyn Transport>,
    pipeline: ResiliencePipeline,
    classifier: ErrorClassifier,
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("base_url", &self.inner.config.effective_base_url())
            .field("environment", &self.inner.config.environment)
            .field("pipeline", &self.inner.pipeline)
            .finish()
    }
}

impl GatewayClient {
    /// Build a client talking HTTP to the configured processor.
    pub fn new(config: GatewayConfig) -> Result<Self, ConfigError> {
        let transport = HttpTransport::new(&config)?;
        tracing::info!(
            base_url = %transport.base_url(),
            environment = %config.environment,
            "Gateway client initialized"
        );
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Build a client over an arbitrary transport, with fresh limiter and breakers.
    pub fn with_transport(config: GatewayConfig, transport: Arc<dyn Transport>) -> Self {
        let pipeline = ResiliencePipeline::from_config(&config);
        Self::assemble(config, transport, pipeline)
    }

    /// Build a client sharing externally owned limiter and breakers.
    pub fn with_parts(
        config: GatewayConfig,
        transport: Arc<dyn Transport>,
        limiter: Arc<RateLimiter>,
        breakers: Arc<CircuitBreakers>,
    ) -> Self {
        let retry = RetryPolicy::from_config(&config.retry, config.request_timeout());
        let pipeline = ResiliencePipeline::new(limiter, breakers, retry);
        Self::assemble(config, transport, pipeline)
    }

    fn assemble(config: GatewayConfig, transport: Arc<dyn Transport>, pipeline: ResiliencePipeline) -> Self {
        let classifier = ErrorClassifier::new(config.retry.default_retry_after_ms);
        Self {
            inner: Arc::new(ClientInner {
                config,
                transport,
                pipeline,
                classifier,
            }),
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.inner.config
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.inner.transport
    }

    pub fn classifier(&self) -> &ErrorClassifier {
        &self.inner.classifier
    }

    pub fn breakers(&self) -> &Arc<CircuitBreakers> {
        self.inner.pipeline.breakers()
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        self.inner.pipeline.limiter()
    }

    /// Current state of a transaction.
    pub async fn get_transaction_status(&self, transaction_id: &str) -> GatewayResult<TransactionStatus> {
        self.get_transaction_status_with_cancel(transaction_id, &CancelSignal::never())
            .await
    }

    pub async fn get_transaction_status_with_cancel(
        &self,
        transaction_id: &str,
        cancel: &CancelSignal,
    ) -> GatewayResult<TransactionStatus> {
        let id = transaction_id.trim();
        if id.is_empty() {
            tracing::warn!(operation = OP_TRANSACTION_STATUS, "Rejected empty transaction id");
            return Err(GatewayError::validation("transaction_id", "must not be empty"));
        }

        let span = tracing::info_span!(
            "gateway_call",
            operation = OP_TRANSACTION_STATUS,
            call_id = %Uuid::new_v4(),
            transaction_id = id,
        );

        async move {
            let result = self
                .inner
                .pipeline
                .call(EndpointGroup::Transactions, OP_TRANSACTION_STATUS, cancel, || {
                    self.fetch::<TransactionWire>(vec!["v1", "transactions", id], AuthScope::Public)
                })
                .await;

            match result {
                Ok(wire) => {
                    let status = wire.into_status(id);
                    tracing::info!(status = ?status.status, "Transaction status retrieved");
                    Ok(status)
                }
                Err(err) => {
                    tracing::warn!(error_kind = err.kind(), error = %err, "Transaction status lookup failed");
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Payment methods the merchant accepts, or the default set when the
    /// processor cannot be reached. Only caller cancellation is an error.
    pub async fn get_payment_methods(&self) -> GatewayResult<PaymentMethods> {
        self.get_payment_methods_with_cancel(&CancelSignal::never()).await
    }

    pub async fn get_payment_methods_with_cancel(&self, cancel: &CancelSignal) -> GatewayResult<PaymentMethods> {
        let span = tracing::info_span!(
            "gateway_call",
            operation = OP_PAYMENT_METHODS,
            call_id = %Uuid::new_v4(),
        );

        async move {
            let public_key = self.inner.config.credentials.public_key.trim();
            let currency = self.inner.config.default_currency.as_str();

            let result = self
                .inner
                .pipeline
                .call(EndpointGroup::PaymentMethods, OP_PAYMENT_METHODS, cancel, || {
                    self.fetch::<MerchantWire>(vec!["v1", "merchants", public_key], AuthScope::Public)
                })
                .await;

            match result {
                Ok(merchant) if !merchant.accepted_payment_methods.is_empty() => {
                    let banks = if merchant.accepts_pse() {
                        self.fetch_pse_banks(cancel).await
                    } else {
                        None
                    };
                    let methods = wire::describe_methods(&merchant, banks, currency);
                    tracing::info!(count = methods.len(), "Payment methods discovered");
                    Ok(PaymentMethods::live(methods))
                }
                Ok(_) => {
                    tracing::warn!("Merchant reported no payment methods, serving defaults");
                    metrics::record_fallback(OP_PAYMENT_METHODS);
                    Ok(PaymentMethods::fallback(currency))
                }
                Err(err @ GatewayError::Network { kind: NetworkErrorKind::Cancelled, .. }) => Err(err),
                Err(err) => {
                    tracing::warn!(
                        error_kind = err.kind(),
                        error = %err,
                        "Payment method discovery failed, serving defaults"
                    );
                    metrics::record_fallback(OP_PAYMENT_METHODS);
                    Ok(PaymentMethods::fallback(currency))
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Composite health report. Never fails.
    pub async fn health_check(&self) -> HealthReport {
        HealthAggregator::new(self).run().await
    }

    /// PSE bank list. Best-effort: failures leave PSE without bank hints.
    async fn fetch_pse_banks(&self, cancel: &CancelSignal) -> Option<Vec<FinancialInstitutionWire>> {
        let result = self
            .inner
            .pipeline
            .call(EndpointGroup::PseBanks, OP_PSE_BANKS, cancel, || {
                self.fetch::<Vec<FinancialInstitutionWire>>(
                    vec!["v1", "pse", "financial_institutions"],
                    AuthScope::Public,
                )
            })
            .await;

        match result {
            Ok(banks) => Some(banks),
            Err(err) => {
                tracing::warn!(error_kind = err.kind(), error = %err, "PSE bank list unavailable");
                None
            }
        }
    }

    /// One attempt: GET, check status, decode, classify failures.
    async fn fetch<T: DeserializeOwned>(&self, segments: Vec<&str>, auth: AuthScope) -> GatewayResult<T> {
        let outcome = match self.inner.transport.get(&segments, auth).await {
            Ok(response) => response
                .into_result()
                .and_then(|body| wire::decode::<T>(&body)),
            Err(failure) => Err(failure),
        };

        outcome.map_err(|failure| {
            if let RawFailure::MalformedBody(detail) = &failure {
                tracing::warn!(
                    path = %segments.join("/"),
                    detail = %detail,
                    "Processor returned an unparseable body, treating as transient"
                );
            }
            self.inner.classifier.classify(failure)
        })
    }
}
