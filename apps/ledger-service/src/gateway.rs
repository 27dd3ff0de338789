//! # Payment Gateway
//!
//! Card refunds go through the hosted payment processor. Everything else
//! (cash, Venmo, Zelle) is settled by hand and never touches this module.
//!
//! ## Failure Classes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create_refund(request)                                                 │
//! │       │                                                                 │
//! │       ├── 2xx, status succeeded|pending ──► Ok(GatewayRefund)           │
//! │       │                                                                 │
//! │       ├── 4xx / status failed|canceled ──► Rejected   (definitive)      │
//! │       │                                                                 │
//! │       └── timeout, 5xx, bad body ────────► Timeout | Transport |        │
//! │                                            InvalidResponse (unknown:    │
//! │                                            money may have moved)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Only a definitive rejection closes the outbox entry. Unknown outcomes stay
//! pending and are replayed with the same idempotency key, so the processor
//! never refunds twice.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::GatewayConfig;
use ledger_core::Money;

/// What the ledger asks the processor to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayRefundRequest {
    /// Charge / payment-intent id recorded at sale time.
    pub provider_reference: String,
    /// Minor units, sent as-is.
    pub amount: Money,
    pub idempotency_key: String,
    pub reason: String,
}

/// The processor's acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayRefund {
    /// Refund id assigned by the processor (`re_...`).
    pub reference: String,
    pub status: String,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// The processor refused the refund.
    #[error("Refund declined: {0}")]
    Rejected(String),

    #[error("Payment gateway timed out")]
    Timeout,

    #[error("Payment gateway unreachable: {0}")]
    Transport(String),

    #[error("Unexpected gateway response: {0}")]
    InvalidResponse(String),

    #[error("Payment gateway is not configured")]
    NotConfigured,
}

impl GatewayError {
    /// `true` when the processor definitely did not move money.
    pub fn is_definitive(&self) -> bool {
        matches!(self, GatewayError::Rejected(_) | GatewayError::NotConfigured)
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Seam between refund orchestration and the processor.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_refund(&self, request: &GatewayRefundRequest) -> GatewayResult<GatewayRefund>;
}

// =============================================================================
// HTTP Gateway
// =============================================================================

/// Stripe-compatible `POST /v1/refunds` client.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    secret_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefundBody {
    id: String,
    status: String,
    #[serde(default)]
    failure_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl HttpGateway {
    pub fn new(config: &GatewayConfig) -> GatewayResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| GatewayError::Transport(format!("client build failed: {e}")))?;

        Ok(HttpGateway {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
        })
    }

    fn headers(&self, idempotency_key: &str) -> GatewayResult<HeaderMap> {
        let secret = self.secret_key.as_deref().ok_or(GatewayError::NotConfigured)?;

        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {secret}"))
            .map_err(|e| GatewayError::InvalidResponse(format!("invalid auth header: {e}")))?;
        headers.insert(AUTHORIZATION, auth);
        let key = HeaderValue::from_str(idempotency_key)
            .map_err(|e| GatewayError::InvalidResponse(format!("invalid idempotency key: {e}")))?;
        headers.insert("Idempotency-Key", key);
        Ok(headers)
    }
}

#[async_trait]
impl PaymentGateway for HttpGateway {
    async fn create_refund(&self, request: &GatewayRefundRequest) -> GatewayResult<GatewayRefund> {
        let url = format!("{}/v1/refunds", self.base_url);
        let amount = request.amount.cents().to_string();
        let form = [
            ("payment_intent", request.provider_reference.as_str()),
            ("amount", amount.as_str()),
            ("metadata[reason]", request.reason.as_str()),
        ];

        debug!(
            provider_reference = %request.provider_reference,
            amount_cents = request.amount.cents(),
            idempotency_key = %request.idempotency_key,
            "Sending refund to gateway"
        );

        let resp = self
            .client
            .post(&url)
            .headers(self.headers(&request.idempotency_key)?)
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::Timeout
                } else {
                    GatewayError::Transport(e.to_string())
                }
            })?;

        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| GatewayError::Transport(format!("read body failed: {e}")))?;

        classify(status, &bytes)
    }
}

/// Maps a `/v1/refunds` response onto a refund or a failure class.
///
/// 4xx other than 429 and a `failed`/`canceled` refund are definitive; any
/// other non-2xx or an unknown refund status leaves the outcome open.
fn classify(status: StatusCode, body: &[u8]) -> GatewayResult<GatewayRefund> {
    if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
        let message = serde_json::from_slice::<ErrorBody>(body)
            .map(|b| b.error.message)
            .unwrap_or_else(|_| format!("status {status}"));
        warn!(%status, %message, "Gateway rejected refund");
        return Err(GatewayError::Rejected(message));
    }
    if !status.is_success() {
        return Err(GatewayError::Transport(format!("status {status}")));
    }

    let body: RefundBody =
        serde_json::from_slice(body).map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

    match body.status.as_str() {
        "succeeded" | "pending" => Ok(GatewayRefund {
            reference: body.id,
            status: body.status,
        }),
        "failed" | "canceled" => Err(GatewayError::Rejected(
            body.failure_reason.unwrap_or(body.status),
        )),
        other => Err(GatewayError::InvalidResponse(format!("refund status '{other}'"))),
    }
}

// =============================================================================
// Scripted Gateway (tests)
// =============================================================================

#[cfg(test)]
pub mod mock {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use tokio::sync::Notify;

    use super::*;

    /// Plays back queued outcomes, then succeeds with `re_mock_N`.
    #[derive(Default)]
    pub struct MockGateway {
        script: Mutex<VecDeque<GatewayResult<GatewayRefund>>>,
        calls: Mutex<Vec<GatewayRefundRequest>>,
        hold: Option<Notify>,
        pub entered: Notify,
    }

    impl MockGateway {
        pub fn new() -> Self {
            Self::default()
        }

        /// Every call parks until [`MockGateway::release`].
        pub fn held() -> Self {
            MockGateway {
                hold: Some(Notify::new()),
                ..Self::default()
            }
        }

        pub fn then(self, outcome: GatewayResult<GatewayRefund>) -> Self {
            self.script.lock().unwrap().push_back(outcome);
            self
        }

        pub fn release(&self) {
            if let Some(hold) = &self.hold {
                hold.notify_one();
            }
        }

        pub fn calls(&self) -> Vec<GatewayRefundRequest> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PaymentGateway for MockGateway {
        async fn create_refund(&self, request: &GatewayRefundRequest) -> GatewayResult<GatewayRefund> {
            let n = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(request.clone());
                calls.len()
            };
            if let Some(hold) = &self.hold {
                self.entered.notify_one();
                hold.notified().await;
            }
            let scripted = self.script.lock().unwrap().pop_front();
            scripted.unwrap_or_else(|| {
                Ok(GatewayRefund {
                    reference: format!("re_mock_{n}"),
                    status: "succeeded".to_string(),
                })
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_rejections_are_definitive() {
        assert!(GatewayError::Rejected("no".into()).is_definitive());
        assert!(GatewayError::NotConfigured.is_definitive());
        assert!(!GatewayError::Timeout.is_definitive());
        assert!(!GatewayError::Transport("reset".into()).is_definitive());
        assert!(!GatewayError::InvalidResponse("{".into()).is_definitive());
    }

    #[test]
    fn test_classify_accepted_refunds() {
        let ok = classify(StatusCode::OK, br#"{"id":"re_1","status":"succeeded"}"#).unwrap();
        assert_eq!(ok.reference, "re_1");
        assert_eq!(ok.status, "succeeded");

        let pending = classify(StatusCode::OK, br#"{"id":"re_2","status":"pending"}"#).unwrap();
        assert_eq!(pending.status, "pending");
    }

    #[test]
    fn test_classify_client_errors_are_rejections() {
        let body = br#"{"error":{"message":"Charge ch_1 has already been refunded."}}"#;
        assert_eq!(
            classify(StatusCode::BAD_REQUEST, body),
            Err(GatewayError::Rejected("Charge ch_1 has already been refunded.".into()))
        );

        let err = classify(StatusCode::PAYMENT_REQUIRED, b"not json").unwrap_err();
        assert!(matches!(err, GatewayError::Rejected(ref m) if m.contains("402")));
    }

    #[test]
    fn test_classify_throttling_and_server_errors_stay_open() {
        for status in [StatusCode::TOO_MANY_REQUESTS, StatusCode::INTERNAL_SERVER_ERROR, StatusCode::BAD_GATEWAY] {
            let err = classify(status, b"{}").unwrap_err();
            assert!(matches!(err, GatewayError::Transport(_)), "{status}");
            assert!(!err.is_definitive());
        }
    }

    #[test]
    fn test_classify_refund_body_status() {
        let failed = classify(
            StatusCode::OK,
            br#"{"id":"re_3","status":"failed","failure_reason":"expired_or_canceled_card"}"#,
        );
        assert_eq!(failed, Err(GatewayError::Rejected("expired_or_canceled_card".into())));

        let canceled = classify(StatusCode::OK, br#"{"id":"re_4","status":"canceled"}"#);
        assert_eq!(canceled, Err(GatewayError::Rejected("canceled".into())));

        let unknown = classify(StatusCode::OK, br#"{"id":"re_5","status":"requires_action"}"#).unwrap_err();
        assert!(matches!(unknown, GatewayError::InvalidResponse(_)));

        let garbled = classify(StatusCode::OK, b"<html>").unwrap_err();
        assert!(matches!(garbled, GatewayError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_http_gateway_without_secret_is_not_configured() {
        let gateway = HttpGateway::new(&GatewayConfig::default()).unwrap();
        let err = gateway
            .create_refund(&GatewayRefundRequest {
                provider_reference: "pi_1".into(),
                amount: Money::from_cents(100),
                idempotency_key: "refund:1".into(),
                reason: "scratch".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err, GatewayError::NotConfigured);
    }

    #[tokio::test]
    async fn test_mock_plays_script_then_succeeds() {
        let gateway = mock::MockGateway::new().then(Err(GatewayError::Timeout));
        let req = GatewayRefundRequest {
            provider_reference: "pi_1".into(),
            amount: Money::from_cents(100),
            idempotency_key: "refund:1".into(),
            reason: "scratch".into(),
        };
        assert_eq!(gateway.create_refund(&req).await, Err(GatewayError::Timeout));
        assert_eq!(gateway.create_refund(&req).await.unwrap().reference, "re_mock_2");
        assert_eq!(gateway.calls().len(), 2);
    }
}
