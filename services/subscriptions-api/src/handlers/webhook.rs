//! Payment gateway callback handler

use std::time::Instant;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use subtrack_core::PaymentCallbackInput;

use super::shared::record_op_duration;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PaymentCallbackRequest {
    #[serde(default)]
    pub subscription_id: u64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub transaction_id: String,
}

#[derive(Debug, Serialize)]
pub struct PaymentCallbackResponse {
    pub message: &'static str,
}

fn validate_callback(req: &PaymentCallbackRequest) -> Result<(), ApiError> {
    if req.subscription_id == 0 {
        return Err(ApiError::BadRequest(
            "subscription_id is required".to_string(),
        ));
    }
    match req.status.trim().to_ascii_lowercase().as_str() {
        "success" | "failed" => Ok(()),
        _ => Err(ApiError::BadRequest(
            "status must be success or failed".to_string(),
        )),
    }
}

/// POST /webhooks/payment-callback
#[instrument(skip(state, req), fields(subscription_id = req.subscription_id))]
pub async fn payment_callback(
    State(state): State<AppState>,
    Json(req): Json<PaymentCallbackRequest>,
) -> ApiResult<Json<PaymentCallbackResponse>> {
    let start = Instant::now();
    validate_callback(&req)?;

    let result = state
        .callbacks
        .apply(PaymentCallbackInput {
            subscription_id: req.subscription_id,
            status: req.status,
            transaction_id: req.transaction_id,
        })
        .await;

    let status_label = if result.is_ok() { "success" } else { "error" };
    metrics::counter!("payment_callbacks_total", "status" => status_label).increment(1);
    record_op_duration("payment_callback", start, result.is_ok());
    result?;

    Ok(Json(PaymentCallbackResponse {
        message: "Payment processed successfully",
    }))
}
