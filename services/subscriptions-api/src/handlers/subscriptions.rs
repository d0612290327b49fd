//! Subscription handlers

use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use subtrack_core::{
    CreateSubscriptionInput, ListSubscriptionsFilter, UpdateSubscriptionInput,
};

use super::shared::record_op_duration;
use crate::dto::SubscriptionDto;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateSubscriptionRequest {
    #[serde(default)]
    pub subscription_type_id: u64,
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub start_at: Option<String>,
    #[serde(default)]
    pub auto_renew: bool,
}

#[derive(Debug, Serialize)]
pub struct CreateSubscriptionResponse {
    pub subscription: SubscriptionDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListSubscriptionsQuery {
    pub user_id: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListSubscriptionsResponse {
    pub subscriptions: Vec<SubscriptionDto>,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionEnvelope {
    pub subscription: SubscriptionDto,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSubscriptionRequest {
    pub auto_renew: Option<bool>,
    pub status: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionMutationResponse {
    pub message: &'static str,
    pub subscription: SubscriptionDto,
}

fn validate_create(req: &CreateSubscriptionRequest) -> Result<(), ApiError> {
    if req.subscription_type_id == 0 {
        return Err(ApiError::BadRequest(
            "subscription_type_id is required".to_string(),
        ));
    }
    let user_id = req.user_id.as_deref().map(str::trim).unwrap_or_default();
    let email = req.email.as_deref().map(str::trim).unwrap_or_default();
    if user_id.is_empty() && email.is_empty() {
        return Err(ApiError::BadRequest(
            "at least one of user_id or email is required".to_string(),
        ));
    }
    if let Some(start_at) = req.start_at.as_deref().map(str::trim) {
        if !start_at.is_empty() && DateTime::parse_from_rfc3339(start_at).is_err() {
            return Err(ApiError::BadRequest("start_at must be RFC3339".to_string()));
        }
    }
    Ok(())
}

fn validate_subscription_id(id: u64) -> Result<(), ApiError> {
    if id == 0 {
        return Err(ApiError::BadRequest("invalid subscription id".to_string()));
    }
    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /subscriptions
#[instrument(skip(state, req), fields(subscription_type_id = req.subscription_type_id))]
pub async fn create_subscription(
    State(state): State<AppState>,
    Json(req): Json<CreateSubscriptionRequest>,
) -> ApiResult<(StatusCode, Json<CreateSubscriptionResponse>)> {
    let start = Instant::now();
    validate_create(&req)?;

    let outcome = state
        .engine
        .create_subscription(CreateSubscriptionInput {
            subscription_type_id: req.subscription_type_id,
            user_id: req.user_id,
            email: req.email,
            start_at: req.start_at,
            auto_renew: req.auto_renew,
        })
        .await?;

    metrics::counter!("subscriptions_created_total").increment(1);
    record_op_duration("create_subscription", start, true);

    Ok((
        StatusCode::CREATED,
        Json(CreateSubscriptionResponse {
            subscription: SubscriptionDto::from(&outcome.subscription),
            payment_url: outcome.payment_url,
        }),
    ))
}

/// GET /subscriptions
pub async fn list_subscriptions(
    State(state): State<AppState>,
    Query(query): Query<ListSubscriptionsQuery>,
) -> ApiResult<Json<ListSubscriptionsResponse>> {
    let items = state
        .engine
        .list_subscriptions(ListSubscriptionsFilter {
            user_id: query.user_id,
            email: query.email,
        })
        .await?;

    Ok(Json(ListSubscriptionsResponse {
        subscriptions: items.iter().map(SubscriptionDto::from).collect(),
    }))
}

/// GET /subscriptions/{id}
#[instrument(skip(state))]
pub async fn get_subscription(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<SubscriptionEnvelope>> {
    validate_subscription_id(id)?;

    let item = state.engine.get_subscription(id).await?;

    Ok(Json(SubscriptionEnvelope {
        subscription: SubscriptionDto::from(&item),
    }))
}

/// PATCH /subscriptions/{id}
#[instrument(skip(state, req))]
pub async fn update_subscription(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(req): Json<UpdateSubscriptionRequest>,
) -> ApiResult<Json<SubscriptionEnvelope>> {
    let start = Instant::now();
    validate_subscription_id(id)?;

    let item = state
        .engine
        .update_subscription(UpdateSubscriptionInput {
            id,
            auto_renew: req.auto_renew,
            status: req.status,
        })
        .await?;

    record_op_duration("update_subscription", start, true);

    Ok(Json(SubscriptionEnvelope {
        subscription: SubscriptionDto::from(&item),
    }))
}

/// DELETE /subscriptions/{id}
#[instrument(skip(state))]
pub async fn delete_subscription(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<SubscriptionMutationResponse>> {
    let start = Instant::now();
    validate_subscription_id(id)?;

    let item = state.engine.delete_subscription(id).await?;

    record_op_duration("delete_subscription", start, true);

    Ok(Json(SubscriptionMutationResponse {
        message: "Subscription deleted successfully",
        subscription: SubscriptionDto::from(&item),
    }))
}

/// POST /subscriptions/{id}/cancel
#[instrument(skip(state))]
pub async fn cancel_subscription(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<SubscriptionMutationResponse>> {
    let start = Instant::now();
    validate_subscription_id(id)?;

    let item = state.engine.cancel_subscription(id).await?;

    metrics::counter!("subscriptions_canceled_total").increment(1);
    record_op_duration("cancel_subscription", start, true);

    Ok(Json(SubscriptionMutationResponse {
        message: "Subscription cancelled successfully",
        subscription: SubscriptionDto::from(&item),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_request() -> CreateSubscriptionRequest {
        CreateSubscriptionRequest {
            subscription_type_id: 1,
            user_id: Some("u1".to_string()),
            email: None,
            start_at: None,
            auto_renew: false,
        }
    }

    #[test]
    fn create_requires_type_id() {
        let req = CreateSubscriptionRequest {
            subscription_type_id: 0,
            ..create_request()
        };
        assert!(validate_create(&req).is_err());
    }

    #[test]
    fn create_requires_some_identity() {
        let req = CreateSubscriptionRequest {
            user_id: Some("   ".to_string()),
            email: Some(String::new()),
            ..create_request()
        };
        assert!(validate_create(&req).is_err());
    }

    #[test]
    fn create_rejects_malformed_start_at() {
        let req = CreateSubscriptionRequest {
            start_at: Some("yesterday".to_string()),
            ..create_request()
        };
        assert!(validate_create(&req).is_err());
    }

    #[test]
    fn create_accepts_rfc3339_start_at() {
        let req = CreateSubscriptionRequest {
            start_at: Some("2026-01-01T00:00:00Z".to_string()),
            ..create_request()
        };
        assert!(validate_create(&req).is_ok());
    }

    #[test]
    fn zero_subscription_id_is_rejected() {
        assert!(validate_subscription_id(0).is_err());
        assert!(validate_subscription_id(1).is_ok());
    }
}
