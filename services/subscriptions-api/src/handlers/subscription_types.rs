//! Subscription type catalog handlers

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use subtrack_core::ListSubscriptionTypesFilter;

use crate::dto::SubscriptionTypeDto;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListSubscriptionTypesQuery {
    #[serde(rename = "type")]
    pub type_code: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListSubscriptionTypesResponse {
    pub subscription_types: Vec<SubscriptionTypeDto>,
}

/// GET /subscription-types
pub async fn list_subscription_types(
    State(state): State<AppState>,
    Query(query): Query<ListSubscriptionTypesQuery>,
) -> ApiResult<Json<ListSubscriptionTypesResponse>> {
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            raw.parse::<i32>()
                .map_err(|_| ApiError::BadRequest("invalid query params".to_string()))?,
        ),
    };

    let items = state
        .engine
        .list_subscription_types(ListSubscriptionTypesFilter {
            type_code: query.type_code,
            status,
        })
        .await?;

    Ok(Json(ListSubscriptionTypesResponse {
        subscription_types: items.iter().map(SubscriptionTypeDto::from).collect(),
    }))
}
