//! Internal-auth middleware.
//!
//! Every HTTP endpoint except health and metrics requires a caller API key,
//! validated against the internal auth service over gRPC. Validation failures
//! and auth-service outages both fail closed.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::HeaderName;
use axum::middleware::Next;
use axum::response::Response;
use tokio::sync::Mutex;
use tonic::transport::Channel;

use subtrack_proto::auth_service::auth_service_client::AuthServiceClient;
use subtrack_proto::ValidateApiKeyRequest;

use crate::error::ApiError;
use crate::state::AppState;

pub static API_KEY_HEADER: HeaderName = HeaderName::from_static("x-api-key");

/// Lazily-connected client for the internal auth service.
#[derive(Clone)]
pub struct AuthVerifier {
    endpoint: String,
    client: Arc<Mutex<Option<AuthServiceClient<Channel>>>>,
}

impl AuthVerifier {
    /// Create a verifier for the auth service at `addr` (host:port)
    pub fn new(addr: &str) -> Self {
        let endpoint = if addr.starts_with("http://") || addr.starts_with("https://") {
            addr.to_string()
        } else {
            format!("http://{addr}")
        };
        Self {
            endpoint,
            client: Arc::new(Mutex::new(None)),
        }
    }

    /// Check an API key with the auth service
    pub async fn verify(&self, api_key: &str) -> Result<bool, tonic::Status> {
        let mut client = self.connected_client().await?;
        let response = client
            .validate_api_key(ValidateApiKeyRequest {
                api_key: api_key.to_string(),
            })
            .await?;
        Ok(response.into_inner().valid)
    }

    async fn connected_client(&self) -> Result<AuthServiceClient<Channel>, tonic::Status> {
        let mut guard = self.client.lock().await;
        if let Some(client) = guard.as_ref() {
            return Ok(client.clone());
        }

        let client = AuthServiceClient::connect(self.endpoint.clone())
            .await
            .map_err(|err| {
                tonic::Status::unavailable(format!("auth service unreachable: {err}"))
            })?;
        *guard = Some(client.clone());
        Ok(client)
    }
}

/// Axum middleware: reject requests without a valid API key.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(api_key) = request
        .headers()
        .get(&API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|key| !key.is_empty())
    else {
        return Err(ApiError::Unauthorized);
    };

    match state.auth.verify(api_key).await {
        Ok(true) => Ok(next.run(request).await),
        Ok(false) => Err(ApiError::Unauthorized),
        Err(status) => {
            tracing::error!(error = %status, "auth service call failed, rejecting request");
            Err(ApiError::Unauthorized)
        }
    }
}
