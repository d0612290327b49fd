//! gRPC SubscriptionsService implementation
//!
//! Mirror of the HTTP surface, one method per endpoint. Engine errors map to
//! the same code families the HTTP facade uses (InvalidArgument / NotFound /
//! AlreadyExists / Internal).

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use tonic::{Request, Response, Status};
use tracing::instrument;

use subtrack_core::{
    CreateSubscriptionInput, EngineError, ListSubscriptionTypesFilter, ListSubscriptionsFilter,
    PaymentCallbackInput, PaymentCallbackService, SubscriptionService, UpdateSubscriptionInput,
};
use subtrack_proto::subscriptions_service::subscriptions_service_server::SubscriptionsService as SubscriptionsServiceTrait;
use subtrack_proto::{
    CancelSubscriptionRequest, CreateSubscriptionRequest, CreateSubscriptionResponse,
    DeleteSubscriptionRequest, GetSubscriptionRequest, ListSubscriptionTypesRequest,
    ListSubscriptionTypesResponse, ListSubscriptionsRequest, ListSubscriptionsResponse,
    PaymentCallbackRequest, PaymentCallbackResponse, Subscription as ProtoSubscription,
    SubscriptionEnvelope, SubscriptionMutationResponse, SubscriptionType as ProtoSubscriptionType,
    UpdateSubscriptionRequest,
};

/// gRPC subscriptions service implementation
pub struct GrpcSubscriptionsService {
    engine: Arc<SubscriptionService>,
    callbacks: Arc<PaymentCallbackService>,
}

impl GrpcSubscriptionsService {
    pub fn new(engine: Arc<SubscriptionService>, callbacks: Arc<PaymentCallbackService>) -> Self {
        Self { engine, callbacks }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn rfc3339(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn optional_rfc3339(value: Option<&DateTime<Utc>>) -> String {
    value.map(rfc3339).unwrap_or_default()
}

fn subscription_to_proto(sub: &subtrack_types::Subscription) -> ProtoSubscription {
    ProtoSubscription {
        id: sub.id,
        subscription_type_id: sub.subscription_type_id,
        user_id: sub.user_id.clone().unwrap_or_default(),
        email: sub.email.clone().unwrap_or_default(),
        status: sub.status.code(),
        start_at: optional_rfc3339(sub.start_at.as_ref()),
        end_at: optional_rfc3339(sub.end_at.as_ref()),
        renew_at: optional_rfc3339(sub.renew_at.as_ref()),
        auto_renew: sub.auto_renew,
        created_at: rfc3339(&sub.created_at),
        updated_at: rfc3339(&sub.updated_at),
    }
}

fn subscription_type_to_proto(item: &subtrack_types::SubscriptionType) -> ProtoSubscriptionType {
    ProtoSubscriptionType {
        id: item.id,
        type_code: item.type_code.clone(),
        display_name: item.display_name.clone(),
        status: item.status,
        created_at: rfc3339(&item.created_at),
        updated_at: rfc3339(&item.updated_at),
    }
}

#[allow(clippy::result_large_err)]
fn require_id(id: u64) -> Result<u64, Status> {
    if id == 0 {
        return Err(Status::invalid_argument("invalid subscription id"));
    }
    Ok(id)
}

fn optional_string(value: String) -> Option<String> {
    (!value.trim().is_empty()).then_some(value)
}

fn engine_error_to_status(err: EngineError) -> Status {
    if err.is_invalid_argument() {
        return Status::invalid_argument(err.to_string());
    }
    match err {
        EngineError::SubscriptionTypeNotFound => Status::not_found("subscription type not found"),
        EngineError::SubscriptionNotFound => Status::not_found("subscription not found"),
        EngineError::SubscriptionAlreadyExists => {
            Status::already_exists("subscription already exists")
        }
        other => {
            tracing::error!(error = %other, "internal error on gRPC surface");
            Status::internal("internal server error")
        }
    }
}

// ============================================================================
// SubscriptionsService Implementation
// ============================================================================

#[tonic::async_trait]
impl SubscriptionsServiceTrait for GrpcSubscriptionsService {
    #[instrument(skip(self, request))]
    async fn list_subscription_types(
        &self,
        request: Request<ListSubscriptionTypesRequest>,
    ) -> Result<Response<ListSubscriptionTypesResponse>, Status> {
        let req = request.into_inner();

        let items = self
            .engine
            .list_subscription_types(ListSubscriptionTypesFilter {
                type_code: optional_string(req.type_code),
                status: req.status,
            })
            .await
            .map_err(engine_error_to_status)?;

        Ok(Response::new(ListSubscriptionTypesResponse {
            subscription_types: items.iter().map(subscription_type_to_proto).collect(),
        }))
    }

    #[instrument(skip(self, request), fields(subscription_type_id))]
    async fn create_subscription(
        &self,
        request: Request<CreateSubscriptionRequest>,
    ) -> Result<Response<CreateSubscriptionResponse>, Status> {
        let req = request.into_inner();
        tracing::Span::current().record("subscription_type_id", req.subscription_type_id);

        if req.subscription_type_id == 0 {
            return Err(Status::invalid_argument("subscription_type_id is required"));
        }

        let outcome = self
            .engine
            .create_subscription(CreateSubscriptionInput {
                subscription_type_id: req.subscription_type_id,
                user_id: optional_string(req.user_id),
                email: optional_string(req.email),
                start_at: optional_string(req.start_at),
                auto_renew: req.auto_renew,
            })
            .await
            .map_err(engine_error_to_status)?;

        metrics::counter!("subscriptions_created_total").increment(1);

        Ok(Response::new(CreateSubscriptionResponse {
            subscription: Some(subscription_to_proto(&outcome.subscription)),
            payment_url: outcome.payment_url.unwrap_or_default(),
        }))
    }

    #[instrument(skip(self, request))]
    async fn get_subscription(
        &self,
        request: Request<GetSubscriptionRequest>,
    ) -> Result<Response<SubscriptionEnvelope>, Status> {
        let id = require_id(request.into_inner().id)?;

        let item = self
            .engine
            .get_subscription(id)
            .await
            .map_err(engine_error_to_status)?;

        Ok(Response::new(SubscriptionEnvelope {
            subscription: Some(subscription_to_proto(&item)),
        }))
    }

    #[instrument(skip(self, request))]
    async fn list_subscriptions(
        &self,
        request: Request<ListSubscriptionsRequest>,
    ) -> Result<Response<ListSubscriptionsResponse>, Status> {
        let req = request.into_inner();

        let items = self
            .engine
            .list_subscriptions(ListSubscriptionsFilter {
                user_id: optional_string(req.user_id),
                email: optional_string(req.email),
            })
            .await
            .map_err(engine_error_to_status)?;

        Ok(Response::new(ListSubscriptionsResponse {
            subscriptions: items.iter().map(subscription_to_proto).collect(),
        }))
    }

    #[instrument(skip(self, request))]
    async fn update_subscription(
        &self,
        request: Request<UpdateSubscriptionRequest>,
    ) -> Result<Response<SubscriptionEnvelope>, Status> {
        let req = request.into_inner();
        let id = require_id(req.id)?;

        let item = self
            .engine
            .update_subscription(UpdateSubscriptionInput {
                id,
                auto_renew: req.auto_renew,
                status: req.status,
            })
            .await
            .map_err(engine_error_to_status)?;

        Ok(Response::new(SubscriptionEnvelope {
            subscription: Some(subscription_to_proto(&item)),
        }))
    }

    #[instrument(skip(self, request))]
    async fn delete_subscription(
        &self,
        request: Request<DeleteSubscriptionRequest>,
    ) -> Result<Response<SubscriptionMutationResponse>, Status> {
        let id = require_id(request.into_inner().id)?;

        let item = self
            .engine
            .delete_subscription(id)
            .await
            .map_err(engine_error_to_status)?;

        Ok(Response::new(SubscriptionMutationResponse {
            message: "Subscription deleted successfully".to_string(),
            subscription: Some(subscription_to_proto(&item)),
        }))
    }

    #[instrument(skip(self, request))]
    async fn cancel_subscription(
        &self,
        request: Request<CancelSubscriptionRequest>,
    ) -> Result<Response<SubscriptionMutationResponse>, Status> {
        let id = require_id(request.into_inner().id)?;

        let item = self
            .engine
            .cancel_subscription(id)
            .await
            .map_err(engine_error_to_status)?;

        metrics::counter!("subscriptions_canceled_total").increment(1);

        Ok(Response::new(SubscriptionMutationResponse {
            message: "Subscription cancelled successfully".to_string(),
            subscription: Some(subscription_to_proto(&item)),
        }))
    }

    #[instrument(skip(self, request), fields(subscription_id))]
    async fn payment_callback(
        &self,
        request: Request<PaymentCallbackRequest>,
    ) -> Result<Response<PaymentCallbackResponse>, Status> {
        let req = request.into_inner();
        tracing::Span::current().record("subscription_id", req.subscription_id);

        if req.subscription_id == 0 {
            return Err(Status::invalid_argument("subscription_id is required"));
        }
        match req.status.trim().to_ascii_lowercase().as_str() {
            "success" | "failed" => {}
            _ => return Err(Status::invalid_argument("status must be success or failed")),
        }

        self.callbacks
            .apply(PaymentCallbackInput {
                subscription_id: req.subscription_id,
                status: req.status,
                transaction_id: req.transaction_id,
            })
            .await
            .map_err(engine_error_to_status)?;

        Ok(Response::new(PaymentCallbackResponse {
            message: "Payment processed successfully".to_string(),
        }))
    }
}
