use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    models::{Notification, Order, PaymentProof},
    response::{ApiResponse, Meta},
    routes::{admin, health, orders, params, proofs},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        orders::upload_payment_proof,
        orders::update_order_status,
        proofs::review_payment_proof,
        admin::list_notifications,
        admin::notification_stream,
        admin::mark_notification_read,
        admin::mark_all_notifications_read,
        admin::delete_notification
    ),
    components(
        schemas(
            Order,
            PaymentProof,
            Notification,
            orders::UpdateOrderStatusRequest,
            proofs::ReviewProofRequest,
            proofs::ProofReview,
            admin::NotificationList,
            params::Pagination,
            Meta,
            ApiResponse<Order>,
            ApiResponse<PaymentProof>,
            ApiResponse<proofs::ProofReview>,
            ApiResponse<admin::NotificationList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Orders", description = "Order lifecycle endpoints"),
        (name = "Payment Proofs", description = "Payment proof review endpoints"),
        (name = "Admin", description = "Admin notification endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
