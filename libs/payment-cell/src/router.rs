use std::sync::Arc;

use axum::{
    Router,
    routing::post,
    middleware,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::state::PaymentState;

pub fn payment_routes(state: Arc<PaymentState>) -> Router {
    // Signed by the processor instead of a user token
    let public_routes = Router::new()
        .route("/webhook", post(handlers::payment_webhook));

    let protected_routes = Router::new()
        .route("/intent", post(handlers::create_payment_intent))
        .route("/confirm", post(handlers::confirm_payment))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
