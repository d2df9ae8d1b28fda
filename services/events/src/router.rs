use axum::{
    Router,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use herald_core::error::not_found;
use herald_core::health::healthz;
use herald_core::middleware::{propagate_request_id_layer, request_id_layer};

use crate::handlers::{
    events::{create_event, list_events},
    health::readyz,
    sse::subscribe,
};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Events
        .route("/events", post(create_event).get(list_events))
        // Subscriptions
        .route("/sse", get(subscribe))
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(request_id_layer())
                .layer(TraceLayer::new_for_http())
                .layer(propagate_request_id_layer()),
        )
        .with_state(state)
}
