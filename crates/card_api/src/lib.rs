//! Card preview host
//!
//! This library provides the HTTP shell that mounts one transit messages
//! card instance for a hosting dashboard, standing in for the dashboard
//! runtime: it feeds the card its configuration and host-state snapshot and
//! serves the rendered markup.

mod card;

use axum::{
    Router,
    routing::{get, post},
};
use card_engine::TransitMessagesCard;
use std::sync::{Arc, Mutex};
use tower_http::trace::TraceLayer;

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}

/// Create the application router with all endpoints
pub fn create_app(card: TransitMessagesCard) -> Router {
    let shared_state = Arc::new(Mutex::new(card));
    Router::new()
        .route("/health", get(health_check))
        .route("/card", get(card::get_card))
        .route(
            "/card/config",
            get(card::get_config).post(card::set_config),
        )
        .route("/card/states", post(card::set_states))
        .layer(TraceLayer::new_for_http())
        .with_state(shared_state)
}
