use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
};
use card_core::{CardError, StateMap};
use card_engine::TransitMessagesCard;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex};

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
}

fn card_error_to_response(error: CardError) -> impl IntoResponse {
    let status = match error {
        CardError::MissingEntity | CardError::InvalidConfig(_) => StatusCode::BAD_REQUEST,
    };
    (status, Json(ErrorResponse { error: error.to_string() }))
}

/// Current card markup; empty while hidden or not yet configured.
pub async fn get_card(State(card): State<Arc<Mutex<TransitMessagesCard>>>) -> Html<String> {
    let card = card.lock().unwrap();
    Html(card.html().unwrap_or_default().to_string())
}

/// Get the canonical card configuration
pub async fn get_config(State(card): State<Arc<Mutex<TransitMessagesCard>>>) -> impl IntoResponse {
    tracing::info!("Getting card configuration");
    let card = card.lock().unwrap();
    match card.config() {
        Some(config) => (StatusCode::OK, Json(config.clone())).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "Card is not configured".to_string(),
            }),
        )
            .into_response(),
    }
}

/// Replace the card configuration
pub async fn set_config(
    State(card): State<Arc<Mutex<TransitMessagesCard>>>,
    Json(payload): Json<Value>,
) -> impl IntoResponse {
    tracing::info!("Updating card configuration");
    let mut card = card.lock().unwrap();
    match card.set_config(payload) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => card_error_to_response(error).into_response(),
    }
}

/// Replace the host-state snapshot and trigger a re-render
pub async fn set_states(
    State(card): State<Arc<Mutex<TransitMessagesCard>>>,
    Json(payload): Json<StateMap>,
) -> StatusCode {
    tracing::info!("Updating host-state snapshot ({} entities)", payload.len());
    let mut card = card.lock().unwrap();
    card.set_states(payload);
    StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode},
        routing::{get, post},
    };
    use serde_json::json;
    use tower::util::ServiceExt;

    /// Create the application router with card endpoints
    fn create_app(card: TransitMessagesCard) -> Router {
        let shared_state = Arc::new(Mutex::new(card));
        Router::new()
            .route("/card", get(get_card))
            .route("/card/config", get(get_config).post(set_config))
            .route("/card/states", post(set_states))
            .with_state(shared_state)
    }

    fn demo_states() -> Value {
        json!({
            "sensor.frankfurt_hbf_departures": {
                "state": "ok",
                "attributes": {
                    "next_departures": [
                        {
                            "train": "RE", "trainNumber": "24524", "destination": "Darmstadt Hbf",
                            "scheduledDeparture": "14:22", "departure_current": "14:27",
                            "platform": "7", "delayDeparture": 5, "isCancelled": 0
                        },
                        {
                            "train": "RB", "trainNumber": "24516", "destination": "Wiesbaden",
                            "scheduledDeparture": "14:35", "isCancelled": 1
                        }
                    ]
                }
            }
        })
    }

    async fn post_json(app: Router, uri: &str, body: Value) -> axum::response::Response {
        app.oneshot(
            Request::builder()
                .uri(uri)
                .method("POST")
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_set_config_rejects_missing_entity() {
        let app = create_app(TransitMessagesCard::new());

        let response = post_json(app, "/card/config", json!({"title": "Abfahrten"})).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let error_response: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(error_response.error.contains("'entity'"));
    }

    #[tokio::test]
    async fn test_get_config_before_configuration() {
        let app = create_app(TransitMessagesCard::new());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/card/config")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_get_config_returns_canonical_record() {
        let app = create_app(TransitMessagesCard::new());

        let response = post_json(
            app.clone(),
            "/card/config",
            json!({"entity": "sensor.frankfurt_hbf_departures"}),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/card/config")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let config: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(config["type"], "custom:transit-messages-card");
        assert_eq!(config["title"], "Abfahrten");
        assert_eq!(config["count"], 5.0);
    }

    #[tokio::test]
    async fn test_states_then_card_markup() {
        let app = create_app(TransitMessagesCard::new());

        let response = post_json(
            app.clone(),
            "/card/config",
            json!({"entity": "sensor.frankfurt_hbf_departures"}),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = post_json(app.clone(), "/card/states", demo_states()).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(Request::builder().uri("/card").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("Darmstadt Hbf"));
        assert!(html.contains("Stornierte Verbindungen"));
    }

    #[tokio::test]
    async fn test_card_markup_before_any_input_is_empty() {
        let app = create_app(TransitMessagesCard::new());

        let response = app
            .oneshot(Request::builder().uri("/card").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(body.is_empty());
    }
}
