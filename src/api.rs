use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::mpsc;

use crate::bus::InboundMessage;
use crate::context::PersonalityContext;
use crate::profile::companion::trait_options;
use crate::profile::spiritual::score_survey;
use crate::profile::{Companion, UserProfile};

#[derive(Clone)]
pub struct AppState {
    pub sender: mpsc::Sender<InboundMessage>,
    pub name: String,
    pub api_key: Option<String>,
}

#[derive(Deserialize)]
pub struct SurveyRequest {
    #[serde(default)]
    pub answers: Vec<i64>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/messages", post(handle_message))
        .route("/companions", get(handle_companions))
        .route("/preview", post(handle_preview))
        .route("/survey", post(handle_survey))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_layer))
        .route("/health", get(handle_health))
        .with_state(state)
}

async fn auth_layer(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if let Some(ref expected) = state.api_key {
        let auth_ok = req
            .headers()
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|t| t == expected);
        if !auth_ok {
            return error(StatusCode::UNAUTHORIZED, "Unauthorized");
        }
    }
    next.run(req).await
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

async fn handle_message(State(state): State<AppState>, Json(msg): Json<InboundMessage>) -> Response {
    if msg.text.trim().is_empty() {
        return error(StatusCode::BAD_REQUEST, "text must not be empty");
    }
    let message_id = msg.message_id.clone();
    match state.sender.try_send(msg) {
        Ok(()) => {
            tracing::debug!("Queued message {message_id}");
            (
                StatusCode::ACCEPTED,
                Json(json!({ "status": "accepted", "messageId": message_id })),
            )
                .into_response()
        }
        Err(mpsc::error::TrySendError::Full(_)) => {
            tracing::warn!("Inbound queue full, rejecting message {message_id}");
            error(StatusCode::SERVICE_UNAVAILABLE, "queue full")
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            tracing::error!("Inbound queue closed, rejecting message {message_id}");
            error(StatusCode::SERVICE_UNAVAILABLE, "worker unavailable")
        }
    }
}

async fn handle_companions() -> impl IntoResponse {
    let companions: Vec<_> = Companion::ALL.iter().map(|c| c.card()).collect();
    Json(json!({
        "companions": companions,
        "defaultCompanion": Companion::DEFAULT.id(),
        "traitOptions": trait_options(),
    }))
}

async fn handle_preview(Json(raw): Json<Value>) -> Response {
    let Some(profile) = UserProfile::normalize(&raw) else {
        return error(StatusCode::BAD_REQUEST, "profile must not be null");
    };
    let context = PersonalityContext::compile(&profile);
    Json(json!({
        "profile": profile,
        "companion": context.persona().display_name,
        "lifeStage": context.life_stage().name(),
        "spiritualStage": context.spiritual_tier().stage_name(),
        "spiritualTier": context.spiritual_tier().level(),
        "context": context.to_string(),
    }))
    .into_response()
}

async fn handle_survey(Json(req): Json<SurveyRequest>) -> Response {
    let answers: Vec<u8> = req
        .answers
        .iter()
        .map(|a| (*a).clamp(0, i64::from(u8::MAX)) as u8)
        .collect();
    match score_survey(&answers) {
        Some(score) => Json(score).into_response(),
        None => error(StatusCode::BAD_REQUEST, "answers must not be empty"),
    }
}

async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "name": state.name,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn app(api_key: Option<&str>) -> (Router, mpsc::Receiver<InboundMessage>) {
        let (sender, rx) = mpsc::channel(1);
        let state = AppState {
            sender,
            name: "companion".into(),
            api_key: api_key.map(String::from),
        };
        (router(state), rx)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn inbound(id: &str) -> Value {
        json!({ "conversationId": "c1", "messageId": id, "userId": "u1", "text": "Hello" })
    }

    #[tokio::test]
    async fn test_message_is_queued() {
        let (app, mut rx) = app(None);
        let response = app.oneshot(post_json("/messages", inbound("m1"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(body_json(response).await["messageId"], "m1");
        assert_eq!(rx.recv().await.unwrap().message_id, "m1");
    }

    #[tokio::test]
    async fn test_full_queue_is_unavailable() {
        let (app, _rx) = app(None);
        let first = app
            .clone()
            .oneshot(post_json("/messages", inbound("m1")))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::ACCEPTED);
        let second = app.oneshot(post_json("/messages", inbound("m2"))).await.unwrap();
        assert_eq!(second.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_blank_text_rejected() {
        let (app, _rx) = app(None);
        let mut body = inbound("m1");
        body["text"] = json!("  ");
        let response = app.oneshot(post_json("/messages", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_auth_required_except_health() {
        let (app, _rx) = app(Some("secret"));
        let denied = app
            .clone()
            .oneshot(post_json("/messages", inbound("m1")))
            .await
            .unwrap();
        assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

        let mut allowed = post_json("/messages", inbound("m1"));
        allowed
            .headers_mut()
            .insert("authorization", "Bearer secret".parse().unwrap());
        let allowed = app.clone().oneshot(allowed).await.unwrap();
        assert_eq!(allowed.status(), StatusCode::ACCEPTED);

        let health = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(health.status(), StatusCode::OK);
        let body = body_json(health).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["name"], "companion");
    }

    #[tokio::test]
    async fn test_companions_catalog() {
        let (app, _rx) = app(None);
        let response = app
            .oneshot(Request::get("/companions").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["companions"].as_array().unwrap().len(), 4);
        assert_eq!(body["defaultCompanion"], "ruth");
        assert_eq!(body["traitOptions"]["personalityColor"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_preview() {
        let (app, _rx) = app(None);
        let response = app
            .clone()
            .oneshot(post_json(
                "/preview",
                json!({ "personalityColor": "RED", "age": 35, "spiritualDepthPercent": 47, "language": "es" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["lifeStage"], "Builder");
        assert_eq!(body["spiritualTier"], 5);
        assert_eq!(body["profile"]["personalityColor"], "red");
        assert!(body["context"].as_str().unwrap().contains("Spanish"));

        let null = app.oneshot(post_json("/preview", Value::Null)).await.unwrap();
        assert_eq!(null.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_survey() {
        let (app, _rx) = app(None);
        let response = app
            .clone()
            .oneshot(post_json("/survey", json!({ "answers": [5, 5, 5, 5] })))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["spiritualScorePercent"], 100);
        assert_eq!(body["spiritualTier"], 10);

        let empty = app
            .oneshot(post_json("/survey", json!({ "answers": [] })))
            .await
            .unwrap();
        assert_eq!(empty.status(), StatusCode::BAD_REQUEST);
    }
}
