use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

mod flags;
mod health;

pub use health::health;

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    let flag_router = Router::new()
        .route("/", post(flags::routes::create).get(flags::routes::list))
        .route(
            "/{flag_id}",
            get(flags::routes::get)
                .put(flags::routes::update)
                .delete(flags::routes::delete),
        )
        .route("/{flag_id}/toggle", post(flags::routes::toggle));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/evaluate/{name}", post(flags::routes::evaluate))
        .nest("/flags", flag_router)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn root() -> &'static str {
    "localflags: feature flag evaluation service"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::LocalFlags;
    use crate::store::MemoryFlagStore;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        let state = AppState {
            flags: LocalFlags::new(MemoryFlagStore::new()),
        };
        routes().with_state(state)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(&app(), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], 200);
    }

    #[tokio::test]
    async fn test_flag_lifecycle() {
        let app = app();

        let (status, created) = send(
            &app,
            "POST",
            "/flags",
            Some(json!({
                "name": "new-ui",
                "enabled": true,
                "users": ["alice"]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["id"].as_str().unwrap().to_string();

        let (status, _) = send(&app, "POST", "/flags", Some(json!({"name": "new-ui"}))).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, list) = send(&app, "GET", "/flags", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);

        let (status, eval) = send(
            &app,
            "POST",
            "/evaluate/new-ui",
            Some(json!({"identifier": "alice"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(eval["enabled"], true);
        assert_eq!(eval["reason"]["kind"], "allow_list");

        let (status, toggled) = send(&app, "POST", &format!("/flags/{id}/toggle"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(toggled["enabled"], false);

        let (_, eval) = send(
            &app,
            "POST",
            "/evaluate/new-ui",
            Some(json!({"identifier": "alice"})),
        )
        .await;
        assert_eq!(eval["enabled"], false);
        assert_eq!(eval["reason"]["kind"], "off");

        let (status, updated) = send(
            &app,
            "PUT",
            &format!("/flags/{id}"),
            Some(json!({"description": "new checkout UI"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["description"], "new checkout UI");

        let (status, _) = send(&app, "DELETE", &format!("/flags/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&app, "GET", &format!("/flags/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_evaluate_unknown_flag_is_off() {
        let (status, eval) = send(
            &app(),
            "POST",
            "/evaluate/missing",
            Some(json!({"identifier": "alice", "attributes": {"role": "admin"}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(eval["enabled"], false);
    }

    #[tokio::test]
    async fn test_evaluate_empty_identifier() {
        let (status, _) = send(
            &app(),
            "POST",
            "/evaluate/missing",
            Some(json!({"identifier": ""})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_invalid_rollout() {
        let (status, _) = send(
            &app(),
            "POST",
            "/flags",
            Some(json!({"name": "f", "rollout_percentage": 150})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
