//! HTTP surface of the dashboard.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::dashboard::{Dashboard, SearchQuery};
use crate::error::{Error, PipelineError};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub dashboard: Dashboard,
}

/// Build the router with every dashboard route.
pub fn dashboard_routes(dashboard: Dashboard) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/feedback", get(browse_feedback))
        .route("/api/conversations", get(search_conversations))
        .route("/api/conversations/{id}", get(view_conversation))
        .route("/api/refresh", post(refresh))
        .with_state(AppState { dashboard })
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

impl Error {
    fn status(&self) -> (StatusCode, &'static str) {
        match self {
            Error::Pipeline(PipelineError::UnknownColumn { .. }) => {
                (StatusCode::BAD_REQUEST, "UNKNOWN_COLUMN")
            }
            Error::ConversationNotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Error::Store(_) => (StatusCode::SERVICE_UNAVAILABLE, "STORE_UNAVAILABLE"),
            Error::Pipeline(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATA_SHAPE"),
            Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG"),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, code) = self.status();
        if status.is_server_error() {
            error!(error = %self, code, "Request failed");
        } else {
            warn!(error = %self, code, "Request rejected");
        }
        (
            status,
            Json(json!({
                "error": self.to_string(),
                "code": code,
            })),
        )
            .into_response()
    }
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let report = state.dashboard.health().await;
    let status = if report.status == "ok" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(json!(report)))
}

// ── Views ───────────────────────────────────────────────────────────────

async fn browse_feedback(State(state): State<AppState>) -> Result<impl IntoResponse, Error> {
    let view = state.dashboard.browse_feedback().await?;
    Ok(Json(view))
}

/// Query string of the search view. `columns` is comma-separated.
#[derive(Debug, Default, Deserialize)]
struct SearchParams {
    conversation_id: Option<String>,
    columns: Option<String>,
}

impl From<SearchParams> for SearchQuery {
    fn from(params: SearchParams) -> Self {
        let columns = params.columns.map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect()
        });
        SearchQuery {
            conversation_id: params.conversation_id.filter(|id| !id.is_empty()),
            columns,
        }
    }
}

async fn search_conversations(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, Error> {
    let view = state.dashboard.search_conversations(params.into()).await?;
    Ok(Json(view))
}

async fn view_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, Error> {
    let view = state.dashboard.view_conversation(&id).await?;
    Ok(Json(view))
}

// ── Refresh ─────────────────────────────────────────────────────────────

async fn refresh(State(state): State<AppState>) -> Result<impl IntoResponse, Error> {
    info!("Refresh requested");
    let summary = state.dashboard.refresh().await?;
    Ok(Json(json!({
        "status": "refreshed",
        "summary": summary,
    })))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::cache::ResultCache;
    use crate::error::StoreError;
    use crate::store::{Collection, InMemoryStore};

    async fn body_json(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), 4096).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn unknown_column_is_bad_request() {
        let err = Error::Pipeline(PipelineError::UnknownColumn {
            column: "bogus".into(),
            available: "a, b".into(),
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["code"], "UNKNOWN_COLUMN");
        assert!(json["error"].as_str().unwrap().contains("bogus"));
    }

    #[tokio::test]
    async fn store_failures_are_service_unavailable() {
        let response = Error::Store(StoreError::Timeout {
            collection: "feedback".into(),
            timeout: Duration::from_secs(30),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn data_shape_errors_are_internal_but_readable() {
        let response = Error::Pipeline(PipelineError::MissingField {
            context: "conversation c1".into(),
            field: "title".into(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("title"));
    }

    #[tokio::test]
    async fn missing_conversation_is_not_found() {
        let response = Error::ConversationNotFound("c9".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    fn router(store: Arc<InMemoryStore>) -> Router {
        dashboard_routes(Dashboard::new(store, ResultCache::new()))
    }

    async fn send_get(app: Router, uri: &str) -> Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn routes_map_errors_to_statuses() {
        let store = Arc::new(InMemoryStore::new().with_collection(
            Collection::Conversations,
            vec![json!({
                "_id": "c1", "title": "t",
                "messages": [{
                    "id": "m1", "from": "user", "content": "hi",
                    "createdAt": 1709640000000i64, "updatedAt": 1709640000000i64,
                    "ancestors": [], "children": []
                }]
            })],
        ));

        let response = send_get(router(store.clone()), "/api/conversations?columns=title,bogus").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send_get(router(store.clone()), "/api/conversations/c404").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = send_get(router(store.clone()), "/api/conversations?columns=title").await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["selected_conversation"], "c1");
        assert_eq!(json["table"]["rows"], json!([["t"]]));

        store.set_offline(true);
        let response = send_get(router(store), "/health").await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn search_params_split_columns() {
        let query: SearchQuery = SearchParams {
            conversation_id: Some(String::new()),
            columns: Some("title, model,,from".into()),
        }
        .into();
        assert_eq!(query.conversation_id, None);
        assert_eq!(
            query.columns,
            Some(vec!["title".to_string(), "model".to_string(), "from".to_string()])
        );
    }
}
