//! Integration tests for the dashboard HTTP API.
//!
//! Each test spins up an Axum server on a random port over an in-memory
//! document store and exercises the real REST contract with reqwest.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;

use chat_feedback_dash::api::dashboard_routes;
use chat_feedback_dash::cache::ResultCache;
use chat_feedback_dash::dashboard::Dashboard;
use chat_feedback_dash::store::{Collection, InMemoryStore};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Start an Axum server on a random port, return (port, store).
async fn start_server(store: InMemoryStore) -> (u16, Arc<InMemoryStore>) {
    let store = Arc::new(store);
    let dashboard = Dashboard::new(store.clone(), ResultCache::new());
    let app = dashboard_routes(dashboard);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    (port, store)
}

fn message(id: &str, from: &str, content: &str, minute: u32) -> Value {
    json!({
        "id": id,
        "from": from,
        "content": content,
        "createdAt": {"$date": format!("2024-03-05T12:{minute:02}:00Z")},
        "updatedAt": {"$date": format!("2024-03-05T12:{minute:02}:30Z")},
        "ancestors": [],
        "children": []
    })
}

/// One conversation with a user turn and a scored assistant turn.
fn seeded_store() -> InMemoryStore {
    let mut answer = message("m2", "assistant", "Hi! How can I help?", 1);
    answer["score"] = json!(1);
    answer["ancestors"] = json!(["m1"]);

    InMemoryStore::new()
        .with_collection(
            Collection::Conversations,
            vec![json!({
                "_id": {"$oid": "65e6f0a1"},
                "title": "Greeting",
                "rootMessageId": "m1",
                "model": "mistral",
                "createdAt": {"$date": "2024-03-05T12:00:00Z"},
                "sessionId": "s-1",
                "messages": [message("m1", "user", "Hello", 0), answer]
            })],
        )
        .with_collection(
            Collection::Feedback,
            vec![json!({
                "_id": {"$oid": "f1"},
                "conversationId": {"$oid": "65e6f0a1"},
                "messageId": "m2",
                "createdBy": "u-7",
                "score": 1,
                "feedback": ["helpful"],
                "customComment": "great",
                "createdAt": {"$date": "2024-03-05T12:02:00Z"}
            })],
        )
}

async fn get_json(port: u16, path: &str) -> (u16, Value) {
    let resp = reqwest::get(format!("http://127.0.0.1:{port}{path}"))
        .await
        .unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

// ── Health ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_reports_store_and_cache() {
    timeout(TEST_TIMEOUT, async {
        let (port, _store) = start_server(seeded_store()).await;

        let (status, body) = get_json(port, "/health").await;
        assert_eq!(status, 200);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["cache"]["entries"], 0);
    })
    .await
    .expect("test timed out");
}

// ── Browse ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn browse_lists_feedback_with_message_and_tags() {
    timeout(TEST_TIMEOUT, async {
        let (port, _store) = start_server(seeded_store()).await;

        let (status, body) = get_json(port, "/api/feedback").await;
        assert_eq!(status, 200);

        let columns = body["table"]["columns"].as_array().unwrap();
        assert_eq!(columns[0], "feedback_id");
        assert_eq!(columns.len(), 9);

        let rows = body["table"]["rows"].as_array().unwrap();
        assert_eq!(rows.len(), 1);
        // feedback_id, score, feedback, custom_comment, message_content, ...
        assert_eq!(rows[0][0], "f1");
        assert_eq!(rows[0][2], json!(["helpful"]));
        assert_eq!(rows[0][3], "great");
        assert_eq!(rows[0][4], "Hi! How can I help?");
        assert_eq!(rows[0][5], "65e6f0a1");

        assert_eq!(body["tag_counts"], json!([{"tag": "helpful", "count": 1}]));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn repeated_requests_are_served_from_cache() {
    timeout(TEST_TIMEOUT, async {
        let (port, store) = start_server(seeded_store()).await;

        let (_, first) = get_json(port, "/api/feedback").await;
        let fetches = store.fetch_count();
        let (_, second) = get_json(port, "/api/feedback").await;

        assert_eq!(first, second);
        assert_eq!(store.fetch_count(), fetches);
    })
    .await
    .expect("test timed out");
}

// ── Refresh ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn refresh_picks_up_new_documents() {
    timeout(TEST_TIMEOUT, async {
        let (port, store) = start_server(seeded_store()).await;

        let (_, before) = get_json(port, "/api/feedback").await;
        assert_eq!(before["table"]["rows"].as_array().unwrap().len(), 1);

        store.replace(
            Collection::Feedback,
            vec![
                json!({"_id": "f1", "conversationId": "65e6f0a1", "messageId": "m2", "score": 1, "feedback": ["helpful"]}),
                json!({"_id": "f2", "conversationId": "65e6f0a1", "messageId": "m2", "score": -1, "feedback": ["wrong", "helpful"]}),
            ],
        );

        // Stale until refreshed.
        let (_, stale) = get_json(port, "/api/feedback").await;
        assert_eq!(stale, before);

        let resp = reqwest::Client::new()
            .post(format!("http://127.0.0.1:{port}/api/refresh"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["summary"], json!({"conversations": 1, "feedback": 2, "messages": 2}));

        let (_, after) = get_json(port, "/api/feedback").await;
        assert_eq!(after["table"]["rows"].as_array().unwrap().len(), 2);
        assert_eq!(
            after["tag_counts"],
            json!([{"tag": "helpful", "count": 2}, {"tag": "wrong", "count": 1}])
        );
    })
    .await
    .expect("test timed out");
}

// ── Search ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn search_selects_first_conversation_and_default_columns() {
    timeout(TEST_TIMEOUT, async {
        let (port, _store) = start_server(seeded_store()).await;

        let (status, body) = get_json(port, "/api/conversations").await;
        assert_eq!(status, 200);
        assert_eq!(body["conversation_ids"], json!(["65e6f0a1"]));
        assert_eq!(body["selected_conversation"], "65e6f0a1");
        assert_eq!(
            body["table"]["columns"],
            json!(["conversation_id", "message_id", "from", "message_content", "score", "model", "created_at"])
        );
        assert_eq!(body["table"]["rows"][0][1], "m1");
        assert_eq!(body["table"]["rows"][0][6], "2024-03-05T12:00:00+00:00");

        let available = body["available_columns"].as_array().unwrap();
        assert_eq!(available.len(), 21);
        assert!(available.contains(&json!("root_message_id")));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn search_projects_requested_columns() {
    timeout(TEST_TIMEOUT, async {
        let (port, _store) = start_server(seeded_store()).await;

        let (status, body) = get_json(
            port,
            "/api/conversations?conversation_id=65e6f0a1&columns=message_id,sessionId",
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(body["table"]["rows"], json!([["m1", "s-1"], ["m2", "s-1"]]));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn search_unknown_column_is_bad_request() {
    timeout(TEST_TIMEOUT, async {
        let (port, _store) = start_server(seeded_store()).await;

        let (status, body) = get_json(port, "/api/conversations?columns=message_id,nope").await;
        assert_eq!(status, 400);
        assert!(body["error"].as_str().unwrap().contains("nope"));
    })
    .await
    .expect("test timed out");
}

// ── Transcript ──────────────────────────────────────────────────────────

#[tokio::test]
async fn transcript_annotates_scored_message() {
    timeout(TEST_TIMEOUT, async {
        let (port, _store) = start_server(seeded_store()).await;

        let (status, body) = get_json(port, "/api/conversations/65e6f0a1").await;
        assert_eq!(status, 200);
        assert_eq!(body["title"], "Greeting");

        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["message_id"], "m1");
        assert_eq!(messages[0]["role"], "user");
        assert!(messages[0]["annotation"].is_null());

        let annotation = &messages[1]["annotation"];
        assert_eq!(annotation["sentiment"], "positive");
        assert_eq!(annotation["tags"], json!(["helpful"]));
        assert_eq!(annotation["comments"], json!(["great"]));
        assert_eq!(messages[1]["created_at"], "2024-03-05 12:01:00");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn unknown_conversation_is_not_found() {
    timeout(TEST_TIMEOUT, async {
        let (port, _store) = start_server(seeded_store()).await;

        let (status, body) = get_json(port, "/api/conversations/does-not-exist").await;
        assert_eq!(status, 404);
        assert!(body["error"].as_str().unwrap().contains("does-not-exist"));
    })
    .await
    .expect("test timed out");
}

// ── Failures ────────────────────────────────────────────────────────────

#[tokio::test]
async fn unreachable_store_is_service_unavailable_then_recovers() {
    timeout(TEST_TIMEOUT, async {
        let (port, store) = start_server(seeded_store()).await;
        store.set_offline(true);

        let (status, body) = get_json(port, "/api/feedback").await;
        assert_eq!(status, 503);
        assert!(body["error"].is_string());

        store.set_offline(false);
        let (status, _) = get_json(port, "/api/feedback").await;
        assert_eq!(status, 200);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn malformed_conversation_is_internal_error() {
    timeout(TEST_TIMEOUT, async {
        let store = InMemoryStore::new().with_collection(
            Collection::Conversations,
            vec![json!({"_id": "c1", "messages": []})],
        );
        let (port, _store) = start_server(store).await;

        let (status, body) = get_json(port, "/api/conversations").await;
        assert_eq!(status, 500);
        assert!(body["error"].as_str().unwrap().contains("title"));
    })
    .await
    .expect("test timed out");
}
