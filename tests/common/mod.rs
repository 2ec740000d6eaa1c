//! In-process stand-in for the blackbox service

#![allow(dead_code)]

use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

/// How the mock answers every request
#[derive(Clone, Debug)]
pub enum Behavior {
    Normal,
    Remote(String),
    Status(u16),
    Garbage,
}

#[derive(Clone, Debug)]
pub struct UploadedField {
    pub name: String,
    pub file_name: Option<String>,
    pub data: Vec<u8>,
}

#[derive(Clone, Debug)]
pub struct Upload {
    pub query: HashMap<String, String>,
    pub fields: Vec<UploadedField>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Submission {
    pub user_id: String,
    pub session_id: String,
    pub pay: i64,
}

#[derive(Default)]
struct Inner {
    behavior: Option<Behavior>,
    sessions: HashMap<String, Vec<String>>,
    gets: Vec<HashMap<String, String>>,
    uploads: Vec<Upload>,
    submissions: Vec<Submission>,
}

#[derive(Clone, Default)]
pub struct MockService {
    inner: Arc<Mutex<Inner>>,
}

impl MockService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sessions(self, user_id: &str, sessions: &[&str]) -> Self {
        self.inner.lock().sessions.insert(
            user_id.to_string(),
            sessions.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    pub fn set_behavior(&self, behavior: Behavior) {
        self.inner.lock().behavior = Some(behavior);
    }

    pub fn gets(&self) -> Vec<HashMap<String, String>> {
        self.inner.lock().gets.clone()
    }

    pub fn uploads(&self) -> Vec<Upload> {
        self.inner.lock().uploads.clone()
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.inner.lock().submissions.clone()
    }

    /// Bind to an ephemeral port and return the API base URL
    pub async fn spawn(&self) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let app = Router::new()
            .route("/api", get(handle_get).post(handle_upload))
            .with_state(self.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{}/api", addr)
    }

    fn canned(&self) -> Option<Response> {
        match self.inner.lock().behavior.clone()? {
            Behavior::Normal => None,
            Behavior::Remote(message) => Some(
                Json(json!({ "Success": false, "Error": message })).into_response(),
            ),
            Behavior::Status(code) => Some(
                (StatusCode::from_u16(code).unwrap(), "mock failure").into_response(),
            ),
            Behavior::Garbage => Some((StatusCode::OK, "<html>not json</html>").into_response()),
        }
    }
}

async fn handle_get(
    State(mock): State<MockService>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    mock.inner.lock().gets.push(query.clone());

    if let Some(response) = mock.canned() {
        return response;
    }

    let id = query.get("id").cloned().unwrap_or_default();
    let mut inner = mock.inner.lock();

    match query.get("action").map(String::as_str) {
        Some("info") => {
            let sessions = inner.sessions.get(&id).cloned().unwrap_or_default();
            let current = sessions.first().cloned().unwrap_or_default();
            Json(json!({
                "Success": true, "Error": "", "ID": id, "Session": current, "Sessions": sessions,
            }))
            .into_response()
        }
        Some("create") => {
            let sessions = inner.sessions.entry(id.clone()).or_default();
            let created = format!("{}-s{}", id, sessions.len() + 1);
            sessions.push(created.clone());
            Json(json!({
                "Success": true, "Error": "", "ID": id, "Session": created, "Sessions": sessions.clone(),
            }))
            .into_response()
        }
        Some("finalize") => {
            if query.get("dev").map(String::as_str) != Some("true") {
                inner.submissions.push(Submission {
                    user_id: id,
                    session_id: query.get("session").cloned().unwrap_or_default(),
                    pay: query.get("pay").and_then(|p| p.parse().ok()).unwrap_or_default(),
                });
            }
            Json(json!({ "Success": true, "Error": "" })).into_response()
        }
        other => Json(json!({
            "Success": false,
            "Error": format!("unknown action {:?}", other),
        }))
        .into_response(),
    }
}

async fn handle_upload(
    State(mock): State<MockService>,
    Query(query): Query<HashMap<String, String>>,
    mut multipart: Multipart,
) -> Response {
    let mut fields = Vec::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or("").to_string();
        let file_name = field.file_name().map(|s| s.to_string());
        let data = field.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
        fields.push(UploadedField { name, file_name, data });
    }

    if let Some(response) = mock.canned() {
        return response;
    }

    mock.inner.lock().uploads.push(Upload { query, fields });
    Json(json!({ "Success": true, "Error": "" })).into_response()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
