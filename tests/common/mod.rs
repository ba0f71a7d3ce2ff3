#![allow(dead_code)]

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use todo_api::{
    build_router,
    error::{AppError, AppResult},
    metrics::Metrics,
    models::{NewTodo, TodoChanges, TodoFilter, TodoId, TodoItem},
    repository::{InMemoryTodoRepository, TodoRepository},
    state::{ApiSettings, AppState},
};
use tower::ServiceExt;

/// In-memory repository that counts how often each operation is reached.
#[derive(Debug, Default)]
pub struct CountingRepository {
    inner: InMemoryTodoRepository,
    pub lookups: AtomicUsize,
    pub counts: AtomicUsize,
    pub pages: AtomicUsize,
    pub inserts: AtomicUsize,
    pub updates: AtomicUsize,
    pub deletes: AtomicUsize,
}

impl CountingRepository {
    pub fn total_calls(&self) -> usize {
        [
            &self.lookups,
            &self.counts,
            &self.pages,
            &self.inserts,
            &self.updates,
            &self.deletes,
        ]
        .iter()
        .map(|counter| counter.load(Ordering::SeqCst))
        .sum()
    }
}

#[async_trait]
impl TodoRepository for CountingRepository {
    async fn init(&self) -> AppResult<()> {
        self.inner.init().await
    }

    async fn find_by_id(&self, id: TodoId) -> AppResult<Option<TodoItem>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_id(id).await
    }

    async fn count(&self, filter: TodoFilter) -> AppResult<u64> {
        self.counts.fetch_add(1, Ordering::SeqCst);
        self.inner.count(filter).await
    }

    async fn find_page(
        &self,
        filter: TodoFilter,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<TodoItem>> {
        self.pages.fetch_add(1, Ordering::SeqCst);
        self.inner.find_page(filter, limit, offset).await
    }

    async fn insert(&self, todo: NewTodo) -> AppResult<TodoItem> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.inner.insert(todo).await
    }

    async fn update_fields(&self, id: TodoId, changes: &TodoChanges) -> AppResult<u64> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.inner.update_fields(id, changes).await
    }

    async fn delete_by_id(&self, id: TodoId) -> AppResult<u64> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_by_id(id).await
    }
}

/// Repository whose every call fails the way a dropped database would.
#[derive(Debug, Default)]
pub struct UnavailableRepository;

#[async_trait]
impl TodoRepository for UnavailableRepository {
    async fn init(&self) -> AppResult<()> {
        Ok(())
    }

    async fn find_by_id(&self, _id: TodoId) -> AppResult<Option<TodoItem>> {
        Err(AppError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn count(&self, _filter: TodoFilter) -> AppResult<u64> {
        Err(AppError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn find_page(
        &self,
        _filter: TodoFilter,
        _limit: u64,
        _offset: u64,
    ) -> AppResult<Vec<TodoItem>> {
        Err(AppError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn insert(&self, _todo: NewTodo) -> AppResult<TodoItem> {
        Err(AppError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn update_fields(&self, _id: TodoId, _changes: &TodoChanges) -> AppResult<u64> {
        Err(AppError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn delete_by_id(&self, _id: TodoId) -> AppResult<u64> {
        Err(AppError::Database(sqlx::Error::PoolTimedOut))
    }
}

pub struct TestApp {
    pub router: Router,
    pub repo: Arc<CountingRepository>,
    pub metrics: Arc<Metrics>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_settings(ApiSettings::default())
    }

    pub fn with_settings(settings: ApiSettings) -> Self {
        let repo = Arc::new(CountingRepository::default());
        let metrics = Arc::new(Metrics::new());
        let state = AppState::new(repo.clone(), metrics.clone()).with_settings(settings);

        Self {
            router: build_router(state),
            repo,
            metrics,
        }
    }

    pub async fn send_json(&self, method: Method, uri: &str, payload: Value) -> (StatusCode, Value) {
        send_json(&self.router, method, uri, payload).await
    }

    pub async fn send_empty(&self, method: Method, uri: &str) -> (StatusCode, Value) {
        send_empty(&self.router, method, uri).await
    }

    /// Creates a todo and returns its id.
    pub async fn create(&self, title: &str) -> i64 {
        let (status, body) = self
            .send_json(Method::POST, "/todos", json!({ "title": title }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
        body["id"].as_i64().expect("created response should have id")
    }
}

pub fn unavailable_app() -> Router {
    let state = AppState::new(Arc::new(UnavailableRepository), Arc::new(Metrics::new()));
    build_router(state)
}

pub async fn send_json(
    app: &Router,
    method: Method,
    uri: &str,
    payload: Value,
) -> (StatusCode, Value) {
    send_raw(app, method, uri, Some(payload.to_string())).await
}

pub async fn send_empty(app: &Router, method: Method, uri: &str) -> (StatusCode, Value) {
    send_raw(app, method, uri, None).await
}

pub async fn send_raw(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<String>,
) -> (StatusCode, Value) {
    let (status, bytes) = send_for_bytes(app, method, uri, body).await;

    if bytes.is_empty() {
        return (status, Value::Null);
    }

    let json = serde_json::from_slice::<Value>(&bytes).expect("body should be valid JSON");
    (status, json)
}

/// Sends `body` with no `Content-Type` header.
pub async fn send_untyped(app: &Router, method: Method, uri: &str, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::from(body.to_string()))
        .expect("request should build");

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("response expected");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("response body should be readable")
        .to_bytes();

    (status, serde_json::from_slice(&bytes).expect("body should be valid JSON"))
}

pub async fn send_for_bytes(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<String>,
) -> (StatusCode, Vec<u8>) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body)),
        None => builder.body(Body::empty()),
    }
    .expect("request should build");

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("response expected");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("response body should be readable")
        .to_bytes();

    (status, bytes.to_vec())
}
