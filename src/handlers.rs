use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{PathRejection, QueryRejection},
    },
    http::StatusCode,
};
use tracing::{debug, info};

use crate::{
    error::{AppError, AppResult},
    extract::JsonBody,
    models::{
        CreateTodoRequest, HealthStatus, ListTodosQuery, TodoId, TodoItem, TodoListResponse,
        TodoChange, TodoView, UpdateTodoRequest,
    },
    state::AppState,
    validation::{parse_id, parse_page_request, validate_create, validate_update},
};

pub async fn healthcheck() -> Json<HealthStatus> {
    Json(HealthStatus { status: "ok" })
}

pub async fn create_todo(
    State(state): State<AppState>,
    payload: Result<JsonBody<CreateTodoRequest>, AppError>,
) -> AppResult<(StatusCode, Json<TodoItem>)> {
    let JsonBody(payload) = payload?;
    let todo = validate_create(payload)?;

    let item = state.repo.insert(todo).await?;
    state.metrics.inc_live_items();

    info!(id = item.id, title = %item.title, "todo created");
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn list_todos(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> AppResult<Json<TodoListResponse>> {
    let Query(pairs) = query?;
    let query = ListTodosQuery::from_pairs(pairs);
    let request = parse_page_request(&query, state.settings.pagination)?;

    let count = state.repo.count(request.filter).await?;
    let items = state
        .repo
        .find_page(request.filter, request.page_size, request.offset())
        .await?;

    debug!(
        page = request.page,
        page_size = request.page_size,
        count,
        returned = items.len(),
        "listed todos"
    );

    Ok(Json(TodoListResponse {
        count,
        page: request.page,
        page_size: request.page_size,
        page_count: request.page_count(count),
        items,
    }))
}

pub async fn get_todo(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> AppResult<Json<TodoView>> {
    let id = todo_id(path)?;

    let item = state
        .repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("item not found"))?;

    Ok(Json(item.into()))
}

pub async fn update_todo(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    payload: Result<JsonBody<UpdateTodoRequest>, AppError>,
) -> AppResult<Json<TodoView>> {
    let id = todo_id(path)?;
    let JsonBody(payload) = payload?;
    let changes = validate_update(payload)?;

    if state.repo.find_by_id(id).await?.is_none() {
        return Err(AppError::not_found("todo not found"));
    }

    // A concurrent delete between lookup and update shows up as zero rows.
    if state.repo.update_fields(id, &changes).await? == 0 {
        return Err(AppError::not_found("todo not found"));
    }

    let item = state
        .repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("todo not found"))?;

    let fields: Vec<&str> = changes.iter().map(TodoChange::column).collect();
    info!(id, ?fields, "todo updated");
    Ok(Json(item.into()))
}

pub async fn delete_todo(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> AppResult<StatusCode> {
    let id = todo_id(path)?;

    if state.repo.delete_by_id(id).await? == 0 {
        return Err(AppError::not_found("todo not found"));
    }

    if state.settings.decrement_gauge_on_delete {
        state.metrics.dec_live_items();
    }

    info!(id, "todo deleted");
    Ok(StatusCode::NO_CONTENT)
}

fn todo_id(path: Result<Path<String>, PathRejection>) -> AppResult<TodoId> {
    let Path(raw) = path.map_err(|_| AppError::validation("invalid id"))?;
    parse_id(&raw)
}
