//! Request validation for the todo endpoints.
//!
//! Everything here is a pure function of raw request input: nothing touches
//! the repository, so a failure always short-circuits before any store call.

use crate::{
    error::{AppError, AppResult},
    models::{
        CreateTodoRequest, ListTodosQuery, NewTodo, PageRequest, Patch, TodoChange, TodoChanges,
        TodoFilter, TodoId, UpdateTodoRequest,
    },
};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const MAX_PAGE_SIZE: u64 = 100;
pub const MAX_TITLE_CHARS: usize = 50;

/// How `page` and `page_size` react to values that are not integers at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PaginationParsing {
    /// Unparsable values fall back to the defaults.
    #[default]
    Lenient,
    /// Unparsable values are rejected like out-of-range ones.
    Strict,
}

pub fn parse_id(raw: &str) -> AppResult<TodoId> {
    if raw.is_empty() || !raw.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(AppError::validation("invalid id"));
    }

    raw.parse::<TodoId>()
        .map_err(|_| AppError::validation("invalid id"))
}

pub fn validate_create(payload: CreateTodoRequest) -> AppResult<NewTodo> {
    Ok(NewTodo {
        title: normalize_title(&payload.title)?,
        description: payload
            .description
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string(),
        is_done: payload.is_done.unwrap_or_default(),
    })
}

pub fn validate_update(payload: UpdateTodoRequest) -> AppResult<TodoChanges> {
    if !payload.has_changes() {
        return Err(AppError::validation("no fields to update"));
    }

    let mut changes = TodoChanges::default();

    match payload.title {
        Patch::Absent => {}
        Patch::Null => return Err(AppError::validation("\"title\" cannot be null")),
        Patch::Value(title) => changes.push(TodoChange::Title(normalize_title(&title)?)),
    }

    match payload.description {
        Patch::Absent => {}
        Patch::Null => return Err(AppError::validation("\"description\" cannot be null")),
        Patch::Value(description) => {
            changes.push(TodoChange::Description(description.trim().to_string()));
        }
    }

    match payload.is_done {
        Patch::Absent => {}
        Patch::Null => return Err(AppError::validation("\"is_done\" cannot be null")),
        Patch::Value(is_done) => changes.push(TodoChange::IsDone(is_done)),
    }

    Ok(changes)
}

/// Turns the raw list query into a page request.
///
/// `page` and `page_size` are lenient about garbage (it means "use the
/// default") but strict about integers below one. `page_size` above
/// [`MAX_PAGE_SIZE`] is clamped silently. `is_done` is strict: a value that is
/// not a boolean is an error.
pub fn parse_page_request(
    query: &ListTodosQuery,
    parsing: PaginationParsing,
) -> AppResult<PageRequest> {
    let page = parse_positive(query.page.as_deref(), "page", DEFAULT_PAGE, parsing)?;
    let page_size = parse_positive(
        query.page_size.as_deref(),
        "page_size",
        DEFAULT_PAGE_SIZE,
        parsing,
    )?
    .min(MAX_PAGE_SIZE);

    let is_done = match query.is_done.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(
            parse_bool(raw)
                .ok_or_else(|| AppError::validation("invalid \"is_done\" query param"))?,
        ),
    };

    Ok(PageRequest {
        page,
        page_size,
        filter: TodoFilter { is_done },
    })
}

/// Accepts the usual spellings: `1 t T TRUE true True` and `0 f F FALSE false False`.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

fn normalize_title(raw: &str) -> AppResult<String> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(AppError::validation("\"title\" cannot be empty"));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(AppError::validation(format!(
            "\"title\" must be at most {MAX_TITLE_CHARS} characters"
        )));
    }
    Ok(title.to_string())
}

fn parse_positive(
    raw: Option<&str>,
    field: &str,
    default: u64,
    parsing: PaginationParsing,
) -> AppResult<u64> {
    let value = match raw {
        None | Some("") => return Ok(default),
        Some(raw) => match raw.parse::<i64>() {
            Ok(value) => value,
            Err(_) if parsing == PaginationParsing::Lenient => return Ok(default),
            Err(_) => {
                return Err(AppError::validation(format!(
                    "\"{field}\" must be an integer"
                )));
            }
        },
    };

    u64::try_from(value)
        .ok()
        .filter(|value| *value >= 1)
        .ok_or_else(|| AppError::validation(format!("\"{field}\" must be at least 1")))
}
