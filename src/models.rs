use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;

pub type TodoId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct TodoItem {
    pub id: TodoId,
    pub title: String,
    pub description: String,
    pub is_done: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Response projection for single-item reads and updates. Timestamps are
/// deliberately left out of this shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoView {
    pub id: TodoId,
    pub title: String,
    pub description: String,
    pub is_done: bool,
}

impl From<TodoItem> for TodoView {
    fn from(item: TodoItem) -> Self {
        Self {
            id: item.id,
            title: item.title,
            description: item.description,
            is_done: item.is_done,
        }
    }
}

/// Create payload. `description` and `is_done` may be omitted or sent as `null`;
/// both mean the column default.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTodoRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_done: Option<bool>,
}

/// A field of a PATCH payload: not sent, sent as `null`, or sent with a value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Patch<T> {
    #[default]
    Absent,
    Null,
    Value(T),
}

impl<T> Patch<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

impl<'de, T> Deserialize<'de> for Patch<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Absent fields never reach here; `#[serde(default)]` yields `Patch::Absent`.
        Option::<T>::deserialize(deserializer).map(|value| value.map_or(Self::Null, Self::Value))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTodoRequest {
    #[serde(default)]
    pub title: Patch<String>,
    #[serde(default)]
    pub description: Patch<String>,
    #[serde(default)]
    pub is_done: Patch<bool>,
}

impl UpdateTodoRequest {
    pub fn has_changes(&self) -> bool {
        !self.title.is_absent() || !self.description.is_absent() || !self.is_done.is_absent()
    }
}

/// Validated insert payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTodo {
    pub title: String,
    pub description: String,
    pub is_done: bool,
}

/// A single validated column assignment of a partial update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TodoChange {
    Title(String),
    Description(String),
    IsDone(bool),
}

impl TodoChange {
    pub fn column(&self) -> &'static str {
        match self {
            Self::Title(_) => "title",
            Self::Description(_) => "description",
            Self::IsDone(_) => "is_done",
        }
    }

    pub fn apply(&self, item: &mut TodoItem) {
        match self {
            Self::Title(title) => item.title.clone_from(title),
            Self::Description(description) => item.description.clone_from(description),
            Self::IsDone(is_done) => item.is_done = *is_done,
        }
    }
}

/// Only the fields the caller actually supplied; never empty once validated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoChanges(Vec<TodoChange>);

impl TodoChanges {
    pub fn push(&mut self, change: TodoChange) {
        self.0.push(change);
    }

    pub fn iter(&self) -> impl Iterator<Item = &TodoChange> {
        self.0.iter()
    }
}

/// Raw list query string. Every value stays a string so that the validator can
/// tell "missing" from "unparsable" from "out of range".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListTodosQuery {
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub is_done: Option<String>,
}

impl ListTodosQuery {
    /// Builds the query from decoded `key=value` pairs. A repeated key keeps its
    /// first value and unknown keys are ignored.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut query = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "page" => &mut query.page,
                "page_size" => &mut query.page_size,
                "is_done" => &mut query.is_done,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        query
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TodoFilter {
    pub is_done: Option<bool>,
}

impl TodoFilter {
    pub fn matches(&self, item: &TodoItem) -> bool {
        self.is_done.is_none_or(|is_done| item.is_done == is_done)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub page_size: u64,
    pub filter: TodoFilter,
}

impl PageRequest {
    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.page_size)
    }

    pub fn page_count(&self, total: u64) -> u64 {
        total.div_ceil(self.page_size)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TodoListResponse {
    pub count: u64,
    pub page: u64,
    pub page_size: u64,
    pub page_count: u64,
    pub items: Vec<TodoItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
}
