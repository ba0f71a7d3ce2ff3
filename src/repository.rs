use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tokio::sync::RwLock;

use crate::{
    error::{AppError, AppResult},
    models::{NewTodo, TodoChange, TodoChanges, TodoFilter, TodoId, TodoItem},
};

const TITLE_CONFLICT_MESSAGE: &str = "todo with this title already exists";

const SELECT_TODO_SQL: &str =
    "SELECT id, title, description, is_done, created_at, updated_at FROM todo_items";

/// Storage contract consumed by the handlers.
///
/// Implementations classify their own failures: a uniqueness violation comes
/// back as [`AppError::Conflict`], everything else as a 500-class error.
/// "Not found" is never an error here; lookups return `None` and writes
/// return the number of affected rows.
#[async_trait]
pub trait TodoRepository: Send + Sync {
    async fn init(&self) -> AppResult<()>;
    async fn find_by_id(&self, id: TodoId) -> AppResult<Option<TodoItem>>;
    async fn count(&self, filter: TodoFilter) -> AppResult<u64>;
    /// Newest first.
    async fn find_page(
        &self,
        filter: TodoFilter,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<TodoItem>>;
    async fn insert(&self, todo: NewTodo) -> AppResult<TodoItem>;
    async fn update_fields(&self, id: TodoId, changes: &TodoChanges) -> AppResult<u64>;
    async fn delete_by_id(&self, id: TodoId) -> AppResult<u64>;
}

#[derive(Clone)]
pub struct PgTodoRepository {
    pool: PgPool,
}

impl PgTodoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TodoRepository for PgTodoRepository {
    async fn init(&self) -> AppResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn find_by_id(&self, id: TodoId) -> AppResult<Option<TodoItem>> {
        let todo = sqlx::query_as::<_, TodoItem>(
            r#"
            SELECT id, title, description, is_done, created_at, updated_at
            FROM todo_items
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(todo)
    }

    async fn count(&self, filter: TodoFilter) -> AppResult<u64> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM todo_items");
        push_filter(&mut builder, filter);

        let total = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(total).unwrap_or(0))
    }

    async fn find_page(
        &self,
        filter: TodoFilter,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<TodoItem>> {
        let mut builder = QueryBuilder::<Postgres>::new(SELECT_TODO_SQL);
        push_filter(&mut builder, filter);

        builder
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .push(" OFFSET ")
            .push_bind(i64::try_from(offset).unwrap_or(i64::MAX));

        let items = builder
            .build_query_as::<TodoItem>()
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    async fn insert(&self, todo: NewTodo) -> AppResult<TodoItem> {
        sqlx::query_as::<_, TodoItem>(
            r#"
            INSERT INTO todo_items (title, description, is_done)
            VALUES ($1, $2, $3)
            RETURNING id, title, description, is_done, created_at, updated_at
            "#,
        )
        .bind(todo.title)
        .bind(todo.description)
        .bind(todo.is_done)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)
    }

    async fn update_fields(&self, id: TodoId, changes: &TodoChanges) -> AppResult<u64> {
        let mut builder = QueryBuilder::<Postgres>::new("UPDATE todo_items SET ");

        for change in changes.iter() {
            builder.push(change.column()).push(" = ");
            match change {
                TodoChange::Title(title) => builder.push_bind(title.clone()),
                TodoChange::Description(description) => builder.push_bind(description.clone()),
                TodoChange::IsDone(is_done) => builder.push_bind(*is_done),
            };
            builder.push(", ");
        }

        builder.push("updated_at = NOW() WHERE id = ").push_bind(id);

        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(map_write_error)?;

        Ok(result.rows_affected())
    }

    async fn delete_by_id(&self, id: TodoId) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM todo_items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: TodoFilter) {
    if let Some(is_done) = filter.is_done {
        builder.push(" WHERE is_done = ").push_bind(is_done);
    }
}

fn map_write_error(error: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_error) = &error
        && db_error.code().as_deref() == Some("23505")
    {
        return AppError::conflict(TITLE_CONFLICT_MESSAGE);
    }
    AppError::Database(error)
}

#[derive(Debug, Default)]
struct MemoryTable {
    rows: BTreeMap<TodoId, TodoItem>,
    last_id: TodoId,
}

impl MemoryTable {
    fn title_taken(&self, title: &str, except: Option<TodoId>) -> bool {
        self.rows
            .values()
            .any(|row| row.title == title && Some(row.id) != except)
    }
}

/// Process-local store with the same observable contract as the Postgres one,
/// including the unique title constraint.
#[derive(Debug, Default)]
pub struct InMemoryTodoRepository {
    table: RwLock<MemoryTable>,
}

impl InMemoryTodoRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TodoRepository for InMemoryTodoRepository {
    async fn init(&self) -> AppResult<()> {
        Ok(())
    }

    async fn find_by_id(&self, id: TodoId) -> AppResult<Option<TodoItem>> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn count(&self, filter: TodoFilter) -> AppResult<u64> {
        let table = self.table.read().await;
        let total = table.rows.values().filter(|row| filter.matches(row)).count();
        Ok(total as u64)
    }

    async fn find_page(
        &self,
        filter: TodoFilter,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<TodoItem>> {
        let table = self.table.read().await;

        let mut rows = table
            .rows
            .values()
            .filter(|row| filter.matches(row))
            .cloned()
            .collect::<Vec<_>>();
        rows.sort_by(|left, right| {
            right
                .created_at
                .cmp(&left.created_at)
                .then_with(|| right.id.cmp(&left.id))
        });

        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);

        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }

    async fn insert(&self, todo: NewTodo) -> AppResult<TodoItem> {
        let mut table = self.table.write().await;

        if table.title_taken(&todo.title, None) {
            return Err(AppError::conflict(TITLE_CONFLICT_MESSAGE));
        }

        table.last_id += 1;
        let now = Utc::now();
        let item = TodoItem {
            id: table.last_id,
            title: todo.title,
            description: todo.description,
            is_done: todo.is_done,
            created_at: now,
            updated_at: now,
        };

        table.rows.insert(item.id, item.clone());
        Ok(item)
    }

    async fn update_fields(&self, id: TodoId, changes: &TodoChanges) -> AppResult<u64> {
        let mut table = self.table.write().await;

        if !table.rows.contains_key(&id) {
            return Ok(0);
        }

        for change in changes.iter() {
            if let TodoChange::Title(title) = change
                && table.title_taken(title, Some(id))
            {
                return Err(AppError::conflict(TITLE_CONFLICT_MESSAGE));
            }
        }

        let Some(row) = table.rows.get_mut(&id) else {
            return Ok(0);
        };
        for change in changes.iter() {
            change.apply(row);
        }
        row.updated_at = Utc::now();

        Ok(1)
    }

    async fn delete_by_id(&self, id: TodoId) -> AppResult<u64> {
        let removed = self.table.write().await.rows.remove(&id);
        Ok(u64::from(removed.is_some()))
    }
}
