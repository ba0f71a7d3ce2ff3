use sqlx::{PgPool, postgres::PgPoolOptions};
use todo_api::{
    error::AppError,
    models::{NewTodo, TodoChange, TodoChanges, TodoFilter},
    repository::{PgTodoRepository, TodoRepository},
};

async fn maybe_pool() -> Option<PgPool> {
    let database_url = std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()?;

    PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .ok()
}

fn new_todo(title: &str, is_done: bool) -> NewTodo {
    NewTodo {
        title: title.to_string(),
        description: String::new(),
        is_done,
    }
}

#[tokio::test]
async fn postgres_repository_crud_flow() {
    let Some(pool) = maybe_pool().await else {
        eprintln!(
            "Skipping postgres_repository_crud_flow: TEST_DATABASE_URL/DATABASE_URL is not set or database is unreachable."
        );
        return;
    };

    let repo = PgTodoRepository::new(pool.clone());
    repo.init().await.expect("migrations should run");
    repo.init().await.expect("migrations should be idempotent");

    sqlx::query("TRUNCATE TABLE todo_items RESTART IDENTITY")
        .execute(&pool)
        .await
        .expect("truncate should succeed");

    let first = repo
        .insert(new_todo("pg first", false))
        .await
        .expect("insert should succeed");
    let second = repo
        .insert(new_todo("pg second", true))
        .await
        .expect("insert should succeed");

    let duplicate = repo.insert(new_todo("pg first", false)).await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    assert_eq!(repo.count(TodoFilter::default()).await.expect("count"), 2);
    let done = TodoFilter {
        is_done: Some(true),
    };
    assert_eq!(repo.count(done).await.expect("count"), 1);

    let page = repo
        .find_page(TodoFilter::default(), 10, 0)
        .await
        .expect("page should load");
    let ids: Vec<_> = page.iter().map(|item| item.id).collect();
    assert_eq!(ids, [second.id, first.id]);

    let mut changes = TodoChanges::default();
    changes.push(TodoChange::Description("from postgres".to_string()));
    changes.push(TodoChange::IsDone(true));
    assert_eq!(
        repo.update_fields(first.id, &changes)
            .await
            .expect("update should succeed"),
        1
    );

    let updated = repo
        .find_by_id(first.id)
        .await
        .expect("lookup should succeed")
        .expect("todo should exist");
    assert_eq!(updated.title, "pg first");
    assert_eq!(updated.description, "from postgres");
    assert!(updated.is_done);
    assert!(updated.updated_at >= updated.created_at);

    let mut rename = TodoChanges::default();
    rename.push(TodoChange::Title("pg second".to_string()));
    let conflict = repo.update_fields(first.id, &rename).await;
    assert!(matches!(conflict, Err(AppError::Conflict(_))));

    assert_eq!(repo.delete_by_id(first.id).await.expect("delete"), 1);
    assert_eq!(repo.delete_by_id(first.id).await.expect("delete"), 0);
    assert!(
        repo.find_by_id(first.id)
            .await
            .expect("lookup should succeed")
            .is_none()
    );
}
