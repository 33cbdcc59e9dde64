#![cfg(feature = "sqlite")]

use sql_fluent::prelude::*;
use sql_fluent::test_utils::RecordingSession;
use tempfile::tempdir;

fn unique_db_path(prefix: &str) -> String {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join(format!("{prefix}.db"));
    std::mem::forget(dir);
    path.to_string_lossy().into_owned()
}

async fn movie_pool(prefix: &str) -> Result<ConfigAndPool, SqlFluentError> {
    let pool = ConfigAndPool::sqlite_builder(unique_db_path(prefix))
        .build()
        .await?;
    sql("CREATE TABLE movie (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            directed_by TEXT
        )")
    .execute_with(&pool)
    .await?;
    Ok(pool)
}

async fn movie_count(pool: &ConfigAndPool) -> Result<i64, SqlFluentError> {
    let count = sql("SELECT COUNT(*) FROM movie")
        .query_for_one(|row| row.try_get_i64(0))
        .execute_with(pool)
        .await?;
    Ok(count.unwrap_or_default())
}

#[tokio::test]
async fn prepared_batch_reports_one_count_per_row() -> Result<(), SqlFluentError> {
    let pool = movie_pool("prepared_batch").await?;

    let counts = prepare_sql("INSERT INTO movie(title, directed_by) VALUES (?, ?)")
        .param("Memento")
        .param("Nolan")
        .add_batch()
        .param("Inception")
        .param("Nolan")
        .add_batch()?
        .param("Tenet")
        .param("Nolan")
        .execute_batch(&pool)
        .await?;
    assert_eq!(counts, vec![1, 1, 1]);

    let titles = sql("SELECT title FROM movie ORDER BY id")
        .query_for_list(|row| row.try_get_string(0))
        .execute_with(&pool)
        .await?;
    assert_eq!(titles, vec!["Memento", "Inception", "Tenet"]);
    Ok(())
}

#[tokio::test]
async fn template_only_batch_reports_one_count() -> Result<(), SqlFluentError> {
    let pool = movie_pool("template_only").await?;

    let counts = prepare_sql("INSERT INTO movie(title, directed_by) VALUES (?, ?)")
        .param("Memento")
        .param("Nolan")
        .add_batch()
        .execute_batch(&pool)
        .await?;
    assert_eq!(counts, vec![1]);
    assert_eq!(movie_count(&pool).await?, 1);
    Ok(())
}

#[tokio::test]
async fn trailing_add_batch_does_not_send_an_empty_row() -> Result<(), SqlFluentError> {
    let pool = movie_pool("trailing_add").await?;

    let counts = prepare_sql("INSERT INTO movie(title) VALUES (?)")
        .param("Memento")
        .add_batch()
        .param("Inception")
        .add_batch()?
        .execute_batch(&pool)
        .await?;
    assert_eq!(counts, vec![1, 1]);
    assert_eq!(movie_count(&pool).await?, 2);
    Ok(())
}

#[tokio::test]
async fn mismatched_row_never_reaches_the_database() -> Result<(), SqlFluentError> {
    let pool = movie_pool("mismatch").await?;

    let err = prepare_sql("INSERT INTO movie(title, directed_by) VALUES (?, ?)")
        .param("Memento")
        .param("Nolan")
        .add_batch()
        .param("Inception")
        .add_batch()
        .unwrap_err();
    assert!(err.is_batch_mismatch());

    let err = prepare_sql("INSERT INTO movie(title, directed_by) VALUES (?, ?)")
        .param("Memento")
        .param("Nolan")
        .add_batch()
        .param("Inception")
        .param("Nolan")
        .param("extra")
        .execute_batch(&pool)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SqlFluentError::BatchMismatch {
            expected: 2,
            actual: 3
        }
    ));
    assert_eq!(movie_count(&pool).await?, 0);
    Ok(())
}

#[tokio::test]
async fn mismatched_batch_makes_no_round_trip() {
    let session = RecordingSession::new();

    let err = prepare_sql("INSERT INTO movie(title, directed_by) VALUES (?, ?)")
        .param("Memento")
        .param("Nolan")
        .add_batch()
        .param("Inception")
        .execute_batch(&session)
        .await
        .unwrap_err();

    assert!(err.is_batch_mismatch());
    assert_eq!(session.round_trips(), 0);
    assert!(session.calls().is_empty());
}

#[tokio::test]
async fn failing_row_rolls_back_the_whole_batch() -> Result<(), SqlFluentError> {
    let pool = movie_pool("atomic_batch").await?;

    let err = prepare_sql("INSERT INTO movie(title, directed_by) VALUES (?, ?)")
        .param("Memento")
        .param("Nolan")
        .add_batch()
        .param_null()
        .param("Nolan")
        .execute_batch(&pool)
        .await
        .unwrap_err();
    assert!(matches!(err, SqlFluentError::SqliteError(_)));
    assert_eq!(movie_count(&pool).await?, 0);
    Ok(())
}

#[tokio::test]
async fn statement_batch_runs_each_statement_in_order() -> Result<(), SqlFluentError> {
    let pool = movie_pool("statement_batch").await?;

    let counts = sql("INSERT INTO movie(title) VALUES ('Memento')")
        .add_batch("INSERT INTO movie(title) VALUES ('Inception')")
        .add_batch("UPDATE movie SET directed_by = 'Nolan'")
        .execute_batch(&pool)
        .await?;
    assert_eq!(counts, vec![1, 1, 2]);

    let directed = sql("SELECT 1 FROM movie WHERE directed_by IS NULL")
        .query_for_exists()
        .execute_with(&pool)
        .await?;
    assert!(!directed);
    Ok(())
}

#[tokio::test]
async fn in_only_callable_can_batch() -> Result<(), SqlFluentError> {
    let pool = movie_pool("callable_batch").await?;

    let counts = prepare_call("INSERT INTO movie(title, directed_by) VALUES (?, ?)")
        .param("Memento")
        .param("Nolan")
        .add_batch()
        .param("Dunkirk")
        .param("Nolan")
        .execute_batch(&pool)
        .await?;
    assert_eq!(counts, vec![1, 1]);
    assert_eq!(movie_count(&pool).await?, 2);
    Ok(())
}
