#![cfg(feature = "sqlite")]

use sql_fluent::prelude::*;
use sql_fluent::test_utils::{RecordedCall, RecordingSession, result_set_of};
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

#[tokio::test]
async fn out_param_reads_returned_column() -> Result<(), SqlFluentError> {
    let pool = movie_pool("out_param").await?;

    let id = prepare_call("INSERT INTO movie(title, directed_by) VALUES (?, ?) RETURNING id")
        .param("Tenet")
        .param("Nolan")
        .out_param(SqlType::BigInt)
        .query_out_params(|out| out.get_i64(3))
        .execute_with(&pool)
        .await?;

    let stored = prepare_sql("SELECT id FROM movie WHERE title = ?")
        .param("Tenet")
        .query_for_one(|row| row.try_get_i64(0))
        .execute_with(&pool)
        .await?;
    assert_eq!(stored, Some(id));
    Ok(())
}

#[tokio::test]
async fn inout_param_sends_and_reads_back() -> Result<(), SqlFluentError> {
    let pool = movie_pool("inout_param").await?;
    sql("INSERT INTO movie(title) VALUES ('tenet')")
        .execute_with(&pool)
        .await?;

    let (title, positions) =
        prepare_call("UPDATE movie SET title = upper(?) WHERE id = ? RETURNING title")
            .inout_param(SqlType::Varchar, "tenet")
            .param(1)
            .query_out_params(|out| Ok((out.get_string(1)?, out.positions().collect::<Vec<_>>())))
            .execute_with(&pool)
            .await?;
    assert_eq!(title, "TENET");
    assert_eq!(positions, vec![1]);
    Ok(())
}

#[tokio::test]
async fn outputs_are_converted_to_their_registered_type() -> Result<(), SqlFluentError> {
    let pool = movie_pool("out_types").await?;

    let (label, count) = prepare_call("SELECT ? || ' movies', COUNT(*) FROM movie")
        .inout_param(SqlType::Varchar, "nolan")
        .out_param(SqlType::Varchar)
        .query_out_params(|out| Ok((out.get_string(1)?, out.get_string(2)?)))
        .execute_with(&pool)
        .await?;
    assert_eq!(count, "0");
    assert_eq!(label, "nolan movies");
    Ok(())
}

#[tokio::test]
async fn call_reports_whether_rows_were_produced() -> Result<(), SqlFluentError> {
    let pool = movie_pool("call").await?;

    let produced = prepare_call("INSERT INTO movie(title) VALUES (?) RETURNING id")
        .param("Memento")
        .execute_with(&pool)
        .await?;
    assert!(produced);

    let produced = prepare_call("DELETE FROM movie WHERE id = ?")
        .param(-1)
        .call()
        .execute_with(&pool)
        .await?;
    assert!(!produced);
    Ok(())
}

#[tokio::test]
async fn missing_output_row_is_an_error() -> Result<(), SqlFluentError> {
    let pool = movie_pool("out_missing").await?;

    let err = prepare_call("SELECT id FROM movie WHERE title = ?")
        .param("Interstellar")
        .out_param(SqlType::BigInt)
        .query_out_params(|out| out.get_i64(2))
        .execute_with(&pool)
        .await
        .unwrap_err();
    assert!(matches!(err, SqlFluentError::ExecutionError(_)));
    Ok(())
}

#[tokio::test]
async fn recording_session_sees_one_call() {
    let session = RecordingSession::new().with_result(
        "CALL add_movie(?, ?)",
        result_set_of(&["id"], vec![vec![RowValues::Int(7)]]),
    );

    let id = prepare_call("CALL add_movie(?, ?)")
        .param("Tenet")
        .out_param(SqlType::BigInt)
        .query_out_params(|out| out.get_i64(2))
        .execute_with(&session)
        .await
        .unwrap();

    assert_eq!(id, 7);
    assert_eq!(
        session.calls(),
        vec![RecordedCall::Call("CALL add_movie(?, ?)".into())]
    );
}
