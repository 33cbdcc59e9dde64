#![cfg(feature = "sqlite")]

use sql_fluent::prelude::*;
use tempfile::tempdir;

fn unique_db_path(prefix: &str) -> String {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join(format!("{prefix}.db"));
    std::mem::forget(dir);
    path.to_string_lossy().into_owned()
}

#[test]
fn pool_from_json_config() -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    let json = serde_json::json!({
        "type": "sqlite",
        "db_path": unique_db_path("from_config"),
        "pool_size": 2,
    });
    let config: DatabaseConfig = serde_json::from_value(json)?;
    assert_eq!(config.database_type(), DatabaseType::Sqlite);

    rt.block_on(async {
        let pool = ConfigAndPool::from_config(config).await?;
        assert_eq!(pool.db_type, DatabaseType::Sqlite);

        sql("CREATE TABLE director (id INTEGER PRIMARY KEY, name TEXT NOT NULL)")
            .execute_with(&pool)
            .await?;
        let id = prepare_sql("INSERT INTO director(name) VALUES (?)")
            .param("Nolan")
            .query_generated_keys(|row| row.try_get_i64(0))
            .execute_with(&pool)
            .await?;
        assert_eq!(id, Some(1));
        Ok::<(), SqlFluentError>(())
    })?;
    Ok(())
}

#[test]
fn memory_database_uses_one_connection() {
    let opts = SqliteOptions::new(":memory:".to_string()).with_pool_size(8);
    assert_eq!(opts.effective_pool_size(), 1);
}
