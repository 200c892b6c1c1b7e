use std::path::{Path, PathBuf};

use anyhow::{Context as _, anyhow};
use async_trait::async_trait;
use tokio::sync::Mutex as TokioMutex;
use tokio_sqlite::{Connection, Value};

use super::Storage;

/// SQLite database holding every blob in a single `"blob"` table.
pub struct SqliteStorage {
    path: PathBuf,
    connection: TokioMutex<Connection>,
}

impl SqliteStorage {
    /// Opens (or creates) `data.db` inside `path`.
    pub async fn open(path: &Path) -> Result<Self, anyhow::Error> {
        tokio::fs::create_dir_all(path)
            .await
            .with_context(|| format!("Failed to create data dir {}", path.display()))?;
        let path = path.to_owned();
        let data_path = path.join("data.db");
        let mut connection = Connection::open(&data_path).await?;
        Self::create_tables(&mut connection).await?;
        tracing::debug!(path = %data_path.display(), "Opened storage");
        Ok(Self {
            path,
            connection: TokioMutex::new(connection),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn create_tables(connection: &mut Connection) -> Result<(), anyhow::Error> {
        connection
            .execute(
                "CREATE TABLE IF NOT EXISTS \"blob\" (
                    \"id\" INTEGER PRIMARY KEY AUTOINCREMENT,
                    \"key\" TEXT NOT NULL UNIQUE,
                    \"value\" TEXT NOT NULL
                )",
                Vec::<Value>::new(),
            )
            .await
            .context("Failed to create blob table")?;
        Ok(())
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, anyhow::Error> {
        let mut conn = self.connection.lock().await;
        let row = conn
            .query_row(
                "SELECT \"value\" FROM \"blob\" WHERE \"key\" = ?1 LIMIT 1",
                vec![Value::Text(key.to_string())],
            )
            .await
            .map_err(|e| anyhow!("Failed to query blob '{}': {}", key, e))?;
        match row {
            Some(row) => {
                let mut values = row.into_values();
                match values.pop() {
                    Some(Value::Text(s)) => Ok(Some(s)),
                    Some(other) => Err(anyhow!("Unexpected value type: {:?}", other)),
                    None => Ok(None),
                }
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<(), anyhow::Error> {
        let mut conn = self.connection.lock().await;
        let update_status = conn
            .execute(
                "UPDATE \"blob\" SET \"value\" = ?1 WHERE \"key\" = ?2",
                vec![Value::Text(value.clone()), Value::Text(key.to_string())],
            )
            .await
            .map_err(|e| anyhow!("Failed to update blob '{}': {}", key, e))?;
        if update_status.rows_affected() == 0 {
            conn.execute(
                "INSERT INTO \"blob\" (\"key\", \"value\") VALUES (?1, ?2)",
                vec![Value::Text(key.to_string()), Value::Text(value)],
            )
            .await
            .map_err(|e| anyhow!("Failed to insert blob '{}': {}", key, e))?;
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), anyhow::Error> {
        let mut conn = self.connection.lock().await;
        conn.execute(
            "DELETE FROM \"blob\" WHERE \"key\" = ?1",
            vec![Value::Text(key.to_string())],
        )
        .await
        .map_err(|e| anyhow!("Failed to delete blob '{}': {}", key, e))?;
        Ok(())
    }
}
