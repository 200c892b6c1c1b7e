use anyhow::Context as _;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Durable string blobs addressed by name.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, anyhow::Error>;

    async fn set(&self, key: &str, value: String) -> Result<(), anyhow::Error>;

    async fn remove(&self, key: &str) -> Result<(), anyhow::Error>;
}

/// Loads and decodes a JSON blob, `None` when the key was never written.
pub async fn load_json<T>(storage: &dyn Storage, key: &str) -> Result<Option<T>, anyhow::Error>
where
    T: DeserializeOwned,
{
    let raw = match storage.get(key).await? {
        Some(v) => v,
        None => return Ok(None),
    };
    let value = serde_json::from_str(&raw).with_context(|| format!("Failed to parse '{key}'"))?;
    Ok(Some(value))
}

/// Encodes a value as JSON and replaces the blob stored under `key`.
pub async fn save_json<T>(storage: &dyn Storage, key: &str, value: &T) -> Result<(), anyhow::Error>
where
    T: Serialize + ?Sized,
{
    let raw =
        serde_json::to_string(value).with_context(|| format!("Failed to serialize '{key}'"))?;
    storage.set(key, raw).await
}
