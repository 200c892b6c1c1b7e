use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::Storage;

/// Process-local storage, lost on exit.
#[derive(Default)]
pub struct MemoryStorage {
    blobs: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, anyhow::Error> {
        Ok(self.blobs.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), anyhow::Error> {
        self.blobs.lock().unwrap().insert(key.to_owned(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), anyhow::Error> {
        self.blobs.lock().unwrap().remove(key);
        Ok(())
    }
}
