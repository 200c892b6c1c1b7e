use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::storage::{Storage, load_json, save_json};

pub const CONFIG_KEY: &str = "app-config";

/// Tunables for paging, simulated latency and input limits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    pub page_size: usize,
    pub load_delay_ms: u64,
    pub reply_delay_min_ms: u64,
    pub reply_delay_max_ms: u64,
    pub otp_delay_ms: u64,
    pub search_debounce_ms: u64,
    pub max_image_bytes: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            load_delay_ms: 1000,
            reply_delay_min_ms: 2000,
            reply_delay_max_ms: 3000,
            otp_delay_ms: 2000,
            search_debounce_ms: 300,
            max_image_bytes: 5 * 1024 * 1024,
        }
    }
}

impl AppConfig {
    pub fn load_delay(&self) -> Duration {
        Duration::from_millis(self.load_delay_ms)
    }

    /// Half-open range of reply delays in milliseconds, never empty.
    pub fn reply_delay_range(&self) -> Range<u64> {
        let start = self.reply_delay_min_ms;
        let end = self.reply_delay_max_ms.max(start.saturating_add(1));
        if start >= end {
            return Self::default().reply_delay_range();
        }
        start..end
    }

    pub fn otp_delay(&self) -> Duration {
        Duration::from_millis(self.otp_delay_ms)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

/// Configuration stored as the `"app-config"` blob.
pub struct ConfigManager {
    storage: Arc<dyn Storage>,
}

impl ConfigManager {
    /// Create a new ConfigManager. Does not perform I/O.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Load the persisted config, falling back to defaults when none was saved.
    pub async fn load(&self) -> Result<AppConfig, anyhow::Error> {
        let config = load_json::<AppConfig>(self.storage.as_ref(), CONFIG_KEY)
            .await?
            .unwrap_or_default();
        if config.page_size == 0 {
            tracing::warn!("Ignoring zero page size");
            return Ok(AppConfig {
                page_size: AppConfig::default().page_size,
                ..config
            });
        }
        Ok(config)
    }

    pub async fn save(&self, config: &AppConfig) -> Result<(), anyhow::Error> {
        save_json(self.storage.as_ref(), CONFIG_KEY, config).await
    }
}
