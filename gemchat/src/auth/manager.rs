use std::sync::Arc;

use tokio::sync::Mutex as TokioMutex;

use crate::models::AuthSnapshot;
use crate::storage::{Storage, load_json, save_json};

pub const AUTH_KEY: &str = "auth-storage";

/// Login state. `is_authenticated` is the only gate the dashboard and chat
/// views check.
pub struct AuthManager {
    storage: Arc<dyn Storage>,
    state: TokioMutex<AuthSnapshot>,
}

impl AuthManager {
    pub async fn open(storage: Arc<dyn Storage>) -> Result<Self, anyhow::Error> {
        let state = load_json::<AuthSnapshot>(storage.as_ref(), AUTH_KEY)
            .await?
            .unwrap_or_default();
        Ok(Self {
            storage,
            state: TokioMutex::new(state),
        })
    }

    pub async fn login(&self, phone_number: impl Into<String>) -> Result<(), anyhow::Error> {
        let phone_number = phone_number.into();
        tracing::info!(%phone_number, "Logged in");
        self.replace(AuthSnapshot {
            is_authenticated: true,
            phone_number: Some(phone_number),
        })
        .await
    }

    pub async fn logout(&self) -> Result<(), anyhow::Error> {
        tracing::info!("Logged out");
        self.replace(AuthSnapshot::default()).await
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.lock().await.is_authenticated
    }

    pub async fn phone_number(&self) -> Option<String> {
        self.state.lock().await.phone_number.clone()
    }

    pub async fn snapshot(&self) -> AuthSnapshot {
        self.state.lock().await.clone()
    }

    async fn replace(&self, snapshot: AuthSnapshot) -> Result<(), anyhow::Error> {
        let mut state = self.state.lock().await;
        *state = snapshot;
        save_json(self.storage.as_ref(), AUTH_KEY, &*state).await
    }
}
