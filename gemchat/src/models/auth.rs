use serde::{Deserialize, Serialize};

/// Persisted `"auth-storage"` blob.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSnapshot {
    #[serde(default)]
    pub is_authenticated: bool,
    #[serde(default)]
    pub phone_number: Option<String>,
}
