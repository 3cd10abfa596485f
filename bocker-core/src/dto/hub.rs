//! Docker Hub DTOs

use serde::{Deserialize, Serialize};

/// Body of `POST /v2/users/login`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Login {
    pub username: String,
    pub password: String,
}

/// Response of `POST /v2/users/login`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginToken {
    pub token: String,
}

/// One page of `GET /v2/namespaces/{ns}/repositories/{repo}/tags`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagPage {
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<TagSummary>,
}

/// A published tag, i.e. one backup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagSummary {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub full_size: u64,
    #[serde(default)]
    pub last_updated: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub last_updater_username: Option<String>,
}

impl TagSummary {
    /// Image size in MiB
    pub fn size_mib(&self) -> f64 {
        self.full_size as f64 / (1u64 << 20) as f64
    }
}
