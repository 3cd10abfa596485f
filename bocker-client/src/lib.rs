//! Bocker Docker Hub Client
//!
//! A small, type-safe HTTP client for the Docker Hub API, used to list the
//! backups (image tags) published to a repository.
//!
//! # Example
//!
//! ```no_run
//! use bocker_client::{BackupCatalog, HubClient};
//! use bocker_core::domain::credentials::RegistryCredentials;
//!
//! # async fn example() -> bocker_client::Result<()> {
//! let client = HubClient::new("https://hub.docker.com");
//! let credentials = RegistryCredentials::new("bueti", "dckr_pat_...");
//!
//! for tag in client.list_backups(&credentials, "bueti", "shop-backups").await? {
//!     println!("{} {:.2} MiB", tag.name, tag.size_mib());
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
mod tags;

pub use error::{ClientError, Result};
pub use tags::{BackupCatalog, ORGANISATION_TOKEN_PREFIX};

use reqwest::Client;
use serde::de::DeserializeOwned;

/// Default Docker Hub API host
pub const DEFAULT_HUB_URL: &str = "https://hub.docker.com";

/// HTTP client for the Docker Hub API
#[derive(Debug, Clone)]
pub struct HubClient {
    /// Base URL of the hub (e.g., "https://hub.docker.com")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl HubClient {
    /// Create a new hub client
    ///
    /// # Example
    /// ```
    /// use bocker_client::HubClient;
    ///
    /// let client = HubClient::new("https://hub.docker.com");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new hub client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the hub
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Check the status code and deserialize the JSON body
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = HubClient::new(DEFAULT_HUB_URL);
        assert_eq!(client.base_url(), "https://hub.docker.com");
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = HubClient::new("http://localhost:5000/");
        assert_eq!(client.base_url(), "http://localhost:5000");
    }
}
