//! Login and tag listing endpoints

use async_trait::async_trait;
use bocker_core::domain::credentials::RegistryCredentials;
use bocker_core::dto::hub::{Login, LoginToken, TagPage, TagSummary};
use reqwest::StatusCode;
use tracing::debug;

use crate::HubClient;
use crate::error::{ClientError, Result};

/// Organisation access tokens cannot call the user login endpoint
pub const ORGANISATION_TOKEN_PREFIX: &str = "dckr_oat";

/// Source of published backups
#[async_trait]
pub trait BackupCatalog: Send + Sync {
    /// Lists every tag of `namespace/repository`, newest pages first as served
    async fn list_backups(
        &self,
        credentials: &RegistryCredentials,
        namespace: &str,
        repository: &str,
    ) -> Result<Vec<TagSummary>>;
}

impl HubClient {
    // =============================================================================
    // Authentication
    // =============================================================================

    /// Exchange a username and password (or personal access token) for a JWT
    ///
    /// # Errors
    /// - `InvalidRequest` for organisation access tokens, rejected before any request
    /// - `Unauthorized` when the hub answers 401
    pub async fn login(&self, credentials: &RegistryCredentials) -> Result<String> {
        if credentials.password.starts_with(ORGANISATION_TOKEN_PREFIX) {
            return Err(ClientError::InvalidRequest(
                "cannot use a Docker organisation access token to list repositories".to_string(),
            ));
        }
        if !credentials.is_complete() {
            return Err(ClientError::InvalidRequest(
                "Docker Hub username and password are required".to_string(),
            ));
        }

        let url = format!("{}/v2/users/login", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&Login {
                username: credentials.username.clone(),
                password: credentials.password.clone(),
            })
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(ClientError::Unauthorized(credentials.username.clone()));
        }

        let token: LoginToken = self.handle_response(response).await?;
        Ok(token.token)
    }

    // =============================================================================
    // Tags
    // =============================================================================

    /// Fetch one page of tags
    pub async fn tag_page(&self, token: &str, url: &str) -> Result<TagPage> {
        debug!("Fetching tags from {}", url);
        let response = self.client.get(url).bearer_auth(token).send().await?;
        self.handle_response(response).await
    }

    /// List every tag of a repository, following `next` links
    pub async fn list_tags(
        &self,
        token: &str,
        namespace: &str,
        repository: &str,
    ) -> Result<Vec<TagSummary>> {
        let mut url = Some(format!(
            "{}/v2/namespaces/{}/repositories/{}/tags",
            self.base_url, namespace, repository
        ));
        let mut tags = Vec::new();

        while let Some(current) = url {
            let page = self.tag_page(token, &current).await?;
            tags.extend(page.results);
            url = page.next.filter(|next| !next.is_empty() && *next != current);
        }

        Ok(tags)
    }
}

#[async_trait]
impl BackupCatalog for HubClient {
    async fn list_backups(
        &self,
        credentials: &RegistryCredentials,
        namespace: &str,
        repository: &str,
    ) -> Result<Vec<TagSummary>> {
        let token = self.login(credentials).await?;
        self.list_tags(&token, namespace, repository).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// Minimal HTTP/1.1 server answering canned JSON per request path
    struct FakeHub {
        base_url: String,
        requests: Arc<Mutex<Vec<String>>>,
    }

    impl FakeHub {
        /// `routes` receives the server's base URL so bodies can link back to it
        async fn start(
            routes: impl FnOnce(&str) -> Vec<(&'static str, u16, String)>,
        ) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let base_url = format!("http://{}", listener.local_addr().unwrap());
            let routes: HashMap<_, _> = routes(&base_url)
                .into_iter()
                .map(|(path, status, body)| (path.to_string(), (status, body)))
                .collect();
            let requests = Arc::new(Mutex::new(Vec::new()));
            let seen = Arc::clone(&requests);

            tokio::spawn(async move {
                loop {
                    let Ok((stream, _)) = listener.accept().await else {
                        break;
                    };
                    let line = answer(stream, &routes).await;
                    seen.lock().unwrap().push(line);
                }
            });

            Self { base_url, requests }
        }

        fn client(&self) -> HubClient {
            let http = reqwest::Client::builder().no_proxy().build().unwrap();
            HubClient::with_client(&self.base_url, http)
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    async fn answer(mut stream: TcpStream, routes: &HashMap<String, (u16, String)>) -> String {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 4096];
        let header_end = loop {
            let n = stream.read(&mut chunk).await.unwrap();
            buffer.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
            if n == 0 {
                break buffer.len();
            }
        };

        let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
        let content_length = head
            .lines()
            .find_map(|l| {
                let (name, value) = l.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        while buffer.len() < header_end + content_length {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..n]);
        }

        let request_line = head.lines().next().unwrap_or_default().to_string();
        let path = request_line.split_whitespace().nth(1).unwrap_or("/");
        let (status, body) = routes
            .get(path)
            .cloned()
            .unwrap_or((404, "{\"message\":\"not found\"}".to_string()));

        let response = format!(
            "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.ok();
        request_line
    }

    fn tag(id: u64, name: &str) -> String {
        format!(
            r#"{{"id":{id},"name":"{name}","full_size":1048576,"last_updated":"2024-01-01T00:00:00Z","last_updater_username":"bueti"}}"#
        )
    }

    fn credentials() -> RegistryCredentials {
        RegistryCredentials::new("bueti", "dckr_pat_secret")
    }

    #[tokio::test]
    async fn test_organisation_token_is_rejected_without_request() {
        let client = HubClient::new("http://127.0.0.1:9");
        let err = client
            .login(&RegistryCredentials::new("org", "dckr_oat_abcdef"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_lists_backups_across_pages() {
        let hub = FakeHub::start(|base| {
            vec![
                ("/v2/users/login", 200, r#"{"token":"jwt"}"#.to_string()),
                (
                    "/v2/namespaces/bueti/repositories/shop-backups/tags",
                    200,
                    format!(
                        r#"{{"count":2,"next":"{}/page2","previous":null,"results":[{}]}}"#,
                        base,
                        tag(1, "2024-01-01_00-00-00")
                    ),
                ),
                (
                    "/page2",
                    200,
                    format!(
                        r#"{{"count":2,"next":null,"previous":null,"results":[{}]}}"#,
                        tag(2, "2024-01-02_00-00-00")
                    ),
                ),
            ]
        })
        .await;

        let tags = hub
            .client()
            .list_backups(&credentials(), "bueti", "shop-backups")
            .await
            .unwrap();

        let names: Vec<_> = tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["2024-01-01_00-00-00", "2024-01-02_00-00-00"]);
        assert_eq!(tags[0].size_mib(), 1.0);
        assert_eq!(hub.requests()[0], "POST /v2/users/login HTTP/1.1");
    }

    #[tokio::test]
    async fn test_unauthorized_login() {
        let hub = FakeHub::start(|_| {
            vec![(
                "/v2/users/login",
                401,
                r#"{"detail":"Incorrect authentication credentials"}"#.to_string(),
            )]
        })
        .await;

        let err = hub.client().login(&credentials()).await.unwrap_err();
        assert!(matches!(err, ClientError::Unauthorized(ref user) if user == "bueti"));
    }

    #[tokio::test]
    async fn test_missing_repository() {
        let hub =
            FakeHub::start(|_| vec![("/v2/users/login", 200, r#"{"token":"jwt"}"#.to_string())])
                .await;

        let err = hub
            .client()
            .list_backups(&credentials(), "bueti", "missing")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
