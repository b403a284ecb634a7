//! Azure Stack authentication
//!
//! The stamp publishes its login endpoint and token audience at
//! `/metadata/endpoints`. Tokens come from the client-credentials grant and are
//! cached until five minutes before they expire.

use super::error::ApiError;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

const METADATA_API_VERSION: &str = "2015-01-01";

/// Refresh tokens this long before they expire
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(5 * 60);

/// Source of bearer tokens for ARM requests
#[async_trait]
pub trait TokenCredential: Send + Sync {
    async fn token(&self) -> Result<String, ApiError>;
}

/// Fixed token, for tests and pre-authenticated callers
pub struct StaticToken(pub String);

#[async_trait]
impl TokenCredential for StaticToken {
    async fn token(&self) -> Result<String, ApiError> {
        Ok(self.0.clone())
    }
}

/// Endpoints published by the stamp
#[derive(Debug, Clone, Deserialize)]
pub struct EnvironmentEndpoints {
    pub authentication: AuthenticationEndpoints,
    #[serde(rename = "graphEndpoint", default)]
    pub graph_endpoint: Option<String>,
    #[serde(rename = "portalEndpoint", default)]
    pub portal_endpoint: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthenticationEndpoints {
    #[serde(rename = "loginEndpoint")]
    pub login_endpoint: String,
    #[serde(default)]
    pub audiences: Vec<String>,
}

impl EnvironmentEndpoints {
    /// ADFS stamps use a fixed path instead of a tenant segment
    pub fn token_url(&self, tenant_id: &str) -> String {
        let login = self.authentication.login_endpoint.trim_end_matches('/');
        if login.to_ascii_lowercase().ends_with("/adfs") {
            format!("{}/oauth2/token", login)
        } else {
            format!("{}/{}/oauth2/token", login, tenant_id)
        }
    }

    pub fn audience(&self) -> Result<&str, ApiError> {
        self.authentication
            .audiences
            .first()
            .map(String::as_str)
            .ok_or_else(|| ApiError::Auth("metadata endpoint returned no token audience".to_string()))
    }
}

pub async fn discover_endpoints(
    http_client: &reqwest::Client,
    arm_endpoint: &str,
) -> Result<EnvironmentEndpoints, ApiError> {
    let url = format!(
        "{}/metadata/endpoints?api-version={}",
        arm_endpoint.trim_end_matches('/'),
        METADATA_API_VERSION
    );
    tracing::debug!("Discovering endpoints from: {}", url);

    let response = http_client.get(&url).send().await?;
    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
        tracing::error!("Endpoint discovery failed: {} {}", status, text);
        return Err(ApiError::InvalidEndpoint(format!(
            "metadata request to {} returned HTTP {}",
            url,
            status.as_u16()
        )));
    }

    serde_json::from_str(&text).map_err(|e| {
        tracing::error!("Failed to parse endpoint metadata: {}, body: {}", e, text);
        ApiError::Parse(format!("Failed to parse endpoint metadata: {}", e))
    })
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default, deserialize_with = "deserialize_seconds")]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: String,
}

/// AAD v1 returns `expires_in` as a string, ADFS as a number
fn deserialize_seconds<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrU64 {
        String(String),
        U64(u64),
    }

    match Option::<StringOrU64>::deserialize(deserializer)? {
        Some(StringOrU64::String(s)) => s.parse::<u64>().map(Some).map_err(serde::de::Error::custom),
        Some(StringOrU64::U64(u)) => Ok(Some(u)),
        None => Ok(None),
    }
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    /// Expiry with the refresh buffer already applied
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Service principal credential using the client-credentials grant
pub struct ClientSecretCredential {
    http_client: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    resource: String,
    token_cache: RwLock<Option<CachedToken>>,
}

impl ClientSecretCredential {
    pub fn new(
        http_client: reqwest::Client,
        token_url: String,
        client_id: String,
        client_secret: String,
        resource: String,
    ) -> Self {
        Self {
            http_client,
            token_url,
            client_id,
            client_secret,
            resource,
            token_cache: RwLock::new(None),
        }
    }

    async fn fetch_token(&self) -> Result<CachedToken, ApiError> {
        tracing::debug!("Requesting token from: {}", self.token_url);

        let response = self
            .http_client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("resource", self.resource.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            let detail = serde_json::from_str::<TokenErrorResponse>(&text)
                .map(|e| format!("{}: {}", e.error, e.error_description))
                .unwrap_or_else(|_| format!("HTTP {}", status.as_u16()));
            return Err(ApiError::Auth(detail));
        }

        let token: TokenResponse = serde_json::from_str(&text)
            .map_err(|e| ApiError::Parse(format!("Failed to parse token response: {}", e)))?;

        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(3600));
        Ok(CachedToken {
            token: token.access_token,
            expires_at: Instant::now() + lifetime.saturating_sub(TOKEN_EXPIRY_BUFFER),
        })
    }
}

#[async_trait]
impl TokenCredential for ClientSecretCredential {
    async fn token(&self) -> Result<String, ApiError> {
        {
            let cache = self.token_cache.read().await;
            if let Some(cached) = cache.as_ref().filter(|c| c.is_valid()) {
                return Ok(cached.token.clone());
            }
        }

        let mut cache = self.token_cache.write().await;
        // another task may have refreshed while we waited for the lock
        if let Some(cached) = cache.as_ref().filter(|c| c.is_valid()) {
            return Ok(cached.token.clone());
        }

        let fresh = self.fetch_token().await?;
        tracing::debug!(
            "New token cached, valid for ~{} minutes",
            fresh.expires_at.saturating_duration_since(Instant::now()).as_secs() / 60
        );
        let token = fresh.token.clone();
        *cache = Some(fresh);
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn metadata_body(login: &str) -> String {
        format!(
            r#"{{
                "galleryEndpoint": "https://adminportal.local.azurestack.external:30015/",
                "graphEndpoint": "https://graph.windows.net/",
                "portalEndpoint": "https://portal.local.azurestack.external/",
                "authentication": {{
                    "loginEndpoint": "{}",
                    "audiences": ["https://management.azurestackci.onmicrosoft.com/abc"]
                }}
            }}"#,
            login
        )
    }

    #[tokio::test]
    async fn discovers_login_endpoint_and_audience() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/metadata/endpoints")
            .match_query(Matcher::UrlEncoded(
                "api-version".into(),
                "2015-01-01".into(),
            ))
            .with_body(metadata_body("https://login.microsoftonline.com/"))
            .create_async()
            .await;

        let endpoints = discover_endpoints(&reqwest::Client::new(), &format!("{}/", server.url()))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(
            endpoints.token_url("tenant-1"),
            "https://login.microsoftonline.com/tenant-1/oauth2/token"
        );
        assert_eq!(
            endpoints.audience().unwrap(),
            "https://management.azurestackci.onmicrosoft.com/abc"
        );
    }

    #[test]
    fn adfs_token_url_has_no_tenant() {
        let endpoints: EnvironmentEndpoints =
            serde_json::from_str(&metadata_body("https://adfs.local.azurestack.external/adfs/"))
                .unwrap();
        assert_eq!(
            endpoints.token_url("adfs"),
            "https://adfs.local.azurestack.external/adfs/oauth2/token"
        );
    }

    #[tokio::test]
    async fn client_secret_credential_caches_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/tenant-1/oauth2/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "client_credentials".into()),
                Matcher::UrlEncoded("client_id".into(), "app".into()),
                Matcher::UrlEncoded("resource".into(), "https://management.example/".into()),
            ]))
            .with_body(r#"{"token_type":"Bearer","expires_in":"3599","access_token":"token-1"}"#)
            .expect(1)
            .create_async()
            .await;

        let credential = ClientSecretCredential::new(
            reqwest::Client::new(),
            format!("{}/tenant-1/oauth2/token", server.url()),
            "app".to_string(),
            "secret".to_string(),
            "https://management.example/".to_string(),
        );

        assert_eq!(credential.token().await.unwrap(), "token-1");
        assert_eq!(credential.token().await.unwrap(), "token-1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_credentials_surface_auth_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/tenant-1/oauth2/token")
            .with_status(401)
            .with_body(r#"{"error":"invalid_client","error_description":"AADSTS7000215: Invalid client secret"}"#)
            .create_async()
            .await;

        let credential = ClientSecretCredential::new(
            reqwest::Client::new(),
            format!("{}/tenant-1/oauth2/token", server.url()),
            "app".to_string(),
            "wrong".to_string(),
            "https://management.example/".to_string(),
        );

        match credential.token().await {
            Err(ApiError::Auth(detail)) => assert!(detail.contains("invalid_client")),
            other => panic!("expected auth error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn expires_in_accepts_numbers() {
        let token: TokenResponse =
            serde_json::from_str(r#"{"access_token":"t","expires_in":3600}"#).unwrap();
        assert_eq!(token.expires_in, Some(3600));
    }
}
