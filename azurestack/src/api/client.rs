use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tfplug::Context;

use super::auth::{discover_endpoints, ClientSecretCredential, TokenCredential};
use super::common::{ApiQueryParams, ArmErrorResponse};
use super::error::ApiError;
use super::poller::PollTarget;
use super::pool::{ConnectionPoolConfig, ConnectionPoolManager, ConnectionStats};

/// Azure Resource Manager client for one subscription on one stamp
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: String,
    subscription_id: String,
    credential: Arc<dyn TokenCredential>,
    retry_config: RetryConfig,
    pool_manager: ConnectionPoolManager,
}

#[derive(Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub timeout_seconds: u64,
    /// Delay between long-running operation polls when the service sends no Retry-After
    pub poll_interval_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
            timeout_seconds: 60,
            poll_interval_ms: 10000,
        }
    }
}

/// Credentials and endpoint for [`Client::connect`]
pub struct ConnectSettings<'a> {
    pub arm_endpoint: &'a str,
    pub subscription_id: &'a str,
    pub tenant_id: &'a str,
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub insecure: bool,
}

impl Client {
    /// Discover the stamp's login endpoint and build a client-secret authenticated client
    pub async fn connect(settings: ConnectSettings<'_>) -> Result<Self, ApiError> {
        let retry_config = RetryConfig::default();
        let pool_manager = Self::pool_manager(&retry_config);
        let http_client = pool_manager.build_client(settings.insecure)?;

        let endpoints = discover_endpoints(&http_client, settings.arm_endpoint).await?;
        let credential = ClientSecretCredential::new(
            http_client.clone(),
            endpoints.token_url(settings.tenant_id),
            settings.client_id.to_string(),
            settings.client_secret.to_string(),
            endpoints.audience()?.to_string(),
        );

        Ok(Self::from_parts(
            http_client,
            pool_manager,
            settings.arm_endpoint,
            settings.subscription_id,
            Arc::new(credential),
            retry_config,
        ))
    }

    /// Build a client around an existing credential
    pub fn with_credential(
        endpoint: &str,
        subscription_id: &str,
        credential: Arc<dyn TokenCredential>,
        insecure: bool,
        retry_config: RetryConfig,
    ) -> Result<Self, ApiError> {
        let pool_manager = Self::pool_manager(&retry_config);
        let http_client = pool_manager.build_client(insecure)?;
        Ok(Self::from_parts(
            http_client,
            pool_manager,
            endpoint,
            subscription_id,
            credential,
            retry_config,
        ))
    }

    fn pool_manager(retry_config: &RetryConfig) -> ConnectionPoolManager {
        ConnectionPoolManager::new(ConnectionPoolConfig {
            request_timeout: Duration::from_secs(retry_config.timeout_seconds),
            ..Default::default()
        })
    }

    fn from_parts(
        http_client: reqwest::Client,
        pool_manager: ConnectionPoolManager,
        endpoint: &str,
        subscription_id: &str,
        credential: Arc<dyn TokenCredential>,
        retry_config: RetryConfig,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                http_client,
                base_url: endpoint.trim_end_matches('/').to_string(),
                subscription_id: subscription_id.to_string(),
                credential,
                retry_config,
                pool_manager,
            }),
        }
    }

    pub fn subscription_id(&self) -> &str {
        &self.inner.subscription_id
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Shared HTTP client, reused by the blob data-plane client
    pub fn http_client(&self) -> &reqwest::Client {
        &self.inner.http_client
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.inner.retry_config.poll_interval_ms)
    }

    pub async fn get_connection_stats(&self) -> ConnectionStats {
        self.inner.pool_manager.get_stats().await
    }

    /// Resource groups and template deployments
    pub fn resources(&self) -> super::resources::ResourcesApi<'_> {
        super::resources::ResourcesApi::new(self)
    }

    pub fn dns(&self) -> super::dns::DnsApi<'_> {
        super::dns::DnsApi::new(self)
    }

    pub fn network(&self) -> super::network::NetworkApi<'_> {
        super::network::NetworkApi::new(self)
    }

    pub fn compute(&self) -> super::compute::ComputeApi<'_> {
        super::compute::ComputeApi::new(self)
    }

    pub fn storage(&self) -> super::storage::StorageApi<'_> {
        super::storage::StorageApi::new(self)
    }

    fn url(&self, path: &str, api_version: &str) -> String {
        format!(
            "{}{}{}",
            self.inner.base_url,
            path,
            ApiQueryParams::api_version(api_version).to_query_string()
        )
    }

    /// GET a resource; a missing resource is `ApiError::Api { status: 404, .. }`
    pub async fn get<T: DeserializeOwned>(
        &self,
        ctx: &Context,
        path: &str,
        api_version: &str,
    ) -> Result<T, ApiError> {
        let url = self.url(path, api_version);
        let response = self.send(ctx, Method::GET, &url, None::<&()>).await?;
        self.parse_success_response(response).await
    }

    /// PUT for synchronous resource providers (resource groups, DNS record sets)
    pub async fn put<B: Serialize + ?Sized + Sync, T: DeserializeOwned>(
        &self,
        ctx: &Context,
        path: &str,
        api_version: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(path, api_version);
        let response = self.send(ctx, Method::PUT, &url, Some(body)).await?;
        self.parse_success_response(response).await
    }

    /// PUT and wait for the long-running operation it starts to finish
    pub async fn put_and_wait<B: Serialize + ?Sized + Sync>(
        &self,
        ctx: &Context,
        path: &str,
        api_version: &str,
        body: &B,
    ) -> Result<(), ApiError> {
        let url = self.url(path, api_version);
        let response = self.send(ctx, Method::PUT, &url, Some(body)).await?;
        self.wait_for_response(ctx, response).await
    }

    pub async fn patch<B: Serialize + ?Sized + Sync, T: DeserializeOwned>(
        &self,
        ctx: &Context,
        path: &str,
        api_version: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(path, api_version);
        let response = self.send(ctx, Method::PATCH, &url, Some(body)).await?;
        self.parse_success_response(response).await
    }

    pub async fn post<B: Serialize + ?Sized + Sync, T: DeserializeOwned>(
        &self,
        ctx: &Context,
        path: &str,
        api_version: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError> {
        let url = self.url(path, api_version);
        let response = self.send(ctx, Method::POST, &url, body).await?;
        self.parse_success_response(response).await
    }

    /// DELETE and wait for completion. A 404 comes back as an error so callers
    /// decide whether "already gone" counts as success.
    pub async fn delete_and_wait(
        &self,
        ctx: &Context,
        path: &str,
        api_version: &str,
    ) -> Result<(), ApiError> {
        let url = self.url(path, api_version);
        let response = self.send(ctx, Method::DELETE, &url, None::<&()>).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(());
        }
        self.wait_for_response(ctx, response).await
    }

    /// GET an absolute URL such as an operation status link
    pub(crate) async fn get_absolute(
        &self,
        ctx: &Context,
        url: &str,
    ) -> Result<reqwest::Response, ApiError> {
        self.send(ctx, Method::GET, url, None::<&()>).await
    }

    async fn wait_for_response(
        &self,
        ctx: &Context,
        response: reqwest::Response,
    ) -> Result<(), ApiError> {
        match PollTarget::from_response(&response) {
            Some((target, delay)) => self.wait_for_completion(ctx, target, delay).await,
            None => Ok(()),
        }
    }

    async fn send<B: Serialize + ?Sized + Sync>(
        &self,
        ctx: &Context,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<reqwest::Response, ApiError> {
        tracing::debug!("{} request to: {}", method, url);
        ctx.run(self.execute_with_retry(
            || {
                let request = self.inner.http_client.request(method.clone(), url);
                match body {
                    Some(body) => request.json(body),
                    None => request,
                }
            },
            url,
        ))
        .await?
    }

    /// Execute request with retry logic
    async fn execute_with_retry<F>(
        &self,
        request_fn: F,
        path: &str,
    ) -> Result<reqwest::Response, ApiError>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let token = self.inner.credential.token().await?;
        let mut attempt = 0;
        let mut last_error = None;

        while attempt <= self.inner.retry_config.max_retries {
            if attempt > 0 {
                let backoff = std::cmp::min(
                    self.inner.retry_config.initial_backoff_ms * (2_u64.pow(attempt - 1)),
                    self.inner.retry_config.max_backoff_ms,
                );
                tracing::warn!(
                    "Retrying request to {} after {}ms (attempt {})",
                    path,
                    backoff,
                    attempt
                );
                self.inner.pool_manager.record_retry().await;
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            match request_fn().bearer_auth(&token).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        self.inner.pool_manager.record_request(true).await;
                        return Ok(response);
                    }

                    self.inner.pool_manager.record_request(false).await;

                    if status == StatusCode::UNAUTHORIZED {
                        let text = response.text().await.unwrap_or_default();
                        return Err(ApiError::Auth(text));
                    }

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        last_error = Some(ApiError::RateLimited);
                    } else if status.is_server_error() {
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        return Err(self.handle_error_response(response).await);
                    }
                }
                Err(e) => {
                    self.inner.pool_manager.record_request(false).await;

                    if e.is_timeout() {
                        last_error =
                            Some(ApiError::Timeout(self.inner.retry_config.timeout_seconds));
                    } else if e.is_connect() {
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        return Err(ApiError::Request(e));
                    }
                }
            }

            attempt += 1;
        }

        Err(last_error.unwrap_or(ApiError::ServiceUnavailable))
    }

    async fn parse_success_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let text = response.text().await?;
        tracing::debug!("API response body: {}", text);

        serde_json::from_str::<T>(&text).map_err(|e| {
            tracing::error!("Failed to deserialize response: {}, body: {}", e, text);
            ApiError::Parse(format!("Failed to parse response: {}", e))
        })
    }

    async fn handle_error_response(&self, response: reqwest::Response) -> ApiError {
        let status = response.status();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        match serde_json::from_str::<ArmErrorResponse>(&text) {
            Ok(err_resp) => ApiError::Api {
                status: status.as_u16(),
                code: err_resp.error.code,
                message: err_resp.error.message,
            },
            Err(_) => ApiError::Api {
                status: status.as_u16(),
                code: status.canonical_reason().unwrap_or("Unknown").to_string(),
                message: text,
            },
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use mockito::{Matcher, Server};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Named {
        name: String,
    }

    #[test]
    fn retry_config_defaults() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.initial_backoff_ms, 100);
        assert_eq!(config.max_backoff_ms, 10000);
        assert_eq!(config.timeout_seconds, 60);
    }

    #[tokio::test]
    async fn get_sends_bearer_token_and_api_version() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/subscriptions/s/resourceGroups/rg1")
            .match_header("authorization", "Bearer test-token")
            .match_query(Matcher::UrlEncoded(
                "api-version".into(),
                "2019-10-01".into(),
            ))
            .with_body(r#"{"name":"rg1"}"#)
            .create_async()
            .await;

        let client = create_test_client(&format!("{}/", server.url()));
        let named: Named = client
            .get(&Context::new(), "/subscriptions/s/resourceGroups/rg1", "2019-10-01")
            .await
            .unwrap();

        assert_eq!(named.name, "rg1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn arm_error_body_is_surfaced() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/subscriptions/s/resourceGroups/missing")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"error":{"code":"ResourceGroupNotFound","message":"Resource group 'missing' could not be found."}}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let err = client
            .get::<Named>(&Context::new(), "/subscriptions/s/resourceGroups/missing", "2019-10-01")
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        match err {
            ApiError::Api { code, .. } => assert_eq!(code, "ResourceGroupNotFound"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn server_errors_are_retried_then_reported() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/flaky")
            .match_query(Matcher::Any)
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let err = client
            .get::<Named>(&Context::new(), "/flaky", "2019-10-01")
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::ServiceUnavailable));
        mock.assert_async().await;
        assert_eq!(client.get_connection_stats().await.retried_requests, 2);
    }

    #[tokio::test]
    async fn unauthorized_is_not_retried() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/secure")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body("token expired")
            .expect(1)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let err = client
            .get::<Named>(&Context::new(), "/secure", "2019-10-01")
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Auth(_)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn delete_returning_no_content_completes() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("DELETE", "/subscriptions/s/resourceGroups/rg1")
            .match_query(Matcher::Any)
            .with_status(204)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        client
            .delete_and_wait(&Context::new(), "/subscriptions/s/resourceGroups/rg1", "2019-10-01")
            .await
            .unwrap();
        mock.assert_async().await;
    }
}
