//! Long-running operation polling
//!
//! ARM reports asynchronous work through an `Azure-AsyncOperation` status link
//! (preferred) or a `Location` link, and paces callers with `Retry-After`.

use reqwest::header::{HeaderMap, LOCATION, RETRY_AFTER};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tfplug::Context;

use super::client::Client;
use super::common::ArmErrorBody;
use super::error::ApiError;

const ASYNC_OPERATION: &str = "azure-asyncoperation";

#[derive(Debug, Clone, PartialEq)]
pub enum PollTarget {
    /// Status document with a `status` field
    AsyncOperation(String),
    /// Returns 202 until the operation is done
    Location(String),
}

impl PollTarget {
    /// The link to poll, if the response started a long-running operation
    pub fn from_response(response: &reqwest::Response) -> Option<(PollTarget, Option<Duration>)> {
        Self::from_headers(response.status(), response.headers())
    }

    fn from_headers(
        status: StatusCode,
        headers: &HeaderMap,
    ) -> Option<(PollTarget, Option<Duration>)> {
        let header = |name| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let target = match (header(ASYNC_OPERATION), header(LOCATION.as_str())) {
            (Some(url), _) => PollTarget::AsyncOperation(url),
            (None, Some(url)) if status == StatusCode::ACCEPTED => PollTarget::Location(url),
            _ => return None,
        };
        Some((target, retry_after(headers)))
    }
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[derive(Debug, Deserialize)]
struct OperationStatus {
    status: String,
    #[serde(default)]
    error: Option<ArmErrorBody>,
}

impl Client {
    /// Poll until the operation reaches a terminal state or the context deadline passes
    pub async fn wait_for_completion(
        &self,
        ctx: &Context,
        target: PollTarget,
        first_delay: Option<Duration>,
    ) -> Result<(), ApiError> {
        let mut delay = first_delay.unwrap_or_else(|| self.poll_interval());

        loop {
            ctx.sleep(delay).await?;

            match &target {
                PollTarget::AsyncOperation(url) => {
                    let response = self.get_absolute(ctx, url).await?;
                    delay = retry_after(response.headers()).unwrap_or_else(|| self.poll_interval());

                    let text = response.text().await?;
                    let operation: OperationStatus = serde_json::from_str(&text).map_err(|e| {
                        tracing::error!("Failed to parse operation status: {}, body: {}", e, text);
                        ApiError::Parse(format!("Failed to parse operation status: {}", e))
                    })?;

                    match operation.status.to_ascii_lowercase().as_str() {
                        "succeeded" => return Ok(()),
                        "failed" | "canceled" | "cancelled" => {
                            let error = operation.error.unwrap_or_default();
                            return Err(ApiError::OperationFailed {
                                status: operation.status,
                                message: if error.code.is_empty() {
                                    error.message
                                } else {
                                    format!("{}: {}", error.code, error.message)
                                },
                            });
                        }
                        other => tracing::debug!("Operation {} is {}", url, other),
                    }
                }
                PollTarget::Location(url) => {
                    let response = self.get_absolute(ctx, url).await?;
                    if response.status() != StatusCode::ACCEPTED {
                        return Ok(());
                    }
                    delay = retry_after(response.headers()).unwrap_or_else(|| self.poll_interval());
                    tracing::debug!("Operation {} still in progress", url);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::test_support::create_test_client;
    use mockito::{Matcher, Server};
    use reqwest::header::HeaderValue;

    #[test]
    fn async_operation_header_wins_over_location() {
        let mut headers = HeaderMap::new();
        headers.insert("Azure-AsyncOperation", HeaderValue::from_static("https://op/1"));
        headers.insert(LOCATION, HeaderValue::from_static("https://loc/1"));
        headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));

        let (target, delay) = PollTarget::from_headers(StatusCode::CREATED, &headers).unwrap();
        assert_eq!(target, PollTarget::AsyncOperation("https://op/1".to_string()));
        assert_eq!(delay, Some(Duration::from_secs(7)));
    }

    #[test]
    fn location_only_counts_for_accepted() {
        let mut headers = HeaderMap::new();
        headers.insert(LOCATION, HeaderValue::from_static("https://loc/1"));

        assert!(PollTarget::from_headers(StatusCode::OK, &headers).is_none());
        let (target, _) = PollTarget::from_headers(StatusCode::ACCEPTED, &headers).unwrap();
        assert_eq!(target, PollTarget::Location("https://loc/1".to_string()));
    }

    #[tokio::test]
    async fn polls_async_operation_until_succeeded() {
        let mut server = Server::new_async().await;
        let put = server
            .mock("PUT", "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/routeTables/rt")
            .match_query(Matcher::Any)
            .with_status(201)
            .with_header("Azure-AsyncOperation", &format!("{}/operations/op1", server.url()))
            .with_header("Retry-After", "0")
            .with_body(r#"{"properties":{"provisioningState":"Updating"}}"#)
            .create_async()
            .await;
        let status = server
            .mock("GET", "/operations/op1")
            .with_header("Retry-After", "0")
            .with_body(r#"{"status":"Succeeded"}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        client
            .put_and_wait(
                &Context::new(),
                "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/routeTables/rt",
                "2018-11-01",
                &serde_json::json!({"location": "local"}),
            )
            .await
            .unwrap();

        put.assert_async().await;
        status.assert_async().await;
    }

    #[tokio::test]
    async fn failed_operation_reports_error() {
        let mut server = Server::new_async().await;
        let _status = server
            .mock("GET", "/operations/op2")
            .with_body(r#"{"status":"Failed","error":{"code":"InvalidResourceReference","message":"Subnet not found"}}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let err = client
            .wait_for_completion(
                &Context::new(),
                PollTarget::AsyncOperation(format!("{}/operations/op2", server.url())),
                Some(Duration::ZERO),
            )
            .await
            .unwrap_err();

        match err {
            ApiError::OperationFailed { status, message } => {
                assert_eq!(status, "Failed");
                assert!(message.contains("InvalidResourceReference"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn location_polling_stops_when_not_accepted() {
        let mut server = Server::new_async().await;
        let _done = server
            .mock("GET", "/locations/op3")
            .with_status(200)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        client
            .wait_for_completion(
                &Context::new(),
                PollTarget::Location(format!("{}/locations/op3", server.url())),
                Some(Duration::ZERO),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn deadline_stops_polling() {
        let mut server = Server::new_async().await;
        let _running = server
            .mock("GET", "/operations/op4")
            .with_body(r#"{"status":"InProgress"}"#)
            .expect_at_least(1)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let ctx = Context::new().with_timeout(Duration::from_millis(100));
        let err = client
            .wait_for_completion(
                &ctx,
                PollTarget::AsyncOperation(format!("{}/operations/op4", server.url())),
                Some(Duration::ZERO),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::DeadlineExceeded));
    }
}
