#![allow(dead_code)]

use azurestack::api::auth::StaticToken;
use azurestack::api::{Client, RetryConfig};
use azurestack::provider_data::AzureStackProviderData;
use mockito::{Matcher, Mock, ServerGuard};
use serde_json::json;
use std::sync::Arc;
use tfplug::{Dynamic, DynamicValue};

pub const SUBSCRIPTION: &str = "00000000-0000-0000-0000-000000000000";

/// Path-style blob URL path served by the mock storage account
pub const BLOB_PATH: &str = "/acct1/vhds/disk.vhd";

pub const NOT_FOUND: &str = r#"{"error":{"code":"ResourceNotFound","message":"The resource was not found."}}"#;

pub fn provider_data(server_url: &str) -> AzureStackProviderData {
    let client = Client::with_credential(
        server_url,
        SUBSCRIPTION,
        Arc::new(StaticToken("test-token".to_string())),
        true,
        RetryConfig {
            max_retries: 1,
            initial_backoff_ms: 1,
            max_backoff_ms: 5,
            timeout_seconds: 5,
            poll_interval_ms: 0,
        },
    )
    .unwrap();

    AzureStackProviderData {
        client,
        subscription_id: SUBSCRIPTION.to_string(),
        tenant_id: "tenant".to_string(),
        client_id: "client".to_string(),
    }
}

/// Route provider logs to the test harness; repeated calls are fine
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn value(json: serde_json::Value) -> DynamicValue {
    DynamicValue::new(Dynamic::from(json))
}

pub fn rg_path(resource_group: &str) -> String {
    format!("/subscriptions/{}/resourceGroups/{}", SUBSCRIPTION, resource_group)
}

/// Account lookup and key listing, with the blob endpoint served path style by `server`
pub async fn storage_account(server: &mut ServerGuard) -> (Mock, Mock) {
    let account_id = format!(
        "{}/providers/Microsoft.Storage/storageAccounts/acct1",
        rg_path("rg1")
    );
    let list = server
        .mock(
            "GET",
            format!("/subscriptions/{}/providers/Microsoft.Storage/storageAccounts", SUBSCRIPTION).as_str(),
        )
        .match_query(Matcher::Any)
        .with_body(
            json!({
                "value": [{
                    "id": account_id,
                    "name": "acct1",
                    "properties": {"primaryEndpoints": {"blob": format!("{}/acct1/", server.url())}}
                }]
            })
            .to_string(),
        )
        .create_async()
        .await;
    let keys = server
        .mock("POST", Matcher::Regex("(?i)/storageaccounts/acct1/listKeys".to_string()))
        .match_query(Matcher::Any)
        .with_body(r#"{"keys":[{"keyName":"key1","value":"c2VjcmV0LWtleQ=="}]}"#)
        .create_async()
        .await;
    (list, keys)
}
