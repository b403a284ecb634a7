use base64::prelude::*;
use serde::Deserialize;
use tfplug::Context;

use super::blob::BlobClient;
use super::client::Client;
use super::common::ListResponse;
use super::error::ApiError;
use crate::ids::{ResourceId, StorageAccountId};

pub const API_VERSION: &str = "2019-06-01";

pub struct StorageApi<'a> {
    client: &'a Client,
}

impl<'a> StorageApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn list_accounts(&self, ctx: &Context) -> Result<Vec<StorageAccount>, ApiError> {
        let path = format!(
            "/subscriptions/{}/providers/Microsoft.Storage/storageAccounts",
            self.client.subscription_id()
        );
        let list: ListResponse<StorageAccount> = self.client.get(ctx, &path, API_VERSION).await?;
        Ok(list.value)
    }

    /// Storage account names are unique per stamp, so a name is enough to find one
    pub async fn find_account(
        &self,
        ctx: &Context,
        name: &str,
    ) -> Result<Option<StorageAccount>, ApiError> {
        let accounts = self.list_accounts(ctx).await?;
        Ok(accounts
            .into_iter()
            .find(|a| a.name.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(name))))
    }

    pub async fn list_keys(
        &self,
        ctx: &Context,
        id: &StorageAccountId,
    ) -> Result<Vec<StorageAccountKey>, ApiError> {
        let path = format!("{}/listKeys", id.id());
        let keys: StorageAccountListKeysResult = self
            .client
            .post(ctx, &path, API_VERSION, None::<&()>)
            .await?;
        Ok(keys.keys)
    }

    /// Data-plane client for the named account, signed with its first access key
    pub async fn blob_client(&self, ctx: &Context, account_name: &str) -> Result<BlobClient, ApiError> {
        let account = self
            .find_account(ctx, account_name)
            .await?
            .ok_or_else(|| ApiError::Api {
                status: 404,
                code: "StorageAccountNotFound".to_string(),
                message: format!("storage account {:?} was not found", account_name),
            })?;

        let account_id = account
            .id
            .as_deref()
            .ok_or_else(|| ApiError::Parse(format!("storage account {:?} has no ID", account_name)))
            .and_then(|id| {
                StorageAccountId::parse(id).map_err(|e| ApiError::Parse(e.to_string()))
            })?;
        let blob_endpoint = account
            .properties
            .and_then(|p| p.primary_endpoints)
            .and_then(|e| e.blob)
            .ok_or_else(|| {
                ApiError::InvalidEndpoint(format!(
                    "storage account {:?} has no blob endpoint",
                    account_name
                ))
            })?;

        let key = self
            .list_keys(ctx, &account_id)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::Auth(format!("no access keys for storage account {:?}", account_name)))?;
        let key = BASE64_STANDARD
            .decode(key.value.as_bytes())
            .map_err(|e| ApiError::Auth(format!("invalid storage account key: {}", e)))?;

        Ok(BlobClient::new(
            self.client.http_client().clone(),
            &blob_endpoint,
            &account_id.name,
            key,
            self.client.poll_interval(),
        ))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageAccount {
    pub id: Option<String>,
    pub name: Option<String>,
    pub location: Option<String>,
    pub properties: Option<StorageAccountProperties>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageAccountProperties {
    pub primary_endpoints: Option<Endpoints>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Endpoints {
    pub blob: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StorageAccountListKeysResult {
    #[serde(default)]
    keys: Vec<StorageAccountKey>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageAccountKey {
    pub key_name: String,
    pub value: String,
}
