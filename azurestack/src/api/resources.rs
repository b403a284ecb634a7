use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tfplug::Context;

use super::client::Client;
use super::error::ApiError;
use crate::ids::{ResourceGroupId, ResourceId, TemplateDeploymentId};

pub const API_VERSION: &str = "2019-10-01";

pub struct ResourcesApi<'a> {
    client: &'a Client,
}

impl<'a> ResourcesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn get_group(
        &self,
        ctx: &Context,
        id: &ResourceGroupId,
    ) -> Result<ResourceGroup, ApiError> {
        self.client.get(ctx, &id.id(), API_VERSION).await
    }

    pub async fn create_or_update_group(
        &self,
        ctx: &Context,
        id: &ResourceGroupId,
        group: &ResourceGroup,
    ) -> Result<ResourceGroup, ApiError> {
        self.client.put(ctx, &id.id(), API_VERSION, group).await
    }

    /// Only tags can change on an existing group
    pub async fn update_group_tags(
        &self,
        ctx: &Context,
        id: &ResourceGroupId,
        tags: HashMap<String, String>,
    ) -> Result<ResourceGroup, ApiError> {
        let patch = ResourceGroupPatchable { tags: Some(tags) };
        self.client.patch(ctx, &id.id(), API_VERSION, &patch).await
    }

    pub async fn delete_group(&self, ctx: &Context, id: &ResourceGroupId) -> Result<(), ApiError> {
        self.client.delete_and_wait(ctx, &id.id(), API_VERSION).await
    }

    pub async fn get_deployment(
        &self,
        ctx: &Context,
        id: &TemplateDeploymentId,
    ) -> Result<Deployment, ApiError> {
        self.client.get(ctx, &id.id(), API_VERSION).await
    }

    pub async fn create_or_update_deployment(
        &self,
        ctx: &Context,
        id: &TemplateDeploymentId,
        deployment: &Deployment,
    ) -> Result<(), ApiError> {
        self.client
            .put_and_wait(ctx, &id.id(), API_VERSION, deployment)
            .await
    }

    pub async fn delete_deployment(
        &self,
        ctx: &Context,
        id: &TemplateDeploymentId,
    ) -> Result<(), ApiError> {
        self.client.delete_and_wait(ctx, &id.id(), API_VERSION).await
    }

    /// The template the deployment was created from
    pub async fn export_template(
        &self,
        ctx: &Context,
        id: &TemplateDeploymentId,
    ) -> Result<Value, ApiError> {
        let path = format!("{}/exportTemplate", id.id());
        let exported: DeploymentExportResult = self
            .client
            .post(ctx, &path, API_VERSION, None::<&()>)
            .await?;
        Ok(exported.template.unwrap_or(Value::Null))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceGroup {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<ResourceGroupProperties>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroupProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

#[derive(Debug, Serialize)]
struct ResourceGroupPatchable {
    tags: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Deployment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub properties: DeploymentProperties,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
    /// Only present on responses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeploymentExportResult {
    template: Option<Value>,
}
