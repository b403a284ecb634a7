//! `azurestack_resource_group`

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tfplug::context::Context;
use tfplug::resource::{
    CreateResourceRequest, CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceWithImportState, UpdateResourceRequest,
    UpdateResourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::validator::StringLengthValidator;
use tfplug::DynamicValue;

use super::common::{
    created, decode, deleted, encode, ensure_absent, id_attribute, import_id, read_back, state_id,
    updated,
};
use crate::api::{ignore_not_found, resources::ResourceGroup};
use crate::config::Timeouts;
use crate::error::ProviderError;
use crate::ids::{ResourceGroupId, ResourceId};
use crate::provider_data::AzureStackProviderData;
use crate::{location, tags};

const TYPE_NAME: &str = "azurestack_resource_group";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceGroupModel {
    pub id: Option<String>,
    pub name: String,
    pub location: String,
    pub tags: HashMap<String, String>,
}

pub fn expand(model: &ResourceGroupModel) -> ResourceGroup {
    ResourceGroup {
        location: location::normalize(&model.location),
        tags: Some(tags::expand(Some(&model.tags))),
        ..Default::default()
    }
}

pub fn flatten(id: &ResourceGroupId, group: &ResourceGroup) -> ResourceGroupModel {
    ResourceGroupModel {
        id: Some(id.id()),
        name: group.name.clone().unwrap_or_else(|| id.name.clone()),
        location: location::normalize(&group.location),
        tags: tags::flatten(group.tags.as_ref()),
    }
}

pub struct ResourceGroupResource {
    provider_data: AzureStackProviderData,
    timeouts: Timeouts,
}

impl ResourceGroupResource {
    pub fn new(provider_data: AzureStackProviderData) -> Self {
        Self {
            provider_data,
            timeouts: Timeouts::default(),
        }
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a resource group on Azure Stack")
            .attribute(id_attribute())
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The name of the resource group")
                    .required()
                    .force_new()
                    .validator(StringLengthValidator::between(1, 90))
                    .build(),
            )
            .attribute(location::schema())
            .attribute(tags::schema())
            .build()
    }

    async fn create_group(&self, ctx: &Context, model: &ResourceGroupModel) -> Result<ResourceGroupId, ProviderError> {
        let client = &self.provider_data.client;
        let id = ResourceGroupId::new(client.subscription_id(), &model.name);

        let existing = client.resources().get_group(ctx, &id).await;
        ensure_absent(existing, TYPE_NAME, &id.id(), &model.name, &model.name)?;

        tracing::info!("Creating resource group {}", id);
        client
            .resources()
            .create_or_update_group(ctx, &id, &expand(model))
            .await
            .map_err(|e| ProviderError::upstream(TYPE_NAME, "creating", &model.name, &model.name, e))?;
        Ok(id)
    }

    /// None when the group is gone
    async fn read_group(&self, ctx: &Context, id: &str) -> Result<Option<DynamicValue>, ProviderError> {
        let id = ResourceGroupId::parse(id)?;
        match self.provider_data.client.resources().get_group(ctx, &id).await {
            Ok(group) => Ok(Some(encode(TYPE_NAME, &flatten(&id, &group))?)),
            Err(e) if e.is_not_found() => {
                tracing::warn!("Resource group {} was not found, removing from state", id);
                Ok(None)
            }
            Err(e) => Err(ProviderError::upstream(TYPE_NAME, "reading", &id.name, &id.name, e)),
        }
    }

    async fn update_group(
        &self,
        ctx: &Context,
        prior: &DynamicValue,
        planned: &DynamicValue,
    ) -> Result<String, ProviderError> {
        let id = ResourceGroupId::parse(&state_id(TYPE_NAME, prior)?)?;
        let model: ResourceGroupModel = decode(TYPE_NAME, planned)?;

        self.provider_data
            .client
            .resources()
            .update_group_tags(ctx, &id, tags::expand(Some(&model.tags)))
            .await
            .map_err(|e| ProviderError::upstream(TYPE_NAME, "updating", &id.name, &id.name, e))?;
        Ok(id.id())
    }

    async fn delete_group(&self, ctx: &Context, prior: &DynamicValue) -> Result<(), ProviderError> {
        let id = ResourceGroupId::parse(&state_id(TYPE_NAME, prior)?)?;
        tracing::info!("Deleting resource group {}", id);
        ignore_not_found(self.provider_data.client.resources().delete_group(ctx, &id).await)
            .map_err(|e| ProviderError::upstream(TYPE_NAME, "deleting", &id.name, &id.name, e))
    }
}

#[async_trait]
impl Resource for ResourceGroupResource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Self::schema_static()
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let ctx = ctx.with_timeout(self.timeouts.create);
        let model: ResourceGroupModel = match decode(TYPE_NAME, &request.planned_state) {
            Ok(model) => model,
            Err(e) => return CreateResourceResponse::failed(request.planned_state, e.into()),
        };
        let id = match self.create_group(&ctx, &model).await {
            Ok(id) => id.id(),
            Err(e) => return CreateResourceResponse::failed(request.planned_state, e.into()),
        };
        let read = self.read_group(&ctx, &id).await;
        created(TYPE_NAME, request.planned_state, id, read)
    }

    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let ctx = ctx.with_timeout(self.timeouts.read);
        let read = match state_id(TYPE_NAME, &request.current_state) {
            Ok(id) => self.read_group(&ctx, &id).await,
            Err(e) => Err(e),
        };
        read_back(request.current_state, read)
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let ctx = ctx.with_timeout(self.timeouts.update);
        let id = match self
            .update_group(&ctx, &request.prior_state, &request.planned_state)
            .await
        {
            Ok(id) => id,
            Err(e) => return UpdateResourceResponse::failed(request.prior_state, e.into()),
        };
        let read = self.read_group(&ctx, &id).await;
        updated(TYPE_NAME, request.planned_state, id, read)
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let ctx = ctx.with_timeout(self.timeouts.delete);
        deleted(self.delete_group(&ctx, &request.prior_state).await)
    }
}

#[async_trait]
impl ResourceWithImportState for ResourceGroupResource {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        import_id::<ResourceGroupId>(&request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_always_sends_tags() {
        let model = ResourceGroupModel {
            name: "rg1".to_string(),
            location: "West Europe".to_string(),
            ..Default::default()
        };
        let group = expand(&model);

        assert_eq!(group.location, "westeurope");
        assert_eq!(group.tags, Some(HashMap::new()));
    }

    #[test]
    fn flatten_tolerates_missing_fields() {
        let id = ResourceGroupId::new("s", "rg1");
        let model = flatten(
            &id,
            &ResourceGroup {
                location: "local".to_string(),
                ..Default::default()
            },
        );

        assert_eq!(model.name, "rg1");
        assert_eq!(model.id.as_deref(), Some("/subscriptions/s/resourceGroups/rg1"));
        assert!(model.tags.is_empty());
    }

    #[test]
    fn schema_marks_identity_force_new() {
        let schema = ResourceGroupResource::schema_static();
        assert!(schema.attribute("name").unwrap().force_new);
        assert!(schema.attribute("location").unwrap().force_new);
        assert!(!schema.attribute("tags").unwrap().force_new);
    }
}
