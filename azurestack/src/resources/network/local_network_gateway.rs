//! `azurestack_local_network_gateway`

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
use tfplug::schema::{AttributeBuilder, AttributeType, BlockBuilder, NestedBlock, Schema, SchemaBuilder};
use tfplug::validator::{ListLengthValidator, NumberRangeValidator, StringLengthValidator};
use tfplug::DynamicValue;

use crate::api::network::{AddressSpace, BgpSettings, LocalNetworkGateway, LocalNetworkGatewayProperties};
use crate::api::{ignore_not_found, ApiError};
use crate::config::Timeouts;
use crate::error::ProviderError;
use crate::ids::{LocalNetworkGatewayId, ResourceId};
use crate::provider_data::AzureStackProviderData;
use crate::resources::common::{
    created, decode, deleted, encode, ensure_absent, id_attribute, import_id, name_attribute,
    read_back, resource_group_name_attribute, state_id, updated,
};
use crate::{location, tags};

const TYPE_NAME: &str = "azurestack_local_network_gateway";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalNetworkGatewayModel {
    pub id: Option<String>,
    pub name: String,
    pub location: String,
    pub resource_group_name: String,
    pub gateway_address: String,
    pub address_space: Vec<String>,
    pub bgp_settings: Vec<BgpSettingsBlock>,
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BgpSettingsBlock {
    pub asn: i64,
    pub bgp_peering_address: String,
    pub peer_weight: Option<i64>,
}

pub fn expand_bgp_settings(blocks: &[BgpSettingsBlock]) -> Option<BgpSettings> {
    blocks.first().map(|b| BgpSettings {
        asn: Some(b.asn),
        bgp_peering_address: Some(b.bgp_peering_address.clone()),
        peer_weight: b.peer_weight,
    })
}

pub fn flatten_bgp_settings(settings: Option<&BgpSettings>) -> Vec<BgpSettingsBlock> {
    settings
        .map(|s| BgpSettingsBlock {
            asn: s.asn.unwrap_or_default(),
            bgp_peering_address: s.bgp_peering_address.clone().unwrap_or_default(),
            peer_weight: Some(s.peer_weight.unwrap_or_default()),
        })
        .into_iter()
        .collect()
}

pub fn expand(model: &LocalNetworkGatewayModel) -> LocalNetworkGateway {
    LocalNetworkGateway {
        location: Some(location::normalize(&model.location)),
        tags: Some(tags::expand(Some(&model.tags))),
        properties: LocalNetworkGatewayProperties {
            local_network_address_space: Some(AddressSpace {
                address_prefixes: Some(model.address_space.clone()),
            }),
            gateway_ip_address: Some(model.gateway_address.clone()),
            bgp_settings: expand_bgp_settings(&model.bgp_settings),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn flatten(id: &LocalNetworkGatewayId, gateway: &LocalNetworkGateway) -> LocalNetworkGatewayModel {
    let properties = &gateway.properties;
    LocalNetworkGatewayModel {
        id: Some(id.id()),
        name: id.name.clone(),
        location: gateway.location.as_deref().map(location::normalize).unwrap_or_default(),
        resource_group_name: id.resource_group.clone(),
        gateway_address: properties.gateway_ip_address.clone().unwrap_or_default(),
        address_space: properties
            .local_network_address_space
            .as_ref()
            .and_then(|s| s.address_prefixes.clone())
            .unwrap_or_default(),
        bgp_settings: flatten_bgp_settings(properties.bgp_settings.as_ref()),
        tags: tags::flatten(gateway.tags.as_ref()),
    }
}

pub struct LocalNetworkGatewayResource {
    provider_data: AzureStackProviderData,
    timeouts: Timeouts,
}

impl LocalNetworkGatewayResource {
    pub fn new(provider_data: AzureStackProviderData) -> Self {
        Self {
            provider_data,
            timeouts: Timeouts::default(),
        }
    }

    pub fn schema_static() -> Schema {
        let bgp_settings = BlockBuilder::new()
            .attribute(
                AttributeBuilder::new("asn", AttributeType::Number)
                    .description("BGP speaker's autonomous system number")
                    .required()
                    .validator(NumberRangeValidator {
                        min: Some(1.0),
                        max: Some(4294967295.0),
                    })
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("bgp_peering_address", AttributeType::String)
                    .description("BGP peering address and BGP identifier of this BGP speaker")
                    .required()
                    .validator(StringLengthValidator::not_empty())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("peer_weight", AttributeType::Number)
                    .description("Weight added to routes learned from this BGP speaker")
                    .optional()
                    .computed()
                    .build(),
            )
            .build();

        SchemaBuilder::new()
            .version(0)
            .description("Manages a local network gateway")
            .attribute(id_attribute())
            .attribute(name_attribute("The name of the local network gateway"))
            .attribute(location::schema())
            .attribute(resource_group_name_attribute())
            .attribute(
                AttributeBuilder::new("gateway_address", AttributeType::String)
                    .description("The IP address of the on-premises gateway")
                    .required()
                    .validator(StringLengthValidator::not_empty())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("address_space", AttributeType::list_of(AttributeType::String))
                    .description("Address prefixes reachable through the gateway")
                    .required()
                    .validator(ListLengthValidator {
                        min: Some(1),
                        max: None,
                    })
                    .build(),
            )
            .attribute(tags::schema())
            .block(NestedBlock::list("bgp_settings", bgp_settings).max_items(1))
            .build()
    }

    async fn create_gateway(
        &self,
        ctx: &Context,
        model: &LocalNetworkGatewayModel,
    ) -> Result<String, ProviderError> {
        let network = self.provider_data.client.network();
        let id = LocalNetworkGatewayId::new(
            self.provider_data.client.subscription_id(),
            &model.resource_group_name,
            &model.name,
        );

        let existing = network.get_local_network_gateway(ctx, &id).await;
        ensure_absent(existing, TYPE_NAME, &id.id(), &model.name, &model.resource_group_name)?;

        tracing::info!("Creating local network gateway {}", id);
        network
            .create_or_update_local_network_gateway(ctx, &id, &expand(model))
            .await
            .map_err(|e| {
                ProviderError::upstream(TYPE_NAME, "creating", &model.name, &model.resource_group_name, e)
            })?;
        Ok(id.id())
    }

    async fn read_gateway(&self, ctx: &Context, id: &str) -> Result<Option<DynamicValue>, ProviderError> {
        let id = LocalNetworkGatewayId::parse(id)?;
        match self
            .provider_data
            .client
            .network()
            .get_local_network_gateway(ctx, &id)
            .await
        {
            Ok(gateway) => Ok(Some(encode(TYPE_NAME, &flatten(&id, &gateway))?)),
            Err(e) if e.is_not_found() => {
                tracing::warn!("Local network gateway {} was not found, removing from state", id);
                Ok(None)
            }
            Err(e) => Err(ProviderError::upstream(TYPE_NAME, "reading", &id.name, &id.resource_group, e)),
        }
    }

    async fn update_gateway(
        &self,
        ctx: &Context,
        prior: &DynamicValue,
        planned: &DynamicValue,
    ) -> Result<String, ProviderError> {
        let id = LocalNetworkGatewayId::parse(&state_id(TYPE_NAME, prior)?)?;
        let model: LocalNetworkGatewayModel = decode(TYPE_NAME, planned)?;
        let network = self.provider_data.client.network();
        let upstream = |action: &'static str, e: ApiError| {
            ProviderError::upstream(TYPE_NAME, action, &id.name, &id.resource_group, e)
        };

        let mut gateway = network
            .get_local_network_gateway(ctx, &id)
            .await
            .map_err(|e| upstream("retrieving", e))?;
        let desired = expand(&model);
        gateway.tags = desired.tags;
        gateway.properties.gateway_ip_address = desired.properties.gateway_ip_address;
        gateway.properties.local_network_address_space = desired.properties.local_network_address_space;
        gateway.properties.bgp_settings = desired.properties.bgp_settings;
        gateway.properties.provisioning_state = None;

        network
            .create_or_update_local_network_gateway(ctx, &id, &gateway)
            .await
            .map_err(|e| upstream("updating", e))?;
        Ok(id.id())
    }

    async fn delete_gateway(&self, ctx: &Context, prior: &DynamicValue) -> Result<(), ProviderError> {
        let id = LocalNetworkGatewayId::parse(&state_id(TYPE_NAME, prior)?)?;
        tracing::info!("Deleting local network gateway {}", id);
        ignore_not_found(
            self.provider_data
                .client
                .network()
                .delete_local_network_gateway(ctx, &id)
                .await,
        )
        .map_err(|e| ProviderError::upstream(TYPE_NAME, "deleting", &id.name, &id.resource_group, e))
    }
}

#[async_trait]
impl Resource for LocalNetworkGatewayResource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Self::schema_static()
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let ctx = ctx.with_timeout(self.timeouts.create);
        let model: LocalNetworkGatewayModel = match decode(TYPE_NAME, &request.planned_state) {
            Ok(model) => model,
            Err(e) => return CreateResourceResponse::failed(request.planned_state, e.into()),
        };
        let id = match self.create_gateway(&ctx, &model).await {
            Ok(id) => id,
            Err(e) => return CreateResourceResponse::failed(request.planned_state, e.into()),
        };
        let read = self.read_gateway(&ctx, &id).await;
        created(TYPE_NAME, request.planned_state, id, read)
    }

    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let ctx = ctx.with_timeout(self.timeouts.read);
        let read = match state_id(TYPE_NAME, &request.current_state) {
            Ok(id) => self.read_gateway(&ctx, &id).await,
            Err(e) => Err(e),
        };
        read_back(request.current_state, read)
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let ctx = ctx.with_timeout(self.timeouts.update);
        let id = match self
            .update_gateway(&ctx, &request.prior_state, &request.planned_state)
            .await
        {
            Ok(id) => id,
            Err(e) => return UpdateResourceResponse::failed(request.prior_state, e.into()),
        };
        let read = self.read_gateway(&ctx, &id).await;
        updated(TYPE_NAME, request.planned_state, id, read)
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let ctx = ctx.with_timeout(self.timeouts.delete);
        deleted(self.delete_gateway(&ctx, &request.prior_state).await)
    }
}

#[async_trait]
impl ResourceWithImportState for LocalNetworkGatewayResource {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        import_id::<LocalNetworkGatewayId>(&request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_space_and_bgp_survive_expand_then_flatten() {
        let id = LocalNetworkGatewayId::new("s", "rg", "lngw");
        let model = LocalNetworkGatewayModel {
            id: Some(id.id()),
            name: "lngw".to_string(),
            location: "local".to_string(),
            resource_group_name: "rg".to_string(),
            gateway_address: "168.62.225.23".to_string(),
            address_space: vec!["10.1.1.0/24".to_string(), "10.1.2.0/24".to_string()],
            bgp_settings: vec![BgpSettingsBlock {
                asn: 2468,
                bgp_peering_address: "10.1.1.254".to_string(),
                peer_weight: Some(15),
            }],
            tags: HashMap::new(),
        };

        assert_eq!(flatten(&id, &expand(&model)), model);
    }

    #[test]
    fn missing_bgp_settings_flatten_to_empty_list() {
        let id = LocalNetworkGatewayId::new("s", "rg", "lngw");
        let model = flatten(&id, &LocalNetworkGateway::default());
        assert!(model.bgp_settings.is_empty());
        assert!(model.address_space.is_empty());
        assert_eq!(model.gateway_address, "");
    }

    #[test]
    fn unset_peer_weight_is_not_sent() {
        let settings = expand_bgp_settings(&[BgpSettingsBlock {
            asn: 65000,
            bgp_peering_address: "10.0.0.1".to_string(),
            peer_weight: None,
        }])
        .unwrap();
        assert_eq!(settings.peer_weight, None);
        assert!(expand_bgp_settings(&[]).is_none());
    }
}
