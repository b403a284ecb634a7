//! `azurestack_network_interface_backend_address_pool_association`
//!
//! Attaches a load balancer backend address pool to one IP configuration of
//! a network interface. The association has no ARM object of its own; every
//! operation reads and rewrites the network interface.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
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

use crate::api::common::SubResource;
use crate::api::network::NetworkInterface;
use crate::api::ApiError;
use crate::config::Timeouts;
use crate::error::ProviderError;
use crate::ids::{
    prefer_spelling, IdValidator, LoadBalancerBackendAddressPoolId,
    NetworkInterfaceBackendAddressPoolAssociationId, NetworkInterfaceId,
    NetworkInterfaceIpConfigurationId, ResourceId,
};
use crate::provider_data::AzureStackProviderData;
use crate::resources::common::{
    created, decode, decode_state, deleted, encode, id_attribute, import_id, read_back, state_id,
};

const TYPE_NAME: &str = "azurestack_network_interface_backend_address_pool_association";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssociationModel {
    pub id: Option<String>,
    pub network_interface_id: String,
    pub ip_configuration_name: String,
    pub backend_address_pool_id: String,
}

fn same_id(a: Option<&str>, b: &str) -> bool {
    a.is_some_and(|a| a.eq_ignore_ascii_case(b))
}

/// Whether the named IP configuration already references the pool
pub fn has_pool(nic: &NetworkInterface, ip_configuration: &str, pool_id: &str) -> Option<bool> {
    let config = nic.ip_configuration(ip_configuration)?;
    Some(
        config
            .properties
            .load_balancer_backend_address_pools
            .iter()
            .flatten()
            .any(|p| same_id(p.id.as_deref(), pool_id)),
    )
}

/// Remove every reference to the pool; false when there was none
pub fn detach_pool(nic: &mut NetworkInterface, ip_configuration: &str, pool_id: &str) -> bool {
    let Some(config) = nic.ip_configuration_mut(ip_configuration) else {
        return false;
    };
    let Some(pools) = config.properties.load_balancer_backend_address_pools.as_mut() else {
        return false;
    };
    let before = pools.len();
    pools.retain(|p| !same_id(p.id.as_deref(), pool_id));
    pools.len() != before
}

pub struct NetworkInterfaceBackendAddressPoolAssociationResource {
    provider_data: AzureStackProviderData,
    timeouts: Timeouts,
}

impl NetworkInterfaceBackendAddressPoolAssociationResource {
    pub fn new(provider_data: AzureStackProviderData) -> Self {
        Self {
            provider_data,
            timeouts: Timeouts::default(),
        }
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Associates a network interface IP configuration with a load balancer backend address pool")
            .attribute(id_attribute())
            .attribute(
                AttributeBuilder::new("network_interface_id", AttributeType::String)
                    .description("The ID of the network interface")
                    .required()
                    .force_new()
                    .validator(IdValidator::<NetworkInterfaceId>::new())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("ip_configuration_name", AttributeType::String)
                    .description("The name of the IP configuration within the network interface")
                    .required()
                    .force_new()
                    .validator(StringLengthValidator::not_empty())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("backend_address_pool_id", AttributeType::String)
                    .description("The ID of the load balancer backend address pool")
                    .required()
                    .force_new()
                    .validator(IdValidator::<LoadBalancerBackendAddressPoolId>::new())
                    .build(),
            )
            .build()
    }

    async fn create_association(&self, ctx: &Context, model: &AssociationModel) -> Result<String, ProviderError> {
        let nic_id = NetworkInterfaceId::parse(&model.network_interface_id)?;
        let pool_id = LoadBalancerBackendAddressPoolId::parse(&model.backend_address_pool_id)?;
        let id = NetworkInterfaceBackendAddressPoolAssociationId::new(
            NetworkInterfaceIpConfigurationId::new(
                &nic_id.subscription_id,
                &nic_id.resource_group,
                &nic_id.name,
                &model.ip_configuration_name,
            ),
            pool_id,
        );
        let network = self.provider_data.client.network();
        let upstream = |action: &'static str, e: ApiError| {
            ProviderError::upstream(TYPE_NAME, action, &nic_id.name, &nic_id.resource_group, e)
        };

        let mut nic = network
            .get_network_interface(ctx, &nic_id)
            .await
            .map_err(|e| upstream("retrieving network interface for", e))?;

        let pool = id.backend_address_pool.id();
        match has_pool(&nic, &model.ip_configuration_name, &pool) {
            None => {
                return Err(ProviderError::NotFound {
                    resource_type: TYPE_NAME,
                    id: id.ip_configuration.id(),
                })
            }
            Some(true) => {
                return Err(ProviderError::AlreadyExists {
                    resource_type: TYPE_NAME,
                    id: id.id(),
                })
            }
            Some(false) => {}
        }

        if let Some(config) = nic.ip_configuration_mut(&model.ip_configuration_name) {
            config
                .properties
                .load_balancer_backend_address_pools
                .get_or_insert_with(Vec::new)
                .push(SubResource::new(pool));
        }

        tracing::info!("Associating {} with {}", id.ip_configuration, id.backend_address_pool);
        network
            .create_or_update_network_interface(ctx, &nic_id, &nic)
            .await
            .map_err(|e| upstream("updating network interface for", e))?;
        Ok(id.id())
    }

    async fn read_association(
        &self,
        ctx: &Context,
        id: &str,
        known: &AssociationModel,
    ) -> Result<Option<DynamicValue>, ProviderError> {
        let id = NetworkInterfaceBackendAddressPoolAssociationId::parse(id)?;
        let nic_id = id.ip_configuration.network_interface_id();
        let nic = match self.provider_data.client.network().get_network_interface(ctx, &nic_id).await {
            Ok(nic) => nic,
            Err(e) if e.is_not_found() => {
                tracing::warn!("Network interface {} was not found, removing association from state", nic_id);
                return Ok(None);
            }
            Err(e) => {
                return Err(ProviderError::upstream(TYPE_NAME, "reading", &nic_id.name, &nic_id.resource_group, e))
            }
        };

        let ip_configuration = &id.ip_configuration.name;
        match has_pool(&nic, ip_configuration, &id.backend_address_pool.id()) {
            Some(true) => {}
            Some(false) => {
                tracing::warn!("Backend address pool is no longer attached to {}, removing from state", id.ip_configuration);
                return Ok(None);
            }
            None => {
                tracing::warn!("IP configuration {} was not found, removing from state", id.ip_configuration);
                return Ok(None);
            }
        }

        let model = AssociationModel {
            id: Some(id.id()),
            network_interface_id: prefer_spelling(Some(known.network_interface_id.as_str()), &nic_id),
            ip_configuration_name: ip_configuration.clone(),
            backend_address_pool_id: prefer_spelling(
                Some(known.backend_address_pool_id.as_str()),
                &id.backend_address_pool,
            ),
        };
        Ok(Some(encode(TYPE_NAME, &model)?))
    }

    async fn delete_association(&self, ctx: &Context, prior: &DynamicValue) -> Result<(), ProviderError> {
        let id = NetworkInterfaceBackendAddressPoolAssociationId::parse(&state_id(TYPE_NAME, prior)?)?;
        let nic_id = id.ip_configuration.network_interface_id();
        let network = self.provider_data.client.network();
        let upstream = |action: &'static str, e: ApiError| {
            ProviderError::upstream(TYPE_NAME, action, &nic_id.name, &nic_id.resource_group, e)
        };

        let mut nic = match network.get_network_interface(ctx, &nic_id).await {
            Ok(nic) => nic,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(upstream("retrieving network interface for", e)),
        };
        if !detach_pool(&mut nic, &id.ip_configuration.name, &id.backend_address_pool.id()) {
            return Ok(());
        }

        tracing::info!("Removing {} from {}", id.backend_address_pool, id.ip_configuration);
        network
            .create_or_update_network_interface(ctx, &nic_id, &nic)
            .await
            .map_err(|e| upstream("deleting", e))
    }
}

#[async_trait]
impl Resource for NetworkInterfaceBackendAddressPoolAssociationResource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Self::schema_static()
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let ctx = ctx.with_timeout(self.timeouts.create);
        let model: AssociationModel = match decode(TYPE_NAME, &request.planned_state) {
            Ok(model) => model,
            Err(e) => return CreateResourceResponse::failed(request.planned_state, e.into()),
        };
        let id = match self.create_association(&ctx, &model).await {
            Ok(id) => id,
            Err(e) => return CreateResourceResponse::failed(request.planned_state, e.into()),
        };
        let read = self.read_association(&ctx, &id, &model).await;
        created(TYPE_NAME, request.planned_state, id, read)
    }

    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let ctx = ctx.with_timeout(self.timeouts.read);
        let prior = decode_state::<AssociationModel>(TYPE_NAME, &request.current_state)
            .and_then(|known| state_id(TYPE_NAME, &request.current_state).map(|id| (id, known)));
        let read = match prior {
            Ok((id, known)) => self.read_association(&ctx, &id, &known).await,
            Err(e) => Err(e),
        };
        read_back(request.current_state, read)
    }

    /// Every attribute forces replacement, so there is nothing to change in place
    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        UpdateResourceResponse {
            new_state: request.planned_state,
            diagnostics: vec![],
        }
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let ctx = ctx.with_timeout(self.timeouts.delete);
        deleted(self.delete_association(&ctx, &request.prior_state).await)
    }
}

#[async_trait]
impl ResourceWithImportState for NetworkInterfaceBackendAddressPoolAssociationResource {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        import_id::<NetworkInterfaceBackendAddressPoolAssociationId>(&request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POOL: &str = "/subscriptions/s/resourceGroups/rg/providers/microsoft.network/loadbalancers/lb/backendaddresspools/pool1";

    fn nic(pools: serde_json::Value) -> NetworkInterface {
        serde_json::from_value(serde_json::json!({
            "id": "/nic",
            "properties": {
                "ipConfigurations": [{
                    "name": "primary",
                    "properties": {"loadBalancerBackendAddressPools": pools}
                }]
            }
        }))
        .unwrap()
    }

    #[test]
    fn pool_membership_ignores_case() {
        let nic = nic(serde_json::json!([{
            "id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/loadBalancers/lb/backendAddressPools/pool1"
        }]));
        assert_eq!(has_pool(&nic, "primary", POOL), Some(true));
        assert_eq!(has_pool(&nic, "secondary", POOL), None);
    }

    #[test]
    fn detach_removes_only_the_pool() {
        let mut nic = nic(serde_json::json!([{"id": POOL}, {"id": "/other"}]));
        assert!(detach_pool(&mut nic, "primary", POOL));
        assert_eq!(has_pool(&nic, "primary", POOL), Some(false));
        assert_eq!(
            nic.ip_configuration("primary")
                .unwrap()
                .properties
                .load_balancer_backend_address_pools
                .as_ref()
                .unwrap()
                .len(),
            1
        );
        assert!(!detach_pool(&mut nic, "primary", POOL));
    }
}
