//! `azurestack_route_table`
//!
//! Routes are managed inline. Leaving `route` out keeps whatever routes the
//! table already has; `route = []` removes them all.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tfplug::context::Context;
use tfplug::defaults::StaticDefault;
use tfplug::plan_modifier::SuppressCaseDiff;
use tfplug::resource::{
    CreateResourceRequest, CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceWithImportState, UpdateResourceRequest,
    UpdateResourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, BlockBuilder, NestedBlock, Schema, SchemaBuilder};
use tfplug::validator::{OneOfValidator, StringLengthValidator};
use tfplug::DynamicValue;

use crate::api::common::SubResource;
use crate::api::network::{Route, RouteProperties, RouteTable, RouteTableProperties};
use crate::api::{ignore_not_found, ApiError};
use crate::config::Timeouts;
use crate::error::ProviderError;
use crate::ids::{ResourceId, RouteTableId};
use crate::provider_data::AzureStackProviderData;
use crate::resources::common::{
    created, decode, decode_state, deleted, encode, ensure_absent, id_attribute, import_id, name_attribute,
    read_back, resource_group_name_attribute, state_id, updated,
};
use crate::{location, tags};

const TYPE_NAME: &str = "azurestack_route_table";

pub const NEXT_HOP_TYPES: [&str; 5] = [
    "VirtualNetworkGateway",
    "VnetLocal",
    "Internet",
    "VirtualAppliance",
    "None",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteTableModel {
    pub id: Option<String>,
    pub name: String,
    pub location: String,
    pub resource_group_name: String,
    /// None leaves the remote routes alone
    pub route: Option<Vec<RouteBlock>>,
    pub disable_bgp_route_propagation: bool,
    pub subnets: Vec<String>,
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteBlock {
    pub name: String,
    pub address_prefix: String,
    pub next_hop_type: String,
    pub next_hop_in_ip_address: Option<String>,
}

pub fn expand_routes(routes: &[RouteBlock]) -> Vec<Route> {
    routes
        .iter()
        .map(|r| Route {
            name: Some(r.name.clone()),
            properties: RouteProperties {
                address_prefix: Some(r.address_prefix.clone()),
                next_hop_type: Some(r.next_hop_type.clone()),
                next_hop_ip_address: r
                    .next_hop_in_ip_address
                    .clone()
                    .filter(|ip| !ip.is_empty()),
            },
            ..Default::default()
        })
        .collect()
}

/// `known` supplies the spelling of `next_hop_type` the configuration used
pub fn flatten_routes(routes: Option<&Vec<Route>>, known: &[RouteBlock]) -> Vec<RouteBlock> {
    let Some(routes) = routes else {
        return Vec::new();
    };
    routes
        .iter()
        .map(|r| {
            let name = r.name.clone().unwrap_or_default();
            let next_hop_type = r.properties.next_hop_type.clone().unwrap_or_default();
            let next_hop_type = known
                .iter()
                .find(|k| k.name == name && k.next_hop_type.eq_ignore_ascii_case(&next_hop_type))
                .map(|k| k.next_hop_type.clone())
                .unwrap_or(next_hop_type);
            RouteBlock {
                name,
                address_prefix: r.properties.address_prefix.clone().unwrap_or_default(),
                next_hop_type,
                next_hop_in_ip_address: r.properties.next_hop_ip_address.clone(),
            }
        })
        .collect()
}

pub fn flatten_subnets(subnets: Option<&Vec<SubResource>>) -> Vec<String> {
    subnets
        .map(|s| s.iter().filter_map(|s| s.id.clone()).collect())
        .unwrap_or_default()
}

pub fn expand(model: &RouteTableModel) -> RouteTable {
    RouteTable {
        location: Some(location::normalize(&model.location)),
        tags: Some(tags::expand(Some(&model.tags))),
        properties: RouteTableProperties {
            routes: model.route.as_deref().map(expand_routes),
            disable_bgp_route_propagation: Some(model.disable_bgp_route_propagation),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn flatten(id: &RouteTableId, table: &RouteTable, known: &[RouteBlock]) -> RouteTableModel {
    RouteTableModel {
        id: Some(id.id()),
        name: id.name.clone(),
        location: table.location.as_deref().map(location::normalize).unwrap_or_default(),
        resource_group_name: id.resource_group.clone(),
        route: Some(flatten_routes(table.properties.routes.as_ref(), known)),
        disable_bgp_route_propagation: table
            .properties
            .disable_bgp_route_propagation
            .unwrap_or_default(),
        subnets: flatten_subnets(table.properties.subnets.as_ref()),
        tags: tags::flatten(table.tags.as_ref()),
    }
}

pub struct RouteTableResource {
    provider_data: AzureStackProviderData,
    timeouts: Timeouts,
}

impl RouteTableResource {
    pub fn new(provider_data: AzureStackProviderData) -> Self {
        Self {
            provider_data,
            timeouts: Timeouts::default(),
        }
    }

    pub fn schema_static() -> Schema {
        let route = BlockBuilder::new()
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The name of the route")
                    .required()
                    .validator(StringLengthValidator::not_empty())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("address_prefix", AttributeType::String)
                    .description("The destination CIDR the route applies to")
                    .required()
                    .validator(StringLengthValidator::not_empty())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("next_hop_type", AttributeType::String)
                    .description("The type of hop packets are sent to")
                    .required()
                    .validator(OneOfValidator::ignore_case(&NEXT_HOP_TYPES))
                    .plan_modifier(SuppressCaseDiff)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("next_hop_in_ip_address", AttributeType::String)
                    .description("Next hop address, only allowed with VirtualAppliance")
                    .optional()
                    .build(),
            )
            .build();

        SchemaBuilder::new()
            .version(0)
            .description("Manages a route table")
            .attribute(id_attribute())
            .attribute(name_attribute("The name of the route table"))
            .attribute(location::schema())
            .attribute(resource_group_name_attribute())
            .attribute(
                AttributeBuilder::new("disable_bgp_route_propagation", AttributeType::Bool)
                    .description("Stop routes learned by BGP from reaching this table")
                    .optional()
                    .default(StaticDefault::bool(false))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("subnets", AttributeType::set_of(AttributeType::String))
                    .description("IDs of the subnets associated with the route table")
                    .computed()
                    .build(),
            )
            .attribute(tags::schema())
            .block(NestedBlock::list("route", route).computed())
            .build()
    }

    fn validate_routes(model: &RouteTableModel) -> Result<(), ProviderError> {
        for route in model.route.iter().flatten() {
            let has_ip = route.next_hop_in_ip_address.as_deref().is_some_and(|ip| !ip.is_empty());
            if has_ip && !route.next_hop_type.eq_ignore_ascii_case("VirtualAppliance") {
                return Err(ProviderError::validation(
                    TYPE_NAME,
                    format!(
                        "route {:?}: next_hop_in_ip_address is only allowed when next_hop_type is VirtualAppliance",
                        route.name
                    ),
                ));
            }
        }
        Ok(())
    }

    async fn create_table(&self, ctx: &Context, model: &RouteTableModel) -> Result<String, ProviderError> {
        Self::validate_routes(model)?;
        let network = self.provider_data.client.network();
        let id = RouteTableId::new(
            self.provider_data.client.subscription_id(),
            &model.resource_group_name,
            &model.name,
        );

        let existing = network.get_route_table(ctx, &id).await;
        ensure_absent(existing, TYPE_NAME, &id.id(), &model.name, &model.resource_group_name)?;

        tracing::info!("Creating route table {}", id);
        network
            .create_or_update_route_table(ctx, &id, &expand(model))
            .await
            .map_err(|e| {
                ProviderError::upstream(TYPE_NAME, "creating", &model.name, &model.resource_group_name, e)
            })?;
        Ok(id.id())
    }

    async fn read_table(
        &self,
        ctx: &Context,
        id: &str,
        known: &[RouteBlock],
    ) -> Result<Option<DynamicValue>, ProviderError> {
        let id = RouteTableId::parse(id)?;
        match self.provider_data.client.network().get_route_table(ctx, &id).await {
            Ok(table) => Ok(Some(encode(TYPE_NAME, &flatten(&id, &table, known))?)),
            Err(e) if e.is_not_found() => {
                tracing::warn!("Route table {} was not found, removing from state", id);
                Ok(None)
            }
            Err(e) => Err(ProviderError::upstream(TYPE_NAME, "reading", &id.name, &id.resource_group, e)),
        }
    }

    async fn update_table(
        &self,
        ctx: &Context,
        prior: &RouteTableModel,
        planned: &RouteTableModel,
    ) -> Result<String, ProviderError> {
        Self::validate_routes(planned)?;
        let id = RouteTableId::parse(prior.id.as_deref().unwrap_or_default())?;
        let network = self.provider_data.client.network();
        let upstream = |action: &'static str, e: ApiError| {
            ProviderError::upstream(TYPE_NAME, action, &id.name, &id.resource_group, e)
        };

        let mut table = network
            .get_route_table(ctx, &id)
            .await
            .map_err(|e| upstream("retrieving", e))?;
        if planned.tags != prior.tags {
            table.tags = Some(tags::expand(Some(&planned.tags)));
        }
        if planned.disable_bgp_route_propagation != prior.disable_bgp_route_propagation {
            table.properties.disable_bgp_route_propagation = Some(planned.disable_bgp_route_propagation);
        }
        if let Some(routes) = planned.route.as_deref().filter(|_| planned.route != prior.route) {
            table.properties.routes = Some(expand_routes(routes));
        }
        table.properties.provisioning_state = None;

        network
            .create_or_update_route_table(ctx, &id, &table)
            .await
            .map_err(|e| upstream("updating", e))?;
        Ok(id.id())
    }

    async fn delete_table(&self, ctx: &Context, prior: &DynamicValue) -> Result<(), ProviderError> {
        let id = RouteTableId::parse(&state_id(TYPE_NAME, prior)?)?;
        tracing::info!("Deleting route table {}", id);
        ignore_not_found(self.provider_data.client.network().delete_route_table(ctx, &id).await)
            .map_err(|e| ProviderError::upstream(TYPE_NAME, "deleting", &id.name, &id.resource_group, e))
    }
}

#[async_trait]
impl Resource for RouteTableResource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Self::schema_static()
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let ctx = ctx.with_timeout(self.timeouts.create);
        let model: RouteTableModel = match decode(TYPE_NAME, &request.planned_state) {
            Ok(model) => model,
            Err(e) => return CreateResourceResponse::failed(request.planned_state, e.into()),
        };
        let id = match self.create_table(&ctx, &model).await {
            Ok(id) => id,
            Err(e) => return CreateResourceResponse::failed(request.planned_state, e.into()),
        };
        let known = model.route.unwrap_or_default();
        let read = self.read_table(&ctx, &id, &known).await;
        created(TYPE_NAME, request.planned_state, id, read)
    }

    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let ctx = ctx.with_timeout(self.timeouts.read);
        let prior = decode_state::<RouteTableModel>(TYPE_NAME, &request.current_state)
            .and_then(|known| state_id(TYPE_NAME, &request.current_state).map(|id| (id, known)));
        let read = match prior {
            Ok((id, known)) => self.read_table(&ctx, &id, &known.route.unwrap_or_default()).await,
            Err(e) => Err(e),
        };
        read_back(request.current_state, read)
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let ctx = ctx.with_timeout(self.timeouts.update);
        let models = decode::<RouteTableModel>(TYPE_NAME, &request.prior_state).and_then(|prior| {
            decode::<RouteTableModel>(TYPE_NAME, &request.planned_state).map(|planned| (prior, planned))
        });
        let (prior, planned) = match models {
            Ok(models) => models,
            Err(e) => return UpdateResourceResponse::failed(request.prior_state, e.into()),
        };
        let id = match self.update_table(&ctx, &prior, &planned).await {
            Ok(id) => id,
            Err(e) => return UpdateResourceResponse::failed(request.prior_state, e.into()),
        };
        let read = self.read_table(&ctx, &id, &planned.route.unwrap_or_default()).await;
        updated(TYPE_NAME, request.planned_state, id, read)
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let ctx = ctx.with_timeout(self.timeouts.delete);
        deleted(self.delete_table(&ctx, &request.prior_state).await)
    }
}

#[async_trait]
impl ResourceWithImportState for RouteTableResource {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        import_id::<RouteTableId>(&request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(name: &str, next_hop_type: &str) -> RouteBlock {
        RouteBlock {
            name: name.to_string(),
            address_prefix: "10.1.0.0/16".to_string(),
            next_hop_type: next_hop_type.to_string(),
            next_hop_in_ip_address: None,
        }
    }

    #[test]
    fn routes_survive_expand_then_flatten() {
        let routes = vec![route("route1", "VnetLocal"), route("route2", "Internet")];
        assert_eq!(flatten_routes(Some(&expand_routes(&routes)), &[]), routes);
    }

    #[test]
    fn flatten_keeps_configured_casing() {
        let known = vec![route("route1", "vnetlocal")];
        let flattened = flatten_routes(Some(&expand_routes(&[route("route1", "VnetLocal")])), &known);
        assert_eq!(flattened[0].next_hop_type, "vnetlocal");
    }

    #[test]
    fn absent_routes_are_not_sent() {
        let model = RouteTableModel {
            location: "local".to_string(),
            ..Default::default()
        };
        assert!(expand(&model).properties.routes.is_none());

        let emptied = RouteTableModel {
            route: Some(vec![]),
            ..model
        };
        assert_eq!(expand(&emptied).properties.routes, Some(vec![]));
    }

    #[test]
    fn flatten_without_routes_reports_none() {
        let id = RouteTableId::new("s", "rg", "rt");
        let model = flatten(&id, &RouteTable::default(), &[]);
        assert_eq!(model.route, Some(vec![]));
        assert!(model.subnets.is_empty());
        assert!(!model.disable_bgp_route_propagation);
    }

    #[test]
    fn next_hop_ip_requires_virtual_appliance() {
        let mut bad = route("route1", "VnetLocal");
        bad.next_hop_in_ip_address = Some("10.0.0.4".to_string());
        let model = RouteTableModel {
            route: Some(vec![bad]),
            ..Default::default()
        };
        assert!(matches!(
            RouteTableResource::validate_routes(&model),
            Err(ProviderError::Validation { .. })
        ));

        let mut good = route("route1", "virtualappliance");
        good.next_hop_in_ip_address = Some("10.0.0.4".to_string());
        let model = RouteTableModel {
            route: Some(vec![good]),
            ..Default::default()
        };
        assert!(RouteTableResource::validate_routes(&model).is_ok());
    }
}
