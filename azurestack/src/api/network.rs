use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tfplug::Context;

use super::client::Client;
use super::common::SubResource;
use super::error::ApiError;
use crate::ids::{LocalNetworkGatewayId, NetworkInterfaceId, ResourceId, RouteTableId};

pub const API_VERSION: &str = "2018-11-01";

pub struct NetworkApi<'a> {
    client: &'a Client,
}

impl<'a> NetworkApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn get_route_table(&self, ctx: &Context, id: &RouteTableId) -> Result<RouteTable, ApiError> {
        self.client.get(ctx, &id.id(), API_VERSION).await
    }

    pub async fn create_or_update_route_table(
        &self,
        ctx: &Context,
        id: &RouteTableId,
        table: &RouteTable,
    ) -> Result<(), ApiError> {
        self.client.put_and_wait(ctx, &id.id(), API_VERSION, table).await
    }

    pub async fn delete_route_table(&self, ctx: &Context, id: &RouteTableId) -> Result<(), ApiError> {
        self.client.delete_and_wait(ctx, &id.id(), API_VERSION).await
    }

    pub async fn get_local_network_gateway(
        &self,
        ctx: &Context,
        id: &LocalNetworkGatewayId,
    ) -> Result<LocalNetworkGateway, ApiError> {
        self.client.get(ctx, &id.id(), API_VERSION).await
    }

    pub async fn create_or_update_local_network_gateway(
        &self,
        ctx: &Context,
        id: &LocalNetworkGatewayId,
        gateway: &LocalNetworkGateway,
    ) -> Result<(), ApiError> {
        self.client.put_and_wait(ctx, &id.id(), API_VERSION, gateway).await
    }

    pub async fn delete_local_network_gateway(
        &self,
        ctx: &Context,
        id: &LocalNetworkGatewayId,
    ) -> Result<(), ApiError> {
        self.client.delete_and_wait(ctx, &id.id(), API_VERSION).await
    }

    pub async fn get_network_interface(
        &self,
        ctx: &Context,
        id: &NetworkInterfaceId,
    ) -> Result<NetworkInterface, ApiError> {
        self.client.get(ctx, &id.id(), API_VERSION).await
    }

    pub async fn create_or_update_network_interface(
        &self,
        ctx: &Context,
        id: &NetworkInterfaceId,
        nic: &NetworkInterface,
    ) -> Result<(), ApiError> {
        self.client.put_and_wait(ctx, &id.id(), API_VERSION, nic).await
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteTable {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, String>>,
    #[serde(default)]
    pub properties: RouteTableProperties,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteTableProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routes: Option<Vec<Route>>,
    /// Read-only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnets: Option<Vec<SubResource>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_bgp_route_propagation: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub properties: RouteProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_hop_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_hop_ip_address: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocalNetworkGateway {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, String>>,
    #[serde(default)]
    pub properties: LocalNetworkGatewayProperties,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalNetworkGatewayProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_network_address_space: Option<AddressSpace>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bgp_settings: Option<BgpSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressSpace {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_prefixes: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BgpSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asn: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bgp_peering_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer_weight: Option<i64>,
}

/// Network interfaces are written back after a partial change, so fields the
/// provider does not model are carried through untouched in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkInterface {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, String>>,
    #[serde(default)]
    pub properties: NetworkInterfaceProperties,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterfaceProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub virtual_machine: Option<SubResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_security_group: Option<SubResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_configurations: Option<Vec<NetworkInterfaceIpConfiguration>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_settings: Option<NetworkInterfaceDnsSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary: Option<bool>,
    #[serde(rename = "enableIPForwarding", skip_serializing_if = "Option::is_none")]
    pub enable_ip_forwarding: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterfaceDnsSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_servers: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_dns_servers: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_dns_name_label: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkInterfaceIpConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub properties: IpConfigurationProperties,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IpConfigurationProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet: Option<SubResource>,
    #[serde(rename = "privateIPAddress", skip_serializing_if = "Option::is_none")]
    pub private_ip_address: Option<String>,
    #[serde(rename = "privateIPAddressVersion", skip_serializing_if = "Option::is_none")]
    pub private_ip_address_version: Option<String>,
    #[serde(rename = "privateIPAllocationMethod", skip_serializing_if = "Option::is_none")]
    pub private_ip_allocation_method: Option<String>,
    #[serde(rename = "publicIPAddress", skip_serializing_if = "Option::is_none")]
    pub public_ip_address: Option<SubResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary: Option<bool>,
    #[serde(
        rename = "applicationGatewayBackendAddressPools",
        skip_serializing_if = "Option::is_none"
    )]
    pub application_gateway_backend_address_pools: Option<Vec<SubResource>>,
    #[serde(
        rename = "loadBalancerBackendAddressPools",
        skip_serializing_if = "Option::is_none"
    )]
    pub load_balancer_backend_address_pools: Option<Vec<SubResource>>,
    #[serde(
        rename = "loadBalancerInboundNatRules",
        skip_serializing_if = "Option::is_none"
    )]
    pub load_balancer_inbound_nat_rules: Option<Vec<SubResource>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NetworkInterface {
    pub fn ip_configuration_mut(&mut self, name: &str) -> Option<&mut NetworkInterfaceIpConfiguration> {
        self.properties
            .ip_configurations
            .as_mut()?
            .iter_mut()
            .find(|c| c.name.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(name)))
    }

    pub fn ip_configuration(&self, name: &str) -> Option<&NetworkInterfaceIpConfiguration> {
        self.properties
            .ip_configurations
            .as_ref()?
            .iter()
            .find(|c| c.name.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(name)))
    }
}
