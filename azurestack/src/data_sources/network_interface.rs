//! `azurestack_network_interface` data source

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tfplug::context::Context;
use tfplug::data_source::{DataSource, ReadDataSourceRequest, ReadDataSourceResponse};
use tfplug::schema::{AttributeBuilder, AttributeType, BlockBuilder, NestedBlock, Schema, SchemaBuilder};
use tfplug::validator::StringLengthValidator;
use tfplug::DynamicValue;

use crate::api::common::SubResource;
use crate::api::network::{IpConfigurationProperties, NetworkInterface};
use crate::error::ProviderError;
use crate::ids::{NetworkInterfaceId, ResourceId};
use crate::provider_data::AzureStackProviderData;
use crate::resources::common::{decode, encode};
use crate::{location, tags};

const TYPE_NAME: &str = "azurestack_network_interface";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkInterfaceDataModel {
    pub id: Option<String>,
    pub name: String,
    pub resource_group_name: String,
    pub location: String,
    pub network_security_group_id: String,
    pub mac_address: String,
    pub virtual_machine_id: String,
    pub ip_configuration: Vec<IpConfigurationBlock>,
    pub dns_servers: Vec<String>,
    pub internal_dns_name_label: String,
    pub applied_dns_servers: Vec<String>,
    pub enable_ip_forwarding: bool,
    pub private_ip_address: String,
    pub private_ip_addresses: Vec<String>,
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IpConfigurationBlock {
    pub name: String,
    pub subnet_id: String,
    pub private_ip_address: String,
    pub private_ip_address_version: String,
    pub private_ip_address_allocation: String,
    pub public_ip_address_id: String,
    pub application_gateway_backend_address_pools_ids: Vec<String>,
    pub load_balancer_backend_address_pools_ids: Vec<String>,
    pub load_balancer_inbound_nat_rules_ids: Vec<String>,
    pub primary: bool,
}

fn sub_id(sub: Option<&SubResource>) -> String {
    sub.and_then(|s| s.id.clone()).unwrap_or_default()
}

fn sub_ids(subs: Option<&Vec<SubResource>>) -> Vec<String> {
    subs.into_iter()
        .flatten()
        .filter_map(|s| s.id.clone())
        .collect()
}

fn flatten_ip_configuration(name: Option<&str>, props: &IpConfigurationProperties) -> IpConfigurationBlock {
    IpConfigurationBlock {
        name: name.unwrap_or_default().to_string(),
        subnet_id: sub_id(props.subnet.as_ref()),
        private_ip_address: props.private_ip_address.clone().unwrap_or_default(),
        private_ip_address_version: props.private_ip_address_version.clone().unwrap_or_default(),
        private_ip_address_allocation: props
            .private_ip_allocation_method
            .as_deref()
            .map(str::to_ascii_lowercase)
            .unwrap_or_default(),
        public_ip_address_id: sub_id(props.public_ip_address.as_ref()),
        application_gateway_backend_address_pools_ids: sub_ids(
            props.application_gateway_backend_address_pools.as_ref(),
        ),
        load_balancer_backend_address_pools_ids: sub_ids(props.load_balancer_backend_address_pools.as_ref()),
        load_balancer_inbound_nat_rules_ids: sub_ids(props.load_balancer_inbound_nat_rules.as_ref()),
        primary: props.primary.unwrap_or(false),
    }
}

pub fn flatten(id: &NetworkInterfaceId, nic: &NetworkInterface) -> NetworkInterfaceDataModel {
    let props = &nic.properties;
    let ip_configuration: Vec<IpConfigurationBlock> = props
        .ip_configurations
        .iter()
        .flatten()
        .map(|c| flatten_ip_configuration(c.name.as_deref(), &c.properties))
        .collect();
    let private_ip_addresses: Vec<String> = ip_configuration
        .iter()
        .map(|c| c.private_ip_address.clone())
        .filter(|ip| !ip.is_empty())
        .collect();
    let dns = props.dns_settings.clone().unwrap_or_default();

    NetworkInterfaceDataModel {
        id: Some(id.id()),
        name: id.name.clone(),
        resource_group_name: id.resource_group.clone(),
        location: nic.location.as_deref().map(location::normalize).unwrap_or_default(),
        network_security_group_id: sub_id(props.network_security_group.as_ref()),
        mac_address: props.mac_address.clone().unwrap_or_default(),
        virtual_machine_id: sub_id(props.virtual_machine.as_ref()),
        dns_servers: dns.dns_servers.unwrap_or_default(),
        internal_dns_name_label: dns.internal_dns_name_label.unwrap_or_default(),
        applied_dns_servers: dns.applied_dns_servers.unwrap_or_default(),
        enable_ip_forwarding: props.enable_ip_forwarding.unwrap_or(false),
        private_ip_address: private_ip_addresses.first().cloned().unwrap_or_default(),
        private_ip_addresses,
        ip_configuration,
        tags: tags::flatten(nic.tags.as_ref()),
    }
}

pub struct NetworkInterfaceDataSource {
    provider_data: AzureStackProviderData,
}

impl NetworkInterfaceDataSource {
    pub fn new(provider_data: AzureStackProviderData) -> Self {
        Self { provider_data }
    }

    pub fn schema_static() -> Schema {
        let string = |name: &str, description: &str| {
            AttributeBuilder::new(name, AttributeType::String)
                .description(description)
                .computed()
                .build()
        };
        let strings = |name: &str, description: &str| {
            AttributeBuilder::new(name, AttributeType::list_of(AttributeType::String))
                .description(description)
                .computed()
                .build()
        };

        let ip_configuration = BlockBuilder::new()
            .attribute(string("name", "The name of the IP configuration"))
            .attribute(string("subnet_id", "The subnet the configuration is placed in"))
            .attribute(string("private_ip_address", "The private IP address"))
            .attribute(string("private_ip_address_version", "IPv4 or IPv6"))
            .attribute(string("private_ip_address_allocation", "static or dynamic"))
            .attribute(string("public_ip_address_id", "The attached public IP address"))
            .attribute(strings(
                "application_gateway_backend_address_pools_ids",
                "Application gateway backend pools the configuration belongs to",
            ))
            .attribute(strings(
                "load_balancer_backend_address_pools_ids",
                "Load balancer backend pools the configuration belongs to",
            ))
            .attribute(strings(
                "load_balancer_inbound_nat_rules_ids",
                "Load balancer inbound NAT rules the configuration belongs to",
            ))
            .attribute(
                AttributeBuilder::new("primary", AttributeType::Bool)
                    .description("Whether this is the primary configuration")
                    .computed()
                    .build(),
            )
            .build();

        SchemaBuilder::new()
            .version(0)
            .description("Look up an existing network interface")
            .attribute(string("id", "The network interface ID"))
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The name of the network interface")
                    .required()
                    .validator(StringLengthValidator::not_empty())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("resource_group_name", AttributeType::String)
                    .description("The resource group the network interface lives in")
                    .required()
                    .validator(StringLengthValidator::between(1, 90))
                    .build(),
            )
            .attribute(location::computed_schema())
            .attribute(string("network_security_group_id", "The attached network security group"))
            .attribute(string("mac_address", "The MAC address"))
            .attribute(string("virtual_machine_id", "The virtual machine the interface is attached to"))
            .attribute(strings("dns_servers", "DNS servers configured on the interface"))
            .attribute(string("internal_dns_name_label", "The internal DNS label"))
            .attribute(strings("applied_dns_servers", "DNS servers in effect on the interface"))
            .attribute(
                AttributeBuilder::new("enable_ip_forwarding", AttributeType::Bool)
                    .description("Whether IP forwarding is enabled")
                    .computed()
                    .build(),
            )
            .attribute(string("private_ip_address", "The first private IP address"))
            .attribute(strings("private_ip_addresses", "Every private IP address"))
            .attribute(
                AttributeBuilder::new("tags", AttributeType::map_of(AttributeType::String))
                    .description("Tags on the network interface")
                    .computed()
                    .build(),
            )
            .block(NestedBlock::list("ip_configuration", ip_configuration).computed())
            .build()
    }

    async fn read_interface(&self, ctx: &Context, config: &DynamicValue) -> Result<DynamicValue, ProviderError> {
        let model: NetworkInterfaceDataModel = decode(TYPE_NAME, config)?;
        let id = NetworkInterfaceId::new(
            self.provider_data.client.subscription_id(),
            &model.resource_group_name,
            &model.name,
        );
        match self.provider_data.client.network().get_network_interface(ctx, &id).await {
            Ok(nic) => encode(TYPE_NAME, &flatten(&id, &nic)),
            Err(e) if e.is_not_found() => Err(ProviderError::NotFound {
                resource_type: TYPE_NAME,
                id: id.id(),
            }),
            Err(e) => Err(ProviderError::upstream(
                TYPE_NAME,
                "reading",
                &id.name,
                &id.resource_group,
                e,
            )),
        }
    }
}

#[async_trait]
impl DataSource for NetworkInterfaceDataSource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Self::schema_static()
    }

    async fn read(&self, ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        match self.read_interface(&ctx, &request.config).await {
            Ok(state) => ReadDataSourceResponse {
                state,
                diagnostics: vec![],
            },
            Err(e) => ReadDataSourceResponse::failed(request.config, e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::network::{NetworkInterfaceDnsSettings, NetworkInterfaceIpConfiguration};

    fn ip_config(name: &str, ip: &str, primary: bool) -> NetworkInterfaceIpConfiguration {
        NetworkInterfaceIpConfiguration {
            name: Some(name.to_string()),
            properties: IpConfigurationProperties {
                subnet: Some(SubResource::new("/subnet")),
                private_ip_address: Some(ip.to_string()),
                private_ip_allocation_method: Some("Dynamic".to_string()),
                primary: Some(primary),
                load_balancer_backend_address_pools: Some(vec![SubResource::new("/pool1")]),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn flatten_collects_private_addresses_in_order() {
        let mut nic = NetworkInterface {
            location: Some("Local".to_string()),
            ..Default::default()
        };
        nic.properties.ip_configurations = Some(vec![
            ip_config("ipconfig1", "10.0.0.4", true),
            ip_config("ipconfig2", "10.0.0.5", false),
        ]);
        nic.properties.dns_settings = Some(NetworkInterfaceDnsSettings {
            applied_dns_servers: Some(vec!["10.0.0.2".to_string()]),
            ..Default::default()
        });

        let model = flatten(&NetworkInterfaceId::new("s", "rg", "nic1"), &nic);
        assert_eq!(model.private_ip_address, "10.0.0.4");
        assert_eq!(model.private_ip_addresses, vec!["10.0.0.4", "10.0.0.5"]);
        assert_eq!(model.ip_configuration[0].private_ip_address_allocation, "dynamic");
        assert_eq!(model.ip_configuration[0].load_balancer_backend_address_pools_ids, vec!["/pool1"]);
        assert!(model.ip_configuration[0].primary);
        assert_eq!(model.applied_dns_servers, vec!["10.0.0.2"]);
        assert!(model.dns_servers.is_empty());
        assert_eq!(model.location, "local");
    }

    #[test]
    fn flatten_empty_interface() {
        let model = flatten(&NetworkInterfaceId::new("s", "rg", "nic1"), &NetworkInterface::default());
        assert_eq!(model.name, "nic1");
        assert!(model.private_ip_address.is_empty());
        assert!(model.ip_configuration.is_empty());
        assert!(!model.enable_ip_forwarding);
    }
}
