//! Terraform provider for Azure Stack Hub

pub mod api;
pub mod config;
pub mod data_sources;
pub mod error;
pub mod ids;
pub mod location;
pub mod provider_data;
pub mod resources;
pub mod tags;

use async_trait::async_trait;
use std::collections::HashMap;
use tfplug::context::Context;
use tfplug::provider::{ConfigureProviderRequest, ConfigureProviderResponse};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::{DataSource, Diagnostic, Provider, Resource, TfplugError};

use crate::api::{Client, ConnectSettings};
use crate::config::ProviderSettings;
use crate::provider_data::AzureStackProviderData;

pub struct AzureStackProvider {
    provider_data: Option<AzureStackProviderData>,
}

impl Default for AzureStackProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl AzureStackProvider {
    pub fn new() -> Self {
        Self { provider_data: None }
    }

    /// A provider that skips configure, for callers holding a ready client
    pub fn with_provider_data(provider_data: AzureStackProviderData) -> Self {
        Self {
            provider_data: Some(provider_data),
        }
    }

    pub fn schema_static() -> Schema {
        let string = |name: &str, description: &str| {
            AttributeBuilder::new(name, AttributeType::String)
                .description(description)
                .optional()
                .build()
        };
        SchemaBuilder::new()
            .version(0)
            .description("Azure Stack Hub")
            .attribute(string(
                "arm_endpoint",
                "The Azure Resource Manager endpoint of the stamp. Falls back to ARM_ENDPOINT",
            ))
            .attribute(string("subscription_id", "Falls back to ARM_SUBSCRIPTION_ID"))
            .attribute(string("tenant_id", "Falls back to ARM_TENANT_ID"))
            .attribute(string("client_id", "Falls back to ARM_CLIENT_ID"))
            .attribute(
                AttributeBuilder::new("client_secret", AttributeType::String)
                    .description("Falls back to ARM_CLIENT_SECRET")
                    .optional()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("insecure", AttributeType::Bool)
                    .description("Skip TLS verification. Falls back to ARM_INSECURE")
                    .optional()
                    .build(),
            )
            .build()
    }

    fn provider_data(&self) -> tfplug::Result<AzureStackProviderData> {
        self.provider_data
            .clone()
            .ok_or(TfplugError::ProviderNotConfigured)
    }
}

#[async_trait]
impl Provider for AzureStackProvider {
    fn type_name(&self) -> &str {
        "azurestack"
    }

    fn schema(&self) -> Schema {
        Self::schema_static()
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        let settings = match ProviderSettings::from_config(&request.config) {
            Ok(settings) => settings,
            Err(diagnostics) => return ConfigureProviderResponse { diagnostics },
        };

        let connected = Client::connect(ConnectSettings {
            arm_endpoint: &settings.arm_endpoint,
            subscription_id: &settings.subscription_id,
            tenant_id: &settings.tenant_id,
            client_id: &settings.client_id,
            client_secret: &settings.client_secret,
            insecure: settings.insecure,
        })
        .await;

        match connected {
            Ok(client) => {
                tracing::info!("Configured provider for {}", settings.arm_endpoint);
                self.provider_data = Some(AzureStackProviderData::new(client, &settings));
                ConfigureProviderResponse::default()
            }
            Err(e) => ConfigureProviderResponse {
                diagnostics: vec![Diagnostic::error(
                    "Failed to create API client",
                    format!("connecting to {}: {}", settings.arm_endpoint, e),
                )],
            },
        }
    }

    async fn create_resource(&self, name: &str) -> tfplug::Result<Box<dyn Resource>> {
        let data = self.provider_data()?;

        match name {
            "azurestack_resource_group" => Ok(Box::new(resources::ResourceGroupResource::new(data))),
            "azurestack_dns_ns_record" => Ok(Box::new(resources::NsRecordResource::new(data))),
            "azurestack_dns_mx_record" => Ok(Box::new(resources::MxRecordResource::new(data))),
            "azurestack_route_table" => Ok(Box::new(resources::RouteTableResource::new(data))),
            "azurestack_local_network_gateway" => {
                Ok(Box::new(resources::LocalNetworkGatewayResource::new(data)))
            }
            "azurestack_network_interface_backend_address_pool_association" => Ok(Box::new(
                resources::NetworkInterfaceBackendAddressPoolAssociationResource::new(data),
            )),
            "azurestack_virtual_machine" => Ok(Box::new(resources::VirtualMachineResource::new(data))),
            "azurestack_storage_blob" => Ok(Box::new(resources::StorageBlobResource::new(data))),
            "azurestack_template_deployment" => {
                Ok(Box::new(resources::TemplateDeploymentResource::new(data)))
            }
            _ => Err(TfplugError::ResourceNotFound(name.to_string())),
        }
    }

    async fn create_data_source(&self, name: &str) -> tfplug::Result<Box<dyn DataSource>> {
        let data = self.provider_data()?;

        match name {
            "azurestack_client_config" => Ok(Box::new(data_sources::ClientConfigDataSource::new(data))),
            "azurestack_network_interface" => {
                Ok(Box::new(data_sources::NetworkInterfaceDataSource::new(data)))
            }
            _ => Err(TfplugError::DataSourceNotFound(name.to_string())),
        }
    }

    fn resource_schemas(&self) -> HashMap<String, Schema> {
        static SCHEMAS: std::sync::OnceLock<HashMap<String, Schema>> = std::sync::OnceLock::new();

        SCHEMAS
            .get_or_init(|| {
                [
                    (
                        "azurestack_resource_group",
                        resources::ResourceGroupResource::schema_static(),
                    ),
                    ("azurestack_dns_ns_record", resources::NsRecordResource::schema_static()),
                    ("azurestack_dns_mx_record", resources::MxRecordResource::schema_static()),
                    ("azurestack_route_table", resources::RouteTableResource::schema_static()),
                    (
                        "azurestack_local_network_gateway",
                        resources::LocalNetworkGatewayResource::schema_static(),
                    ),
                    (
                        "azurestack_network_interface_backend_address_pool_association",
                        resources::NetworkInterfaceBackendAddressPoolAssociationResource::schema_static(),
                    ),
                    (
                        "azurestack_virtual_machine",
                        resources::VirtualMachineResource::schema_static(),
                    ),
                    ("azurestack_storage_blob", resources::StorageBlobResource::schema_static()),
                    (
                        "azurestack_template_deployment",
                        resources::TemplateDeploymentResource::schema_static(),
                    ),
                ]
                .into_iter()
                .map(|(name, schema)| (name.to_string(), schema))
                .collect()
            })
            .clone()
    }

    fn data_source_schemas(&self) -> HashMap<String, Schema> {
        static SCHEMAS: std::sync::OnceLock<HashMap<String, Schema>> = std::sync::OnceLock::new();

        SCHEMAS
            .get_or_init(|| {
                let mut schemas = HashMap::new();
                schemas.insert(
                    "azurestack_client_config".to_string(),
                    data_sources::ClientConfigDataSource::schema_static(),
                );
                schemas.insert(
                    "azurestack_network_interface".to_string(),
                    data_sources::NetworkInterfaceDataSource::schema_static(),
                );
                schemas
            })
            .clone()
    }
}
