//! `azurestack_client_config`: the identity the provider was configured with

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tfplug::context::Context;
use tfplug::data_source::{DataSource, ReadDataSourceRequest, ReadDataSourceResponse};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::DynamicValue;

use crate::provider_data::AzureStackProviderData;

const TYPE_NAME: &str = "azurestack_client_config";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientConfigModel {
    pub id: String,
    pub client_id: String,
    pub tenant_id: String,
    pub subscription_id: String,
}

pub struct ClientConfigDataSource {
    provider_data: AzureStackProviderData,
}

impl ClientConfigDataSource {
    pub fn new(provider_data: AzureStackProviderData) -> Self {
        Self { provider_data }
    }

    pub fn schema_static() -> Schema {
        let computed = |name: &str, description: &str| {
            AttributeBuilder::new(name, AttributeType::String)
                .description(description)
                .computed()
                .build()
        };
        SchemaBuilder::new()
            .version(0)
            .description("Details of the credentials the provider is using")
            .attribute(computed("id", "Time of the read"))
            .attribute(computed("client_id", "The service principal's client ID"))
            .attribute(computed("tenant_id", "The tenant the service principal belongs to"))
            .attribute(computed("subscription_id", "The subscription resources are managed in"))
            .build()
    }

    pub fn model(&self) -> ClientConfigModel {
        ClientConfigModel {
            id: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            client_id: self.provider_data.client_id.clone(),
            tenant_id: self.provider_data.tenant_id.clone(),
            subscription_id: self.provider_data.subscription_id.clone(),
        }
    }
}

#[async_trait]
impl DataSource for ClientConfigDataSource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Self::schema_static()
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        match DynamicValue::from_typed(&self.model()) {
            Ok(state) => ReadDataSourceResponse {
                state,
                diagnostics: vec![],
            },
            Err(e) => ReadDataSourceResponse::failed(
                request.config,
                tfplug::Diagnostic::error("Failed to convert client config", e.to_string()),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::test_support::{create_test_client, SUBSCRIPTION};

    fn data_source() -> ClientConfigDataSource {
        ClientConfigDataSource::new(AzureStackProviderData {
            client: create_test_client("https://management.local.azurestack.external"),
            subscription_id: SUBSCRIPTION.to_string(),
            tenant_id: "tenant".to_string(),
            client_id: "client".to_string(),
        })
    }

    #[test]
    fn read_reports_identity() {
        let response = tokio_test::block_on(data_source().read(
            Context::new(),
            ReadDataSourceRequest {
                type_name: TYPE_NAME.to_string(),
                config: DynamicValue::empty_object(),
            },
        ));

        assert!(response.diagnostics.is_empty());
        let model: std::collections::HashMap<String, String> = response.state.decode().unwrap();
        assert_eq!(model["subscription_id"], SUBSCRIPTION);
        assert_eq!(model["tenant_id"], "tenant");
        assert_eq!(model["client_id"], "client");
        assert!(chrono::DateTime::parse_from_rfc3339(&model["id"]).is_ok());
    }

    #[test]
    fn every_attribute_is_computed() {
        let schema = ClientConfigDataSource::schema_static();
        for name in ["id", "client_id", "tenant_id", "subscription_id"] {
            let attribute = schema.attribute(name).unwrap();
            assert!(attribute.computed && !attribute.required, "{}", name);
        }
    }
}
