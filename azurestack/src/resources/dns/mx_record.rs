//! `azurestack_dns_mx_record`

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
use tfplug::validator::{NumberRangeValidator, StringLengthValidator};
use tfplug::DynamicValue;

use super::{fqdn_attribute, ttl_attribute, zone_name_attribute};
use crate::api::dns::{MxRecord, RecordSet, RecordSetProperties};
use crate::api::{ignore_not_found, ApiError};
use crate::config::Timeouts;
use crate::error::ProviderError;
use crate::ids::{MxRecordId, ResourceId};
use crate::provider_data::AzureStackProviderData;
use crate::resources::common::{
    created, decode, decode_state, deleted, encode, ensure_absent, id_attribute, import_id, name_attribute,
    order_like, read_back, resource_group_name_attribute, state_id, updated,
};
use crate::tags;

const TYPE_NAME: &str = "azurestack_dns_mx_record";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MxRecordModel {
    pub id: Option<String>,
    pub name: String,
    pub resource_group_name: String,
    pub zone_name: String,
    pub record: Vec<MxRecordBlock>,
    pub ttl: i64,
    pub fqdn: String,
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MxRecordBlock {
    pub preference: i64,
    pub exchange: String,
}

pub fn expand_records(records: &[MxRecordBlock]) -> Vec<MxRecord> {
    records
        .iter()
        .map(|r| MxRecord {
            preference: Some(r.preference),
            exchange: Some(r.exchange.clone()),
        })
        .collect()
}

/// `record` is a set; members come back in the order Terraform already knows
pub fn flatten_records(records: Option<&Vec<MxRecord>>, known: &[MxRecordBlock]) -> Vec<MxRecordBlock> {
    let flattened = records
        .map(|records| {
            records
                .iter()
                .map(|r| MxRecordBlock {
                    preference: r.preference.unwrap_or_default(),
                    exchange: r.exchange.clone().unwrap_or_default(),
                })
                .collect()
        })
        .unwrap_or_default();
    order_like(flattened, known)
}

pub fn expand(model: &MxRecordModel) -> RecordSet {
    RecordSet {
        properties: RecordSetProperties {
            metadata: Some(tags::expand(Some(&model.tags))),
            ttl: Some(model.ttl),
            mx_records: Some(expand_records(&model.record)),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn flatten(id: &MxRecordId, record_set: &RecordSet, known: &[MxRecordBlock]) -> MxRecordModel {
    let properties = &record_set.properties;
    MxRecordModel {
        id: Some(id.id()),
        name: id.name.clone(),
        resource_group_name: id.resource_group.clone(),
        zone_name: id.zone_name.clone(),
        record: flatten_records(properties.mx_records.as_ref(), known),
        ttl: properties.ttl.unwrap_or_default(),
        fqdn: properties.fqdn.clone().unwrap_or_default(),
        tags: tags::flatten(properties.metadata.as_ref()),
    }
}

pub struct MxRecordResource {
    provider_data: AzureStackProviderData,
    timeouts: Timeouts,
}

impl MxRecordResource {
    pub fn new(provider_data: AzureStackProviderData) -> Self {
        Self {
            provider_data,
            timeouts: Timeouts::default(),
        }
    }

    pub fn schema_static() -> Schema {
        let record = BlockBuilder::new()
            .attribute(
                AttributeBuilder::new("preference", AttributeType::Number)
                    .description("Preference of the mail exchanger, lower is preferred")
                    .required()
                    .validator(NumberRangeValidator {
                        min: Some(0.0),
                        max: Some(65535.0),
                    })
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("exchange", AttributeType::String)
                    .description("Host name of the mail exchanger")
                    .required()
                    .validator(StringLengthValidator::not_empty())
                    .build(),
            )
            .build();

        SchemaBuilder::new()
            .version(0)
            .description("Manages a DNS MX record set")
            .attribute(id_attribute())
            .attribute(name_attribute("The name of the record set"))
            .attribute(resource_group_name_attribute())
            .attribute(zone_name_attribute())
            .attribute(ttl_attribute())
            .attribute(fqdn_attribute())
            .attribute(tags::schema())
            .block(NestedBlock::set("record", record).min_items(1))
            .build()
    }

    async fn create_record(&self, ctx: &Context, model: &MxRecordModel) -> Result<String, ProviderError> {
        let dns = self.provider_data.client.dns();
        let id = MxRecordId::new(
            self.provider_data.client.subscription_id(),
            &model.resource_group_name,
            &model.zone_name,
            &model.name,
        );

        let existing = dns.get_mx_record_set(ctx, &id).await;
        ensure_absent(existing, TYPE_NAME, &id.id(), &model.name, &model.resource_group_name)?;

        tracing::info!("Creating DNS MX record {}", id);
        dns.put_mx_record_set(ctx, &id, &expand(model))
            .await
            .map_err(|e| {
                ProviderError::upstream(TYPE_NAME, "creating", &model.name, &model.resource_group_name, e)
            })?;
        Ok(id.id())
    }

    async fn read_record(
        &self,
        ctx: &Context,
        id: &str,
        known: &[MxRecordBlock],
    ) -> Result<Option<DynamicValue>, ProviderError> {
        let id = MxRecordId::parse(id)?;
        match self.provider_data.client.dns().get_mx_record_set(ctx, &id).await {
            Ok(record_set) => Ok(Some(encode(TYPE_NAME, &flatten(&id, &record_set, known))?)),
            Err(e) if e.is_not_found() => {
                tracing::warn!("DNS MX record {} was not found, removing from state", id);
                Ok(None)
            }
            Err(e) => Err(ProviderError::upstream(TYPE_NAME, "reading", &id.name, &id.resource_group, e)),
        }
    }

    async fn update_record(
        &self,
        ctx: &Context,
        prior: &DynamicValue,
        model: &MxRecordModel,
    ) -> Result<String, ProviderError> {
        let id = MxRecordId::parse(&state_id(TYPE_NAME, prior)?)?;
        let dns = self.provider_data.client.dns();
        let upstream = |action: &'static str, e: ApiError| {
            ProviderError::upstream(TYPE_NAME, action, &id.name, &id.resource_group, e)
        };

        let mut record_set = dns
            .get_mx_record_set(ctx, &id)
            .await
            .map_err(|e| upstream("retrieving", e))?;
        let desired = expand(model).properties;
        record_set.properties.ttl = desired.ttl;
        record_set.properties.metadata = desired.metadata;
        record_set.properties.mx_records = desired.mx_records;

        dns.put_mx_record_set(ctx, &id, &record_set)
            .await
            .map_err(|e| upstream("updating", e))?;
        Ok(id.id())
    }

    async fn delete_record(&self, ctx: &Context, prior: &DynamicValue) -> Result<(), ProviderError> {
        let id = MxRecordId::parse(&state_id(TYPE_NAME, prior)?)?;
        tracing::info!("Deleting DNS MX record {}", id);
        ignore_not_found(self.provider_data.client.dns().delete_mx_record_set(ctx, &id).await)
            .map_err(|e| ProviderError::upstream(TYPE_NAME, "deleting", &id.name, &id.resource_group, e))
    }
}

#[async_trait]
impl Resource for MxRecordResource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Self::schema_static()
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let ctx = ctx.with_timeout(self.timeouts.create);
        let model: MxRecordModel = match decode(TYPE_NAME, &request.planned_state) {
            Ok(model) => model,
            Err(e) => return CreateResourceResponse::failed(request.planned_state, e.into()),
        };
        let id = match self.create_record(&ctx, &model).await {
            Ok(id) => id,
            Err(e) => return CreateResourceResponse::failed(request.planned_state, e.into()),
        };
        let read = self.read_record(&ctx, &id, &model.record).await;
        created(TYPE_NAME, request.planned_state, id, read)
    }

    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let ctx = ctx.with_timeout(self.timeouts.read);
        let prior = decode_state::<MxRecordModel>(TYPE_NAME, &request.current_state)
            .and_then(|known| state_id(TYPE_NAME, &request.current_state).map(|id| (id, known)));
        let read = match prior {
            Ok((id, known)) => self.read_record(&ctx, &id, &known.record).await,
            Err(e) => Err(e),
        };
        read_back(request.current_state, read)
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let ctx = ctx.with_timeout(self.timeouts.update);
        let model: MxRecordModel = match decode(TYPE_NAME, &request.planned_state) {
            Ok(model) => model,
            Err(e) => return UpdateResourceResponse::failed(request.prior_state, e.into()),
        };
        let id = match self.update_record(&ctx, &request.prior_state, &model).await {
            Ok(id) => id,
            Err(e) => return UpdateResourceResponse::failed(request.prior_state, e.into()),
        };
        let read = self.read_record(&ctx, &id, &model.record).await;
        updated(TYPE_NAME, request.planned_state, id, read)
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let ctx = ctx.with_timeout(self.timeouts.delete);
        deleted(self.delete_record(&ctx, &request.prior_state).await)
    }
}

#[async_trait]
impl ResourceWithImportState for MxRecordResource {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        import_id::<MxRecordId>(&request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(preference: i64, exchange: &str) -> MxRecordBlock {
        MxRecordBlock {
            preference,
            exchange: exchange.to_string(),
        }
    }

    #[test]
    fn records_survive_expand_then_flatten_in_any_order() {
        let records = vec![block(10, "mail1.contoso.com"), block(20, "mail2.contoso.com")];
        let mut reversed = expand_records(&records);
        reversed.reverse();

        let flattened = flatten_records(Some(&reversed), &[]);
        assert_eq!(flattened.len(), 2);
        assert!(records.iter().all(|r| flattened.contains(r)));

        assert_eq!(flatten_records(Some(&reversed), &records), records);
    }

    #[test]
    fn missing_fields_flatten_to_defaults() {
        let flattened = flatten_records(
            Some(&vec![MxRecord {
                preference: None,
                exchange: Some("mail.contoso.com".to_string()),
            }]),
            &[],
        );
        assert_eq!(flattened, vec![block(0, "mail.contoso.com")]);
        assert!(flatten_records(None, &[]).is_empty());
    }

    #[test]
    fn expand_sends_ttl_and_metadata() {
        let model = MxRecordModel {
            ttl: 300,
            record: vec![block(10, "mail.contoso.com")],
            ..Default::default()
        };
        let body = serde_json::to_value(expand(&model)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"properties": {
                "metadata": {},
                "TTL": 300,
                "MXRecords": [{"preference": 10, "exchange": "mail.contoso.com"}]
            }})
        );
    }

    #[test]
    fn schema_declares_record_set_block() {
        let schema = MxRecordResource::schema_static();
        let record = schema.nested_block("record").unwrap();
        assert_eq!(record.min_items, 1);
        assert!(record.block.attributes.iter().any(|a| a.name == "exchange"));
    }
}
