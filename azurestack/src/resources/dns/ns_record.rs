//! `azurestack_dns_ns_record`

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
use tfplug::validator::ListLengthValidator;
use tfplug::DynamicValue;

use super::{fqdn_attribute, ttl_attribute, zone_name_attribute};
use crate::api::dns::{NsRecord, RecordSet, RecordSetProperties};
use crate::api::{ignore_not_found, ApiError};
use crate::config::Timeouts;
use crate::error::ProviderError;
use crate::ids::{NsRecordId, ResourceId};
use crate::provider_data::AzureStackProviderData;
use crate::resources::common::{
    created, decode, deleted, encode, ensure_absent, id_attribute, import_id, name_attribute,
    read_back, resource_group_name_attribute, state_id, updated,
};
use crate::tags;

const TYPE_NAME: &str = "azurestack_dns_ns_record";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NsRecordModel {
    pub id: Option<String>,
    pub name: String,
    pub resource_group_name: String,
    pub zone_name: String,
    pub records: Vec<String>,
    pub ttl: i64,
    pub fqdn: String,
    pub tags: HashMap<String, String>,
}

pub fn expand_records(records: &[String]) -> Vec<NsRecord> {
    records
        .iter()
        .map(|nsdname| NsRecord {
            nsdname: Some(nsdname.clone()),
        })
        .collect()
}

pub fn flatten_records(records: Option<&Vec<NsRecord>>) -> Vec<String> {
    records
        .map(|records| records.iter().filter_map(|r| r.nsdname.clone()).collect())
        .unwrap_or_default()
}

pub fn expand(model: &NsRecordModel) -> RecordSet {
    RecordSet {
        properties: RecordSetProperties {
            metadata: Some(tags::expand(Some(&model.tags))),
            ttl: Some(model.ttl),
            ns_records: Some(expand_records(&model.records)),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn flatten(id: &NsRecordId, record_set: &RecordSet) -> NsRecordModel {
    let properties = &record_set.properties;
    NsRecordModel {
        id: Some(id.id()),
        name: id.name.clone(),
        resource_group_name: id.resource_group.clone(),
        zone_name: id.zone_name.clone(),
        records: flatten_records(properties.ns_records.as_ref()),
        ttl: properties.ttl.unwrap_or_default(),
        fqdn: properties.fqdn.clone().unwrap_or_default(),
        tags: tags::flatten(properties.metadata.as_ref()),
    }
}

pub struct NsRecordResource {
    provider_data: AzureStackProviderData,
    timeouts: Timeouts,
}

impl NsRecordResource {
    pub fn new(provider_data: AzureStackProviderData) -> Self {
        Self {
            provider_data,
            timeouts: Timeouts::default(),
        }
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a DNS NS record set")
            .attribute(id_attribute())
            .attribute(name_attribute("The name of the record set"))
            .attribute(resource_group_name_attribute())
            .attribute(zone_name_attribute())
            .attribute(
                AttributeBuilder::new("records", AttributeType::list_of(AttributeType::String))
                    .description("Name servers the record set delegates to")
                    .required()
                    .validator(ListLengthValidator {
                        min: Some(1),
                        max: None,
                    })
                    .build(),
            )
            .attribute(ttl_attribute())
            .attribute(fqdn_attribute())
            .attribute(tags::schema())
            .build()
    }

    fn record_id(&self, model: &NsRecordModel) -> NsRecordId {
        NsRecordId::new(
            self.provider_data.client.subscription_id(),
            &model.resource_group_name,
            &model.zone_name,
            &model.name,
        )
    }

    async fn create_record(&self, ctx: &Context, model: &NsRecordModel) -> Result<String, ProviderError> {
        let dns = self.provider_data.client.dns();
        let id = self.record_id(model);
        let upstream = |action: &'static str, e: ApiError| {
            ProviderError::upstream(TYPE_NAME, action, &model.name, &model.resource_group_name, e)
        };

        let existing = dns.get_ns_record_set(ctx, &id).await;
        ensure_absent(existing, TYPE_NAME, &id.id(), &model.name, &model.resource_group_name)?;

        tracing::info!("Creating DNS NS record {}", id);
        dns.put_ns_record_set(ctx, &id, &expand(model))
            .await
            .map_err(|e| upstream("creating", e))?;
        Ok(id.id())
    }

    async fn read_record(&self, ctx: &Context, id: &str) -> Result<Option<DynamicValue>, ProviderError> {
        let id = NsRecordId::parse(id)?;
        match self.provider_data.client.dns().get_ns_record_set(ctx, &id).await {
            Ok(record_set) => Ok(Some(encode(TYPE_NAME, &flatten(&id, &record_set))?)),
            Err(e) if e.is_not_found() => {
                tracing::warn!("DNS NS record {} was not found, removing from state", id);
                Ok(None)
            }
            Err(e) => Err(ProviderError::upstream(TYPE_NAME, "reading", &id.name, &id.resource_group, e)),
        }
    }

    async fn update_record(
        &self,
        ctx: &Context,
        prior: &DynamicValue,
        planned: &DynamicValue,
    ) -> Result<String, ProviderError> {
        let id = NsRecordId::parse(&state_id(TYPE_NAME, prior)?)?;
        let model: NsRecordModel = decode(TYPE_NAME, planned)?;
        let dns = self.provider_data.client.dns();
        let upstream = |action: &'static str, e: ApiError| {
            ProviderError::upstream(TYPE_NAME, action, &id.name, &id.resource_group, e)
        };

        let mut record_set = dns
            .get_ns_record_set(ctx, &id)
            .await
            .map_err(|e| upstream("retrieving", e))?;
        let desired = expand(&model).properties;
        record_set.properties.ttl = desired.ttl;
        record_set.properties.metadata = desired.metadata;
        record_set.properties.ns_records = desired.ns_records;

        dns.put_ns_record_set(ctx, &id, &record_set)
            .await
            .map_err(|e| upstream("updating", e))?;
        Ok(id.id())
    }

    async fn delete_record(&self, ctx: &Context, prior: &DynamicValue) -> Result<(), ProviderError> {
        let id = NsRecordId::parse(&state_id(TYPE_NAME, prior)?)?;
        tracing::info!("Deleting DNS NS record {}", id);
        ignore_not_found(self.provider_data.client.dns().delete_ns_record_set(ctx, &id).await)
            .map_err(|e| ProviderError::upstream(TYPE_NAME, "deleting", &id.name, &id.resource_group, e))
    }
}

#[async_trait]
impl Resource for NsRecordResource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Self::schema_static()
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let ctx = ctx.with_timeout(self.timeouts.create);
        let model: NsRecordModel = match decode(TYPE_NAME, &request.planned_state) {
            Ok(model) => model,
            Err(e) => return CreateResourceResponse::failed(request.planned_state, e.into()),
        };
        let id = match self.create_record(&ctx, &model).await {
            Ok(id) => id,
            Err(e) => return CreateResourceResponse::failed(request.planned_state, e.into()),
        };
        let read = self.read_record(&ctx, &id).await;
        created(TYPE_NAME, request.planned_state, id, read)
    }

    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let ctx = ctx.with_timeout(self.timeouts.read);
        let read = match state_id(TYPE_NAME, &request.current_state) {
            Ok(id) => self.read_record(&ctx, &id).await,
            Err(e) => Err(e),
        };
        read_back(request.current_state, read)
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let ctx = ctx.with_timeout(self.timeouts.update);
        let id = match self
            .update_record(&ctx, &request.prior_state, &request.planned_state)
            .await
        {
            Ok(id) => id,
            Err(e) => return UpdateResourceResponse::failed(request.prior_state, e.into()),
        };
        let read = self.read_record(&ctx, &id).await;
        updated(TYPE_NAME, request.planned_state, id, read)
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let ctx = ctx.with_timeout(self.timeouts.delete);
        deleted(self.delete_record(&ctx, &request.prior_state).await)
    }
}

#[async_trait]
impl ResourceWithImportState for NsRecordResource {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        import_id::<NsRecordId>(&request)
    }
}
