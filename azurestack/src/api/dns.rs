use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tfplug::Context;

use super::client::Client;
use super::error::ApiError;
use crate::ids::{MxRecordId, NsRecordId, ResourceId};

pub const API_VERSION: &str = "2016-04-01";

/// DNS record sets; the resource provider answers synchronously
pub struct DnsApi<'a> {
    client: &'a Client,
}

impl<'a> DnsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn get_ns_record_set(&self, ctx: &Context, id: &NsRecordId) -> Result<RecordSet, ApiError> {
        self.client.get(ctx, &id.id(), API_VERSION).await
    }

    pub async fn put_ns_record_set(
        &self,
        ctx: &Context,
        id: &NsRecordId,
        record_set: &RecordSet,
    ) -> Result<RecordSet, ApiError> {
        self.client.put(ctx, &id.id(), API_VERSION, record_set).await
    }

    pub async fn delete_ns_record_set(&self, ctx: &Context, id: &NsRecordId) -> Result<(), ApiError> {
        self.client.delete_and_wait(ctx, &id.id(), API_VERSION).await
    }

    pub async fn get_mx_record_set(&self, ctx: &Context, id: &MxRecordId) -> Result<RecordSet, ApiError> {
        self.client.get(ctx, &id.id(), API_VERSION).await
    }

    pub async fn put_mx_record_set(
        &self,
        ctx: &Context,
        id: &MxRecordId,
        record_set: &RecordSet,
    ) -> Result<RecordSet, ApiError> {
        self.client.put(ctx, &id.id(), API_VERSION, record_set).await
    }

    pub async fn delete_mx_record_set(&self, ctx: &Context, id: &MxRecordId) -> Result<(), ApiError> {
        self.client.delete_and_wait(ctx, &id.id(), API_VERSION).await
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default)]
    pub properties: RecordSetProperties,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordSetProperties {
    /// Record sets call their tags metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
    #[serde(rename = "TTL", skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
    #[serde(rename = "NSRecords", skip_serializing_if = "Option::is_none")]
    pub ns_records: Option<Vec<NsRecord>>,
    #[serde(rename = "MXRecords", skip_serializing_if = "Option::is_none")]
    pub mx_records: Option<Vec<MxRecord>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NsRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nsdname: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MxRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preference: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,
}
