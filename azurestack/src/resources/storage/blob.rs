//! `azurestack_storage_blob`
//!
//! Blobs live on the storage data plane, so this resource talks to the blob
//! service with a Shared Key client instead of ARM. Content comes from a local
//! file (`source`), an inline string (`source_content`) or a server side copy
//! (`source_uri`); none of these can be read back, so Read carries them over.

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
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::validator::{NumberRangeValidator, OneOfValidator, StringFuncValidator, StringLengthValidator};
use tfplug::DynamicValue;

use crate::api::blob::{BlobClient, BlobHttpHeaders, BlobProperties, BlobType, PAGE_ALIGNMENT};
use crate::api::{ignore_not_found, ApiError};
use crate::config::Timeouts;
use crate::error::ProviderError;
use crate::ids::{BlobId, ResourceId};
use crate::provider_data::AzureStackProviderData;
use crate::resources::common::{
    created, decode, decode_state, deleted, encode, id_attribute, import_id, prefer_case, read_back,
    state_id, updated,
};
use crate::tags::LowercaseKeysValidator;

const TYPE_NAME: &str = "azurestack_storage_blob";

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
pub const DEFAULT_PARALLELISM: i64 = 8;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageBlobModel {
    pub id: Option<String>,
    pub name: String,
    pub storage_account_name: String,
    pub storage_container_name: String,
    #[serde(rename = "type")]
    pub blob_type: String,
    pub size: i64,
    pub content_type: String,
    pub cache_control: Option<String>,
    pub content_md5: Option<String>,
    pub source: Option<String>,
    pub source_content: Option<String>,
    pub source_uri: Option<String>,
    pub parallelism: i64,
    pub metadata: HashMap<String, String>,
    pub url: Option<String>,
}

/// Where the initial content of the blob comes from
#[derive(Debug, Clone, PartialEq)]
pub enum BlobSource {
    Empty,
    File(String),
    Content(String),
    Copy(String),
}

impl StorageBlobModel {
    fn set(value: &Option<String>) -> Option<String> {
        value.clone().filter(|v| !v.is_empty())
    }

    pub fn source(&self) -> Result<BlobSource, ProviderError> {
        let sources = [
            Self::set(&self.source).map(BlobSource::File),
            Self::set(&self.source_content).map(BlobSource::Content),
            Self::set(&self.source_uri).map(BlobSource::Copy),
        ];
        let mut sources = sources.into_iter().flatten();
        match (sources.next(), sources.next()) {
            (None, _) => Ok(BlobSource::Empty),
            (Some(source), None) => Ok(source),
            (Some(_), Some(_)) => Err(ProviderError::validation(
                TYPE_NAME,
                "only one of source, source_content and source_uri can be set",
            )),
        }
    }

    pub fn kind(&self) -> Result<BlobType, ProviderError> {
        BlobType::parse(&self.blob_type).ok_or_else(|| {
            ProviderError::validation(TYPE_NAME, format!("unsupported blob type {:?}", self.blob_type))
        })
    }

    pub fn http_headers(&self) -> BlobHttpHeaders {
        BlobHttpHeaders {
            content_type: Some(self.content_type.clone())
                .filter(|v| !v.is_empty())
                .or_else(|| Some(DEFAULT_CONTENT_TYPE.to_string())),
            cache_control: Self::set(&self.cache_control),
            content_md5: Self::set(&self.content_md5),
        }
    }

    fn parallelism(&self) -> usize {
        usize::try_from(self.parallelism)
            .ok()
            .filter(|p| *p > 0)
            .unwrap_or(DEFAULT_PARALLELISM as usize)
    }
}

/// Page blob length: the configured size, or the content rounded up to a whole page
pub fn page_blob_size(configured: i64, content_len: usize) -> Result<u64, ProviderError> {
    let configured = u64::try_from(configured)
        .map_err(|_| ProviderError::validation(TYPE_NAME, "size cannot be negative"))?;
    if configured % PAGE_ALIGNMENT != 0 {
        return Err(ProviderError::validation(
            TYPE_NAME,
            format!("size {} must be a multiple of {}", configured, PAGE_ALIGNMENT),
        ));
    }
    let content_len = content_len as u64;
    let needed = content_len.div_ceil(PAGE_ALIGNMENT) * PAGE_ALIGNMENT;
    match configured {
        0 => Ok(needed),
        size if size < needed => Err(ProviderError::validation(
            TYPE_NAME,
            format!("size {} is smaller than the {} bytes of content", size, content_len),
        )),
        size => Ok(size),
    }
}

/// Content padded with zeros to a whole number of pages
pub fn pad_to_pages(mut content: Vec<u8>) -> Vec<u8> {
    let padded = (content.len() as u64).div_ceil(PAGE_ALIGNMENT) * PAGE_ALIGNMENT;
    content.resize(padded as usize, 0);
    content
}

pub fn flatten(id: &BlobId, properties: &BlobProperties, known: &StorageBlobModel) -> StorageBlobModel {
    let blob_type = properties.blob_type.map(|t| t.name().to_string());
    let headers = &properties.http_headers;

    StorageBlobModel {
        id: Some(id.id()),
        name: id.blob_name.clone(),
        storage_account_name: id.account_name.clone(),
        storage_container_name: id.container_name.clone(),
        blob_type: prefer_case(Some(known.blob_type.as_str()), blob_type).unwrap_or_default(),
        // the service reports the padded length, keep what was configured
        size: known.size,
        content_type: headers
            .content_type
            .clone()
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
        cache_control: headers.cache_control.clone(),
        // the service computes an MD5 on its own, only echo a configured one
        content_md5: known.content_md5.as_ref().and(headers.content_md5.clone()),
        source: known.source.clone(),
        source_content: known.source_content.clone(),
        source_uri: known
            .source_uri
            .clone()
            .or_else(|| properties.copy_source.clone()),
        parallelism: if known.parallelism > 0 {
            known.parallelism
        } else {
            DEFAULT_PARALLELISM
        },
        metadata: properties.metadata.clone(),
        url: Some(id.id()),
    }
}

fn container_name_is_valid(name: &str) -> Result<(), String> {
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !(3..=63).contains(&name.len()) || !valid_chars || name.starts_with('-') || name.contains("--") {
        return Err(format!(
            "{:?}: container names are 3-63 lower case letters, digits or single hyphens",
            name
        ));
    }
    Ok(())
}

pub struct StorageBlobResource {
    provider_data: AzureStackProviderData,
    timeouts: Timeouts,
}

impl StorageBlobResource {
    pub fn new(provider_data: AzureStackProviderData) -> Self {
        Self {
            provider_data,
            timeouts: Timeouts::default(),
        }
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a blob in a storage container")
            .attribute(id_attribute())
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The name of the blob")
                    .required()
                    .force_new()
                    .validator(StringLengthValidator::between(1, 1024))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("storage_account_name", AttributeType::String)
                    .description("The storage account that holds the container")
                    .required()
                    .force_new()
                    .validator(StringLengthValidator::between(3, 24))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("storage_container_name", AttributeType::String)
                    .description("The container the blob is written to")
                    .required()
                    .force_new()
                    .validator(StringFuncValidator::new(
                        "a valid container name",
                        container_name_is_valid,
                    ))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("type", AttributeType::String)
                    .description("Append, Block or Page")
                    .required()
                    .force_new()
                    .validator(OneOfValidator::ignore_case(&["Append", "Block", "Page"]))
                    .plan_modifier(SuppressCaseDiff)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("size", AttributeType::Number)
                    .description("Size of a page blob in bytes, a multiple of 512")
                    .optional()
                    .force_new()
                    .default(StaticDefault::number(0.0))
                    .validator(NumberRangeValidator {
                        min: Some(0.0),
                        max: None,
                    })
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("content_type", AttributeType::String)
                    .description("MIME type of the content")
                    .optional()
                    .default(StaticDefault::string(DEFAULT_CONTENT_TYPE))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("cache_control", AttributeType::String)
                    .description("Cache-Control header served with the blob")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("content_md5", AttributeType::String)
                    .description("Base64 MD5 of the content")
                    .optional()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("source", AttributeType::String)
                    .description("Path of a local file to upload")
                    .optional()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("source_content", AttributeType::String)
                    .description("Literal content to upload")
                    .optional()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("source_uri", AttributeType::String)
                    .description("URL of a blob or file to copy from")
                    .optional()
                    .computed()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("parallelism", AttributeType::Number)
                    .description("Number of chunks uploaded at once")
                    .optional()
                    .force_new()
                    .default(StaticDefault::number(DEFAULT_PARALLELISM as f64))
                    .validator(NumberRangeValidator {
                        min: Some(1.0),
                        max: None,
                    })
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("metadata", AttributeType::map_of(AttributeType::String))
                    .description("Metadata stored with the blob")
                    .optional()
                    .computed()
                    .validator(LowercaseKeysValidator)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("url", AttributeType::String)
                    .description("The URL of the blob")
                    .computed()
                    .build(),
            )
            .build()
    }

    async fn blob_client(&self, ctx: &Context, account_name: &str) -> Result<BlobClient, ApiError> {
        self.provider_data
            .client
            .storage()
            .blob_client(ctx, account_name)
            .await
    }

    fn upstream(action: &'static str, id: &BlobId, e: ApiError) -> ProviderError {
        ProviderError::upstream(
            TYPE_NAME,
            action,
            &format!("{}/{}", id.container_name, id.blob_name),
            &id.account_name,
            e,
        )
    }

    async fn load_content(source: &BlobSource) -> Result<Vec<u8>, ProviderError> {
        match source {
            BlobSource::File(path) => tokio::fs::read(path).await.map_err(|e| {
                ProviderError::validation(TYPE_NAME, format!("reading source {:?}: {}", path, e))
            }),
            BlobSource::Content(content) => Ok(content.as_bytes().to_vec()),
            BlobSource::Empty | BlobSource::Copy(_) => Ok(Vec::new()),
        }
    }

    async fn create_blob(&self, ctx: &Context, model: &StorageBlobModel) -> Result<String, ProviderError> {
        let kind = model.kind()?;
        let source = model.source()?;
        let content = Self::load_content(&source).await?;
        let page_size = match kind {
            BlobType::Page => Some(page_blob_size(model.size, content.len())?),
            _ => None,
        };

        let account_upstream = |e: ApiError| {
            ProviderError::upstream(
                TYPE_NAME,
                "retrieving keys for",
                &model.name,
                &model.storage_account_name,
                e,
            )
        };
        let blobs = self
            .blob_client(ctx, &model.storage_account_name)
            .await
            .map_err(account_upstream)?;
        let id = blobs.blob_id(&model.storage_container_name, &model.name);

        match blobs.get_properties(ctx, &id).await {
            Ok(_) => {
                return Err(ProviderError::AlreadyExists {
                    resource_type: TYPE_NAME,
                    id: id.id(),
                })
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(Self::upstream("checking for presence of existing", &id, e)),
        }

        let headers = model.http_headers();
        let parallelism = model.parallelism();
        tracing::info!("Creating {} blob {}", kind.name(), id);
        let upload = async {
            match (&source, kind) {
                (BlobSource::Copy(uri), _) => {
                    blobs.copy_from_url(ctx, &id, uri, &model.metadata).await?;
                    blobs.set_http_headers(ctx, &id, &headers).await
                }
                (_, BlobType::Block) => {
                    blobs
                        .upload_block_blob(ctx, &id, content, parallelism, &headers, &model.metadata)
                        .await
                }
                (_, BlobType::Page) => {
                    let size = page_size.unwrap_or(0);
                    blobs.create_page_blob(ctx, &id, size, &headers, &model.metadata).await?;
                    if content.is_empty() {
                        return Ok(());
                    }
                    blobs
                        .upload_pages(ctx, &id, &pad_to_pages(content), parallelism)
                        .await
                }
                (_, BlobType::Append) => {
                    blobs.create_append_blob(ctx, &id, &headers, &model.metadata).await?;
                    blobs.append_blocks(ctx, &id, &content).await
                }
            }
        };
        let result: Result<(), ApiError> = upload.await;
        result.map_err(|e| Self::upstream("creating", &id, e))?;
        Ok(id.id())
    }

    async fn read_blob(
        &self,
        ctx: &Context,
        id: &str,
        known: &StorageBlobModel,
    ) -> Result<Option<DynamicValue>, ProviderError> {
        let id = BlobId::parse(id)?;
        let blobs = match self.blob_client(ctx, &id.account_name).await {
            Ok(blobs) => blobs,
            Err(e) if e.is_not_found() => {
                tracing::warn!("Storage account {} was not found, removing blob from state", id.account_name);
                return Ok(None);
            }
            Err(e) => return Err(Self::upstream("retrieving keys for", &id, e)),
        };
        match blobs.get_properties(ctx, &id).await {
            Ok(properties) => Ok(Some(encode(TYPE_NAME, &flatten(&id, &properties, known))?)),
            Err(e) if e.is_not_found() => {
                tracing::warn!("Blob {} was not found, removing from state", id);
                Ok(None)
            }
            Err(e) => Err(Self::upstream("reading", &id, e)),
        }
    }

    async fn update_blob(
        &self,
        ctx: &Context,
        prior: &StorageBlobModel,
        planned: &StorageBlobModel,
    ) -> Result<String, ProviderError> {
        let id = BlobId::parse(prior.id.as_deref().unwrap_or_default())?;
        let blobs = self
            .blob_client(ctx, &id.account_name)
            .await
            .map_err(|e| Self::upstream("retrieving keys for", &id, e))?;

        if planned.content_type != prior.content_type || planned.cache_control != prior.cache_control {
            tracing::info!("Updating properties of blob {}", id);
            blobs
                .set_http_headers(ctx, &id, &planned.http_headers())
                .await
                .map_err(|e| Self::upstream("updating", &id, e))?;
        }
        if planned.metadata != prior.metadata {
            tracing::info!("Updating metadata of blob {}", id);
            blobs
                .set_metadata(ctx, &id, &planned.metadata)
                .await
                .map_err(|e| Self::upstream("updating", &id, e))?;
        }
        Ok(id.id())
    }

    async fn delete_blob(&self, ctx: &Context, prior: &DynamicValue) -> Result<(), ProviderError> {
        let id = BlobId::parse(&state_id(TYPE_NAME, prior)?)?;
        let blobs = match self.blob_client(ctx, &id.account_name).await {
            Ok(blobs) => blobs,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(Self::upstream("retrieving keys for", &id, e)),
        };
        tracing::info!("Deleting blob {}", id);
        ignore_not_found(blobs.delete(ctx, &id).await).map_err(|e| Self::upstream("deleting", &id, e))
    }
}

#[async_trait]
impl Resource for StorageBlobResource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Self::schema_static()
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let ctx = ctx.with_timeout(self.timeouts.create);
        let model: StorageBlobModel = match decode(TYPE_NAME, &request.planned_state) {
            Ok(model) => model,
            Err(e) => return CreateResourceResponse::failed(request.planned_state, e.into()),
        };
        let id = match self.create_blob(&ctx, &model).await {
            Ok(id) => id,
            Err(e) => return CreateResourceResponse::failed(request.planned_state, e.into()),
        };
        let read = self.read_blob(&ctx, &id, &model).await;
        created(TYPE_NAME, request.planned_state, id, read)
    }

    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let ctx = ctx.with_timeout(self.timeouts.read);
        let prior = decode_state::<StorageBlobModel>(TYPE_NAME, &request.current_state)
            .and_then(|known| state_id(TYPE_NAME, &request.current_state).map(|id| (id, known)));
        let read = match prior {
            Ok((id, known)) => self.read_blob(&ctx, &id, &known).await,
            Err(e) => Err(e),
        };
        read_back(request.current_state, read)
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let ctx = ctx.with_timeout(self.timeouts.update);
        let models = decode::<StorageBlobModel>(TYPE_NAME, &request.prior_state).and_then(|prior| {
            decode::<StorageBlobModel>(TYPE_NAME, &request.planned_state).map(|planned| (prior, planned))
        });
        let (prior, planned) = match models {
            Ok(models) => models,
            Err(e) => return UpdateResourceResponse::failed(request.prior_state, e.into()),
        };
        let id = match self.update_blob(&ctx, &prior, &planned).await {
            Ok(id) => id,
            Err(e) => return UpdateResourceResponse::failed(request.prior_state, e.into()),
        };
        let read = self.read_blob(&ctx, &id, &planned).await;
        updated(TYPE_NAME, request.planned_state, id, read)
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let ctx = ctx.with_timeout(self.timeouts.delete);
        deleted(self.delete_blob(&ctx, &request.prior_state).await)
    }
}

#[async_trait]
impl ResourceWithImportState for StorageBlobResource {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        import_id::<BlobId>(&request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_blob() -> StorageBlobModel {
        StorageBlobModel {
            name: "example.vhd".to_string(),
            storage_account_name: "acct".to_string(),
            storage_container_name: "vhds".to_string(),
            blob_type: "block".to_string(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            parallelism: DEFAULT_PARALLELISM,
            ..Default::default()
        }
    }

    #[test]
    fn sources_are_mutually_exclusive() {
        let mut model = block_blob();
        assert_eq!(model.source().unwrap(), BlobSource::Empty);

        model.source_content = Some("Wubba Lubba Dub Dub".to_string());
        assert_eq!(
            model.source().unwrap(),
            BlobSource::Content("Wubba Lubba Dub Dub".to_string())
        );

        model.source_uri = Some("https://other.blob.local.azurestack.external/c/b".to_string());
        assert!(matches!(model.source(), Err(ProviderError::Validation { .. })));
    }

    #[test]
    fn empty_source_strings_do_not_count() {
        let model = StorageBlobModel {
            source: Some(String::new()),
            source_content: Some("abc".to_string()),
            ..block_blob()
        };
        assert_eq!(model.source().unwrap(), BlobSource::Content("abc".to_string()));
    }

    #[test]
    fn page_sizes_are_aligned() {
        assert_eq!(page_blob_size(0, 0).unwrap(), 0);
        assert_eq!(page_blob_size(0, 700).unwrap(), 1024);
        assert_eq!(page_blob_size(5120, 700).unwrap(), 5120);
        assert!(page_blob_size(1000, 0).is_err());
        assert!(page_blob_size(512, 700).is_err());
        assert!(page_blob_size(-512, 0).is_err());
    }

    #[test]
    fn padding_fills_the_last_page() {
        assert_eq!(pad_to_pages(vec![1; 513]).len(), 1024);
        assert_eq!(pad_to_pages(vec![1; 512]).len(), 512);
        assert!(pad_to_pages(Vec::new()).is_empty());
    }

    #[test]
    fn missing_content_type_falls_back_to_default() {
        let model = StorageBlobModel {
            content_type: String::new(),
            ..block_blob()
        };
        assert_eq!(
            model.http_headers().content_type.as_deref(),
            Some(DEFAULT_CONTENT_TYPE)
        );
    }

    #[test]
    fn flatten_keeps_write_only_values_and_type_spelling() {
        let known = StorageBlobModel {
            source_content: Some("hello".to_string()),
            parallelism: 4,
            ..block_blob()
        };
        let id = BlobId::new("https://acct.blob.local.azurestack.external", "acct", "vhds", "example.vhd");
        let properties = BlobProperties {
            blob_type: Some(BlobType::Block),
            content_length: 5,
            http_headers: BlobHttpHeaders {
                content_type: Some("text/plain".to_string()),
                cache_control: None,
                content_md5: Some("XUFAKrxLKna5cZ2REBfFkg==".to_string()),
            },
            metadata: HashMap::from([("hello".to_string(), "world".to_string())]),
            ..Default::default()
        };

        let model = flatten(&id, &properties, &known);
        assert_eq!(model.blob_type, "block");
        assert_eq!(model.source_content.as_deref(), Some("hello"));
        assert_eq!(model.parallelism, 4);
        assert_eq!(model.content_type, "text/plain");
        assert_eq!(model.content_md5, None);
        assert_eq!(model.metadata["hello"], "world");
        assert_eq!(
            model.url.as_deref(),
            Some("https://acct.blob.local.azurestack.external/vhds/example.vhd")
        );
    }

    #[test]
    fn page_blob_size_is_not_read_back() {
        let id = BlobId::new("https://acct.blob.local.azurestack.external", "acct", "vhds", "disk.vhd");
        let properties = BlobProperties {
            blob_type: Some(BlobType::Page),
            content_length: 1024,
            ..Default::default()
        };
        let imported = flatten(&id, &properties, &StorageBlobModel::default());
        assert_eq!(imported.blob_type, "Page");
        assert_eq!(imported.size, 0);
        assert_eq!(imported.parallelism, DEFAULT_PARALLELISM);
    }

    #[test]
    fn page_blob_without_size_plans_no_changes_after_create() {
        let config = serde_json::json!({
            "name": "disk.vhd",
            "storage_account_name": "acct",
            "storage_container_name": "vhds",
            "type": "Page",
            "source": "/tmp/disk.vhd"
        });
        let schema = StorageBlobResource::schema_static();
        let planned = tfplug::plan_resource_change(
            &schema,
            &DynamicValue::null(),
            &DynamicValue::new(config.clone().into()),
        );
        let known: StorageBlobModel = planned.planned_state.decode().unwrap();
        assert_eq!(known.size, 0);

        let id = BlobId::new("https://acct.blob.local.azurestack.external", "acct", "vhds", "disk.vhd");
        let properties = BlobProperties {
            blob_type: Some(BlobType::Page),
            content_length: 1024,
            ..Default::default()
        };
        let state = encode(TYPE_NAME, &flatten(&id, &properties, &known)).unwrap();

        let plan = tfplug::plan_resource_change(&schema, &state, &DynamicValue::new(config.into()));
        assert_eq!(plan.action, tfplug::ChangeAction::NoOp, "{:?}", plan.requires_replace);
    }

    #[test]
    fn container_names_follow_service_rules() {
        assert!(container_name_is_valid("vhds").is_ok());
        assert!(container_name_is_valid("my-container-1").is_ok());
        assert!(container_name_is_valid("ab").is_err());
        assert!(container_name_is_valid("Upper").is_err());
        assert!(container_name_is_valid("double--hyphen").is_err());
    }
}
