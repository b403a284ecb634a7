//! Blob service data-plane client
//!
//! Requests are authorized with Shared Key: an HMAC-SHA256 over the canonical
//! request, keyed with the storage account access key.

use base64::prelude::*;
use chrono::{DateTime, Utc};
use futures::{stream, StreamExt, TryStreamExt};
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use sha2::Sha256;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tfplug::Context;
use url::Url;

use super::error::ApiError;
use crate::ids::{BlobId, ResourceId};

pub const BLOB_SERVICE_VERSION: &str = "2018-11-09";

/// Largest single block, page range or append block
pub const BLOCK_SIZE: usize = 4 * 1024 * 1024;

/// Page blob sizes and writes are aligned to this
pub const PAGE_ALIGNMENT: u64 = 512;

const META_PREFIX: &str = "x-ms-meta-";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobType {
    Block,
    Page,
    Append,
}

impl BlobType {
    /// Accepts the schema spelling (`block`, `Page`, ...) in any case
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "block" | "blockblob" => Some(BlobType::Block),
            "page" | "pageblob" => Some(BlobType::Page),
            "append" | "appendblob" => Some(BlobType::Append),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BlobType::Block => "Block",
            BlobType::Page => "Page",
            BlobType::Append => "Append",
        }
    }

    fn header_value(&self) -> &'static str {
        match self {
            BlobType::Block => "BlockBlob",
            BlobType::Page => "PageBlob",
            BlobType::Append => "AppendBlob",
        }
    }
}

/// Standard HTTP properties stored with a blob
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlobHttpHeaders {
    pub content_type: Option<String>,
    pub cache_control: Option<String>,
    pub content_md5: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlobProperties {
    pub blob_type: Option<BlobType>,
    pub content_length: u64,
    pub http_headers: BlobHttpHeaders,
    pub metadata: HashMap<String, String>,
    pub copy_status: Option<String>,
    pub copy_source: Option<String>,
}

impl BlobProperties {
    fn from_headers(headers: &HeaderMap) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        let metadata = headers
            .iter()
            .filter_map(|(name, value)| {
                let key = name.as_str().strip_prefix(META_PREFIX)?;
                Some((key.to_string(), value.to_str().ok()?.to_string()))
            })
            .collect();

        Self {
            blob_type: header("x-ms-blob-type").as_deref().and_then(BlobType::parse),
            content_length: header("content-length")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            http_headers: BlobHttpHeaders {
                content_type: header("content-type"),
                cache_control: header("cache-control"),
                content_md5: header("content-md5"),
            },
            metadata,
            copy_status: header("x-ms-copy-status"),
            copy_source: header("x-ms-copy-source"),
        }
    }
}

#[derive(Clone)]
pub struct BlobClient {
    http_client: reqwest::Client,
    service_url: String,
    account_name: String,
    key: Vec<u8>,
    poll_interval: Duration,
}

impl std::fmt::Debug for BlobClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobClient")
            .field("service_url", &self.service_url)
            .field("account_name", &self.account_name)
            .finish_non_exhaustive()
    }
}

impl BlobClient {
    pub fn new(
        http_client: reqwest::Client,
        service_url: &str,
        account_name: &str,
        key: Vec<u8>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            http_client,
            service_url: service_url.trim_end_matches('/').to_string(),
            account_name: account_name.to_string(),
            key,
            poll_interval,
        }
    }

    pub fn account_name(&self) -> &str {
        &self.account_name
    }

    pub fn service_url(&self) -> &str {
        &self.service_url
    }

    pub fn blob_id(&self, container_name: &str, blob_name: &str) -> BlobId {
        BlobId::new(&self.service_url, &self.account_name, container_name, blob_name)
    }

    /// HEAD the blob; a missing blob is `ApiError::Api { status: 404, .. }`
    pub async fn get_properties(&self, ctx: &Context, id: &BlobId) -> Result<BlobProperties, ApiError> {
        let response = self
            .send(ctx, Method::HEAD, id, &[], HeaderMap::new(), Vec::new())
            .await?;
        Ok(BlobProperties::from_headers(response.headers()))
    }

    pub async fn put_block_blob(
        &self,
        ctx: &Context,
        id: &BlobId,
        content: Vec<u8>,
        http_headers: &BlobHttpHeaders,
        metadata: &HashMap<String, String>,
    ) -> Result<(), ApiError> {
        let mut headers = blob_type_headers(BlobType::Block);
        apply_http_headers(&mut headers, http_headers)?;
        apply_metadata(&mut headers, metadata)?;
        self.send(ctx, Method::PUT, id, &[], headers, content).await?;
        Ok(())
    }

    pub async fn put_block(
        &self,
        ctx: &Context,
        id: &BlobId,
        block_id: &str,
        data: Vec<u8>,
    ) -> Result<(), ApiError> {
        self.send(
            ctx,
            Method::PUT,
            id,
            &[("comp", "block"), ("blockid", block_id)],
            HeaderMap::new(),
            data,
        )
        .await?;
        Ok(())
    }

    /// Commit previously uploaded blocks in order
    pub async fn put_block_list(
        &self,
        ctx: &Context,
        id: &BlobId,
        block_ids: &[String],
        http_headers: &BlobHttpHeaders,
        metadata: &HashMap<String, String>,
    ) -> Result<(), ApiError> {
        let mut body = String::from(r#"<?xml version="1.0" encoding="utf-8"?><BlockList>"#);
        for block_id in block_ids {
            body.push_str(&format!("<Latest>{}</Latest>", block_id));
        }
        body.push_str("</BlockList>");

        let mut headers = HeaderMap::new();
        apply_http_headers(&mut headers, http_headers)?;
        apply_metadata(&mut headers, metadata)?;
        self.send(
            ctx,
            Method::PUT,
            id,
            &[("comp", "blocklist")],
            headers,
            body.into_bytes(),
        )
        .await?;
        Ok(())
    }

    /// Single PUT for small content, otherwise blocks uploaded `parallelism` at a time
    pub async fn upload_block_blob(
        &self,
        ctx: &Context,
        id: &BlobId,
        content: Vec<u8>,
        parallelism: usize,
        http_headers: &BlobHttpHeaders,
        metadata: &HashMap<String, String>,
    ) -> Result<(), ApiError> {
        if content.len() <= BLOCK_SIZE {
            return self
                .put_block_blob(ctx, id, content, http_headers, metadata)
                .await;
        }

        let blocks: Vec<(String, Vec<u8>)> = content
            .chunks(BLOCK_SIZE)
            .enumerate()
            .map(|(index, chunk)| (block_id(index), chunk.to_vec()))
            .collect();
        let block_ids: Vec<String> = blocks.iter().map(|(block_id, _)| block_id.clone()).collect();
        tracing::debug!("Uploading {} in {} blocks", id, block_ids.len());

        stream::iter(blocks)
            .map(|(block_id, chunk)| async move { self.put_block(ctx, id, &block_id, chunk).await })
            .buffer_unordered(parallelism.max(1))
            .try_collect::<Vec<()>>()
            .await?;

        self.put_block_list(ctx, id, &block_ids, http_headers, metadata)
            .await
    }

    pub async fn create_page_blob(
        &self,
        ctx: &Context,
        id: &BlobId,
        size: u64,
        http_headers: &BlobHttpHeaders,
        metadata: &HashMap<String, String>,
    ) -> Result<(), ApiError> {
        let mut headers = blob_type_headers(BlobType::Page);
        headers.insert("x-ms-blob-content-length", HeaderValue::from(size));
        apply_http_headers(&mut headers, http_headers)?;
        apply_metadata(&mut headers, metadata)?;
        self.send(ctx, Method::PUT, id, &[], headers, Vec::new())
            .await?;
        Ok(())
    }

    /// Write `data` at `offset`; both must be page aligned
    pub async fn put_pages(
        &self,
        ctx: &Context,
        id: &BlobId,
        offset: u64,
        data: Vec<u8>,
    ) -> Result<(), ApiError> {
        let end = offset + data.len() as u64 - 1;
        let mut headers = HeaderMap::new();
        headers.insert("x-ms-page-write", HeaderValue::from_static("update"));
        headers.insert(
            "x-ms-range",
            header_value(&format!("bytes={}-{}", offset, end))?,
        );
        self.send(ctx, Method::PUT, id, &[("comp", "page")], headers, data)
            .await?;
        Ok(())
    }

    /// Write the non-empty ranges of `content`; a new page blob already reads as zeros
    pub async fn upload_pages(
        &self,
        ctx: &Context,
        id: &BlobId,
        content: &[u8],
        parallelism: usize,
    ) -> Result<(), ApiError> {
        let ranges: Vec<(u64, Vec<u8>)> = content
            .chunks(BLOCK_SIZE)
            .enumerate()
            .filter(|(_, chunk)| chunk.iter().any(|b| *b != 0))
            .map(|(index, chunk)| ((index * BLOCK_SIZE) as u64, chunk.to_vec()))
            .collect();

        stream::iter(ranges)
            .map(|(offset, data)| async move { self.put_pages(ctx, id, offset, data).await })
            .buffer_unordered(parallelism.max(1))
            .try_collect::<Vec<()>>()
            .await?;
        Ok(())
    }

    pub async fn create_append_blob(
        &self,
        ctx: &Context,
        id: &BlobId,
        http_headers: &BlobHttpHeaders,
        metadata: &HashMap<String, String>,
    ) -> Result<(), ApiError> {
        let mut headers = blob_type_headers(BlobType::Append);
        apply_http_headers(&mut headers, http_headers)?;
        apply_metadata(&mut headers, metadata)?;
        self.send(ctx, Method::PUT, id, &[], headers, Vec::new())
            .await?;
        Ok(())
    }

    /// Appends go in order, one block at a time
    pub async fn append_blocks(&self, ctx: &Context, id: &BlobId, content: &[u8]) -> Result<(), ApiError> {
        for chunk in content.chunks(BLOCK_SIZE) {
            self.send(
                ctx,
                Method::PUT,
                id,
                &[("comp", "appendblock")],
                HeaderMap::new(),
                chunk.to_vec(),
            )
            .await?;
        }
        Ok(())
    }

    /// Server-side copy, polled until the copy status leaves `pending`
    pub async fn copy_from_url(
        &self,
        ctx: &Context,
        id: &BlobId,
        source_uri: &str,
        metadata: &HashMap<String, String>,
    ) -> Result<(), ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert("x-ms-copy-source", header_value(source_uri)?);
        apply_metadata(&mut headers, metadata)?;
        let response = self
            .send(ctx, Method::PUT, id, &[], headers, Vec::new())
            .await?;

        let mut status = response
            .headers()
            .get("x-ms-copy-status")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        loop {
            match status.as_deref() {
                None | Some("success") => return Ok(()),
                Some("pending") => {
                    tracing::debug!("Copy of {} into {} is pending", source_uri, id);
                    ctx.sleep(self.poll_interval).await?;
                    status = self.get_properties(ctx, id).await?.copy_status;
                }
                Some(other) => {
                    return Err(ApiError::OperationFailed {
                        status: other.to_string(),
                        message: format!("copy of {} into {} did not succeed", source_uri, id),
                    })
                }
            }
        }
    }

    pub async fn set_http_headers(
        &self,
        ctx: &Context,
        id: &BlobId,
        http_headers: &BlobHttpHeaders,
    ) -> Result<(), ApiError> {
        let mut headers = HeaderMap::new();
        apply_http_headers(&mut headers, http_headers)?;
        self.send(
            ctx,
            Method::PUT,
            id,
            &[("comp", "properties")],
            headers,
            Vec::new(),
        )
        .await?;
        Ok(())
    }

    /// Replaces all metadata on the blob
    pub async fn set_metadata(
        &self,
        ctx: &Context,
        id: &BlobId,
        metadata: &HashMap<String, String>,
    ) -> Result<(), ApiError> {
        let mut headers = HeaderMap::new();
        apply_metadata(&mut headers, metadata)?;
        self.send(
            ctx,
            Method::PUT,
            id,
            &[("comp", "metadata")],
            headers,
            Vec::new(),
        )
        .await?;
        Ok(())
    }

    /// Deletes the blob and its snapshots; a missing blob comes back as a 404 error
    pub async fn delete(&self, ctx: &Context, id: &BlobId) -> Result<(), ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert("x-ms-delete-snapshots", HeaderValue::from_static("include"));
        self.send(ctx, Method::DELETE, id, &[], headers, Vec::new())
            .await?;
        Ok(())
    }

    async fn send(
        &self,
        ctx: &Context,
        method: Method,
        id: &BlobId,
        query: &[(&str, &str)],
        mut headers: HeaderMap,
        body: Vec<u8>,
    ) -> Result<reqwest::Response, ApiError> {
        let mut url = Url::parse(&id.id())?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        headers.insert("x-ms-date", header_value(&rfc1123(Utc::now()))?);
        headers.insert("x-ms-version", HeaderValue::from_static(BLOB_SERVICE_VERSION));

        let payload = string_to_sign(&method, &url, &headers, body.len(), &self.account_name);
        let signature = sign(&self.key, &payload)?;
        headers.insert(
            AUTHORIZATION,
            header_value(&format!("SharedKey {}:{}", self.account_name, signature))?,
        );

        tracing::debug!("{} blob request to: {}", method, url);
        let mut request = self.http_client.request(method.clone(), url).headers(headers);
        if method == Method::PUT {
            request = request.body(body);
        }

        let response = ctx.run(request.send()).await??;
        check_response(response).await
    }
}

fn blob_type_headers(blob_type: BlobType) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("x-ms-blob-type", HeaderValue::from_static(blob_type.header_value()));
    headers
}

fn apply_http_headers(headers: &mut HeaderMap, http_headers: &BlobHttpHeaders) -> Result<(), ApiError> {
    let fields = [
        ("x-ms-blob-content-type", &http_headers.content_type),
        ("x-ms-blob-cache-control", &http_headers.cache_control),
        ("x-ms-blob-content-md5", &http_headers.content_md5),
    ];
    for (name, value) in fields {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            headers.insert(name, header_value(value)?);
        }
    }
    Ok(())
}

fn apply_metadata(headers: &mut HeaderMap, metadata: &HashMap<String, String>) -> Result<(), ApiError> {
    for (key, value) in metadata {
        let name = HeaderName::from_bytes(format!("{}{}", META_PREFIX, key).as_bytes())
            .map_err(|e| ApiError::Parse(format!("invalid metadata key {:?}: {}", key, e)))?;
        headers.insert(name, header_value(value)?);
    }
    Ok(())
}

fn header_value(value: &str) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(value)
        .map_err(|e| ApiError::Parse(format!("invalid header value {:?}: {}", value, e)))
}

/// Block IDs must all have the same length before encoding
fn block_id(index: usize) -> String {
    BASE64_STANDARD.encode(format!("{:08}", index))
}

fn rfc1123(now: DateTime<Utc>) -> String {
    now.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn string_to_sign(
    method: &Method,
    url: &Url,
    headers: &HeaderMap,
    content_length: usize,
    account_name: &str,
) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    };
    let length = if content_length == 0 {
        String::new()
    } else {
        content_length.to_string()
    };

    let mut payload = format!(
        "{}\n{}\n{}\n{}\n{}\n{}\n{}\n{}\n{}\n{}\n{}\n{}\n",
        method.as_str(),
        header("content-encoding"),
        header("content-language"),
        length,
        header("content-md5"),
        header("content-type"),
        header("date"),
        header("if-modified-since"),
        header("if-match"),
        header("if-none-match"),
        header("if-unmodified-since"),
        header("range"),
    );

    let mut ms_headers: Vec<(&str, &str)> = headers
        .iter()
        .filter(|(name, _)| name.as_str().starts_with("x-ms-"))
        .filter_map(|(name, value)| Some((name.as_str(), value.to_str().ok()?.trim())))
        .collect();
    ms_headers.sort();
    for (name, value) in ms_headers {
        payload.push_str(&format!("{}:{}\n", name, value));
    }

    payload.push_str(&format!("/{}{}", account_name, url.path()));

    let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in url.query_pairs() {
        params
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.into_owned());
    }
    for (name, mut values) in params {
        values.sort();
        payload.push_str(&format!("\n{}:{}", name, values.join(",")));
    }

    payload
}

fn sign(key: &[u8], payload: &str) -> Result<String, ApiError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| ApiError::Auth(format!("invalid storage account key: {}", e)))?;
    mac.update(payload.as_bytes());
    Ok(BASE64_STANDARD.encode(mac.finalize().into_bytes()))
}

async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let code = response
        .headers()
        .get("x-ms-error-code")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown").to_string());
    let text = response.text().await.unwrap_or_default();
    let message = xml_element(&text, "Message").unwrap_or(text);

    Err(ApiError::Api {
        status: status.as_u16(),
        code,
        message,
    })
}

fn xml_element(body: &str, name: &str) -> Option<String> {
    let open = format!("<{}>", name);
    let close = format!("</{}>", name);
    let start = body.find(&open)? + open.len();
    let end = body[start..].find(&close)? + start;
    Some(body[start..end].trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mockito::{Matcher, Server};

    const DATE: &str = "Mon, 01 Jan 2024 00:00:00 GMT";

    fn signed_headers(extra: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-ms-date", HeaderValue::from_static(DATE));
        headers.insert("x-ms-version", HeaderValue::from_static(BLOB_SERVICE_VERSION));
        for (name, value) in extra {
            headers.insert(*name, HeaderValue::from_static(value));
        }
        headers
    }

    fn test_blob_client(server: &Server) -> BlobClient {
        BlobClient::new(
            reqwest::Client::new(),
            &format!("{}/acct1", server.url()),
            "acct1",
            b"secret-key".to_vec(),
            Duration::from_millis(5),
        )
    }

    #[test]
    fn rfc1123_date_format() {
        let date = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(rfc1123(date), DATE);
    }

    #[test]
    fn string_to_sign_for_get_with_query() {
        let url = Url::parse("https://acct1.blob.core.windows.net/container/blob.txt?comp=metadata").unwrap();
        let payload = string_to_sign(&Method::GET, &url, &signed_headers(&[]), 0, "acct1");

        assert_eq!(
            payload,
            "GET\n\n\n\n\n\n\n\n\n\n\n\nx-ms-date:Mon, 01 Jan 2024 00:00:00 GMT\nx-ms-version:2018-11-09\n/acct1/container/blob.txt\ncomp:metadata"
        );
        assert_eq!(
            sign(b"secret-key", &payload).unwrap(),
            "4l8ehHJeT4mAw5ICyS/Bqqsc9sYJsBVbNBx3Bcq+VX8="
        );
    }

    #[test]
    fn string_to_sign_for_put_with_body() {
        let url = Url::parse("https://acct1.blob.core.windows.net/container/blob.txt").unwrap();
        let headers = signed_headers(&[("content-type", "text/plain"), ("x-ms-blob-type", "BlockBlob")]);
        let payload = string_to_sign(&Method::PUT, &url, &headers, 11, "acct1");

        assert!(payload.starts_with("PUT\n\n\n11\n\ntext/plain\n"));
        assert_eq!(
            sign(b"secret-key", &payload).unwrap(),
            "dTXlANCTwm7Gwi77iKuBGH6hyUfbCvb+0sxx9jzsQiw="
        );
    }

    #[test]
    fn block_ids_have_equal_length() {
        assert_eq!(block_id(0), "MDAwMDAwMDA=");
        assert_eq!(block_id(1), "MDAwMDAwMDE=");
        assert_eq!(block_id(12).len(), block_id(99_999).len());
    }

    #[test]
    fn blob_type_parses_schema_spellings() {
        assert_eq!(BlobType::parse("block"), Some(BlobType::Block));
        assert_eq!(BlobType::parse("PageBlob"), Some(BlobType::Page));
        assert_eq!(BlobType::parse("Append"), Some(BlobType::Append));
        assert_eq!(BlobType::parse("file"), None);
    }

    #[tokio::test]
    async fn small_block_blob_is_a_single_put() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PUT", "/acct1/container/hello.txt")
            .match_header("x-ms-blob-type", "BlockBlob")
            .match_header("x-ms-version", BLOB_SERVICE_VERSION)
            .match_header("x-ms-blob-content-type", "text/plain")
            .match_header("x-ms-meta-owner", "ops")
            .match_header("authorization", Matcher::Regex("^SharedKey acct1:.+=$".to_string()))
            .match_body("hello world")
            .with_status(201)
            .create_async()
            .await;

        let client = test_blob_client(&server);
        let id = client.blob_id("container", "hello.txt");
        client
            .upload_block_blob(
                &Context::new(),
                &id,
                b"hello world".to_vec(),
                4,
                &BlobHttpHeaders {
                    content_type: Some("text/plain".to_string()),
                    ..Default::default()
                },
                &HashMap::from([("owner".to_string(), "ops".to_string())]),
            )
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn large_block_blob_uploads_blocks_then_commits() {
        let mut server = Server::new_async().await;
        let blocks = server
            .mock("PUT", "/acct1/container/big.bin")
            .match_query(Matcher::UrlEncoded("comp".into(), "block".into()))
            .with_status(201)
            .expect(2)
            .create_async()
            .await;
        let commit = server
            .mock("PUT", "/acct1/container/big.bin")
            .match_query(Matcher::UrlEncoded("comp".into(), "blocklist".into()))
            .match_body(Matcher::Regex(
                "<Latest>MDAwMDAwMDA=</Latest><Latest>MDAwMDAwMDE=</Latest>".to_string(),
            ))
            .with_status(201)
            .create_async()
            .await;

        let client = test_blob_client(&server);
        let id = client.blob_id("container", "big.bin");
        client
            .upload_block_blob(
                &Context::new(),
                &id,
                vec![7u8; BLOCK_SIZE + 10],
                2,
                &BlobHttpHeaders::default(),
                &HashMap::new(),
            )
            .await
            .unwrap();

        blocks.assert_async().await;
        commit.assert_async().await;
    }

    #[tokio::test]
    async fn page_upload_skips_empty_ranges() {
        let mut server = Server::new_async().await;
        let pages = server
            .mock("PUT", "/acct1/vhds/disk.vhd")
            .match_query(Matcher::UrlEncoded("comp".into(), "page".into()))
            .match_header("x-ms-range", "bytes=0-1023")
            .match_header("x-ms-page-write", "update")
            .with_status(201)
            .expect(1)
            .create_async()
            .await;

        let client = test_blob_client(&server);
        let id = client.blob_id("vhds", "disk.vhd");
        let mut content = vec![0u8; 1024];
        content[10] = 1;
        client
            .upload_pages(&Context::new(), &id, &content, 2)
            .await
            .unwrap();

        let empty = vec![0u8; 2048];
        client
            .upload_pages(&Context::new(), &id, &empty, 2)
            .await
            .unwrap();

        pages.assert_async().await;
    }

    #[tokio::test]
    async fn properties_come_from_headers() {
        let mut server = Server::new_async().await;
        let _head = server
            .mock("HEAD", "/acct1/container/hello.txt")
            .with_header("x-ms-blob-type", "AppendBlob")
            .with_header("content-type", "application/octet-stream")
            .with_header("cache-control", "no-cache")
            .with_header("x-ms-meta-owner", "ops")
            .create_async()
            .await;

        let client = test_blob_client(&server);
        let properties = client
            .get_properties(&Context::new(), &client.blob_id("container", "hello.txt"))
            .await
            .unwrap();

        assert_eq!(properties.blob_type, Some(BlobType::Append));
        assert_eq!(
            properties.http_headers.cache_control.as_deref(),
            Some("no-cache")
        );
        assert_eq!(properties.metadata.get("owner").map(String::as_str), Some("ops"));
    }

    #[tokio::test]
    async fn missing_blob_is_not_found() {
        let mut server = Server::new_async().await;
        let _delete = server
            .mock("DELETE", "/acct1/container/gone.txt")
            .match_header("x-ms-delete-snapshots", "include")
            .with_status(404)
            .with_header("x-ms-error-code", "BlobNotFound")
            .with_body("<?xml version=\"1.0\"?><Error><Code>BlobNotFound</Code><Message>The specified blob does not exist.</Message></Error>")
            .create_async()
            .await;

        let client = test_blob_client(&server);
        let err = client
            .delete(&Context::new(), &client.blob_id("container", "gone.txt"))
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        match err {
            ApiError::Api { code, message, .. } => {
                assert_eq!(code, "BlobNotFound");
                assert_eq!(message, "The specified blob does not exist.");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn copy_polls_until_success() {
        let mut server = Server::new_async().await;
        let copy = server
            .mock("PUT", "/acct1/container/copy.vhd")
            .match_header("x-ms-copy-source", "https://source.example/image.vhd")
            .with_status(202)
            .with_header("x-ms-copy-status", "pending")
            .create_async()
            .await;
        let head = server
            .mock("HEAD", "/acct1/container/copy.vhd")
            .with_header("x-ms-copy-status", "success")
            .create_async()
            .await;

        let client = test_blob_client(&server);
        client
            .copy_from_url(
                &Context::new(),
                &client.blob_id("container", "copy.vhd"),
                "https://source.example/image.vhd",
                &HashMap::new(),
            )
            .await
            .unwrap();

        copy.assert_async().await;
        head.assert_async().await;
    }

    #[tokio::test]
    async fn failed_copy_is_reported() {
        let mut server = Server::new_async().await;
        let _copy = server
            .mock("PUT", "/acct1/container/copy.vhd")
            .with_status(202)
            .with_header("x-ms-copy-status", "failed")
            .create_async()
            .await;

        let client = test_blob_client(&server);
        let err = client
            .copy_from_url(
                &Context::new(),
                &client.blob_id("container", "copy.vhd"),
                "https://source.example/image.vhd",
                &HashMap::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::OperationFailed { .. }));
    }
}
