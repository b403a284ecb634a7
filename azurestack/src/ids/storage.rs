use super::{IdError, ResourceId};
use url::Url;

resource_group_child_id!(
    StorageAccountId,
    "Storage Account",
    "Microsoft.Storage",
    "storageAccounts"
);

/// Blob URL, either `https://{account}.blob.{suffix}/{container}/{blob}` or the
/// path-style `http://{host}/{account}/{container}/{blob}` used by emulators
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobId {
    /// Blob service endpoint without trailing slash
    pub service_url: String,
    pub account_name: String,
    pub container_name: String,
    pub blob_name: String,
}

impl BlobId {
    pub fn new(service_url: &str, account_name: &str, container_name: &str, blob_name: &str) -> Self {
        Self {
            service_url: service_url.trim_end_matches('/').to_string(),
            account_name: account_name.to_string(),
            container_name: container_name.to_string(),
            blob_name: blob_name.to_string(),
        }
    }

    pub fn container_url(&self) -> String {
        format!("{}/{}", self.service_url, self.container_name)
    }
}

impl ResourceId for BlobId {
    const KIND: &'static str = "Storage Blob";

    fn parse(input: &str) -> Result<Self, IdError> {
        let url = Url::parse(input).map_err(|e| IdError::new(Self::KIND, input, e.to_string()))?;
        let host = url
            .host_str()
            .ok_or_else(|| IdError::new(Self::KIND, input, "URL has no host"))?;
        let origin = match url.port() {
            Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
            None => format!("{}://{}", url.scheme(), host),
        };

        let path = url.path().trim_start_matches('/');
        let (service_url, account_name, rest) = match host.split_once(".blob.") {
            Some((account, _)) => (origin.clone(), account.to_string(), path),
            None => {
                let (account, rest) = path.split_once('/').ok_or_else(|| {
                    IdError::new(Self::KIND, input, "expected /{account}/{container}/{blob}")
                })?;
                (format!("{}/{}", origin, account), account.to_string(), rest)
            }
        };

        let (container_name, blob_name) = rest
            .split_once('/')
            .filter(|(container, blob)| !container.is_empty() && !blob.is_empty())
            .ok_or_else(|| IdError::new(Self::KIND, input, "expected {container}/{blob} in the path"))?;
        if account_name.is_empty() {
            return Err(IdError::new(Self::KIND, input, "storage account name is empty"));
        }

        Ok(Self {
            service_url,
            account_name,
            container_name: container_name.to_string(),
            blob_name: blob_name.to_string(),
        })
    }

    fn id(&self) -> String {
        format!("{}/{}/{}", self.service_url, self.container_name, self.blob_name)
    }
}

display_as_id!(BlobId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_host_style_blob_url() {
        let id = BlobId::parse("https://acct1.blob.local.azurestack.external/vhds/os/disk1.vhd").unwrap();
        assert_eq!(id.account_name, "acct1");
        assert_eq!(id.container_name, "vhds");
        assert_eq!(id.blob_name, "os/disk1.vhd");
        assert_eq!(id.service_url, "https://acct1.blob.local.azurestack.external");
        assert_eq!(id.id(), "https://acct1.blob.local.azurestack.external/vhds/os/disk1.vhd");
    }

    #[test]
    fn parses_path_style_blob_url() {
        let id = BlobId::parse("http://127.0.0.1:10000/devstore/images/a.vhd").unwrap();
        assert_eq!(id.account_name, "devstore");
        assert_eq!(id.service_url, "http://127.0.0.1:10000/devstore");
        assert_eq!(id.container_url(), "http://127.0.0.1:10000/devstore/images");
        assert_eq!(id.blob_name, "a.vhd");
    }

    #[test]
    fn rejects_container_without_blob() {
        assert!(BlobId::parse("https://acct1.blob.core.windows.net/vhds").is_err());
        assert!(BlobId::parse("https://acct1.blob.core.windows.net/vhds/").is_err());
        assert!(BlobId::parse("not a url").is_err());
    }

    #[test]
    fn storage_account_id_parses() {
        let id = StorageAccountId::parse(
            "/subscriptions/12345/resourceGroups/group1/providers/Microsoft.Storage/storageAccounts/acct1",
        )
        .unwrap();
        assert_eq!(id.name, "acct1");
    }
}
