//! Provider error taxonomy
//!
//! Every failure a CRUD operation reports carries the resource type and, when
//! the remote API is involved, the resource name and resource group.

use crate::api::ApiError;
use crate::ids::IdError;
use thiserror::Error;
use tfplug::{Diagnostic, TfplugError};

#[derive(Debug, Error)]
pub enum ProviderError {
    /// Malformed configuration, caught before any network call
    #[error("invalid {resource_type} configuration: {detail}")]
    Validation {
        resource_type: &'static str,
        detail: String,
    },

    #[error("{resource_type} {id:?} was not found")]
    NotFound {
        resource_type: &'static str,
        id: String,
    },

    #[error("A resource with the ID \"{id}\" already exists - to be managed via Terraform this resource needs to be imported into the State. Please see the resource documentation for \"{resource_type}\" for more information.")]
    AlreadyExists {
        resource_type: &'static str,
        id: String,
    },

    #[error("{action} {resource_type} {name:?} (Resource Group {resource_group:?}): {source}")]
    Upstream {
        resource_type: &'static str,
        action: &'static str,
        name: String,
        resource_group: String,
        #[source]
        source: ApiError,
    },

    #[error(transparent)]
    MalformedIdentifier(#[from] IdError),

    /// Typed state could not be converted to or from a dynamic value
    #[error("{resource_type} state: {source}")]
    State {
        resource_type: &'static str,
        #[source]
        source: TfplugError,
    },
}

impl ProviderError {
    pub fn validation(resource_type: &'static str, detail: impl Into<String>) -> Self {
        ProviderError::Validation {
            resource_type,
            detail: detail.into(),
        }
    }

    pub fn upstream(
        resource_type: &'static str,
        action: &'static str,
        name: &str,
        resource_group: &str,
        source: ApiError,
    ) -> Self {
        ProviderError::Upstream {
            resource_type,
            action,
            name: name.to_string(),
            resource_group: resource_group.to_string(),
            source,
        }
    }

    pub fn state(resource_type: &'static str, source: TfplugError) -> Self {
        ProviderError::State {
            resource_type,
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            ProviderError::NotFound { .. } => true,
            ProviderError::Upstream { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let summary = match self {
            ProviderError::Validation { resource_type, .. } => {
                format!("Invalid {} configuration", resource_type)
            }
            ProviderError::NotFound { resource_type, .. } => {
                format!("{} not found", resource_type)
            }
            ProviderError::AlreadyExists { resource_type, .. } => {
                format!("{} already exists", resource_type)
            }
            ProviderError::Upstream {
                resource_type,
                action,
                name,
                resource_group,
                ..
            } => format!(
                "Error {} {} {:?} (Resource Group {:?})",
                action, resource_type, name, resource_group
            ),
            ProviderError::MalformedIdentifier(e) => format!("Malformed {} ID", e.kind),
            ProviderError::State { resource_type, .. } => {
                format!("Failed to convert {} state", resource_type)
            }
        };
        Diagnostic::error(summary, self.to_string())
    }
}

impl From<ProviderError> for Diagnostic {
    fn from(e: ProviderError) -> Self {
        e.to_diagnostic()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_exists_asks_for_import() {
        let err = ProviderError::AlreadyExists {
            resource_type: "azurestack_route_table",
            id: "/subscriptions/s/resourceGroups/rg/providers/microsoft.network/routetables/rt".to_string(),
        };
        let diag = err.to_diagnostic();

        assert_eq!(diag.summary, "azurestack_route_table already exists");
        assert!(diag.detail.contains("needs to be imported into the State"));
        assert!(diag.detail.contains("routetables/rt"));
    }

    #[test]
    fn upstream_names_resource_and_group() {
        let err = ProviderError::upstream(
            "azurestack_dns_ns_record",
            "creating",
            "www",
            "rg1",
            ApiError::Api {
                status: 400,
                code: "BadRequest".to_string(),
                message: "TTL out of range".to_string(),
            },
        );
        let diag = Diagnostic::from(err);

        assert_eq!(
            diag.summary,
            "Error creating azurestack_dns_ns_record \"www\" (Resource Group \"rg1\")"
        );
        assert!(diag.detail.contains("TTL out of range"));
    }

    #[test]
    fn not_found_is_recognised_through_upstream() {
        let err = ProviderError::upstream(
            "azurestack_route_table",
            "reading",
            "rt",
            "rg",
            ApiError::Api {
                status: 404,
                code: "ResourceNotFound".to_string(),
                message: String::new(),
            },
        );
        assert!(err.is_not_found());
        assert!(!ProviderError::validation("azurestack_route_table", "bad").is_not_found());
    }

    #[test]
    fn malformed_identifier_summary_names_kind() {
        let err: ProviderError = IdError::new("Route Table", "/bad", "missing segment").into();
        assert_eq!(err.to_diagnostic().summary, "Malformed Route Table ID");
    }
}
