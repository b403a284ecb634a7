//! Resource identifiers
//!
//! Every resource stores its ARM ID in state and parses it again for Read,
//! Update and Delete. Parsing matches the fixed markers (`subscriptions`,
//! `providers`, resource type names) case-insensitively and keeps names as
//! written. Formatting emits `subscriptions`, `resourceGroups` and `providers`
//! as shown and lower-cases the provider namespace and resource type markers,
//! which is the form the API hands back.

macro_rules! display_as_id {
    ($($ty:ty),*) => {
        $(impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&$crate::ids::ResourceId::id(self))
            }
        })*
    };
}

/// `{resource group}/providers/{namespace}/{marker}/{name}`
macro_rules! resource_group_child_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal, $namespace:literal, $marker:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            pub subscription_id: String,
            pub resource_group: String,
            pub name: String,
        }

        impl $name {
            pub fn new(subscription_id: &str, resource_group: &str, name: &str) -> Self {
                Self {
                    subscription_id: subscription_id.to_string(),
                    resource_group: resource_group.to_string(),
                    name: name.to_string(),
                }
            }
        }

        impl $crate::ids::ResourceId for $name {
            const KIND: &'static str = $kind;

            fn parse(input: &str) -> Result<Self, $crate::ids::IdError> {
                let mut p = $crate::ids::parser::SegmentParser::new(Self::KIND, input)?;
                let (subscription_id, resource_group) = p.resource_group_scope()?;
                p.provider($namespace)?;
                let name = p.keyed($marker)?;
                p.finish()?;
                Ok(Self {
                    subscription_id,
                    resource_group,
                    name,
                })
            }

            fn id(&self) -> String {
                format!(
                    "{}/{}/{}",
                    $crate::ids::parser::provider_prefix(
                        &self.subscription_id,
                        &self.resource_group,
                        $namespace
                    ),
                    $marker.to_ascii_lowercase(),
                    self.name
                )
            }
        }

        display_as_id!($name);
    };
}

mod compute;
mod dns;
mod network;
mod parser;
mod resources;
mod storage;

pub use compute::{AvailabilitySetId, ManagedDiskId, VirtualMachineId};
pub use dns::{MxRecordId, NsRecordId};
pub use network::{
    LoadBalancerBackendAddressPoolId, LocalNetworkGatewayId,
    NetworkInterfaceBackendAddressPoolAssociationId, NetworkInterfaceId,
    NetworkInterfaceIpConfigurationId, RouteTableId, SubnetId,
};
pub use resources::{ResourceGroupId, TemplateDeploymentId};
pub use storage::{BlobId, StorageAccountId};

use std::marker::PhantomData;
use tfplug::types::{AttributePath, Diagnostic, Dynamic};
use tfplug::validator::Validator;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("parsing {kind} ID {input:?}: {reason}")]
pub struct IdError {
    pub kind: &'static str,
    pub input: String,
    pub reason: String,
}

impl IdError {
    pub(crate) fn new(kind: &'static str, input: &str, reason: impl Into<String>) -> Self {
        Self {
            kind,
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

pub trait ResourceId: Sized {
    /// Human readable kind used in error messages
    const KIND: &'static str;

    fn parse(input: &str) -> Result<Self, IdError>;

    /// Canonical string form
    fn id(&self) -> String;
}

/// Rewrite `input` into the canonical form of `T`
pub fn normalize<T: ResourceId>(input: &str) -> Result<String, IdError> {
    T::parse(input).map(|id| id.id())
}

/// The ID as the configuration spelled it when it names the same resource as
/// `actual`, otherwise the canonical form of `actual`
pub fn prefer_spelling<T: ResourceId + PartialEq>(known: Option<&str>, actual: &T) -> String {
    match known {
        Some(known) if T::parse(known).is_ok_and(|parsed| parsed == *actual) => known.to_string(),
        _ => actual.id(),
    }
}

/// Schema validator accepting only strings that parse as `T`
pub struct IdValidator<T> {
    kind: PhantomData<fn() -> T>,
}

impl<T> IdValidator<T> {
    pub fn new() -> Self {
        Self { kind: PhantomData }
    }
}

impl<T> Default for IdValidator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ResourceId> Validator for IdValidator<T> {
    fn description(&self) -> String {
        format!("a valid {} ID", T::KIND)
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Some(s) = value.as_str() {
            if let Err(e) = T::parse(s) {
                diagnostics.push(
                    Diagnostic::error(format!("{} must be a valid {} ID", path, T::KIND), e.to_string())
                        .with_attribute(path.clone()),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_validator_reports_parse_error() {
        let validator = IdValidator::<RouteTableId>::new();
        let mut diags = Vec::new();
        validator.validate(
            &Dynamic::from("/subscriptions/s/resourceGroups/rg"),
            &AttributePath::new("route_table_id"),
            &mut diags,
        );

        assert_eq!(diags.len(), 1);
        assert!(diags[0].summary.contains("Route Table"));
        assert!(diags[0].detail.contains("/subscriptions/s/resourceGroups/rg"));
    }

    #[test]
    fn prefer_spelling_keeps_equivalent_ids() {
        let actual = RouteTableId::new("s", "rg", "rt");
        let configured = "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/routeTables/rt";
        assert_eq!(prefer_spelling(Some(configured), &actual), configured);

        let other = "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/routeTables/rt2";
        assert_eq!(prefer_spelling(Some(other), &actual), actual.id());
        assert_eq!(prefer_spelling(None, &actual), actual.id());
    }

    #[test]
    fn normalize_rewrites_marker_casing() {
        let normalized = normalize::<RouteTableId>(
            "/SUBSCRIPTIONS/s/RESOURCEGROUPS/Rg1/providers/microsoft.network/ROUTETABLES/Rt1",
        )
        .unwrap();
        assert_eq!(
            normalized,
            "/subscriptions/s/resourceGroups/Rg1/providers/microsoft.network/routetables/Rt1"
        );
    }
}
