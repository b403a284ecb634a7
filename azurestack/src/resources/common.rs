//! Pieces shared by every resource adapter

use serde::de::DeserializeOwned;
use serde::Serialize;
use tfplug::plan_modifier::UseStateForUnknown;
use tfplug::resource::{
    CreateResourceResponse, DeleteResourceResponse, ImportResourceStateRequest,
    ImportResourceStateResponse, ImportedResource, ReadResourceResponse, UpdateResourceResponse,
};
use tfplug::schema::Attribute;
use tfplug::validator::StringLengthValidator;
use tfplug::{AttributeBuilder, AttributePath, AttributeType, Diagnostic, DynamicValue};

use crate::api::ApiError;
use crate::error::ProviderError;
use crate::ids::ResourceId;

/// Decode configuration or state into the resource's model
pub(crate) fn decode<T: DeserializeOwned>(
    resource_type: &'static str,
    value: &DynamicValue,
) -> Result<T, ProviderError> {
    value
        .decode()
        .map_err(|e| ProviderError::validation(resource_type, e.to_string()))
}

/// Decode prior state; unlike configuration, a failure here is a state problem
pub(crate) fn decode_state<T: DeserializeOwned>(
    resource_type: &'static str,
    value: &DynamicValue,
) -> Result<T, ProviderError> {
    value
        .decode()
        .map_err(|e| ProviderError::state(resource_type, e))
}

pub(crate) fn encode<T: Serialize>(
    resource_type: &'static str,
    model: &T,
) -> Result<DynamicValue, ProviderError> {
    DynamicValue::from_typed(model).map_err(|e| ProviderError::state(resource_type, e))
}

/// The `id` recorded in state
pub(crate) fn state_id(resource_type: &'static str, state: &DynamicValue) -> Result<String, ProviderError> {
    state
        .get_string(&AttributePath::new("id"))
        .map_err(|e| ProviderError::state(resource_type, e))
}

/// Planned state with the new identifier filled in, for creates that
/// succeeded remotely but could not be read back
pub(crate) fn with_id(mut planned: DynamicValue, id: &str) -> DynamicValue {
    if let Err(e) = planned.set_string(&AttributePath::new("id"), id) {
        tracing::warn!("Could not record ID {} in state: {}", id, e);
    }
    planned
}

/// Outcome of the read that follows a successful create
pub(crate) fn created(
    resource_type: &'static str,
    planned: DynamicValue,
    id: String,
    read: Result<Option<DynamicValue>, ProviderError>,
) -> CreateResourceResponse {
    match read {
        Ok(Some(new_state)) => CreateResourceResponse {
            new_state,
            diagnostics: vec![],
        },
        Ok(None) => CreateResourceResponse::failed(
            with_id(planned, &id),
            ProviderError::NotFound { resource_type, id }.into(),
        ),
        Err(e) => CreateResourceResponse::failed(with_id(planned, &id), e.into()),
    }
}

pub(crate) fn read_back(
    current: DynamicValue,
    read: Result<Option<DynamicValue>, ProviderError>,
) -> ReadResourceResponse {
    match read {
        Ok(new_state) => ReadResourceResponse {
            new_state,
            diagnostics: vec![],
        },
        Err(e) => ReadResourceResponse::failed(current, e.into()),
    }
}

/// Outcome of the read that follows a successful update
pub(crate) fn updated(
    resource_type: &'static str,
    planned: DynamicValue,
    id: String,
    read: Result<Option<DynamicValue>, ProviderError>,
) -> UpdateResourceResponse {
    match read {
        Ok(Some(new_state)) => UpdateResourceResponse {
            new_state,
            diagnostics: vec![],
        },
        Ok(None) => UpdateResourceResponse::failed(
            planned,
            ProviderError::NotFound { resource_type, id }.into(),
        ),
        Err(e) => UpdateResourceResponse::failed(planned, e.into()),
    }
}

pub(crate) fn deleted(result: Result<(), ProviderError>) -> DeleteResourceResponse {
    match result {
        Ok(()) => DeleteResourceResponse::default(),
        Err(e) => DeleteResourceResponse {
            diagnostics: vec![e.into()],
        },
    }
}

/// Create pre-check: anything but "not found" stops the create
pub(crate) fn ensure_absent<T>(
    existing: Result<T, ApiError>,
    resource_type: &'static str,
    id: &str,
    name: &str,
    resource_group: &str,
) -> Result<(), ProviderError> {
    match existing {
        Ok(_) => Err(ProviderError::AlreadyExists {
            resource_type,
            id: id.to_string(),
        }),
        Err(e) if e.is_not_found() => Ok(()),
        Err(e) => Err(ProviderError::upstream(
            resource_type,
            "checking for presence of existing",
            name,
            resource_group,
            e,
        )),
    }
}

/// Parse the import ID with `T`'s codec and seed state with its canonical form
pub(crate) fn import_id<T: ResourceId>(request: &ImportResourceStateRequest) -> ImportResourceStateResponse {
    let mut response = ImportResourceStateResponse::default();
    let id = match T::parse(&request.id) {
        Ok(id) => id,
        Err(e) => {
            response.diagnostics.push(ProviderError::from(e).into());
            return response;
        }
    };

    let mut state = DynamicValue::empty_object();
    if let Err(e) = state.set_string(&AttributePath::new("id"), id.id()) {
        response.diagnostics.push(Diagnostic::error("Failed to set import ID", e.to_string()));
        return response;
    }
    response.imported_resources.push(ImportedResource {
        type_name: request.type_name.clone(),
        state,
    });
    response
}

/// Reorder set members returned by the API to follow `reference`, the order
/// Terraform already holds. Members not in `reference` keep API order at the end.
pub(crate) fn order_like<T: PartialEq>(mut items: Vec<T>, reference: &[T]) -> Vec<T> {
    let mut ordered = Vec::with_capacity(items.len());
    for wanted in reference {
        if let Some(pos) = items.iter().position(|item| item == wanted) {
            ordered.push(items.remove(pos));
        }
    }
    ordered.append(&mut items);
    ordered
}

/// The configured spelling of a case-insensitive value when the API echoes
/// it back in a different case
pub(crate) fn prefer_case(known: Option<&str>, actual: Option<String>) -> Option<String> {
    match (known, actual) {
        (Some(known), Some(actual)) if known.eq_ignore_ascii_case(&actual) => Some(known.to_string()),
        (_, actual) => actual,
    }
}

pub(crate) fn id_attribute() -> Attribute {
    AttributeBuilder::new("id", AttributeType::String)
        .description("The resource ID")
        .computed()
        .plan_modifier(UseStateForUnknown)
        .build()
}

pub(crate) fn name_attribute(description: &str) -> Attribute {
    AttributeBuilder::new("name", AttributeType::String)
        .description(description)
        .required()
        .force_new()
        .validator(StringLengthValidator::not_empty())
        .build()
}

pub(crate) fn resource_group_name_attribute() -> Attribute {
    AttributeBuilder::new("resource_group_name", AttributeType::String)
        .description("The name of the resource group in which to create the resource")
        .required()
        .force_new()
        .validator(StringLengthValidator::between(1, 90))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::RouteTableId;

    fn api_error(status: u16) -> ApiError {
        ApiError::Api {
            status,
            code: "Code".to_string(),
            message: "message".to_string(),
        }
    }

    #[test]
    fn existing_resource_requires_import() {
        let err = ensure_absent(Ok(()), "azurestack_route_table", "/id", "rt", "rg").unwrap_err();
        assert!(matches!(err, ProviderError::AlreadyExists { .. }));
    }

    #[test]
    fn prefer_case_only_keeps_equal_values() {
        assert_eq!(
            prefer_case(Some("readwrite"), Some("ReadWrite".to_string())).as_deref(),
            Some("readwrite")
        );
        assert_eq!(
            prefer_case(Some("ReadOnly"), Some("ReadWrite".to_string())).as_deref(),
            Some("ReadWrite")
        );
        assert_eq!(prefer_case(Some("ReadOnly"), None), None);
    }

    #[test]
    fn not_found_allows_create() {
        ensure_absent::<()>(Err(api_error(404)), "azurestack_route_table", "/id", "rt", "rg").unwrap();
    }

    #[test]
    fn other_errors_stop_create() {
        let err = ensure_absent::<()>(Err(api_error(403)), "azurestack_route_table", "/id", "rt", "rg")
            .unwrap_err();
        assert!(matches!(err, ProviderError::Upstream { .. }));
    }

    #[test]
    fn unreadable_state_is_a_state_error() {
        #[derive(Debug, Default, serde::Deserialize)]
        #[serde(default)]
        struct Model {
            #[allow(dead_code)]
            keep_disks: bool,
        }

        let state = DynamicValue::new(tfplug::Dynamic::from(serde_json::json!({"keep_disks": "yes"})));
        let err = decode_state::<Model>("azurestack_virtual_machine", &state).unwrap_err();
        assert!(matches!(err, ProviderError::State { .. }));
    }

    #[test]
    fn order_like_follows_reference() {
        let ordered = order_like(vec![3, 1, 4, 2], &[2, 3, 9]);
        assert_eq!(ordered, vec![2, 3, 1, 4]);
    }

    #[test]
    fn import_normalizes_id() {
        let response = import_id::<RouteTableId>(&ImportResourceStateRequest {
            type_name: "azurestack_route_table".to_string(),
            id: "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/routeTables/rt1".to_string(),
        });

        assert!(response.diagnostics.is_empty());
        assert_eq!(
            response.imported_resources[0]
                .state
                .get_string(&AttributePath::new("id"))
                .unwrap(),
            "/subscriptions/s/resourceGroups/rg/providers/microsoft.network/routetables/rt1"
        );
    }

    #[test]
    fn import_rejects_malformed_id() {
        let response = import_id::<RouteTableId>(&ImportResourceStateRequest {
            type_name: "azurestack_route_table".to_string(),
            id: "/subscriptions/s/resourceGroups/rg".to_string(),
        });

        assert!(response.imported_resources.is_empty());
        assert_eq!(response.diagnostics[0].summary, "Malformed Route Table ID");
    }
}
