//! Import helpers for simplifying resource import implementations

use crate::context::Context;
use crate::resource::{
    ImportResourceStateRequest, ImportResourceStateResponse, ImportedResource,
    ReadResourceRequest, Resource, ResourceWithImportState,
};
use crate::types::{AttributePath, Diagnostic, DynamicValue};

/// Sets the import ID to a specific attribute in state
///
/// Example: ID "/subscriptions/.../routeTables/rt1" -> state.id = that ID
pub fn import_state_passthrough_id(
    _ctx: &Context,
    attr_path: AttributePath,
    request: &ImportResourceStateRequest,
    response: &mut ImportResourceStateResponse,
) {
    let mut state = DynamicValue::empty_object();

    if let Err(e) = state.set_string(&attr_path, request.id.clone()) {
        response.diagnostics.push(
            Diagnostic::error(
                format!("Failed to set import ID: {}", e),
                format!("Could not set attribute '{}' to value '{}'", attr_path, request.id),
            )
            .with_attribute(attr_path),
        );
        return;
    }

    response.imported_resources.push(ImportedResource {
        type_name: request.type_name.clone(),
        state,
    });
}

/// Runs `terraform import` end to end: seed state from the ID, then read.
///
/// Returns None when the object does not exist, which Terraform reports as
/// "Cannot import non-existent remote object".
pub async fn import_and_read<R>(
    ctx: Context,
    resource: &R,
    id: &str,
) -> (Option<DynamicValue>, Vec<Diagnostic>)
where
    R: ResourceWithImportState + ?Sized,
{
    let import = resource
        .import_state(
            ctx,
            ImportResourceStateRequest {
                type_name: resource.type_name().to_string(),
                id: id.to_string(),
            },
        )
        .await;

    let mut diagnostics = import.diagnostics;
    let Some(imported) = import.imported_resources.into_iter().next() else {
        return (None, diagnostics);
    };
    if crate::types::has_errors(&diagnostics) {
        return (None, diagnostics);
    }

    let read = Resource::read(
        resource,
        ctx,
        ReadResourceRequest {
            type_name: imported.type_name,
            current_state: imported.state,
        },
    )
    .await;
    diagnostics.extend(read.diagnostics);

    if read.new_state.is_none() && !crate::types::has_errors(&diagnostics) {
        diagnostics.push(Diagnostic::error(
            "Cannot import non-existent remote object",
            format!("While attempting to import an existing object to {:?}, the provider detected that no object exists with the given id.", id),
        ));
    }
    (read.new_state, diagnostics)
}
