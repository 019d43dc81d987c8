//! Import helpers for simplifying resource import implementations

use crate::context::Context;
use crate::resource::{ImportResourceStateRequest, ImportResourceStateResponse, ImportedResource};
use crate::types::{AttributePath, Diagnostic, DynamicValue};

/// Copies the import ID verbatim into one attribute of a fresh state
///
/// Example: ID "correct-horse" -> state.result = "correct-horse"
///
/// Returns the index of the imported resource so callers can fill in the
/// remaining attributes, or None if a diagnostic was recorded instead.
pub fn import_state_passthrough_id(
    _ctx: &Context,
    attr_path: AttributePath,
    request: &ImportResourceStateRequest,
    response: &mut ImportResourceStateResponse,
) -> Option<usize> {
    let mut state = DynamicValue::object();

    if let Err(e) = state.set_string(&attr_path, request.id.clone()) {
        response.diagnostics.push(
            Diagnostic::error(
                format!("Failed to set import ID: {}", e),
                format!("Could not set attribute '{}' from the import ID", attr_path),
            )
            .with_attribute(attr_path),
        );
        return None;
    }

    response.imported_resources.push(ImportedResource {
        type_name: request.type_name.clone(),
        state,
    });
    Some(response.imported_resources.len() - 1)
}
