pub mod read;
pub mod write;

use std::sync::Arc;

use bridge_api::MessageSchema;
use pipeline::config::SchemaConfig;

use crate::error::QbridgeError;

/// Resolve the schema handle once at startup, only when a schema-axis type
/// is selected.
fn resolve_schema(
    required: bool,
    schema: &SchemaConfig,
) -> Result<Option<Arc<dyn MessageSchema>>, QbridgeError> {
    if !required {
        return Ok(None);
    }
    let Some((location, root)) = schema.source() else {
        return Err(QbridgeError::Config {
            context: "schema",
            detail: "protobuf dir and root message must both be set".into(),
        });
    };
    let schema: Arc<dyn MessageSchema> = Arc::new(
        format_protobuf::resolve(location, root)
            .map_err(|e| e.context("unable to find root message descriptor"))?,
    );
    Ok(Some(schema))
}
