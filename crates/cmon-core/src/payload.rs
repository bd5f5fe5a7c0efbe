//! Canonical payload serialization and send-time enrichment

use crate::config::ProjectContext;
use crate::event::EventFields;
use serde_json::Value;

/// Compact JSON of the field map in insertion order.
///
/// This is both the spooled file body and the input to the content hash, so
/// identical field data always yields identical bytes.
pub fn canonical_bytes(fields: &EventFields) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(fields)
}

/// Merge the deployment identity into a field map.
///
/// `project`, `environment` and `secret` overwrite any event field of the same
/// name. They are added at send time only and never written to the spool.
pub fn with_project_context(mut fields: EventFields, context: &ProjectContext) -> EventFields {
    fields.insert("project".into(), Value::from(context.project.as_str()));
    fields.insert("environment".into(), Value::from(context.environment.as_str()));
    fields.insert("secret".into(), Value::from(context.secret.as_str()));
    fields
}
