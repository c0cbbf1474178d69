//! JSON Schema generation for the configuration file.

use crate::config::PieslotConfig;

/// URL the published schema is served from.
pub const SCHEMA_ID: &str = "https://raw.githubusercontent.com/pieslot/pieslot/main/pieslot.schema.json";

/// Generates a JSON Schema for the Pieslot configuration.
///
/// The schema includes all configuration options with their types,
/// descriptions, and default values.
#[must_use]
pub fn generate_schema() -> schemars::Schema {
    let mut schema = schemars::schema_for!(PieslotConfig);

    if let Some(obj) = schema.as_object_mut() {
        obj.insert("$id".to_string(), serde_json::json!(SCHEMA_ID));
    }

    schema
}

/// Generates a pretty-printed JSON Schema string for the configuration.
#[must_use]
pub fn generate_schema_json() -> String {
    let schema = generate_schema();
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}
