use serde_json::{Map, Value};

use super::bones::VrmVersion;
use crate::project::MetaOverride;

/// Apply the configured meta fields, creating the meta block if the file has
/// none. Fields left unset in `settings` are not touched.
///
/// Returns whether anything was written: nothing is when no field is set, or
/// when the override is disabled and the file already has meta.
pub(super) fn apply_meta_override(
    json: &mut Value,
    version: Option<VrmVersion>,
    settings: &MetaOverride,
) -> bool {
    let extension = match version {
        Some(VrmVersion::V1) => "VRMC_vrm",
        Some(VrmVersion::V0) | None => "VRM",
    };
    let has_meta = json
        .pointer(&format!("/extensions/{extension}/meta"))
        .is_some_and(Value::is_object);
    if has_meta && !settings.enabled {
        return false;
    }
    if settings.name.is_none() && settings.version.is_none() && settings.author.is_none() {
        return false;
    }

    let Some(meta) = object_entry(json, "extensions")
        .and_then(|extensions| object_entry_in(extensions, extension))
        .and_then(|vrm| object_entry_in(vrm, "meta"))
    else {
        return false;
    };

    let title_key = match version {
        Some(VrmVersion::V1) => "name",
        _ => "title",
    };
    if let Some(name) = &settings.name {
        meta.insert(title_key.to_string(), Value::from(name.as_str()));
    }
    if let Some(model_version) = &settings.version {
        meta.insert("version".to_string(), Value::from(model_version.as_str()));
    }
    if let Some(author) = &settings.author {
        match version {
            Some(VrmVersion::V1) => {
                meta.insert("authors".to_string(), serde_json::json!([author]));
            }
            _ => {
                meta.insert("author".to_string(), Value::from(author.as_str()));
            }
        }
    }

    true
}

fn object_entry<'a>(value: &'a mut Value, key: &str) -> Option<&'a mut Map<String, Value>> {
    object_entry_in(value.as_object_mut()?, key)
}

fn object_entry_in<'a>(
    object: &'a mut Map<String, Value>,
    key: &str,
) -> Option<&'a mut Map<String, Value>> {
    let entry = object
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !entry.is_object() {
        *entry = Value::Object(Map::new());
    }
    entry.as_object_mut()
}
