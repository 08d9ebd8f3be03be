// Key renaming between the editor's field names and the interchange format.
//
// The two directions are not inverses of each other: export only rewrites the
// five keys listed in `EXPORT_KEY_TABLE`, while import camel-cases every snake_case key.

use lazy_static::lazy_static;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::HashMap;

/// Top-level key of the activity registry. Its members are keyed by activity id, and ids are
/// data, so they are never renamed.
pub const REGISTRY_KEY: &str = "activities";

lazy_static! {
    // Editor name -> interchange name. Nothing else is renamed on export; in particular
    // `correct_text`, `questionBlocks` and `is_submission` pass through untouched.
    static ref EXPORT_KEY_TABLE: HashMap<&'static str, &'static str> = {
        let mut table = HashMap::new();
        table.insert("mediaUrl", "media_url");
        table.insert("mediaType", "media_type");
        table.insert("activityId", "activity_id");
        table.insert("teacherOnly", "teacher_only");
        table.insert("stepBlockGroups", "block_groups");
        table
    };
}

static SNAKE_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_([a-z])").expect("snake segment pattern is valid"));

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Interchange name for an editor key. Keys outside the fixed table are returned unchanged.
pub fn export_key(key: &str) -> String {
    EXPORT_KEY_TABLE
        .get(key)
        .map_or_else(|| key.to_string(), |renamed| renamed.to_string())
}

/// Editor name for an interchange key: every `_x` becomes `X`, then `blockGroups` is mapped
/// to the editor's `stepBlockGroups`.
///
/// Example:
/// ```
/// use curriculum_schema::keys::import_key;
///
/// assert_eq!(import_key("teacher_only"), "teacherOnly");
/// assert_eq!(import_key("block_groups"), "stepBlockGroups");
/// assert_eq!(import_key("checkpoint-set"), "checkpoint-set");
/// ```
pub fn import_key(key: &str) -> String {
    let camel = SNAKE_SEGMENT.replace_all(key, |caps: &Captures| caps[1].to_uppercase());
    if camel == "blockGroups" {
        "stepBlockGroups".to_string()
    } else {
        camel.into_owned()
    }
}

/// Applies `rename` to every object key in `value`, at any depth.
pub fn rename_keys(value: Value, rename: fn(&str) -> String) -> Value {
    match value {
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| rename_keys(item, rename))
                .collect(),
        ),
        Value::Object(fields) => Value::Object(
            fields
                .into_iter()
                .map(|(key, member)| (rename(&key), rename_keys(member, rename)))
                .collect(),
        ),
        other => other,
    }
}

/// Like [`rename_keys`] for a whole course document, except that the ids keying the
/// activity registry are kept verbatim. The mappings under those ids are still renamed.
pub fn rename_document_keys(value: Value, rename: fn(&str) -> String) -> Value {
    let Value::Object(fields) = value else {
        return rename_keys(value, rename);
    };
    Value::Object(
        fields
            .into_iter()
            .map(|(key, member)| {
                let renamed = rename(&key);
                let member = if renamed == REGISTRY_KEY {
                    rename_registry(member, rename)
                } else {
                    rename_keys(member, rename)
                };
                (renamed, member)
            })
            .collect(),
    )
}

fn rename_registry(value: Value, rename: fn(&str) -> String) -> Value {
    match value {
        Value::Object(entries) => Value::Object(
            entries
                .into_iter()
                .map(|(id, mapping)| (id, rename_keys(mapping, rename)))
                .collect(),
        ),
        other => rename_keys(other, rename),
    }
}

/// Replaces every run of whitespace with a single underscore.
pub fn underscore_whitespace(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text, "_").into_owned()
}
