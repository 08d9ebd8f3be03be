use crate::activity::ActivityMapping;
use crate::course::Course;
use crate::gen_uuid;
use crate::keys::{import_key, rename_document_keys, REGISTRY_KEY};
use crate::scoring::{Context, ScoringConfig};
use crate::serde_helpers::{is_truthy, strip_nulls, value_to_string, vec_from_value};
use crate::settings::Settings;
use log::{debug, error, warn};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::error::Error;
use std::fs;
use std::path::Path;

/// Result of importing a curriculum document.
///
/// Reading and parsing are the only failures; once the JSON is parsed the import always
/// produces a course, defaulting whatever it cannot interpret.
#[derive(Debug)]
pub enum ImportOutcome {
    Ok(Course),       // Success case with the imported course.
    ErrRead(String),  // The file could not be read.
    ErrParse(String), // The text is not valid JSON.
}

impl ImportOutcome {
    pub fn into_result(self) -> Result<Course, Box<dyn Error>> {
        match self {
            ImportOutcome::Ok(course) => Ok(course),
            ImportOutcome::ErrRead(e) | ImportOutcome::ErrParse(e) => Err(e.into()),
        }
    }
}

// Content fields used to infer a missing part type, in priority order.
const QUESTION_PART_KINDS: [&str; 3] = ["text", "media", "code"];
const CHOICE_PART_KINDS: [&str; 3] = ["media", "text", "code"];
const EXPLANATION_PART_KINDS: [&str; 2] = ["text", "media"];

const CHECKPOINT_SET: &str = "checkpoint-set";

/// Rewrites an interchange document into the editor's shape, still as JSON.
///
/// 1. `null` members are dropped.
/// 2. Every key is camel-cased and `blockGroups` becomes `stepBlockGroups`. Activity ids
///    keying the registry are kept as they are.
/// 3. Checkpoint-set parts get an inferred `type` and their nested `media` object flattened.
/// 4. Scoring contexts are rebuilt as `{memberKey, members, title}`.
pub fn normalize_import(value: Value, settings: &Settings) -> Value {
    let mut value = value;
    strip_nulls(&mut value);
    let mut value = rename_document_keys(value, import_key);
    migrate_checkpoint_sets(&mut value);
    rebuild_contexts(&mut value, settings.read_plural_activities);
    value
}

// The registry entry named `checkpoint-set` is the documented location; any mapping whose
// tool is `checkpoint-set` is migrated the same way.
fn migrate_checkpoint_sets(value: &mut Value) {
    let Some(activities) = value.get_mut(REGISTRY_KEY).and_then(Value::as_object_mut) else {
        return;
    };
    let mut migrated = 0;
    for (id, mapping) in activities.iter_mut() {
        let is_set = id == CHECKPOINT_SET
            || mapping.get("tool").and_then(Value::as_str) == Some(CHECKPOINT_SET);
        if !is_set {
            continue;
        }
        let Some(checkpoints) = mapping.get_mut("checkpoints").and_then(Value::as_array_mut)
        else {
            continue;
        };
        for checkpoint in checkpoints.iter_mut().filter_map(Value::as_object_mut) {
            migrate_parts(checkpoint, "question", &QUESTION_PART_KINDS);
            migrate_parts(checkpoint, "choices", &CHOICE_PART_KINDS);
            migrate_parts(checkpoint, "explanation", &EXPLANATION_PART_KINDS);
            migrated += 1;
        }
    }
    if migrated > 0 {
        debug!("Migrated {} checkpoint-set checkpoints", migrated);
    }
}

fn migrate_parts(checkpoint: &mut Map<String, Value>, field: &str, kinds: &[&str]) {
    let parts = checkpoint
        .entry(field)
        .or_insert_with(|| Value::Array(Vec::new()));
    let Some(parts) = parts.as_array_mut() else {
        return;
    };
    for part in parts.iter_mut().filter_map(Value::as_object_mut) {
        if !part.get("type").map_or(false, is_truthy) {
            let inferred = kinds
                .iter()
                .find(|kind| part.get(**kind).map_or(false, is_truthy));
            if let Some(kind) = inferred {
                part.insert("type".to_string(), Value::String(kind.to_string()));
            }
        }
        if part.get("media").map_or(false, is_truthy) {
            if let Some(media) = part.remove("media") {
                flatten_media(part, &media);
            }
        }
    }
}

fn flatten_media(part: &mut Map<String, Value>, media: &Value) {
    for (nested, flat) in [("type", "mediaType"), ("url", "url"), ("height", "height")] {
        match media.get(nested) {
            Some(value) => {
                part.insert(flat.to_string(), value.clone());
            }
            None => {
                part.remove(flat);
            }
        }
    }
}

fn rebuild_contexts(value: &mut Value, read_plural_activities: bool) {
    let Some(criteria) = value
        .pointer_mut("/scoring/criteria")
        .and_then(Value::as_array_mut)
    else {
        return;
    };
    let mut rebuilt = 0;
    for criterion in criteria.iter_mut().filter_map(Value::as_object_mut) {
        let contexts: Vec<Value> = match criterion.get("contexts") {
            Some(Value::Array(contexts)) => contexts
                .iter()
                .map(|context| Context::from_wire(context, read_plural_activities))
                .filter_map(|context| serde_json::to_value(context).ok())
                .collect(),
            _ => Vec::new(),
        };
        rebuilt += contexts.len();
        criterion.insert("contexts".to_string(), Value::Array(contexts));
    }
    debug!("Rebuilt {} scoring contexts", rebuilt);
}

/// Builds a course from a parsed interchange document, current or legacy.
///
/// Never fails: the document is normalized with [`normalize_import`] and merged field by
/// field into a fresh course. Absent or unusable fields take the course defaults, a missing
/// `id` is generated, and both `sectionGroups` and `section_groups` are accepted. Checkpoint
/// choices get an id, `text`, `correct` and `type` when missing, and requirement ids are
/// made unique.
///
/// Example:
/// ```
/// use curriculum_schema::{import_value, Settings};
/// use serde_json::json;
///
/// let course = import_value(json!({ "title": "Robots", "media_type": "video" }), &Settings::default());
/// assert_eq!(course.title, "Robots");
/// assert_eq!(course.media_type, "video");
/// assert_eq!(course.language, "CoBlocks");
/// assert_eq!(course.id.len(), 36);
/// ```
pub fn import_value(value: Value, settings: &Settings) -> Course {
    let mut fields = match normalize_import(value, settings) {
        Value::Object(fields) => fields,
        other => {
            warn!(
                "Imported document is not an object ({}); starting from an empty course",
                other
            );
            Map::new()
        }
    };

    let defaults = Course::default();
    let section_groups = fields
        .remove("sectionGroups")
        .filter(Value::is_array)
        .or_else(|| fields.remove("section_groups"));
    let mut course = Course {
        id: text_field(&mut fields, "id").unwrap_or_else(gen_uuid),
        name: text_field(&mut fields, "name").unwrap_or_default(),
        title: text_field(&mut fields, "title").unwrap_or_default(),
        description: text_field(&mut fields, "description").unwrap_or_default(),
        media_url: text_field(&mut fields, "mediaUrl").unwrap_or_default(),
        media_type: text_field(&mut fields, "mediaType").unwrap_or(defaults.media_type),
        language: text_field(&mut fields, "language").unwrap_or(defaults.language),
        vocabulary: fields
            .remove("vocabulary")
            .map(vec_from_value)
            .unwrap_or_default(),
        rubric: fields.remove("rubric").map(vec_from_value).unwrap_or_default(),
        section_groups: section_groups.map(vec_from_value).unwrap_or_default(),
        scoring: fields
            .remove("scoring")
            .map(scoring_from_value)
            .unwrap_or_default(),
        activities: fields
            .remove(REGISTRY_KEY)
            .map(registry_from_value)
            .unwrap_or_default(),
    };

    course.for_each_block_mut(|block| {
        if let Some(checkpoint) = block.as_checkpoint_mut() {
            checkpoint.apply_import_defaults();
        }
    });
    course
        .rubric
        .iter_mut()
        .for_each(|item| item.normalize_requirements());

    debug!(
        "Imported course {} ({} section groups, {} activities)",
        course.id,
        course.section_groups.len(),
        course.activities.len()
    );
    course
}

// A present, non-empty scalar field as text.
fn text_field(fields: &mut Map<String, Value>, key: &str) -> Option<String> {
    fields
        .remove(key)
        .filter(is_truthy)
        .map(|value| value_to_string(&value))
        .filter(|text| !text.is_empty())
}

fn scoring_from_value(value: Value) -> ScoringConfig {
    serde_json::from_value(value).unwrap_or_else(|e| {
        warn!("Could not read scoring configuration ({}); using none", e);
        ScoringConfig::default()
    })
}

fn registry_from_value(value: Value) -> BTreeMap<String, ActivityMapping> {
    let Value::Object(entries) = value else {
        warn!("Activity registry is not an object; ignoring it");
        return BTreeMap::new();
    };
    entries
        .into_iter()
        .map(|(id, mapping)| {
            let mapping = serde_json::from_value(mapping).unwrap_or_else(|e| {
                warn!("Could not read activity mapping {:?} ({}); using an empty one", id, e);
                ActivityMapping::default()
            });
            (id, mapping)
        })
        .collect()
}

/// Parses and imports a JSON document held in a string.
///
/// Returns:
/// - `ImportOutcome::Ok(Course)`: The imported course.
/// - `ImportOutcome::ErrParse(String)`: The text is not valid JSON. Nothing is imported.
pub fn import_str(text: &str, settings: &Settings) -> ImportOutcome {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => ImportOutcome::Ok(import_value(value, settings)),
        Err(e) => {
            error!("Invalid JSON document: {}", e);
            ImportOutcome::ErrParse(format!("Invalid JSON document: {}", e))
        }
    }
}

/// Reads and imports a JSON file in one read-then-parse step.
///
/// Returns:
/// - `ImportOutcome::Ok(Course)`: The imported course.
/// - `ImportOutcome::ErrRead(String)`: The file could not be read.
/// - `ImportOutcome::ErrParse(String)`: The file is not valid JSON.
pub fn import_file<P: AsRef<Path>>(path: P, settings: &Settings) -> ImportOutcome {
    let path = path.as_ref();
    match fs::read_to_string(path) {
        Ok(text) => import_str(&text, settings),
        Err(e) => {
            error!("Failed to read {:?}: {}", path, e);
            ImportOutcome::ErrRead(format!("Failed to read {:?}: {}", path, e))
        }
    }
}
