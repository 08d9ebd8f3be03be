use crate::block::BlockContent;
use crate::course::Course;
use crate::keys::{export_key, rename_document_keys, underscore_whitespace};
use crate::rubric::Requirement;
use crate::settings::Settings;
use log::{debug, info};
use serde_json::Value;
use std::error::Error;
use std::fs;
use std::path::PathBuf;

/// File name used when the course has no title.
pub const DEFAULT_EXPORT_FILE: &str = "curriculum.json";

/// Converts a course into the interchange JSON document.
///
/// The course is deep-copied first and never modified. On the copy:
/// - audio URLs are dropped wherever audio is disabled,
/// - media blocks carrying both flat `url` and `mediaType` get a nested `media: {url, type}`,
/// - empty step types are removed,
/// - keys are renamed through the export table (`mediaUrl` → `media_url`, `stepBlockGroups`
///   → `block_groups`, ...), every other key passing through,
/// - scoring contexts are reshaped from `{memberKey, members}` to the `type`-discriminated form.
///
/// Returns:
/// - `Ok(Value)`: The interchange document.
/// - `Err(serde_json::Error)`: The course could not be serialized.
///
/// Example:
/// ```
/// use curriculum_schema::{prepare_export_data, Course};
///
/// let course = Course::new();
/// let data = prepare_export_data(&course).unwrap();
/// assert_eq!(data["media_type"], "image");
/// assert!(data.get("mediaType").is_none());
/// ```
pub fn prepare_export_data(course: &Course) -> Result<Value, serde_json::Error> {
    let mut data = course.clone();

    data.rubric
        .iter_mut()
        .flat_map(|item| item.requirements.iter_mut())
        .for_each(Requirement::enforce_audio_invariant);

    let mut consolidated = 0;
    data.for_each_block_mut(|block| {
        block.enforce_audio_invariant();
        if let BlockContent::Media(media) = &mut block.content {
            if media.consolidate_legacy_fields() {
                consolidated += 1;
            }
        }
    });
    if consolidated > 0 {
        debug!("Consolidated {} legacy media blocks", consolidated);
    }

    for step in data.steps_mut() {
        if step.step_type.as_deref().map_or(false, str::is_empty) {
            step.step_type = None;
        }
    }

    let mut value = rename_document_keys(serde_json::to_value(&data)?, export_key);

    // Contexts have no renamed keys, so they are swapped in after renaming.
    if let Some(criteria) = value
        .pointer_mut("/scoring/criteria")
        .and_then(Value::as_array_mut)
    {
        for (criterion, source) in criteria.iter_mut().zip(&data.scoring.criteria) {
            if let Some(fields) = criterion.as_object_mut() {
                fields.insert(
                    "contexts".to_string(),
                    serde_json::to_value(source.wire_contexts())?,
                );
            }
        }
    }

    Ok(value)
}

/// Name of the export file: the trimmed title with whitespace runs replaced by `_`, plus
/// `.json`. An empty title gives `curriculum.json`.
///
/// Example:
/// ```
/// use curriculum_schema::export::export_file_name;
///
/// assert_eq!(export_file_name(" Intro to  Robotics "), "Intro_to_Robotics.json");
/// assert_eq!(export_file_name(""), "curriculum.json");
/// ```
pub fn export_file_name(title: &str) -> String {
    let title = title.trim();
    if title.is_empty() {
        DEFAULT_EXPORT_FILE.to_string()
    } else {
        format!("{}.json", underscore_whitespace(title))
    }
}

/// Serializes the interchange document to text, pretty-printed with two-space indentation
/// when `pretty` is set.
pub fn export_to_string(course: &Course, pretty: bool) -> Result<String, serde_json::Error> {
    let data = prepare_export_data(course)?;
    if pretty {
        serde_json::to_string_pretty(&data)
    } else {
        serde_json::to_string(&data)
    }
}

/// Writes the interchange document to the export directory of `settings`.
///
/// Returns:
/// - `Ok(PathBuf)`: Path of the written file.
/// - `Err(Box<dyn Error>)`: Serialization failed or the file could not be written.
pub fn export_to_file(course: &Course, settings: &Settings) -> Result<PathBuf, Box<dyn Error>> {
    let contents = export_to_string(course, settings.pretty)?;
    let dir = settings.export_directory();
    fs::create_dir_all(&dir)
        .map_err(|e| format!("Failed to create export directory {:?}: {}", dir, e))?;
    let path = dir.join(export_file_name(&course.title));
    fs::write(&path, contents).map_err(|e| format!("Failed to write {:?}: {}", path, e))?;
    info!("Exported course {} to {:?}", course.id, path);
    Ok(path)
}
