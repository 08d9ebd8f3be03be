use crate::gen_uuid;
use crate::sequence::reorder_by_ids;
use crate::serde_helpers::{
    is_false, lenient_string, opt_lenient_string, truthy, value_to_string,
};
use log::warn;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// One graded item of the course rubric.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RubricItem {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(rename = "type", deserialize_with = "lenient_string")]
    pub kind: String,
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(deserialize_with = "lenient_string")]
    pub weight: String, // Free text typed by the author, e.g. "20" or "20%"
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "opt_lenient_string"
    )]
    pub subtitle: Option<String>, // Optional field
    #[serde(deserialize_with = "requirements_from_value")]
    pub requirements: Vec<Requirement>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single requirement line of a rubric item, optionally read aloud.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Requirement {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub text: String,
    #[serde(skip_serializing_if = "is_false", deserialize_with = "truthy")]
    pub audio_enabled: bool,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "opt_lenient_string"
    )]
    pub audio: Option<String>, // Only meaningful while audio_enabled is set
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RubricItem {
    /// Creates an empty rubric item with a fresh id, as the "+ Add Rubric Item" action does.
    pub fn new() -> Self {
        RubricItem {
            id: gen_uuid(),
            ..Default::default()
        }
    }

    /// Gives every requirement a non-empty id that is unique within this item.
    ///
    /// Plain-string requirements are already upgraded while deserializing; this pass covers
    /// objects that arrive without an id and duplicated ids from copy-pasted JSON.
    pub fn normalize_requirements(&mut self) {
        let mut seen = HashSet::new();
        for requirement in &mut self.requirements {
            if requirement.id.is_empty() || !seen.insert(requirement.id.clone()) {
                requirement.id = gen_uuid();
                seen.insert(requirement.id.clone());
            }
        }
    }

    pub fn add_requirement(&mut self) -> &mut Requirement {
        self.requirements.push(Requirement::new(""));
        let last = self.requirements.len() - 1;
        &mut self.requirements[last]
    }

    /// Applies a drag-and-drop result: requirements are rebuilt in the order of `ids`.
    pub fn reorder_requirements(&mut self, ids: &[String]) {
        reorder_by_ids(&mut self.requirements, ids, |requirement| requirement.id.as_str());
    }
}

impl Requirement {
    pub fn new(text: &str) -> Self {
        Requirement {
            id: gen_uuid(),
            text: text.to_string(),
            ..Default::default()
        }
    }

    /// Turns audio on or off. Turning it off deletes the audio URL, so it can never be
    /// exported while disabled.
    pub fn set_audio_enabled(&mut self, enabled: bool) {
        self.audio_enabled = enabled;
        if !enabled {
            self.audio = None;
        }
    }

    pub(crate) fn enforce_audio_invariant(&mut self) {
        if !self.audio_enabled {
            self.audio = None;
        }
    }
}

// Requirements used to be stored as bare strings; those are upgraded to `{id, text}`.
fn requirements_from_value<'de, D>(deserializer: D) -> Result<Vec<Requirement>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let entries = match value {
        Value::Array(entries) => entries,
        Value::Null => return Ok(Vec::new()),
        other => {
            warn!("Expected a list of requirements, found {}", other);
            return Ok(Vec::new());
        }
    };
    Ok(entries
        .into_iter()
        .filter_map(|entry| match entry {
            Value::String(text) => Some(Requirement::new(&text)),
            Value::Object(_) => match serde_json::from_value(entry) {
                Ok(requirement) => Some(requirement),
                Err(e) => {
                    warn!("Skipping malformed requirement: {}", e);
                    None
                }
            },
            Value::Null => None,
            scalar => Some(Requirement::new(&value_to_string(&scalar))),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_legacy_string_requirements_upgraded() {
        let item: RubricItem = serde_json::from_value(json!({
            "id": "r1",
            "type": "skill",
            "title": "Design",
            "requirements": ["Do X", { "text": "Do Y" }, { "id": "keep", "text": "Do Z" }]
        }))
        .unwrap();

        assert_eq!(item.requirements.len(), 3);
        assert_eq!(item.requirements[0].text, "Do X");
        assert_eq!(item.requirements[0].id.len(), 36);
        assert_eq!(item.requirements[2].id, "keep");
    }

    #[test]
    fn test_mistyped_and_unknown_fields_are_kept() {
        let raw = json!({
            "id": "r1",
            "type": "skill",
            "title": "Design",
            "weight": "20",
            "subtitle": 2,
            "icon": "star",
            "requirements": [{ "id": "q", "text": "x", "audio": 5, "hint": "h" }]
        });
        let item: RubricItem = serde_json::from_value(raw).unwrap();

        assert_eq!(item.subtitle.as_deref(), Some("2"));
        assert_eq!(item.extra["icon"], "star");
        assert_eq!(item.requirements.len(), 1);
        assert_eq!(item.requirements[0].audio.as_deref(), Some("5"));
        assert_eq!(item.requirements[0].extra["hint"], "h");

        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["icon"], "star");
        assert_eq!(value["requirements"][0]["hint"], "h");
    }

    #[test]
    fn test_normalize_requirements_makes_ids_unique() {
        let mut item = RubricItem::new();
        item.requirements = vec![
            Requirement { id: "same".into(), text: "a".into(), ..Default::default() },
            Requirement { id: "same".into(), text: "b".into(), ..Default::default() },
            Requirement { id: String::new(), text: "c".into(), ..Default::default() },
        ];
        item.normalize_requirements();

        let ids: HashSet<&str> = item.requirements.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids.len(), 3);
        assert!(ids.contains("same"));
        assert!(!ids.contains(""));
    }

    #[test]
    fn test_disabling_audio_deletes_url() {
        let mut requirement = Requirement::new("Explain");
        requirement.set_audio_enabled(true);
        requirement.audio = Some("https://cdn.example.com/a.mp3".into());
        requirement.set_audio_enabled(false);

        assert_eq!(requirement.audio, None);
        let value = serde_json::to_value(&requirement).unwrap();
        assert!(value.get("audio").is_none());
        assert!(value.get("audioEnabled").is_none());
    }

    #[test]
    fn test_reorder_requirements() {
        let mut item = RubricItem::new();
        item.requirements = vec![Requirement::new("a"), Requirement::new("b")];
        let ids = vec![item.requirements[1].id.clone(), item.requirements[0].id.clone()];
        item.reorder_requirements(&ids);
        assert_eq!(item.requirements[0].text, "b");
        assert_eq!(item.requirements[1].text, "a");
    }
}
