use crate::block::{ContentPart, MediaRef};
use crate::gen_uuid;
use crate::serde_helpers::{lenient_string, lenient_vec, opt_lenient_string};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Tool that runs an activity. Unrecognized tool names are read as `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tool {
    CheckpointSet,
    Cospaces,
    Quiz,
    ExitTicket,
    LessonPlan,
    ExampleProject,
    #[serde(other)]
    Other,
}

/// Registry entry describing how an activity is delivered.
///
/// Entries are created empty by the activity sync and filled in by the author. Only
/// `checkpoint-set` mappings carry `checkpoints`.
///
/// Fields:
/// - `tool`: Delivery tool, e.g. `cospaces` or `checkpoint-set`.
/// - `url`: Launch URL. When absent, the URL of `media` is shown instead.
/// - `media`: Optional `{type, url}` media reference.
/// - `action`: Free-form action hint for the consumer.
/// - `checkpoints`: Checkpoint definitions of a `checkpoint-set` activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityMapping {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<Tool>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "opt_lenient_string"
    )]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaRef>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "opt_lenient_string"
    )]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "lenient_vec")]
    pub checkpoints: Vec<CheckpointDef>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A checkpoint defined directly under a `checkpoint-set` activity.
///
/// Its parts use the flat media shape (`mediaType`, `url`, `height`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointDef {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(
        rename = "type",
        skip_serializing_if = "Option::is_none",
        deserialize_with = "opt_lenient_string"
    )]
    pub kind: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub comment: String,
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "opt_lenient_string"
    )]
    pub variant: Option<String>,
    #[serde(deserialize_with = "lenient_vec")]
    pub question: Vec<ContentPart>,
    #[serde(deserialize_with = "lenient_vec")]
    pub choices: Vec<ContentPart>,
    #[serde(deserialize_with = "lenient_vec")]
    pub explanation: Vec<ContentPart>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ActivityMapping {
    pub fn is_checkpoint_set(&self) -> bool {
        self.tool == Some(Tool::CheckpointSet)
    }

    /// URL shown for the activity: `url` when set, otherwise the media URL.
    pub fn display_url(&self) -> &str {
        match &self.url {
            Some(url) => url,
            None => self
                .media
                .as_ref()
                .and_then(|media| media.url.as_deref())
                .unwrap_or(""),
        }
    }

    pub fn set_media_type(&mut self, media_type: &str) {
        self.media.get_or_insert_with(MediaRef::default).kind = Some(media_type.to_string());
    }

    pub fn add_checkpoint(&mut self) -> &mut CheckpointDef {
        self.checkpoints.push(CheckpointDef::new());
        let last = self.checkpoints.len() - 1;
        &mut self.checkpoints[last]
    }
}

impl CheckpointDef {
    pub fn new() -> Self {
        CheckpointDef {
            id: gen_uuid(),
            kind: Some("checkpoint".to_string()),
            variant: Some("none".to_string()),
            ..Default::default()
        }
    }
}
