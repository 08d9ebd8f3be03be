//! Content blocks and block groups.
//!
//! A `Block` is a tagged union over the `type` field. The fields shared by every block (`id`,
//! `audioEnabled`, `audio`) live on `Block`; everything else lives in the `BlockContent`
//! variant. Blocks whose `type` is unknown, or whose fields cannot be read, are kept as
//! `BlockContent::Other` with their raw fields so nothing is lost on the way back out.

use crate::gen_uuid;
use crate::serde_helpers::{
    is_false, is_truthy, lenient_string, lenient_vec, opt_lenient_string, opt_truthy, truthy,
    value_to_string,
};
use log::warn;
use serde::de::{DeserializeOwned, Error as DeError};
use serde::ser::Error as SerError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// A group of blocks rendered together inside a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockGroup {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub variant: String,
    #[serde(deserialize_with = "lenient_vec")]
    pub blocks: Vec<Block>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for BlockGroup {
    fn default() -> Self {
        BlockGroup {
            id: String::new(),
            variant: "none".to_string(),
            blocks: Vec::new(),
            extra: Map::new(),
        }
    }
}

impl BlockGroup {
    /// A new group with a fresh id, seeded with one empty text block.
    pub fn new() -> Self {
        BlockGroup {
            id: gen_uuid(),
            blocks: vec![Block::new("text")],
            ..Default::default()
        }
    }
}

/// One content block.
///
/// Fields:
/// - `id`: Identifier of the block, referenced by scoring components and contexts.
/// - `audio_enabled`: Whether the block is read aloud.
/// - `audio`: Audio URL. Only present while `audio_enabled` is set.
/// - `content`: The type-specific part of the block.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub id: String,
    pub audio_enabled: bool,
    pub audio: Option<String>,
    pub content: BlockContent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BlockContent {
    Text(TextBlock),
    Label(TextBlock),
    Exemplar(TextBlock),
    Code(CodeBlock),
    Media(MediaBlock),
    Checkpoint(CheckpointBlock),
    Artifacts(ArtifactsBlock),
    Rubric(RubricBlock),
    FramedText(FramedTextBlock),
    FramedTable(FramedTableBlock),
    Vocabulary(VocabularyBlock),
    /// A block of unknown type, kept verbatim.
    Other {
        kind: String,
        fields: Map<String, Value>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextBlock {
    #[serde(deserialize_with = "lenient_string")]
    pub text: String,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "opt_lenient_string"
    )]
    pub variant: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeBlock {
    #[serde(deserialize_with = "lenient_string")]
    pub code: String,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "opt_lenient_string"
    )]
    pub variant: Option<String>, // python, java, html, css, console, college-board
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `{type, url}` reference to an image or video.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaRef {
    #[serde(
        rename = "type",
        skip_serializing_if = "Option::is_none",
        deserialize_with = "opt_lenient_string"
    )]
    pub kind: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "opt_lenient_string"
    )]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Media block. The nested `media` object is current; the flat `url` and `mediaType`
/// fields are the legacy shape and are still accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MediaBlock {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaRef>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "opt_lenient_string"
    )]
    pub url: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "opt_lenient_string"
    )]
    pub media_type: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "opt_lenient_string"
    )]
    pub height: Option<String>, // CSS length, e.g. "240px"
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MediaBlock {
    /// Fills empty nested fields from the flat legacy fields. Never writes the other way.
    pub fn sync_legacy_fields(&mut self) {
        let media = self.media.get_or_insert_with(MediaRef::default);
        if media.url.as_deref().map_or(true, str::is_empty) {
            if let Some(url) = self.url.as_ref().filter(|url| !url.is_empty()) {
                media.url = Some(url.clone());
            }
        }
        if media.kind.as_deref().map_or(true, str::is_empty) {
            if let Some(kind) = self.media_type.as_ref().filter(|kind| !kind.is_empty()) {
                media.kind = Some(kind.clone());
            }
        }
    }

    /// Moves a flat `url` + `mediaType` pair into `media: {url, type}` and deletes the flat
    /// fields. Blocks lacking either flat field are left alone. Returns whether anything changed.
    pub fn consolidate_legacy_fields(&mut self) -> bool {
        if self.url.is_none() || self.media_type.is_none() {
            return false;
        }
        self.media = Some(MediaRef {
            kind: self.media_type.take(),
            url: self.url.take(),
            extra: Map::new(),
        });
        true
    }
}

/// One part of a checkpoint question, choice or explanation.
///
/// A part is a text, media or code snippet; choices additionally carry `correct`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContentPart {
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(
        rename = "type",
        skip_serializing_if = "Option::is_none",
        deserialize_with = "opt_lenient_string"
    )]
    pub kind: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "opt_lenient_string"
    )]
    pub text: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "opt_lenient_string"
    )]
    pub code: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "opt_lenient_string"
    )]
    pub language: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "opt_lenient_string"
    )]
    pub media_type: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "opt_lenient_string"
    )]
    pub url: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "opt_lenient_string"
    )]
    pub height: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "opt_truthy")]
    pub correct: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContentPart {
    /// A new text part, as added by "+ Add Question Block" and "+ Add Explanation".
    pub fn text_part(text: &str) -> Self {
        ContentPart {
            id: gen_uuid(),
            kind: Some("text".to_string()),
            text: Some(text.to_string()),
            ..Default::default()
        }
    }

    /// A new, incorrect text choice.
    pub fn choice() -> Self {
        ContentPart {
            correct: Some(false),
            ..ContentPart::text_part("")
        }
    }

    pub fn is_correct(&self) -> bool {
        self.correct.unwrap_or(false)
    }
}

/// `{id, terms}` group used by checkpoint and vocabulary blocks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TermCategory {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(deserialize_with = "lenient_vec")]
    pub terms: Vec<String>,
}

impl TermCategory {
    pub fn new() -> Self {
        TermCategory {
            id: gen_uuid(),
            terms: Vec::new(),
        }
    }
}

/// Checkpoint (assessment) block.
///
/// `correct_text`, `incorrect_text` and `is_submission` keep their snake_case names in the
/// interchange format; the importer camel-cases every key, so both spellings are accepted.
/// `validation_url` and `validation_variant` only matter while `require_validation` is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CheckpointBlock {
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "opt_lenient_string"
    )]
    pub variant: Option<String>, // multiple_choice, short_answer, rubric, link, rich_text
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "lenient_string")]
    pub question: String, // Legacy single-text question
    #[serde(deserialize_with = "lenient_vec")]
    pub question_blocks: Vec<ContentPart>,
    #[serde(deserialize_with = "lenient_vec")]
    pub choices: Vec<ContentPart>,
    #[serde(deserialize_with = "lenient_vec")]
    pub explanation: Vec<ContentPart>,
    #[serde(
        rename = "correct_text",
        alias = "correctText",
        deserialize_with = "lenient_string"
    )]
    pub correct_text: String,
    #[serde(
        rename = "incorrect_text",
        alias = "incorrectText",
        deserialize_with = "lenient_string"
    )]
    pub incorrect_text: String,
    #[serde(deserialize_with = "lenient_vec")]
    pub categories: Vec<TermCategory>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "opt_lenient_string"
    )]
    pub placeholder: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "opt_lenient_string"
    )]
    pub error_msg: Option<String>,
    #[serde(
        rename = "is_submission",
        alias = "isSubmission",
        skip_serializing_if = "is_false",
        deserialize_with = "truthy"
    )]
    pub is_submission: bool,
    #[serde(skip_serializing_if = "is_false", deserialize_with = "truthy")]
    pub require_validation: bool,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "opt_lenient_string"
    )]
    pub validation_url: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "opt_lenient_string"
    )]
    pub validation_variant: Option<String>, // cospaces
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CheckpointBlock {
    /// Render-time normalization: default feedback labels and legacy question migration.
    pub fn normalize(&mut self) {
        if self.correct_text.is_empty() {
            self.correct_text = "Correct".to_string();
        }
        if self.incorrect_text.is_empty() {
            self.incorrect_text = "Incorrect".to_string();
        }
        self.migrate_legacy_question();
    }

    /// Rewrites a singular `question` into `questionBlocks` when no question blocks exist yet.
    /// Returns whether the block was migrated.
    pub fn migrate_legacy_question(&mut self) -> bool {
        if self.question.is_empty() || !self.question_blocks.is_empty() {
            return false;
        }
        let text = std::mem::take(&mut self.question);
        self.question_blocks = vec![ContentPart {
            kind: Some("text".to_string()),
            text: Some(text),
            ..Default::default()
        }];
        true
    }

    /// Import-time defaults: every choice gets an id and a `text`, `correct` and `type`.
    pub fn apply_import_defaults(&mut self) {
        for choice in &mut self.choices {
            if choice.id.is_empty() {
                choice.id = gen_uuid();
            }
            choice.text.get_or_insert_with(String::new);
            choice.correct.get_or_insert(false);
            choice.kind.get_or_insert_with(|| "text".to_string());
        }
    }

    pub fn set_require_validation(&mut self, required: bool) {
        self.require_validation = required;
        if !required {
            self.validation_url = None;
            self.validation_variant = None;
        }
    }

    /// Text of the first question part, if any.
    pub fn first_question_text(&self) -> Option<&str> {
        self.question_blocks
            .first()
            .map(|part| part.text.as_deref().unwrap_or(""))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactsBlock {
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(deserialize_with = "lenient_vec")]
    pub rows: Vec<ArtifactRow>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactRow {
    #[serde(deserialize_with = "lenient_string")]
    pub category: String,
    #[serde(deserialize_with = "lenient_vec")]
    pub artifacts: Vec<Artifact>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Artifact {
    pub title: ArtifactLink,
    #[serde(deserialize_with = "lenient_string")]
    pub subtitle: String,
    pub icon: ArtifactIcon,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactLink {
    #[serde(deserialize_with = "lenient_string")]
    pub text: String,
    #[serde(deserialize_with = "lenient_string")]
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactIcon {
    #[serde(rename = "type", deserialize_with = "lenient_string")]
    pub kind: String,
    #[serde(deserialize_with = "lenient_string")]
    pub url: String,
}

impl Default for ArtifactIcon {
    fn default() -> Self {
        ArtifactIcon {
            kind: "pdf".to_string(),
            url: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RubricBlock {
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FramedTextBlock {
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(deserialize_with = "lenient_string")]
    pub text: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FramedTableBlock {
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(deserialize_with = "lenient_vec")]
    pub table: Vec<Vec<String>>, // Rows of cells
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VocabularyBlock {
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(deserialize_with = "lenient_vec")]
    pub categories: Vec<TermCategory>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Block {
    /// Creates an empty block of the given type with a fresh id.
    ///
    /// Example:
    /// ```
    /// use curriculum_schema::Block;
    ///
    /// let block = Block::new("checkpoint");
    /// assert_eq!(block.kind(), "checkpoint");
    /// assert_eq!(block.id.len(), 36);
    /// ```
    pub fn new(kind: &str) -> Self {
        Block {
            id: gen_uuid(),
            audio_enabled: false,
            audio: None,
            content: BlockContent::from_fields(kind, Map::new()),
        }
    }

    /// The block's `type` tag.
    pub fn kind(&self) -> &str {
        self.content.kind()
    }

    /// Switches the block to another type. Fields the new type understands are kept.
    pub fn set_kind(&mut self, kind: &str) {
        let fields = self.content.to_fields().unwrap_or_default();
        self.content = BlockContent::from_fields(kind, fields);
    }

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

    /// Normalization applied whenever a block is shown in the editor.
    pub fn normalize(&mut self) {
        match &mut self.content {
            BlockContent::Checkpoint(checkpoint) => checkpoint.normalize(),
            BlockContent::Media(media) => media.sync_legacy_fields(),
            BlockContent::Exemplar(exemplar) => exemplar.variant = None,
            _ => {}
        }
    }

    pub fn as_checkpoint(&self) -> Option<&CheckpointBlock> {
        match &self.content {
            BlockContent::Checkpoint(checkpoint) => Some(checkpoint),
            _ => None,
        }
    }

    pub fn as_checkpoint_mut(&mut self) -> Option<&mut CheckpointBlock> {
        match &mut self.content {
            BlockContent::Checkpoint(checkpoint) => Some(checkpoint),
            _ => None,
        }
    }
}

impl BlockContent {
    pub fn kind(&self) -> &str {
        match self {
            BlockContent::Text(_) => "text",
            BlockContent::Label(_) => "label",
            BlockContent::Exemplar(_) => "exemplar",
            BlockContent::Code(_) => "code",
            BlockContent::Media(_) => "media",
            BlockContent::Checkpoint(_) => "checkpoint",
            BlockContent::Artifacts(_) => "artifacts",
            BlockContent::Rubric(_) => "rubric",
            BlockContent::FramedText(_) => "framed-text",
            BlockContent::FramedTable(_) => "framed-table",
            BlockContent::Vocabulary(_) => "vocabulary",
            BlockContent::Other { kind, .. } => kind,
        }
    }

    /// Builds the variant named by `kind` from the block's type-specific fields.
    /// Unknown types, and fields that cannot be read at all, yield `Other`.
    fn from_fields(kind: &str, fields: Map<String, Value>) -> BlockContent {
        let parsed = match kind {
            "text" => parse(&fields).map(BlockContent::Text),
            "label" => parse(&fields).map(BlockContent::Label),
            "exemplar" => parse(&fields).map(BlockContent::Exemplar),
            "code" => parse(&fields).map(BlockContent::Code),
            "media" => parse(&fields).map(BlockContent::Media),
            "checkpoint" => parse(&fields).map(BlockContent::Checkpoint),
            "artifacts" => parse(&fields).map(BlockContent::Artifacts),
            "rubric" => parse(&fields).map(BlockContent::Rubric),
            "framed-text" => parse(&fields).map(BlockContent::FramedText),
            "framed-table" => parse(&fields).map(BlockContent::FramedTable),
            "vocabulary" => parse(&fields).map(BlockContent::Vocabulary),
            _ => {
                warn!("Unknown block type {:?}; keeping the block as is", kind);
                return BlockContent::Other {
                    kind: kind.to_string(),
                    fields,
                };
            }
        };
        match parsed {
            Ok(content) => content,
            Err(e) => {
                warn!("Could not read {} block ({}); keeping it as is", kind, e);
                BlockContent::Other {
                    kind: kind.to_string(),
                    fields,
                }
            }
        }
    }

    fn to_fields(&self) -> Result<Map<String, Value>, serde_json::Error> {
        match self {
            BlockContent::Text(inner)
            | BlockContent::Label(inner)
            | BlockContent::Exemplar(inner) => object_of(inner),
            BlockContent::Code(inner) => object_of(inner),
            BlockContent::Media(inner) => object_of(inner),
            BlockContent::Checkpoint(inner) => object_of(inner),
            BlockContent::Artifacts(inner) => object_of(inner),
            BlockContent::Rubric(inner) => object_of(inner),
            BlockContent::FramedText(inner) => object_of(inner),
            BlockContent::FramedTable(inner) => object_of(inner),
            BlockContent::Vocabulary(inner) => object_of(inner),
            BlockContent::Other { fields, .. } => Ok(fields.clone()),
        }
    }
}

fn parse<T: DeserializeOwned>(fields: &Map<String, Value>) -> Result<T, serde_json::Error> {
    serde_json::from_value(Value::Object(fields.clone()))
}

fn object_of<T: Serialize>(inner: &T) -> Result<Map<String, Value>, serde_json::Error> {
    match serde_json::to_value(inner)? {
        Value::Object(fields) => Ok(fields),
        _ => Ok(Map::new()),
    }
}

impl Serialize for Block {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut fields = self.content.to_fields().map_err(S::Error::custom)?;
        let kind = self.kind();
        if !kind.is_empty() {
            fields.insert("type".to_string(), Value::String(kind.to_string()));
        }
        if !self.id.is_empty() {
            fields.insert("id".to_string(), Value::String(self.id.clone()));
        }
        if self.audio_enabled {
            fields.insert("audioEnabled".to_string(), Value::Bool(true));
        }
        if let Some(audio) = &self.audio {
            fields.insert("audio".to_string(), Value::String(audio.clone()));
        }
        fields.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Block {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut fields = match Value::deserialize(deserializer)? {
            Value::Object(fields) => fields,
            other => {
                return Err(D::Error::custom(format!(
                    "expected a block object, found {}",
                    other
                )))
            }
        };
        let id = fields
            .remove("id")
            .map(|id| value_to_string(&id))
            .unwrap_or_default();
        let audio_enabled = fields
            .remove("audioEnabled")
            .map_or(false, |flag| is_truthy(&flag));
        let audio = match fields.remove("audio") {
            None | Some(Value::Null) => None,
            Some(audio) => Some(value_to_string(&audio)),
        };
        let kind = fields
            .remove("type")
            .map(|kind| value_to_string(&kind))
            .unwrap_or_default();
        Ok(Block {
            id,
            audio_enabled,
            audio,
            content: BlockContent::from_fields(&kind, fields),
        })
    }
}
