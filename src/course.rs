use crate::activity::ActivityMapping;
use crate::block::{Block, BlockGroup};
use crate::gen_uuid;
use crate::keys::underscore_whitespace;
use crate::rubric::RubricItem;
use crate::scoring::ScoringConfig;
use crate::serde_helpers::{lenient_string, lenient_vec, opt_lenient_string, truthy};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};

/// Root of the curriculum document.
///
/// This structure is the in-memory editing representation. Its serde shape is the editor's
/// own field naming (`mediaUrl`, `stepBlockGroups`, contexts as `memberKey`/`members`);
/// the interchange shape is produced by `export::prepare_export_data` and read back by
/// `import::import_value`.
///
/// Fields:
/// - `id`: Unique identifier, generated once and never changed afterwards.
/// - `name`, `title`: Internal name and display title. The title also names the export file.
/// - `description`: HTML-bearing course description.
/// - `media_url`, `media_type`: Cover media. `media_type` is `image` or `video`.
/// - `language`: Target language, `CoBlocks` by default.
/// - `vocabulary`: Free-form vocabulary tags.
/// - `rubric`: Rubric items with their requirements.
/// - `section_groups`: The group → section → step tree.
/// - `scoring`: Scoring criteria.
/// - `activities`: Activity registry keyed by activity id, kept in sync with the steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Course {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(deserialize_with = "lenient_string")]
    pub media_url: String,
    #[serde(deserialize_with = "lenient_string")]
    pub media_type: String,
    #[serde(deserialize_with = "lenient_string")]
    pub language: String,
    #[serde(deserialize_with = "lenient_vec")]
    pub vocabulary: Vec<String>,
    #[serde(deserialize_with = "lenient_vec")]
    pub rubric: Vec<RubricItem>,
    #[serde(
        rename = "section_groups",
        alias = "sectionGroups",
        deserialize_with = "lenient_vec"
    )]
    pub section_groups: Vec<SectionGroup>,
    pub scoring: ScoringConfig,
    pub activities: BTreeMap<String, ActivityMapping>,
}

impl Default for Course {
    fn default() -> Self {
        Course {
            id: String::new(),
            name: String::new(),
            title: String::new(),
            description: String::new(),
            media_url: String::new(),
            media_type: "image".to_string(),
            language: "CoBlocks".to_string(),
            vocabulary: Vec::new(),
            rubric: Vec::new(),
            section_groups: Vec::new(),
            scoring: ScoringConfig::default(),
            activities: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionGroup {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(deserialize_with = "lenient_vec")]
    pub sections: Vec<Section>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Section {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(deserialize_with = "lenient_vec")]
    pub steps: Vec<Step>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A step of a section.
///
/// `activity_id` is either derived from the title (while `generate_id` is set) or typed in
/// by the author. Use the setters below rather than assigning the fields directly so the
/// derived id stays current.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Step {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "opt_lenient_string"
    )]
    pub activity_id: Option<String>,
    #[serde(deserialize_with = "truthy")]
    pub generate_id: bool,
    #[serde(deserialize_with = "truthy")]
    pub teacher_only: bool,
    #[serde(
        rename = "type",
        skip_serializing_if = "Option::is_none",
        deserialize_with = "opt_lenient_string"
    )]
    pub step_type: Option<String>, // Only "session-summary" is used
    #[serde(deserialize_with = "lenient_vec")]
    pub step_block_groups: Vec<BlockGroup>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An `{id, label}` entry of a scoring drop-down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub id: String,
    pub label: String,
}

const CHECKPOINT_LABEL_CHARS: usize = 30;

impl Course {
    /// Creates an empty course and gives it its identity.
    pub fn new() -> Self {
        Course {
            id: gen_uuid(),
            ..Default::default()
        }
    }

    /// Steps in tree order (group, section, step).
    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.section_groups
            .iter()
            .flat_map(|group| group.sections.iter())
            .flat_map(|section| section.steps.iter())
    }

    pub fn steps_mut(&mut self) -> impl Iterator<Item = &mut Step> {
        self.section_groups
            .iter_mut()
            .flat_map(|group| group.sections.iter_mut())
            .flat_map(|section| section.steps.iter_mut())
    }

    /// Calls `f` on every block of every step, in tree order.
    pub fn for_each_block_mut<F: FnMut(&mut Block)>(&mut self, mut f: F) {
        for step in self.steps_mut() {
            for group in &mut step.step_block_groups {
                group.blocks.iter_mut().for_each(&mut f);
            }
        }
    }

    /// Normalization run before the document is shown: block defaults and legacy migrations,
    /// plus unique requirement ids.
    pub fn normalize(&mut self) {
        self.for_each_block_mut(Block::normalize);
        self.rubric
            .iter_mut()
            .for_each(RubricItem::normalize_requirements);
    }

    /// Brings the activity registry in line with the step tree.
    pub fn sync_activities(&mut self) {
        crate::sync::sync_activities(&self.section_groups, &mut self.activities);
    }

    /// Every checkpoint block, labelled "step title – first question" for the scoring UI.
    ///
    /// Example:
    /// ```
    /// use curriculum_schema::{Block, BlockGroup, Course, Section, SectionGroup, Step};
    ///
    /// let mut step = Step::new();
    /// step.set_title("Warm up");
    /// let mut group = BlockGroup::new();
    /// group.blocks = vec![Block::new("checkpoint")];
    /// step.step_block_groups.push(group);
    /// let mut section = Section::new();
    /// section.steps.push(step);
    /// let mut section_group = SectionGroup::new();
    /// section_group.sections.push(section);
    /// let mut course = Course::new();
    /// course.section_groups.push(section_group);
    ///
    /// assert_eq!(course.checkpoint_options()[0].label, "Warm up – Checkpoint");
    /// ```
    pub fn checkpoint_options(&self) -> Vec<SelectOption> {
        let mut options = Vec::new();
        for step in self.steps() {
            let step_label = if step.title.is_empty() {
                "Untitled Step"
            } else {
                step.title.as_str()
            };
            for group in &step.step_block_groups {
                for block in &group.blocks {
                    let Some(checkpoint) = block.as_checkpoint() else {
                        continue;
                    };
                    let detail = match checkpoint.first_question_text() {
                        Some(text) => truncate_label(text),
                        None => "Checkpoint".to_string(),
                    };
                    options.push(SelectOption {
                        id: block.id.clone(),
                        label: format!("{} – {}", step_label, detail),
                    });
                }
            }
        }
        options
    }

    /// Distinct step activity ids in tree order, labelled with the step title.
    pub fn activity_options(&self) -> Vec<SelectOption> {
        let mut seen = HashSet::new();
        let mut options = Vec::new();
        for step in self.steps() {
            let Some(activity_id) = step.activity_id.as_deref().filter(|id| !id.is_empty())
            else {
                continue;
            };
            if !seen.insert(activity_id) {
                continue;
            }
            let label = if step.title.is_empty() {
                activity_id
            } else {
                step.title.as_str()
            };
            options.push(SelectOption {
                id: activity_id.to_string(),
                label: label.to_string(),
            });
        }
        options
    }
}

fn truncate_label(text: &str) -> String {
    if text.chars().count() > CHECKPOINT_LABEL_CHARS {
        let head: String = text.chars().take(CHECKPOINT_LABEL_CHARS).collect();
        format!("{}…", head)
    } else {
        text.to_string()
    }
}

impl SectionGroup {
    pub fn new() -> Self {
        SectionGroup {
            id: gen_uuid(),
            ..Default::default()
        }
    }
}

impl Section {
    pub fn new() -> Self {
        Section {
            id: gen_uuid(),
            ..Default::default()
        }
    }
}

impl Step {
    pub fn new() -> Self {
        Step {
            id: gen_uuid(),
            ..Default::default()
        }
    }

    /// Activity id derived from a step title: lowercased, whitespace runs replaced by `_`.
    ///
    /// Example:
    /// ```
    /// use curriculum_schema::Step;
    ///
    /// assert_eq!(Step::derive_activity_id("Build a  Robot"), "build_a_robot");
    /// ```
    pub fn derive_activity_id(title: &str) -> String {
        underscore_whitespace(&title.to_lowercase())
    }

    /// Sets the title, re-deriving the activity id while `generate_id` is on.
    pub fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
        if self.generate_id {
            self.activity_id = Some(Step::derive_activity_id(title));
        }
    }

    /// Turning generation on derives the id from the current title; turning it off removes
    /// the activity id altogether.
    pub fn set_generate_id(&mut self, generate: bool) {
        self.generate_id = generate;
        self.activity_id = if generate {
            Some(Step::derive_activity_id(&self.title))
        } else {
            None
        };
    }

    /// Sets a manually typed activity id. An empty id removes it.
    pub fn set_activity_id(&mut self, activity_id: &str) {
        self.activity_id = if activity_id.is_empty() {
            None
        } else {
            Some(activity_id.to_string())
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::ContentPart;
    use serde_json::json;

    fn course_with_step(step: Step) -> Course {
        let mut section = Section::new();
        section.steps.push(step);
        let mut group = SectionGroup::new();
        group.sections.push(section);
        let mut course = Course::new();
        course.section_groups.push(group);
        course
    }

    #[test]
    fn test_course_defaults() {
        let course = Course::new();
        assert_eq!(course.id.len(), 36);
        assert_eq!(course.media_type, "image");
        assert_eq!(course.language, "CoBlocks");
        assert!(course.activities.is_empty());
    }

    #[test]
    fn test_internal_shape_keys() {
        let mut step = Step::new();
        step.id = "s1".into();
        step.set_generate_id(true);
        step.set_title("Intro Video");
        let mut course = course_with_step(step);
        course.id = "c1".into();

        let value = serde_json::to_value(&course).unwrap();
        let step = &value["section_groups"][0]["sections"][0]["steps"][0];
        assert_eq!(step["activityId"], "intro_video");
        assert_eq!(step["teacherOnly"], false);
        assert!(step.get("type").is_none());
        assert!(step["stepBlockGroups"].is_array());
        assert_eq!(value["mediaType"], "image");
    }

    #[test]
    fn test_section_groups_accepts_both_spellings() {
        let snake: Course =
            serde_json::from_value(json!({ "section_groups": [{ "title": "G" }] })).unwrap();
        let camel: Course =
            serde_json::from_value(json!({ "sectionGroups": [{ "title": "G" }] })).unwrap();
        assert_eq!(snake.section_groups[0].title, "G");
        assert_eq!(snake, camel);
    }

    #[test]
    fn test_generate_id_follows_title() {
        let mut step = Step::new();
        step.set_title("First Draft");
        assert_eq!(step.activity_id, None);

        step.set_generate_id(true);
        assert_eq!(step.activity_id.as_deref(), Some("first_draft"));
        step.set_title("Second\tDraft  Now");
        assert_eq!(step.activity_id.as_deref(), Some("second_draft_now"));

        step.set_generate_id(false);
        assert_eq!(step.activity_id, None);
        step.set_title("Third");
        assert_eq!(step.activity_id, None);
    }

    #[test]
    fn test_checkpoint_option_labels() {
        let mut long = Block::new("checkpoint");
        long.id = "cp1".into();
        long.as_checkpoint_mut().unwrap().question_blocks =
            vec![ContentPart::text_part("What is the airspeed velocity of an unladen swallow?")];
        let mut short = Block::new("checkpoint");
        short.id = "cp2".into();
        short.as_checkpoint_mut().unwrap().question_blocks = vec![ContentPart::text_part("Why?")];

        let mut group = BlockGroup::new();
        group.blocks = vec![long, Block::new("text"), short];
        let mut step = Step::new();
        step.step_block_groups.push(group);
        let course = course_with_step(step);

        let options = course.checkpoint_options();
        assert_eq!(options.len(), 2);
        assert_eq!(
            options[0].label,
            "Untitled Step – What is the airspeed velocity …"
        );
        assert_eq!(options[1].id, "cp2");
        assert_eq!(options[1].label, "Untitled Step – Why?");
    }

    #[test]
    fn test_activity_options_are_distinct() {
        let mut first = Step::new();
        first.set_activity_id("lab");
        let mut second = Step::new();
        second.set_title("Lab again");
        second.set_activity_id("lab");
        let mut third = Step::new();
        third.set_title("Quiz");
        third.set_activity_id("quiz");

        let mut course = course_with_step(first);
        let steps = &mut course.section_groups[0].sections[0].steps;
        steps.push(second);
        steps.push(third);

        let options = course.activity_options();
        assert_eq!(
            options,
            vec![
                SelectOption { id: "lab".into(), label: "lab".into() },
                SelectOption { id: "quiz".into(), label: "Quiz".into() },
            ]
        );
    }

    #[test]
    fn test_normalize_runs_block_and_rubric_passes() {
        let mut course: Course = serde_json::from_value(json!({
            "rubric": [{ "requirements": [{ "id": "r", "text": "a" }, { "id": "r", "text": "b" }] }],
            "section_groups": [{ "sections": [{ "steps": [{ "stepBlockGroups": [{
                "blocks": [{ "id": "cp", "type": "checkpoint", "question": "Q" }]
            }] }] }] }]
        }))
        .unwrap();
        course.normalize();

        let requirements = &course.rubric[0].requirements;
        assert_ne!(requirements[0].id, requirements[1].id);
        let block = &course.section_groups[0].sections[0].steps[0].step_block_groups[0].blocks[0];
        assert_eq!(block.as_checkpoint().unwrap().first_question_text(), Some("Q"));
    }
}
