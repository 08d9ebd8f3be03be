//! Editing session.
//!
//! The `Editor` owns the course being edited. Edits that can change the set of step
//! activity ids go through it so the activity registry is re-synced afterwards; everything
//! else can be edited in place through `course_mut`, after which `sync` may be called.

use crate::course::{Course, Section, SectionGroup, Step};
use crate::export::{export_to_file, export_to_string, prepare_export_data};
use crate::import::{import_file, import_str};
use crate::sequence::Sequence;
use crate::settings::Settings;
use log::info;
use serde_json::Value;
use std::error::Error;
use std::path::{Path, PathBuf};

/// Position of a step in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepPath {
    pub group: usize,
    pub section: usize,
    pub step: usize,
}

#[derive(Debug, Clone)]
pub struct Editor {
    course: Course,
    settings: Settings,
}

impl Default for Editor {
    fn default() -> Self {
        Editor::new(Settings::default())
    }
}

impl Editor {
    /// Starts a session on a new, empty course.
    pub fn new(settings: Settings) -> Self {
        Editor {
            course: Course::new(),
            settings,
        }
    }

    /// Starts a session on an existing course. The course is normalized and synced first.
    pub fn with_course(course: Course, settings: Settings) -> Self {
        let mut editor = Editor::new(settings);
        editor.replace_course(course);
        editor
    }

    pub fn course(&self) -> &Course {
        &self.course
    }

    pub fn course_mut(&mut self) -> &mut Course {
        &mut self.course
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Re-derives the activity registry from the step tree.
    pub fn sync(&mut self) {
        self.course.sync_activities();
    }

    fn replace_course(&mut self, mut course: Course) {
        course.normalize();
        course.sync_activities();
        self.course = course;
    }

    /// Imports a JSON document from a string.
    ///
    /// On success the current course is replaced. On a parse failure the current course is
    /// kept untouched and the error is returned.
    pub fn import_str(&mut self, text: &str) -> Result<(), Box<dyn Error>> {
        let course = import_str(text, &self.settings).into_result()?;
        self.replace_course(course);
        Ok(())
    }

    /// Imports a JSON file. Same replacement rules as [`Editor::import_str`].
    pub fn import_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), Box<dyn Error>> {
        let course = import_file(path.as_ref(), &self.settings).into_result()?;
        self.replace_course(course);
        info!("Imported {:?} as course {}", path.as_ref(), self.course.id);
        Ok(())
    }

    pub fn export_value(&self) -> Result<Value, serde_json::Error> {
        prepare_export_data(&self.course)
    }

    pub fn export_string(&self) -> Result<String, serde_json::Error> {
        export_to_string(&self.course, self.settings.pretty)
    }

    /// Writes the course to the export directory, named after its title.
    pub fn export_file(&self) -> Result<PathBuf, Box<dyn Error>> {
        export_to_file(&self.course, &self.settings)
    }

    pub fn step(&self, path: StepPath) -> Option<&Step> {
        self.course
            .section_groups
            .get(path.group)?
            .sections
            .get(path.section)?
            .steps
            .get(path.step)
    }

    fn step_mut(&mut self, path: StepPath) -> Result<&mut Step, Box<dyn Error>> {
        self.course
            .section_groups
            .get_mut(path.group)
            .and_then(|group| group.sections.get_mut(path.section))
            .and_then(|section| section.steps.get_mut(path.step))
            .ok_or_else(|| format!("Step {:?} not found", path).into())
    }

    fn section_mut(&mut self, group: usize, section: usize) -> Result<&mut Section, Box<dyn Error>> {
        self.course
            .section_groups
            .get_mut(group)
            .and_then(|g| g.sections.get_mut(section))
            .ok_or_else(|| format!("Section {} of group {} not found", section, group).into())
    }

    fn group_mut(&mut self, group: usize) -> Result<&mut SectionGroup, Box<dyn Error>> {
        self.course
            .section_groups
            .get_mut(group)
            .ok_or_else(|| format!("Section group {} not found", group).into())
    }

    pub fn set_step_title(&mut self, path: StepPath, title: &str) -> Result<(), Box<dyn Error>> {
        self.step_mut(path)?.set_title(title);
        self.sync();
        Ok(())
    }

    pub fn set_generate_id(&mut self, path: StepPath, generate: bool) -> Result<(), Box<dyn Error>> {
        self.step_mut(path)?.set_generate_id(generate);
        self.sync();
        Ok(())
    }

    pub fn set_activity_id(&mut self, path: StepPath, activity_id: &str) -> Result<(), Box<dyn Error>> {
        self.step_mut(path)?.set_activity_id(activity_id);
        self.sync();
        Ok(())
    }

    /// Appends a new step to a section and returns its path.
    pub fn add_step(&mut self, group: usize, section: usize) -> Result<StepPath, Box<dyn Error>> {
        let steps = &mut self.section_mut(group, section)?.steps;
        steps.push(Step::new());
        let step = steps.len() - 1;
        self.sync();
        Ok(StepPath {
            group,
            section,
            step,
        })
    }

    pub fn remove_step(&mut self, path: StepPath) -> Result<Step, Box<dyn Error>> {
        let removed = self
            .section_mut(path.group, path.section)?
            .steps
            .remove_at(path.step)
            .ok_or_else(|| format!("Step {:?} not found", path))?;
        self.sync();
        Ok(removed)
    }

    pub fn move_step_up(&mut self, path: StepPath) -> Result<bool, Box<dyn Error>> {
        Ok(self.section_mut(path.group, path.section)?.steps.move_up(path.step))
    }

    pub fn move_step_down(&mut self, path: StepPath) -> Result<bool, Box<dyn Error>> {
        Ok(self.section_mut(path.group, path.section)?.steps.move_down(path.step))
    }

    pub fn add_section_group(&mut self) -> usize {
        self.course.section_groups.push(SectionGroup::new());
        self.course.section_groups.len() - 1
    }

    pub fn remove_section_group(&mut self, group: usize) -> Result<SectionGroup, Box<dyn Error>> {
        let removed = self
            .course
            .section_groups
            .remove_at(group)
            .ok_or_else(|| format!("Section group {} not found", group))?;
        self.sync();
        Ok(removed)
    }

    pub fn add_section(&mut self, group: usize) -> Result<usize, Box<dyn Error>> {
        let sections = &mut self.group_mut(group)?.sections;
        sections.push(Section::new());
        Ok(sections.len() - 1)
    }

    pub fn remove_section(&mut self, group: usize, section: usize) -> Result<Section, Box<dyn Error>> {
        let removed = self
            .group_mut(group)?
            .sections
            .remove_at(section)
            .ok_or_else(|| format!("Section {} of group {} not found", section, group))?;
        self.sync();
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{ActivityMapping, Tool};

    fn editor_with_step() -> (Editor, StepPath) {
        let mut editor = Editor::default();
        let group = editor.add_section_group();
        let section = editor.add_section(group).unwrap();
        let path = editor.add_step(group, section).unwrap();
        (editor, path)
    }

    #[test]
    fn test_new_session_has_identity() {
        let editor = Editor::default();
        assert_eq!(editor.course().id.len(), 36);
        assert!(editor.settings().pretty);
    }

    #[test]
    fn test_generated_activity_id_registers_mapping() {
        let (mut editor, path) = editor_with_step();
        editor.set_step_title(path, "Build Robot").unwrap();
        assert!(editor.course().activities.is_empty());

        editor.set_generate_id(path, true).unwrap();
        let keys: Vec<&String> = editor.course().activities.keys().collect();
        assert_eq!(keys, vec!["build_robot"]);

        editor.set_step_title(path, "Test Robot").unwrap();
        assert!(editor.course().activities.contains_key("test_robot"));
        assert!(!editor.course().activities.contains_key("build_robot"));

        editor.set_generate_id(path, false).unwrap();
        assert!(editor.course().activities.is_empty());
        assert_eq!(editor.step(path).unwrap().activity_id, None);
    }

    #[test]
    fn test_removing_step_prunes_mapping() {
        let (mut editor, path) = editor_with_step();
        editor.set_activity_id(path, "lab").unwrap();
        editor.course_mut().activities.insert(
            "lab".into(),
            ActivityMapping {
                tool: Some(Tool::Cospaces),
                ..Default::default()
            },
        );
        let second = editor.add_step(path.group, path.section).unwrap();
        editor.set_activity_id(second, "lab").unwrap();
        assert_eq!(editor.course().activities["lab"].tool, Some(Tool::Cospaces));

        editor.remove_step(path).unwrap();
        assert_eq!(editor.course().activities.len(), 1);
        editor.remove_section(path.group, path.section).unwrap();
        assert!(editor.course().activities.is_empty());
    }

    #[test]
    fn test_invalid_paths_are_errors() {
        let (mut editor, path) = editor_with_step();
        let missing = StepPath { step: 5, ..path };
        assert!(editor.set_step_title(missing, "x").is_err());
        assert!(editor.remove_step(missing).is_err());
        assert!(editor.add_step(3, 0).is_err());
        assert!(editor.remove_section_group(9).is_err());
    }

    #[test]
    fn test_move_steps() {
        let (mut editor, first) = editor_with_step();
        editor.set_step_title(first, "one").unwrap();
        let second = editor.add_step(first.group, first.section).unwrap();
        editor.set_step_title(second, "two").unwrap();

        assert!(editor.move_step_up(second).unwrap());
        assert_eq!(editor.step(first).unwrap().title, "two");
        assert!(!editor.move_step_up(first).unwrap());
        assert!(editor.move_step_down(first).unwrap());
        assert_eq!(editor.step(first).unwrap().title, "one");
    }

    #[test]
    fn test_failed_import_keeps_course() {
        let (mut editor, path) = editor_with_step();
        editor.set_step_title(path, "Keep me").unwrap();
        let before = editor.course().clone();

        assert!(editor.import_str("{ broken").is_err());
        assert_eq!(editor.course(), &before);
    }

    #[test]
    fn test_import_normalizes_and_syncs() {
        let mut editor = Editor::default();
        editor
            .import_str(
                r#"{
                    "id": "c1",
                    "section_groups": [{ "sections": [{ "steps": [{
                        "title": "Lab",
                        "activity_id": "lab",
                        "block_groups": [{ "blocks": [
                            { "id": "cp", "type": "checkpoint", "question": "Why?" }
                        ] }]
                    }] }] }],
                    "activities": { "orphan": {} }
                }"#,
            )
            .unwrap();

        let course = editor.course();
        assert_eq!(course.id, "c1");
        let keys: Vec<&String> = course.activities.keys().collect();
        assert_eq!(keys, vec!["lab"]);
        let block = &course.section_groups[0].sections[0].steps[0].step_block_groups[0].blocks[0];
        let checkpoint = block.as_checkpoint().unwrap();
        assert_eq!(checkpoint.correct_text, "Correct");
        assert_eq!(checkpoint.first_question_text(), Some("Why?"));
    }

    #[test]
    fn test_export_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            export_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let mut editor = Editor::new(settings.clone());
        editor.course_mut().title = "Round Trip".into();
        let (group, path) = {
            let group = editor.add_section_group();
            let section = editor.add_section(group).unwrap();
            (group, editor.add_step(group, section).unwrap())
        };
        editor.set_activity_id(path, "lab").unwrap();

        let written = editor.export_file().unwrap();
        assert!(written.ends_with("Round_Trip.json"));

        let mut reloaded = Editor::new(settings);
        reloaded.import_file(&written).unwrap();
        assert_eq!(reloaded.course(), editor.course());
        assert_eq!(reloaded.course().section_groups.len(), group + 1);
    }
}
