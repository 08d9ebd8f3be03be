//! # Curriculum Schema Library
//!
//! This Rust library holds the document model of a curriculum editor and the transformations
//! between that model and the JSON interchange format read by downstream consumers.
//! A curriculum is a tree of section groups, sections, steps, block groups and content blocks,
//! plus a rubric, scoring criteria and an activity registry.
//!
//! ## Core Features
//!
//! - **Export:** Converts the editing model into the interchange schema: fixed key renames,
//!   media consolidation, and reshaping of scoring contexts.
//! - **Import:** Reads current and legacy interchange documents best-effort, migrating old
//!   shapes (flat media fields, single-text questions, string requirements) on the way in.
//! - **Activity Sync:** Keeps the activity registry consistent with the step tree.
//! - **Editing Session:** An `Editor` owning the course, with the step edits that re-sync the
//!   registry and index-based move/remove/insert on every list.
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! curriculum_schema = "0.1"
//! ```
//!
//! Importing a document and exporting it again:
//! ```rust
//! use curriculum_schema::{Editor, Settings};
//!
//! let mut editor = Editor::new(Settings::default());
//! editor
//!     .import_str(r#"{ "title": "Robotics", "section_groups": [] }"#)
//!     .unwrap();
//! let data = editor.export_value().unwrap();
//! assert_eq!(data["title"], "Robotics");
//! assert_eq!(data["media_type"], "image");
//! ```
//!
//! Reading a file reports failures as an `ImportOutcome`:
//! ```rust
//! use curriculum_schema::{import_file, ImportOutcome, Settings};
//!
//! match import_file("missing.json", &Settings::default()) {
//!     ImportOutcome::Ok(course) => println!("Course: {}", course.title),
//!     ImportOutcome::ErrRead(err) => eprintln!("Read error: {}", err),
//!     ImportOutcome::ErrParse(err) => eprintln!("Parse error: {}", err),
//! }
//! ```
//!
//! Logging goes through the `log` facade; install any logger to see it.
pub mod activity; // Activity registry entries and checkpoint-set definitions.
pub mod block; // Content blocks and block groups.
pub mod course; // Course root, section groups, sections and steps.
pub mod editor; // Editing session owning the course.
pub mod export; // Model -> interchange JSON.
mod identifier; // Identifier generation.
pub mod import; // Interchange JSON -> model.
pub mod keys; // Key renaming tables for both directions.
pub mod rubric;
pub mod scoring; // Scoring criteria, components and contexts.
pub mod sequence; // Index-based list editing.
mod serde_helpers;
pub mod settings; // Session settings, optionally from the environment.
pub mod sync; // Activity registry consistency.

// Exports key structures for external use.
pub use activity::{ActivityMapping, CheckpointDef, Tool};
pub use block::{Block, BlockContent, BlockGroup, CheckpointBlock, ContentPart, MediaBlock};
pub use course::{Course, Section, SectionGroup, SelectOption, Step};
pub use editor::{Editor, StepPath};
pub use export::{export_to_file, export_to_string, prepare_export_data};
pub use identifier::gen_uuid;
pub use import::{import_file, import_str, import_value, ImportOutcome};
pub use rubric::{Requirement, RubricItem};
pub use scoring::{Component, ComponentKind, Context, Criterion, ScoringConfig, WireContext};
pub use sequence::Sequence;
pub use settings::Settings;
pub use sync::sync_activities;
