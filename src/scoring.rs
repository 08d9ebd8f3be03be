use crate::serde_helpers::{
    is_truthy, lenient_f64, lenient_string, lenient_vec, opt_lenient_string, value_to_string,
    whole_number,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    #[serde(deserialize_with = "lenient_vec")]
    pub criteria: Vec<Criterion>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A scoring criterion: weighted components plus the contexts the criterion applies to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Criterion {
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(deserialize_with = "lenient_vec")]
    pub components: Vec<Component>,
    #[serde(deserialize_with = "lenient_vec")]
    pub contexts: Vec<Context>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Activity,
    #[default]
    #[serde(other)]
    Checkpoint,
}

/// A weighted reference to a checkpoint block or an activity.
///
/// `variant` and `categories` only apply to checkpoint components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Component {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(rename = "type", deserialize_with = "component_kind")]
    pub kind: ComponentKind,
    #[serde(serialize_with = "whole_number", deserialize_with = "lenient_f64")]
    pub weight: f64,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "opt_lenient_string"
    )]
    pub variant: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "lenient_vec")]
    pub categories: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Component {
    fn default() -> Self {
        Component {
            id: String::new(),
            kind: ComponentKind::Checkpoint,
            weight: 1.0,
            variant: None,
            categories: Vec::new(),
            extra: Map::new(),
        }
    }
}

// Anything but the string "activity" reads as a checkpoint component.
fn component_kind<'de, D>(deserializer: D) -> Result<ComponentKind, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value.as_str() {
        Some("activity") => ComponentKind::Activity,
        _ => ComponentKind::Checkpoint,
    })
}

impl Component {
    pub fn new() -> Self {
        Component::default()
    }

    /// Changes the component type. Activity components carry no variant or categories.
    pub fn set_kind(&mut self, kind: ComponentKind) {
        self.kind = kind;
        if kind == ComponentKind::Activity {
            self.variant = None;
            self.categories.clear();
        }
    }
}

/// A criterion's reference to a set of activities or checkpoints, in the editor's shape
/// (`memberKey`, `members`, `title`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "memberKey", rename_all = "lowercase")]
pub enum Context {
    Activities {
        #[serde(default, deserialize_with = "lenient_vec")]
        members: Vec<String>,
        #[serde(default, deserialize_with = "lenient_string")]
        title: String,
    },
    Checkpoints {
        #[serde(default, deserialize_with = "lenient_vec")]
        members: Vec<String>,
        #[serde(default, deserialize_with = "lenient_string")]
        title: String,
    },
}

/// A context in the interchange shape, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WireContext {
    Checkpoint {
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        checkpoints: Vec<String>,
    },
    Activity {
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        activities: Option<Vec<String>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        activity: Option<String>,
    },
}

impl Default for Context {
    /// An activity context with one empty slot, as "+ Add Context" creates it.
    fn default() -> Self {
        Context::Activities {
            members: vec![String::new()],
            title: String::new(),
        }
    }
}

impl Context {
    pub fn new() -> Self {
        Context::default()
    }

    pub fn members(&self) -> &[String] {
        match self {
            Context::Activities { members, .. } | Context::Checkpoints { members, .. } => members,
        }
    }

    pub fn members_mut(&mut self) -> &mut Vec<String> {
        match self {
            Context::Activities { members, .. } | Context::Checkpoints { members, .. } => members,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Context::Activities { title, .. } | Context::Checkpoints { title, .. } => title,
        }
    }

    pub fn is_checkpoints(&self) -> bool {
        matches!(self, Context::Checkpoints { .. })
    }

    /// Switches between activity and checkpoint members. The member list is reset because
    /// ids of one kind mean nothing to the other; the title is kept.
    pub fn set_checkpoints(&mut self, checkpoints: bool) {
        let title = self.title().to_string();
        *self = if checkpoints {
            Context::Checkpoints {
                members: Vec::new(),
                title,
            }
        } else {
            Context::Activities {
                members: Vec::new(),
                title,
            }
        };
    }

    /// Interchange form of this context.
    ///
    /// Checkpoint contexts always list their members. Activity contexts emit `activities` only
    /// for more than one member, and `activity` whenever the first member is non-empty.
    pub fn to_wire(&self) -> WireContext {
        let title = Some(self.title())
            .filter(|title| !title.is_empty())
            .map(str::to_string);
        match self {
            Context::Checkpoints { members, .. } => WireContext::Checkpoint {
                title,
                checkpoints: members.clone(),
            },
            Context::Activities { members, .. } => WireContext::Activity {
                title,
                activities: (members.len() > 1).then(|| members.clone()),
                activity: members.first().filter(|first| !first.is_empty()).cloned(),
            },
        }
    }

    /// Reads a context in the interchange shape.
    ///
    /// Members come from `checkpoints` when present, else from `activity`. The plural
    /// `activities` field is only consulted when `read_plural_activities` is set.
    pub fn from_wire(value: &Value, read_plural_activities: bool) -> Context {
        let members = if let Some(checkpoints) = truthy_field(value, "checkpoints") {
            string_list(checkpoints)
        } else if let Some(activities) = truthy_field(value, "activities")
            .filter(|_| read_plural_activities)
            .filter(|activities| activities.as_array().map_or(false, |a| !a.is_empty()))
        {
            string_list(activities)
        } else if let Some(activity) = truthy_field(value, "activity") {
            vec![value_to_string(activity)]
        } else {
            Vec::new()
        };
        let title = value.get("title").map(value_to_string).unwrap_or_default();

        if value.get("type").and_then(Value::as_str) == Some("checkpoint") {
            Context::Checkpoints { members, title }
        } else {
            Context::Activities { members, title }
        }
    }
}

fn truthy_field<'a>(value: &'a Value, name: &str) -> Option<&'a Value> {
    value.get(name).filter(|member| is_truthy(member))
}

fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().map(value_to_string).collect(),
        scalar => vec![value_to_string(scalar)],
    }
}

impl Criterion {
    pub fn new() -> Self {
        Criterion::default()
    }

    pub fn wire_contexts(&self) -> Vec<WireContext> {
        self.contexts.iter().map(Context::to_wire).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn activities(members: &[&str]) -> Context {
        Context::Activities {
            members: members.iter().map(|m| m.to_string()).collect(),
            title: String::new(),
        }
    }

    #[test]
    fn test_singular_activity_context() {
        let wire = serde_json::to_value(activities(&["act1"]).to_wire()).unwrap();
        assert_eq!(wire, json!({ "type": "activity", "activity": "act1" }));
    }

    #[test]
    fn test_plural_activity_context() {
        let wire = serde_json::to_value(activities(&["act1", "act2"]).to_wire()).unwrap();
        assert_eq!(
            wire,
            json!({ "type": "activity", "activity": "act1", "activities": ["act1", "act2"] })
        );
    }

    #[test]
    fn test_empty_first_member_is_not_emitted() {
        let wire = serde_json::to_value(Context::new().to_wire()).unwrap();
        assert_eq!(wire, json!({ "type": "activity" }));
    }

    #[test]
    fn test_checkpoint_context_with_title() {
        let context = Context::Checkpoints {
            members: Vec::new(),
            title: "Quizzes".into(),
        };
        assert_eq!(
            serde_json::to_value(context.to_wire()).unwrap(),
            json!({ "type": "checkpoint", "title": "Quizzes", "checkpoints": [] })
        );
    }

    #[test]
    fn test_from_wire_reads_checkpoints_then_activity() {
        let checkpoint = Context::from_wire(
            &json!({ "type": "checkpoint", "checkpoints": ["cp1", "cp2"], "title": "T" }),
            false,
        );
        assert_eq!(
            checkpoint,
            Context::Checkpoints {
                members: vec!["cp1".into(), "cp2".into()],
                title: "T".into()
            }
        );

        let plural = json!({ "type": "activity", "activity": "a1", "activities": ["a1", "a2"] });
        assert_eq!(Context::from_wire(&plural, false), activities(&["a1"]));
        assert_eq!(Context::from_wire(&plural, true), activities(&["a1", "a2"]));

        let bare = Context::from_wire(&json!({ "type": "activity" }), false);
        assert_eq!(bare, activities(&[]));
    }

    #[test]
    fn test_internal_shape_uses_member_key() {
        let value = serde_json::to_value(activities(&["a"])).unwrap();
        assert_eq!(value, json!({ "memberKey": "activities", "members": ["a"], "title": "" }));
        let back: Context = serde_json::from_value(value).unwrap();
        assert_eq!(back, activities(&["a"]));
    }

    #[test]
    fn test_switching_member_key_resets_members() {
        let mut context = activities(&["a", "b"]);
        context.set_checkpoints(true);
        assert!(context.is_checkpoints());
        assert!(context.members().is_empty());
    }

    #[test]
    fn test_component_defaults_and_kind() {
        let component: Component =
            serde_json::from_value(json!({ "id": "cp1", "weight": "2.5" })).unwrap();
        assert_eq!(component.kind, ComponentKind::Checkpoint);
        assert_eq!(component.weight, 2.5);
        assert_eq!(Component::new().weight, 1.0);

        let mut component: Component = serde_json::from_value(json!({
            "id": "cp1", "type": "checkpoint", "variant": "rubric", "categories": ["x"]
        }))
        .unwrap();
        component.set_kind(ComponentKind::Activity);
        assert_eq!(
            serde_json::to_value(&component).unwrap(),
            json!({ "id": "cp1", "type": "activity", "weight": 1 })
        );
    }

    #[test]
    fn test_component_reads_mistyped_fields() {
        let component: Component = serde_json::from_value(json!({
            "id": "cp1", "type": 7, "variant": 3, "weight": 2, "label": "Quiz 1"
        }))
        .unwrap();
        assert_eq!(component.kind, ComponentKind::Checkpoint);
        assert_eq!(component.variant.as_deref(), Some("3"));
        assert_eq!(component.extra["label"], "Quiz 1");

        let value = serde_json::to_value(&component).unwrap();
        assert_eq!(value["weight"], json!(2));
        assert_eq!(value["label"], "Quiz 1");

        let half: Component = serde_json::from_value(json!({ "weight": 0.5 })).unwrap();
        assert_eq!(serde_json::to_value(&half).unwrap()["weight"], json!(0.5));
    }
}
