use crate::activity::ActivityMapping;
use crate::course::SectionGroup;
use log::debug;
use std::collections::{BTreeMap, HashSet};

/// Collects the non-empty activity ids of all steps, in tree order, without duplicates.
pub fn collect_activity_ids(groups: &[SectionGroup]) -> Vec<String> {
    let mut seen = HashSet::new();
    groups
        .iter()
        .flat_map(|group| group.sections.iter())
        .flat_map(|section| section.steps.iter())
        .filter_map(|step| step.activity_id.as_deref())
        .filter(|id| !id.is_empty())
        .filter(|id| seen.insert(*id))
        .map(str::to_string)
        .collect()
}

/// Keeps the activity registry in line with the step tree.
///
/// Every step activity id missing from the registry gets an empty mapping, and every
/// registry entry no step refers to is removed. Existing mappings are left untouched, so
/// running the sync twice changes nothing the second time.
///
/// Arguments:
/// - `groups`: The section groups to read activity ids from.
/// - `activities`: The registry to update in place.
pub fn sync_activities(groups: &[SectionGroup], activities: &mut BTreeMap<String, ActivityMapping>) {
    let ids = collect_activity_ids(groups);

    let mut inserted = 0;
    for id in &ids {
        if !activities.contains_key(id) {
            activities.insert(id.clone(), ActivityMapping::default());
            inserted += 1;
        }
    }

    let keep: HashSet<&str> = ids.iter().map(String::as_str).collect();
    let before = activities.len();
    activities.retain(|id, _| keep.contains(id.as_str()));
    let pruned = before - activities.len();

    if inserted > 0 || pruned > 0 {
        debug!(
            "Activity sync: {} inserted, {} pruned, {} registered",
            inserted,
            pruned,
            activities.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::Tool;
    use crate::course::{Section, Step};

    fn groups_with(ids: &[Option<&str>]) -> Vec<SectionGroup> {
        let mut section = Section::new();
        for id in ids {
            let mut step = Step::new();
            if let Some(id) = id {
                step.set_activity_id(id);
            }
            section.steps.push(step);
        }
        let mut group = SectionGroup::new();
        group.sections.push(section);
        vec![group]
    }

    #[test]
    fn test_sync_inserts_and_prunes() {
        let groups = groups_with(&[Some("a"), Some("b")]);
        let mut activities = BTreeMap::new();
        activities.insert(
            "a".to_string(),
            ActivityMapping {
                tool: Some(Tool::Quiz),
                ..Default::default()
            },
        );
        activities.insert("c".to_string(), ActivityMapping::default());

        sync_activities(&groups, &mut activities);

        let keys: Vec<&str> = activities.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(activities["a"].tool, Some(Tool::Quiz));
        assert_eq!(activities["b"], ActivityMapping::default());
    }

    #[test]
    fn test_sync_is_idempotent() {
        let groups = groups_with(&[Some("x"), None, Some("y"), Some("x")]);
        let mut activities = BTreeMap::new();
        sync_activities(&groups, &mut activities);
        let once = activities.clone();
        sync_activities(&groups, &mut activities);
        assert_eq!(activities, once);
        assert_eq!(activities.len(), 2);
    }

    #[test]
    fn test_collect_ids_in_tree_order() {
        let groups = groups_with(&[Some("second"), Some(""), Some("first"), Some("second")]);
        assert_eq!(collect_activity_ids(&groups), vec!["second", "first"]);
    }
}
