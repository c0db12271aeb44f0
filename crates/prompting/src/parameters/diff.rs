//! Structural diff between two parameter definitions.
//!
//! Groups are matched by name. Within a matched group, parameters are matched
//! by name; a parameter that changes group shows up as a removal from the old
//! group and an addition to the new one. The diff never looks at widgets.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::Serialize;

use super::{Parameter, ParameterDefinition, ParameterGroup};

/// Parameters of one group that share a diff category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffEntry {
    /// The group header (no parameters) the entry belongs to.
    pub group: ParameterGroup,
    pub params: Vec<Parameter>,
}

impl DiffEntry {
    fn new(group: &ParameterGroup) -> Self {
        Self {
            group: group.header(),
            params: Vec::new(),
        }
    }

    pub fn param_names(&self) -> Vec<&str> {
        self.params.iter().map(|p| p.name.as_str()).collect()
    }
}

/// Additions, removals and data changes keyed by group name.
///
/// Each map preserves the order in which groups were encountered: old
/// definition order for `to_remove`, new definition order for the others.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diff {
    pub to_remove: IndexMap<String, DiffEntry>,
    pub to_add: IndexMap<String, DiffEntry>,
    pub to_change_data: IndexMap<String, DiffEntry>,
}

/// Parameter counts per category, for logging and events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    pub added: usize,
    pub removed: usize,
    pub changed: usize,
}

impl Diff {
    pub fn is_empty(&self) -> bool {
        self.to_remove.is_empty() && self.to_add.is_empty() && self.to_change_data.is_empty()
    }

    pub fn summary(&self) -> DiffSummary {
        let count = |m: &IndexMap<String, DiffEntry>| -> usize {
            m.values().map(|e| e.params.len()).sum()
        };
        DiffSummary {
            added: count(&self.to_add),
            removed: count(&self.to_remove),
            changed: count(&self.to_change_data),
        }
    }

    /// Append `param` to `group`'s entry in `map`.
    pub fn push(map: &mut IndexMap<String, DiffEntry>, group: &ParameterGroup, param: &Parameter) {
        map.entry(group.name.clone())
            .or_insert_with(|| DiffEntry::new(group))
            .params
            .push(param.clone());
    }
}

/// Compute the diff that turns `old` into `new`.
pub fn diff(old: &ParameterDefinition, new: &ParameterDefinition) -> Diff {
    let mut out = Diff::default();

    for old_group in &old.parameter_groups {
        let new_group = new
            .parameter_groups
            .iter()
            .find(|g| g.name == old_group.name);
        for param in &old_group.parameters {
            let kept = new_group.is_some_and(|g| g.parameter(&param.name).is_some());
            if !kept {
                Diff::push(&mut out.to_remove, old_group, param);
            }
        }
    }

    for new_group in &new.parameter_groups {
        let old_group = old
            .parameter_groups
            .iter()
            .find(|g| g.name == new_group.name);
        for param in &new_group.parameters {
            match old_group.and_then(|g| g.parameter(&param.name)) {
                None => Diff::push(&mut out.to_add, new_group, param),
                Some(previous) if data_changed(previous, param) => {
                    Diff::push(&mut out.to_change_data, new_group, param)
                }
                Some(_) => {}
            }
        }
    }

    out
}

/// The value list (values and labels, in order) or the selected set differ.
fn data_changed(old: &Parameter, new: &Parameter) -> bool {
    let listed = |p: &Parameter| -> Vec<(String, String)> {
        p.values
            .iter()
            .map(|v| (v.value.clone(), v.label.clone()))
            .collect()
    };
    let selected = |p: &Parameter| -> BTreeSet<String> {
        p.selected_values().into_iter().map(str::to_string).collect()
    };
    listed(old) != listed(new) || selected(old) != selected(new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::ParameterValue;
    use proptest::prelude::*;

    fn defn(groups: Vec<ParameterGroup>) -> ParameterDefinition {
        groups
            .into_iter()
            .fold(ParameterDefinition::new(), |d, g| d.with_group(g))
    }

    #[test]
    fn identical_definitions_produce_empty_diff() {
        let d = defn(vec![
            ParameterGroup::new("G1")
                .with_parameter(Parameter::new("p1").with_choices(&["a", "b"], &["a"])),
        ]);
        let out = diff(&d, &d);
        assert!(out.is_empty());
        assert_eq!(out.summary(), DiffSummary::default());
    }

    #[test]
    fn removed_parameter_lands_in_to_remove() {
        let old = defn(vec![
            ParameterGroup::new("G1")
                .with_parameter(Parameter::new("p1").with_choices(&["a", "b"], &["a"])),
        ]);
        let new = defn(vec![ParameterGroup::new("G1")]);
        let out = diff(&old, &new);
        assert_eq!(out.to_remove["G1"].param_names(), vec!["p1"]);
        assert!(out.to_add.is_empty());
        assert!(out.to_change_data.is_empty());
        assert!(out.to_remove["G1"].group.parameters.is_empty());
    }

    #[test]
    fn vanished_group_removes_all_its_parameters() {
        let old = defn(vec![
            ParameterGroup::new("G1")
                .with_parameter(Parameter::new("a"))
                .with_parameter(Parameter::new("b")),
        ]);
        let out = diff(&old, &ParameterDefinition::new());
        assert_eq!(out.to_remove["G1"].param_names(), vec!["a", "b"]);
    }

    #[test]
    fn new_group_adds_all_its_parameters() {
        let new = defn(vec![
            ParameterGroup::new("G2").with_parameter(Parameter::new("p2")),
        ]);
        let out = diff(&ParameterDefinition::new(), &new);
        assert_eq!(out.to_add["G2"].group.name, "G2");
        assert_eq!(out.to_add["G2"].param_names(), vec!["p2"]);
        assert_eq!(out.summary().added, 1);
    }

    #[test]
    fn value_list_change_is_a_data_change() {
        let old = defn(vec![
            ParameterGroup::new("G")
                .with_parameter(Parameter::new("p3").with_choices(&["x", "y"], &["x"])),
        ]);
        let new = defn(vec![
            ParameterGroup::new("G")
                .with_parameter(Parameter::new("p3").with_choices(&["x", "y", "z"], &["x"])),
        ]);
        let out = diff(&old, &new);
        assert_eq!(out.to_change_data["G"].param_names(), vec!["p3"]);
        assert_eq!(out.to_change_data["G"].params[0].values.len(), 3);
        assert!(out.to_add.is_empty() && out.to_remove.is_empty());
    }

    #[test]
    fn label_and_selection_changes_are_data_changes() {
        let base = Parameter::new("p").with_choices(&["x", "y"], &["x"]);
        let relabeled = Parameter::new("p")
            .with_value(ParameterValue::new("x").with_label("Ex").selected())
            .with_value(ParameterValue::new("y"));
        let reselected = Parameter::new("p").with_choices(&["x", "y"], &["y"]);
        let group = |p: &Parameter| defn(vec![ParameterGroup::new("G").with_parameter(p.clone())]);

        assert!(!diff(&group(&base), &group(&relabeled)).to_change_data.is_empty());
        assert!(!diff(&group(&base), &group(&reselected)).to_change_data.is_empty());
    }

    #[test]
    fn moved_parameter_is_removed_and_added() {
        let old = defn(vec![
            ParameterGroup::new("G1").with_parameter(Parameter::new("p")),
            ParameterGroup::new("G2"),
        ]);
        let new = defn(vec![
            ParameterGroup::new("G1"),
            ParameterGroup::new("G2").with_parameter(Parameter::new("p")),
        ]);
        let out = diff(&old, &new);
        assert_eq!(out.to_remove["G1"].param_names(), vec!["p"]);
        assert_eq!(out.to_add["G2"].param_names(), vec!["p"]);
        assert!(out.to_change_data.is_empty());
    }

    #[test]
    fn diff_serializes_with_group_keys() {
        let new = defn(vec![
            ParameterGroup::new("G2").with_parameter(Parameter::new("p2")),
        ]);
        let json = serde_json::to_value(diff(&ParameterDefinition::new(), &new)).unwrap();
        assert_eq!(json["to_add"]["G2"]["params"][0]["name"], "p2");
        assert!(json["to_remove"].as_object().unwrap().is_empty());
    }


    fn arb_param(name: String) -> impl Strategy<Value = Parameter> {
        (
            prop::collection::vec("[a-d]", 0..4),
            prop::collection::vec(any::<bool>(), 4),
        )
            .prop_map(move |(values, selected)| {
                let mut p = Parameter::new(name.clone());
                for (i, v) in values.into_iter().enumerate() {
                    let mut pv = ParameterValue::new(v);
                    pv.selected = selected[i];
                    p.values.push(pv);
                }
                p
            })
    }

    fn arb_definition() -> impl Strategy<Value = ParameterDefinition> {
        prop::collection::btree_map("G[0-2]", prop::collection::btree_set("p[0-5]", 0..4), 0..3)
            .prop_flat_map(|groups| {
                let strategies: Vec<_> = groups
                    .into_iter()
                    .map(|(g, names)| {
                        let params: Vec<_> = names.into_iter().map(arb_param).collect();
                        params.prop_map(move |ps| {
                            ps.into_iter()
                                .fold(ParameterGroup::new(g.clone()), |g, p| g.with_parameter(p))
                        })
                    })
                    .collect();
                strategies.prop_map(defn)
            })
    }

    proptest! {
        #[test]
        fn self_diff_is_always_empty(d in arb_definition()) {
            prop_assert!(diff(&d, &d).is_empty());
        }

        #[test]
        fn each_group_parameter_has_at_most_one_category(
            old in arb_definition(),
            new in arb_definition(),
        ) {
            let out = diff(&old, &new);
            let mut seen = BTreeSet::new();
            for map in [&out.to_remove, &out.to_add, &out.to_change_data] {
                for (group, entry) in map {
                    for p in &entry.params {
                        prop_assert!(seen.insert((group.clone(), p.name.clone())));
                    }
                }
            }
        }
    }
}
