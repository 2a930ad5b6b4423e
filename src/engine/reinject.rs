//! Edit application: turns computed actions into a new fragment sequence.
//!
//! Edits are expressed as a sparse index-to-replacement map over the flat
//! fragment sequence, so a single forward reconstruction pass applies every
//! rename and removal while leaving unaffected fragments untouched. New
//! content is queued per destination section and dropped in right after the
//! first emitted header of that section, or appended as a brand-new section
//! block at the end of the document.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use super::actions::{Actions, section_spans};
use crate::catalog::{KeyRule, SectionRule, SectionRules};
use crate::fragment::{Fragment, FragmentKind};

pub(crate) fn apply(
    fragments: &[Fragment],
    actions: &Actions,
    rules: &SectionRules,
) -> Vec<Fragment> {
    let spans = section_spans(fragments);
    let mut replacements: HashMap<usize, Vec<Fragment>> = HashMap::new();

    // Indices of `key=value` fragments for `key` within the spans of `section`.
    let key_indices = |section: &str, key: &str| -> Vec<usize> {
        spans
            .get(section)
            .into_iter()
            .flatten()
            .flat_map(Clone::clone)
            .filter(|&i| fragments[i].key() == Some(key))
            .collect()
    };

    for renamed in &actions.renamed_keys {
        for i in key_indices(&renamed.section, &renamed.old_key) {
            replacements.insert(
                i,
                vec![Fragment::key_value(&renamed.new_key, &renamed.new_value)],
            );
        }
    }

    // Removing a section drops its header and keys; comments and unknown
    // lines inside it stay where they were.
    for section in &actions.removed_sections {
        for range in spans.get(section.as_str()).into_iter().flatten() {
            for i in range.clone() {
                if matches!(
                    fragments[i].kind,
                    FragmentKind::KeyValue(..) | FragmentKind::Section(_)
                ) {
                    replacements.insert(i, Vec::new());
                    if is_blank(fragments, i + 1) {
                        replacements.insert(i + 1, Vec::new());
                    }
                }
            }
        }
    }

    // Removed keys and the source side of moved keys disappear the same way,
    // taking the line's newline with them so no doubled blank line is left.
    let removals = actions
        .removed_keys
        .iter()
        .map(|(section, key)| (section.as_str(), key.as_str()))
        .chain(
            actions
                .moved_keys
                .iter()
                .map(|moved| (moved.old_section.as_str(), moved.old_key.as_str())),
        );
    for (section, key) in removals {
        for i in key_indices(section, key) {
            replacements.insert(i, Vec::new());
            if is_blank(fragments, i + 1) {
                replacements.insert(i + 1, Vec::new());
            }
        }
    }

    for (old_section, new_section) in &actions.renamed_sections {
        for range in spans.get(old_section.as_str()).into_iter().flatten() {
            replacements.insert(range.start, vec![Fragment::section(new_section)]);
        }
    }

    // Queued insertions per destination section: computed new keys first
    // (catalog order), then the target side of moved keys.
    let mut pending: IndexMap<String, Vec<Fragment>> = IndexMap::new();
    for (section, rule) in rules {
        let SectionRule::Keys(keys) = rule else {
            continue;
        };
        for (key, key_rule) in keys {
            if let KeyRule::Insert(item) = key_rule
                && let Some(value) = (item.create)(fragments)
            {
                pending
                    .entry(section.clone())
                    .or_insert_with(Vec::new)
                    .extend(new_key_run(key, &value));
            }
        }
    }
    for moved in &actions.moved_keys {
        for _ in key_indices(&moved.old_section, &moved.old_key) {
            pending
                .entry(moved.new_section.clone())
                .or_insert_with(Vec::new)
                .extend(new_key_run(&moved.new_key, &moved.new_value));
        }
    }

    // Single forward reconstruction pass.
    let mut result: Vec<Fragment> = Vec::with_capacity(fragments.len());
    for (i, fragment) in fragments.iter().enumerate() {
        let emitted: &[Fragment] = match replacements.get(&i) {
            Some(replacement) => replacement,
            None => std::slice::from_ref(fragment),
        };
        result.extend(emitted.iter().cloned());
        if let Some(name) = emitted.first().and_then(Fragment::section_name)
            && let Some(queued) = pending.get_mut(name)
        {
            // Drains the queue so the fallback below skips this section.
            result.append(queued);
        }
    }

    // Destinations that never appeared get a fresh section block at the end,
    // in catalog order.
    for (section, queued) in pending {
        if !queued.is_empty() {
            result.push(Fragment::newline());
            result.push(Fragment::section(&section));
            result.extend(queued);
        }
    }

    drop_shadowed_keys(result)
}

fn new_key_run(key: &str, value: &str) -> [Fragment; 3] {
    [
        Fragment::newline(),
        Fragment::key_value(key, value),
        Fragment::newline(),
    ]
}

fn is_blank(fragments: &[Fragment], i: usize) -> bool {
    fragments.get(i).is_some_and(Fragment::is_newline)
}

/// Duplicate-key resolution.
///
/// Within each section run the first surviving occurrence of a key wins and
/// later ones are dropped. Migrated content lands right behind the section
/// header, so when a moved or inserted key collides with a pre-existing key
/// of the same name, the migrated value is the one that survives. The seen
/// set resets at every section header.
fn drop_shadowed_keys(fragments: Vec<Fragment>) -> Vec<Fragment> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut result = Vec::with_capacity(fragments.len());
    for fragment in fragments {
        match &fragment.kind {
            FragmentKind::KeyValue(key, _) => {
                if !seen.insert(key.clone()) {
                    continue;
                }
            }
            FragmentKind::Section(_) => seen.clear(),
            _ => {}
        }
        result.push(fragment);
    }
    result
}
