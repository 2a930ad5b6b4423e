//! Action computation: a single left-to-right scan over the fragment
//! sequence that resolves one rule set into concrete structural edits.

use std::collections::HashMap;
use std::ops::Range;

use crate::catalog::{KeyRule, KeyRules, SectionRule, SectionRules};
use crate::fragment::{Fragment, FragmentKind};

/// A key renamed in place. `section` is the section name as it appears in
/// the file, which is also how the section spans are keyed.
pub(crate) struct RenamedKey {
    pub section: String,
    pub old_key: String,
    pub new_key: String,
    pub new_value: String,
}

/// A key relocated to another section (possibly under a new name).
pub(crate) struct MovedKey {
    pub old_section: String,
    pub old_key: String,
    pub new_section: String,
    pub new_key: String,
    pub new_value: String,
}

/// The structural edits one rule set performs on one fragment sequence.
#[derive(Default)]
pub(crate) struct Actions {
    pub renamed_sections: Vec<(String, String)>,
    pub renamed_keys: Vec<RenamedKey>,
    pub moved_keys: Vec<MovedKey>,
    pub removed_sections: Vec<String>,
    pub removed_keys: Vec<(String, String)>,
}

impl Actions {
    pub fn is_empty(&self) -> bool {
        self.renamed_sections.is_empty()
            && self.renamed_keys.is_empty()
            && self.moved_keys.is_empty()
            && self.removed_sections.is_empty()
            && self.removed_keys.is_empty()
    }
}

/// Walk the fragments once, tracking the current section and its key table,
/// and record every edit the rule set asks for.
///
/// Value transformations run here, against the original fragment sequence —
/// never against partially migrated output.
pub(crate) fn compute(fragments: &[Fragment], rules: &SectionRules) -> Actions {
    let mut actions = Actions::default();
    // Current section name as the rules see it (a section-level rename within
    // this rule set updates it) and as the file spells it (used for lookup).
    let mut section = String::new();
    let mut original_section = String::new();
    let mut key_rules: Option<&KeyRules> = None;

    for fragment in fragments {
        match &fragment.kind {
            FragmentKind::KeyValue(key, value) => {
                let Some(rule) = key_rules.and_then(|rules| rules.get(key)) else {
                    continue;
                };
                match rule {
                    KeyRule::Remove(_) => {
                        actions.removed_keys.push((original_section.clone(), key.clone()));
                    }
                    KeyRule::Update(update) => {
                        let (new_section, new_key, new_value) =
                            update.apply(&section, key, value, fragments);
                        if new_section == section {
                            actions.renamed_keys.push(RenamedKey {
                                section: original_section.clone(),
                                old_key: key.clone(),
                                new_key,
                                new_value,
                            });
                        } else {
                            actions.moved_keys.push(MovedKey {
                                old_section: original_section.clone(),
                                old_key: key.clone(),
                                new_section,
                                new_key,
                                new_value,
                            });
                        }
                    }
                    // Insertions are resolved per rule set, not per occurrence;
                    // legacy markers never reach the engine.
                    KeyRule::Insert(_) | KeyRule::LegacyOnly(_) => {}
                }
            }
            FragmentKind::Section(name) => {
                key_rules = None;
                section = name.clone();
                original_section = name.clone();
                match rules.get(name) {
                    Some(SectionRule::Remove(_)) => actions.removed_sections.push(name.clone()),
                    Some(SectionRule::Move(mv)) => {
                        actions.renamed_sections.push((name.clone(), mv.name.clone()));
                    }
                    Some(SectionRule::Keys(keys)) => key_rules = Some(keys),
                    Some(SectionRule::MoveWithKeys(mv, keys)) => {
                        actions.renamed_sections.push((name.clone(), mv.name.clone()));
                        section = mv.name.clone();
                        key_rules = Some(keys);
                    }
                    None => {}
                }
            }
            _ => {}
        }
    }

    actions
}

/// Fragment index ranges per section name. A section name occurring several
/// times in the file gets one range per occurrence, in source order. The
/// preamble before the first header is tracked under the empty name.
pub(crate) type SectionSpans = HashMap<String, Vec<Range<usize>>>;

/// Cut a span at every `Section` fragment. A span starts at its header and
/// runs up to the next header, minus the `NewLine` separating the two lines.
pub(crate) fn section_spans(fragments: &[Fragment]) -> SectionSpans {
    let mut spans = SectionSpans::new();
    let mut section = String::new();
    let mut start = 0usize;

    let mut cut = |section: &str, start: usize, end: usize| {
        let end = if end > start && fragments[end - 1].is_newline() {
            end - 1
        } else {
            end
        };
        if end > start {
            spans
                .entry(section.to_string())
                .or_insert_with(Vec::new)
                .push(start..end);
        }
    };

    for (i, fragment) in fragments.iter().enumerate() {
        if let FragmentKind::Section(name) = &fragment.kind {
            cut(&section, start, i);
            section = name.clone();
            start = i;
        }
    }
    cut(&section, start, fragments.len());

    spans
}
