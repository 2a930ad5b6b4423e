//! Migration engine.
//!
//! One call to [`apply_rule_set`] applies a single rule set to a fragment
//! sequence: actions are computed in one scan (`actions`), then applied
//! through an index-keyed replacement map in one reconstruction pass
//! (`reinject`). When the rule set touches nothing, the input sequence is
//! returned as-is so a no-op run cannot perturb formatting.

mod actions;
mod reinject;

use tracing::debug;

use crate::catalog::SectionRules;
use crate::fragment::Fragment;

/// Apply one rule set (with legacy markers already stripped) to a fragment
/// sequence. Returns whether anything changed and the resulting sequence.
pub fn apply_rule_set(fragments: Vec<Fragment>, rules: &SectionRules) -> (bool, Vec<Fragment>) {
    let computed = actions::compute(&fragments, rules);
    if computed.is_empty() {
        return (false, fragments);
    }
    debug!(
        renamed_sections = computed.renamed_sections.len(),
        renamed_keys = computed.renamed_keys.len(),
        moved_keys = computed.moved_keys.len(),
        removed_sections = computed.removed_sections.len(),
        removed_keys = computed.removed_keys.len(),
        "applying rule set"
    );
    let result = reinject::apply(&fragments, &computed, rules);
    (true, result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{
        KeyRule, MoveSection, NewItem, RemoveItem, SectionRule, UpdateItem,
    };
    use crate::fragment::{render, tokenize};

    fn keys<const N: usize>(entries: [(&str, KeyRule); N]) -> SectionRule {
        SectionRule::Keys(
            entries
                .into_iter()
                .map(|(key, rule)| (key.to_string(), rule))
                .collect(),
        )
    }

    fn rules<const N: usize>(entries: [(&str, SectionRule); N]) -> SectionRules {
        entries
            .into_iter()
            .map(|(section, rule)| (section.to_string(), rule))
            .collect()
    }

    fn migrate(content: &str, rules: &SectionRules) -> (bool, String) {
        let (changed, fragments) = apply_rule_set(tokenize(content), rules);
        (changed, render(&fragments))
    }

    #[test]
    fn test_noop_returns_same_sequence() {
        let content = "[globals]\nuntouched=1\n# odd comment\ngarbage line\n";
        let rules = rules([(
            "elsewhere",
            keys([("missing", KeyRule::Update(UpdateItem::renamed("gone")))]),
        )]);
        let fragments = tokenize(content);
        let (changed, result) = apply_rule_set(fragments.clone(), &rules);
        assert!(!changed);
        assert_eq!(result, fragments);
    }

    #[test]
    fn test_rename_preserves_value_and_surroundings() {
        let content = "# header\n[globals]\nsession_timeout=42\nother=x\n";
        let rules = rules([(
            "globals",
            keys([(
                "session_timeout",
                KeyRule::Update(UpdateItem::renamed("base_inactivity_timeout")),
            )]),
        )]);
        let (changed, result) = migrate(content, &rules);
        assert!(changed);
        assert_eq!(
            result,
            "# header\n[globals]\nbase_inactivity_timeout=42\nother=x\n"
        );
    }

    #[test]
    fn test_remove_key_takes_its_line() {
        let content = "[s]\na=1\nb=2\n";
        let rules = rules([("s", keys([("a", KeyRule::Remove(RemoveItem::default()))]))]);
        let (changed, result) = migrate(content, &rules);
        assert!(changed);
        assert_eq!(result, "[s]\nb=2\n");
    }

    #[test]
    fn test_move_across_sections() {
        let content = "[s1]\nkeep=1\nkey_a=7\n\n[s2]\nother=2\n";
        let rules = rules([(
            "s1",
            keys([("key_a", KeyRule::Update(UpdateItem::moved("s2")))]),
        )]);
        let (changed, result) = migrate(content, &rules);
        assert!(changed);
        // At most one blank line is left where key_a used to live, and the key
        // reappears right behind the destination header.
        assert_eq!(result, "[s1]\nkeep=1\n\n[s2]\nkey_a=7\n\nother=2\n");
    }

    #[test]
    fn test_move_to_missing_section_appends_block() {
        let content = "[s1]\nkey_a=7\n";
        let rules = rules([(
            "s1",
            keys([("key_a", KeyRule::Update(UpdateItem::moved_as("s2", "key_b")))]),
        )]);
        let (changed, result) = migrate(content, &rules);
        assert!(changed);
        assert_eq!(result, "[s1]\n\n[s2]\nkey_b=7\n");
    }

    #[test]
    fn test_moved_key_wins_duplicate_resolution() {
        let content = "[s1]\nkey_a=new\n\n[s2]\nother=old\n";
        let rules = rules([(
            "s1",
            keys([("key_a", KeyRule::Update(UpdateItem::moved_as("s2", "other")))]),
        )]);
        let (changed, result) = migrate(content, &rules);
        assert!(changed);
        let other_lines: Vec<&str> = result
            .lines()
            .filter(|line| line.starts_with("other="))
            .collect();
        assert_eq!(other_lines, vec!["other=new"]);
    }

    #[test]
    fn test_remove_section_keeps_comments() {
        let content = "[metrics]\n# still interesting\nlog_path=/tmp\n\n[globals]\na=1\n";
        let rules = rules([(
            "metrics",
            SectionRule::Remove(RemoveItem::with_reason("abandoned project")),
        )]);
        let (changed, result) = migrate(content, &rules);
        assert!(changed);
        assert_eq!(result, "# still interesting\n\n[globals]\na=1\n");
    }

    #[test]
    fn test_rename_section_carries_keys() {
        let content = "[video]\nfps=25\n";
        let rules = rules([("video", SectionRule::Move(MoveSection::to("capture")))]);
        let (changed, result) = migrate(content, &rules);
        assert!(changed);
        assert_eq!(result, "[capture]\nfps=25\n");
    }

    #[test]
    fn test_rename_section_with_key_table() {
        let content = "[video]\nfps=25\nkeep=1\n";
        let rules = rules([(
            "video",
            SectionRule::MoveWithKeys(
                MoveSection::to("capture"),
                [(
                    "fps".to_string(),
                    KeyRule::Update(UpdateItem::renamed("frame_rate")),
                )]
                .into_iter()
                .collect(),
            ),
        )]);
        let (changed, result) = migrate(content, &rules);
        assert!(changed);
        assert_eq!(result, "[capture]\nframe_rate=25\nkeep=1\n");
    }

    #[test]
    fn test_insert_computed_alongside_rename() {
        let content = "[theme]\nedit_focus_color=red\nbgcolor=blue\n";
        let rules = rules([(
            "theme",
            keys([
                (
                    "edit_focus_color",
                    KeyRule::Update(UpdateItem::renamed("edit_focus_border_color")),
                ),
                (
                    "edit_border_color",
                    KeyRule::Insert(NewItem::new(|fragments| {
                        fragments.iter().find_map(|f| match f.key() {
                            Some("bgcolor") => f.text.split_once('=').map(|(_, v)| v.to_string()),
                            _ => None,
                        })
                    })),
                ),
            ]),
        )]);
        let (changed, result) = migrate(content, &rules);
        assert!(changed);
        assert_eq!(
            result,
            "[theme]\nedit_border_color=blue\n\nedit_focus_border_color=red\nbgcolor=blue\n"
        );
    }

    #[test]
    fn test_insert_only_rule_set_is_noop() {
        // Insertions piggyback on a rule set that performs at least one
        // structural action; alone they do not mark the file changed.
        let content = "[theme]\nfgcolor=red\n";
        let rules = rules([(
            "theme",
            keys([(
                "extra",
                KeyRule::Insert(NewItem::new(|_| Some("1".to_string()))),
            )]),
        )]);
        let (changed, result) = migrate(content, &rules);
        assert!(!changed);
        assert_eq!(result, content);
    }

    #[test]
    fn test_insert_yielding_none_adds_nothing() {
        let content = "[theme]\nold=1\n";
        let rules = rules([(
            "theme",
            keys([
                ("old", KeyRule::Update(UpdateItem::renamed("new"))),
                ("extra", KeyRule::Insert(NewItem::new(|_| None))),
            ]),
        )]);
        let (changed, result) = migrate(content, &rules);
        assert!(changed);
        assert_eq!(result, "[theme]\nnew=1\n");
    }

    #[test]
    fn test_transform_reads_original_fragments() {
        // Both keys collapse into one; the transform reads the sibling from
        // the pre-migration sequence even while the first rename already
        // produced output.
        let content = "[session_log]\nenable_session_log=yes\nenable_arcsight_log=yes\n";
        let merge = |_: &str, fragments: &[crate::fragment::Fragment]| {
            let on = |key: &str| {
                fragments
                    .iter()
                    .any(|f| f.key() == Some(key) && f.text.ends_with("yes"))
            };
            let mut mask = 0;
            if on("enable_session_log") {
                mask |= 1;
            }
            if on("enable_arcsight_log") {
                mask |= 2;
            }
            mask.to_string()
        };
        let rules = rules([(
            "session_log",
            keys([
                (
                    "enable_session_log",
                    KeyRule::Update(UpdateItem::renamed("syslog_format").with_transform(merge)),
                ),
                (
                    "enable_arcsight_log",
                    KeyRule::Update(UpdateItem::renamed("syslog_format").with_transform(merge)),
                ),
            ]),
        )]);
        let (changed, result) = migrate(content, &rules);
        assert!(changed);
        // Both source lines rename to the same key; the duplicate pass keeps
        // one and the dropped line leaves its newline behind.
        assert_eq!(result, "[session_log]\nsyslog_format=3\n\n");
    }

    #[test]
    fn test_unknown_lines_survive_migration() {
        let content = "[s]\n<<<< merge marker\na=1\nnot a key line\n";
        let rules = rules([("s", keys([("a", KeyRule::Remove(RemoveItem::default()))]))]);
        let (changed, result) = migrate(content, &rules);
        assert!(changed);
        assert_eq!(result, "[s]\n<<<< merge marker\nnot a key line\n");
    }

    #[test]
    fn test_duplicate_section_occurrences_both_migrate() {
        let content = "[s]\na=1\n[t]\nx=9\n[s]\na=2\n";
        let rules = rules([(
            "s",
            keys([("a", KeyRule::Update(UpdateItem::renamed("b")))]),
        )]);
        let (changed, result) = migrate(content, &rules);
        assert!(changed);
        assert_eq!(result, "[s]\nb=1\n[t]\nx=9\n[s]\nb=2\n");
    }
}
