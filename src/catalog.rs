//! Declarative migration rule model.
//!
//! A [`Catalog`] is an ordered sequence of [`RuleSet`]s, each gated behind a
//! version threshold. Rule sets are pure data: the engine walks them, the
//! exporter serializes them, and nothing in here touches the file system.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::fragment::Fragment;
use crate::version::ProductVersion;

/// Computes a replacement value from the old value and the original,
/// pre-migration fragment sequence (so a transform can read sibling keys).
pub type ValueTransform = Arc<dyn Fn(&str, &[Fragment]) -> String + Send + Sync>;

/// Computes an optional value for an inserted key from the original fragment
/// sequence. `None` means "do not insert".
pub type ValueSource = Arc<dyn Fn(&[Fragment]) -> Option<String> + Send + Sync>;

/// Drop a key or a whole section. The annotations are documentation for the
/// catalog export and do not affect the engine.
#[derive(Clone, Default)]
pub struct RemoveItem {
    pub reason: String,
    pub old_display_name: String,
    pub legacy_format_only: bool,
}

impl RemoveItem {
    pub fn with_reason(reason: &str) -> Self {
        Self {
            reason: reason.to_string(),
            ..Self::default()
        }
    }
}

/// Rename and/or relocate a key, optionally rewriting its value.
///
/// With no target section the key stays in place (a rename); with a target
/// section differing from where the key was found, the key moves. The format
/// markers are export-only annotations.
#[derive(Clone, Default)]
pub struct UpdateItem {
    pub section: Option<String>,
    pub key: Option<String>,
    pub transform: Option<ValueTransform>,
    pub reason: String,
    pub old_display_name: String,
    pub legacy_format_only: bool,
    pub new_format_only: bool,
}

impl UpdateItem {
    /// Rename the key in place.
    pub fn renamed(key: &str) -> Self {
        Self {
            key: Some(key.to_string()),
            ..Self::default()
        }
    }

    /// Move the key to another section, keeping its name.
    pub fn moved(section: &str) -> Self {
        Self {
            section: Some(section.to_string()),
            ..Self::default()
        }
    }

    /// Move the key to another section under a new name.
    pub fn moved_as(section: &str, key: &str) -> Self {
        Self {
            section: Some(section.to_string()),
            key: Some(key.to_string()),
            ..Self::default()
        }
    }

    pub fn with_transform(
        mut self,
        transform: impl Fn(&str, &[Fragment]) -> String + Send + Sync + 'static,
    ) -> Self {
        self.transform = Some(Arc::new(transform));
        self
    }

    pub fn with_reason(mut self, reason: &str) -> Self {
        self.reason = reason.to_string();
        self
    }

    pub fn legacy_format_only(mut self) -> Self {
        self.legacy_format_only = true;
        self
    }

    pub fn new_format_only(mut self) -> Self {
        self.new_format_only = true;
        self
    }

    /// Resolve the target `(section, key, value)` for one occurrence of the
    /// key. `fragments` is always the original, pre-migration sequence.
    pub(crate) fn apply(
        &self,
        section: &str,
        key: &str,
        value: &str,
        fragments: &[Fragment],
    ) -> (String, String, String) {
        let section = self.section.clone().unwrap_or_else(|| section.to_string());
        let key = self.key.clone().unwrap_or_else(|| key.to_string());
        let value = match &self.transform {
            Some(transform) => transform(value, fragments),
            None => value.to_string(),
        };
        (section, key, value)
    }
}

/// Insert a computed key into a section, creating the section when absent.
#[derive(Clone)]
pub struct NewItem {
    pub create: ValueSource,
}

impl NewItem {
    pub fn new(create: impl Fn(&[Fragment]) -> Option<String> + Send + Sync + 'static) -> Self {
        Self {
            create: Arc::new(create),
        }
    }
}

/// Documentation-only marker for keys that exist solely in the legacy file
/// format. Stripped before the engine sees the rule set.
#[derive(Clone, Default)]
pub struct LegacyOnly {
    pub reason: String,
    pub old_display_name: String,
}

impl LegacyOnly {
    pub fn with_reason(reason: &str) -> Self {
        Self {
            reason: reason.to_string(),
            ..Self::default()
        }
    }
}

/// Rename a section as a whole; all of its keys follow.
#[derive(Clone)]
pub struct MoveSection {
    pub name: String,
    pub old_display_name: String,
}

impl MoveSection {
    pub fn to(name: &str) -> Self {
        Self {
            name: name.to_string(),
            old_display_name: String::new(),
        }
    }
}

/// Operation attached to a single key.
#[derive(Clone)]
pub enum KeyRule {
    Remove(RemoveItem),
    Update(UpdateItem),
    Insert(NewItem),
    LegacyOnly(LegacyOnly),
}

pub type KeyRules = IndexMap<String, KeyRule>;

/// Operation attached to a section name.
#[derive(Clone)]
pub enum SectionRule {
    Remove(RemoveItem),
    Move(MoveSection),
    Keys(KeyRules),
    /// Rename the section and keep applying the key table under the new name.
    MoveWithKeys(MoveSection, KeyRules),
}

pub type SectionRules = IndexMap<String, SectionRule>;

/// All section and key operations gated behind one version threshold.
#[derive(Clone)]
pub struct RuleSet {
    pub version: ProductVersion,
    pub sections: SectionRules,
}

impl RuleSet {
    /// A copy of the section rules with [`KeyRule::LegacyOnly`] entries
    /// stripped; this is what the engine is given.
    pub fn without_legacy_markers(&self) -> SectionRules {
        self.sections
            .iter()
            .map(|(name, rule)| {
                let rule = match rule {
                    SectionRule::Keys(keys) => SectionRule::Keys(strip_legacy(keys)),
                    SectionRule::MoveWithKeys(mv, keys) => {
                        SectionRule::MoveWithKeys(mv.clone(), strip_legacy(keys))
                    }
                    other => other.clone(),
                };
                (name.clone(), rule)
            })
            .collect()
    }
}

fn strip_legacy(keys: &KeyRules) -> KeyRules {
    keys.iter()
        .filter(|(_, rule)| !matches!(rule, KeyRule::LegacyOnly(_)))
        .map(|(key, rule)| (key.clone(), rule.clone()))
        .collect()
}

/// An ordered sequence of rule sets, sorted by non-decreasing threshold.
#[derive(Clone)]
pub struct Catalog {
    rule_sets: Vec<RuleSet>,
}

impl Catalog {
    pub fn new(rule_sets: Vec<RuleSet>) -> Self {
        Self { rule_sets }
    }

    pub fn rule_sets(&self) -> &[RuleSet] {
        &self.rule_sets
    }

    /// The suffix of the catalog starting at the first rule set whose
    /// threshold is strictly greater than `previous_version`.
    ///
    /// Panics when that suffix is not sorted by ascending version: catalog
    /// ordering is an authoring invariant, not a runtime input.
    pub fn applicable(&self, previous_version: &ProductVersion) -> &[RuleSet] {
        for (i, rule_set) in self.rule_sets.iter().enumerate() {
            if *previous_version >= rule_set.version {
                continue;
            }
            let suffix = &self.rule_sets[i..];
            assert!(
                suffix.windows(2).all(|w| w[0].version <= w[1].version),
                "rule catalog must be sorted by ascending version"
            );
            return suffix;
        }
        &[]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule_set(version: &str) -> RuleSet {
        RuleSet {
            version: version.parse().unwrap(),
            sections: SectionRules::new(),
        }
    }

    fn versions(rule_sets: &[RuleSet]) -> Vec<String> {
        rule_sets.iter().map(|r| r.version.to_string()).collect()
    }

    #[test]
    fn test_applicable_selects_strictly_greater_suffix() {
        let catalog = Catalog::new(vec![
            rule_set("9.1.39"),
            rule_set("9.1.71"),
            rule_set("10.2.8"),
        ]);

        assert_eq!(
            versions(catalog.applicable(&"9.1.0".parse().unwrap())),
            vec!["9.1.39", "9.1.71", "10.2.8"]
        );
        // An exactly-matching version skips its own rule set.
        assert_eq!(
            versions(catalog.applicable(&"9.1.39".parse().unwrap())),
            vec!["9.1.71", "10.2.8"]
        );
        assert!(catalog.applicable(&"10.2.8".parse().unwrap()).is_empty());
        assert!(catalog.applicable(&"11.0.0".parse().unwrap()).is_empty());
    }

    #[test]
    fn test_applicable_keeps_duplicate_thresholds_together() {
        let catalog = Catalog::new(vec![
            rule_set("9.1.39"),
            rule_set("12.0.1"),
            rule_set("12.0.1"),
        ]);
        assert_eq!(
            versions(catalog.applicable(&"10.0.0".parse().unwrap())),
            vec!["12.0.1", "12.0.1"]
        );
        // At the duplicated threshold both rule sets are behind us.
        assert!(catalog.applicable(&"12.0.1".parse().unwrap()).is_empty());
    }

    #[test]
    #[should_panic(expected = "sorted by ascending version")]
    fn test_unsorted_catalog_panics() {
        let catalog = Catalog::new(vec![rule_set("10.2.8"), rule_set("9.1.39")]);
        catalog.applicable(&"1.0.0".parse().unwrap());
    }

    #[test]
    fn test_legacy_markers_are_stripped() {
        let mut keys = KeyRules::new();
        keys.insert("kept".to_string(), KeyRule::Update(UpdateItem::renamed("k")));
        keys.insert(
            "doc_only".to_string(),
            KeyRule::LegacyOnly(LegacyOnly::with_reason("unused")),
        );
        let mut sections = SectionRules::new();
        sections.insert("globals".to_string(), SectionRule::Keys(keys));
        let rule_set = RuleSet {
            version: "9.1.39".parse().unwrap(),
            sections,
        };

        let stripped = rule_set.without_legacy_markers();
        let SectionRule::Keys(keys) = &stripped["globals"] else {
            panic!("expected key rules");
        };
        assert!(keys.contains_key("kept"));
        assert!(!keys.contains_key("doc_only"));
    }

    #[test]
    fn test_update_item_apply_resolves_targets() {
        let fragments = crate::fragment::tokenize("[s]\na=1\n");
        let rename = UpdateItem::renamed("b");
        assert_eq!(
            rename.apply("s", "a", "1", &fragments),
            ("s".to_string(), "b".to_string(), "1".to_string())
        );

        let move_with_transform =
            UpdateItem::moved_as("t", "c").with_transform(|value, _| format!("{value}0"));
        assert_eq!(
            move_with_transform.apply("s", "a", "1", &fragments),
            ("t".to_string(), "c".to_string(), "10".to_string())
        );
    }
}
