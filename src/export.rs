//! Read-only JSON projection of a rule catalog.
//!
//! Documentation tooling consumes this dump; the engine never reads it back.
//! Computed insertions carry no serializable payload and are omitted, as are
//! update entries with nothing visible to report and rule sets that end up
//! empty.

use indexmap::IndexMap;
use serde::Serialize;

use crate::catalog::{Catalog, KeyRule, KeyRules, SectionRule};

#[derive(Serialize)]
pub struct RuleSetDump {
    pub version: String,
    pub data: IndexMap<String, SectionDump>,
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SectionDump {
    Remove {
        #[serde(skip_serializing_if = "String::is_empty")]
        reason: String,
        #[serde(rename = "oldDisplayName", skip_serializing_if = "String::is_empty")]
        old_display_name: String,
        #[serde(rename = "legacyFormatOnly", skip_serializing_if = "is_false")]
        legacy_format_only: bool,
    },
    Move {
        #[serde(rename = "newName")]
        new_name: String,
        #[serde(rename = "oldDisplayName", skip_serializing_if = "String::is_empty")]
        old_display_name: String,
    },
    Values {
        values: IndexMap<String, KeyDump>,
    },
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum KeyDump {
    Remove {
        #[serde(skip_serializing_if = "String::is_empty")]
        reason: String,
        #[serde(rename = "oldDisplayName", skip_serializing_if = "String::is_empty")]
        old_display_name: String,
        #[serde(rename = "legacyFormatOnly", skip_serializing_if = "is_false")]
        legacy_format_only: bool,
    },
    Update {
        #[serde(rename = "newSection", skip_serializing_if = "Option::is_none")]
        new_section: Option<String>,
        #[serde(rename = "newKey", skip_serializing_if = "Option::is_none")]
        new_key: Option<String>,
        #[serde(skip_serializing_if = "String::is_empty")]
        reason: String,
        #[serde(rename = "oldDisplayName", skip_serializing_if = "String::is_empty")]
        old_display_name: String,
        #[serde(rename = "legacyFormatOnly", skip_serializing_if = "is_false")]
        legacy_format_only: bool,
        #[serde(rename = "newFormatOnly", skip_serializing_if = "is_false")]
        new_format_only: bool,
    },
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn dump_keys(keys: &KeyRules) -> IndexMap<String, KeyDump> {
    let mut values = IndexMap::new();
    for (key, rule) in keys {
        let dump = match rule {
            KeyRule::Remove(item) => Some(KeyDump::Remove {
                reason: item.reason.clone(),
                old_display_name: item.old_display_name.clone(),
                legacy_format_only: item.legacy_format_only,
            }),
            KeyRule::Update(item) => {
                // An update that neither renames, relocates, nor marks the key
                // as gone from the new format is invisible to readers.
                if item.section.is_none() && item.key.is_none() && !item.new_format_only {
                    None
                } else {
                    Some(KeyDump::Update {
                        new_section: item.section.clone(),
                        new_key: item.key.clone(),
                        reason: item.reason.clone(),
                        old_display_name: item.old_display_name.clone(),
                        legacy_format_only: item.legacy_format_only,
                        new_format_only: item.new_format_only,
                    })
                }
            }
            KeyRule::LegacyOnly(item) => Some(KeyDump::Update {
                new_section: None,
                new_key: None,
                reason: item.reason.clone(),
                old_display_name: item.old_display_name.clone(),
                legacy_format_only: false,
                new_format_only: true,
            }),
            KeyRule::Insert(_) => None,
        };
        if let Some(dump) = dump {
            values.insert(key.clone(), dump);
        }
    }
    values
}

/// Project the whole catalog into its export shape.
pub fn dump(catalog: &Catalog) -> Vec<RuleSetDump> {
    let mut dumps = Vec::new();
    for rule_set in catalog.rule_sets() {
        let mut data = IndexMap::new();
        for (section, rule) in &rule_set.sections {
            let dump = match rule {
                SectionRule::Remove(item) => Some(SectionDump::Remove {
                    reason: item.reason.clone(),
                    old_display_name: item.old_display_name.clone(),
                    legacy_format_only: item.legacy_format_only,
                }),
                SectionRule::Move(mv) | SectionRule::MoveWithKeys(mv, _) => {
                    Some(SectionDump::Move {
                        new_name: mv.name.clone(),
                        old_display_name: mv.old_display_name.clone(),
                    })
                }
                SectionRule::Keys(keys) => {
                    let values = dump_keys(keys);
                    if values.is_empty() {
                        None
                    } else {
                        Some(SectionDump::Values { values })
                    }
                }
            };
            if let Some(dump) = dump {
                data.insert(section.clone(), dump);
            }
        }
        if !data.is_empty() {
            dumps.push(RuleSetDump {
                version: rule_set.version.to_string(),
                data,
            });
        }
    }
    dumps
}
