//! The built-in migration rule catalog and its value helpers.
//!
//! Rule content is plain data describing how configuration keys evolved
//! across product releases; the engine never depends on anything in here.
//! Rule sets must stay sorted by ascending version, and two rule sets may
//! share a threshold when ordering between them matters (keys are moved out
//! of a section before the emptied section is dropped).

use crate::catalog::{
    Catalog, KeyRule, LegacyOnly, NewItem, RemoveItem, RuleSet, SectionRule, SectionRules,
    UpdateItem,
};
use crate::fragment::{Fragment, FragmentKind};
use crate::version::ProductVersion;

/// Loose boolean parsing for configuration values.
pub fn to_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "yes" | "true" | "on"
    )
}

/// Loose integer parsing: decimal or `0x` hexadecimal, anything else is 0.
pub fn to_int(value: &str) -> i64 {
    let value = value.trim();
    match value.strip_prefix("0x") {
        Some(hex) => i64::from_str_radix(hex, 16).unwrap_or(0),
        None => value.parse().unwrap_or(0),
    }
}

/// Last value of `section.key` in a fragment sequence, if present.
pub fn section_value<'a>(fragments: &'a [Fragment], section: &str, key: &str) -> Option<&'a str> {
    let mut in_section = false;
    let mut last = None;
    for fragment in fragments {
        match &fragment.kind {
            FragmentKind::Section(name) => in_section = name == section,
            FragmentKind::KeyValue(k, v) if in_section && k == key => last = Some(v.as_str()),
            _ => {}
        }
    }
    last
}

/// Computed-value source copying the current value of a sibling key.
pub fn copy_of(section: &'static str, key: &'static str) -> NewItem {
    NewItem::new(move |fragments| section_value(fragments, section, key).map(str::to_string))
}

/// Merge `enable_session_log` and `enable_arcsight_log` into the bitmask the
/// unified `syslog_format` key expects.
fn merge_syslog_format(_value: &str, fragments: &[Fragment]) -> String {
    let session_log = section_value(fragments, "session_log", "enable_session_log")
        .map(to_bool)
        .unwrap_or(true);
    let arcsight_log = section_value(fragments, "session_log", "enable_arcsight_log")
        .map(to_bool)
        .unwrap_or(false);
    let mask = i64::from(session_log) | (i64::from(arcsight_log) << 1);
    mask.to_string()
}

fn performance_flag_tokens(flags: i64, enable: bool) -> [String; 7] {
    let sign = |on: bool| if on { '+' } else { '-' };
    let token = |bit: i64, name: &str, sign: char| {
        if flags & bit != 0 {
            format!("{sign}{name}")
        } else {
            String::new()
        }
    };
    [
        token(0x1, "wallpaper", sign(enable)),
        token(0x4, "menu_animations", sign(enable)),
        token(0x8, "theme", sign(enable)),
        token(0x20, "mouse_cursor_shadows", sign(enable)),
        token(0x40, "cursor_blinking", sign(enable)),
        // These two bits historically meant the opposite of the others.
        token(0x80, "font_smoothing", sign(!enable)),
        token(0x100, "desktop_composition", sign(!enable)),
    ]
}

/// Merge the two historical force-present / force-not-present bitmasks into
/// one signed token list; the not-present mask wins on conflicts.
fn merge_performance_flags(_value: &str, fragments: &[Fragment]) -> String {
    let force_present = section_value(fragments, "client", "performance_flags_force_present")
        .map(to_int)
        .unwrap_or(0x28);
    let force_not_present =
        section_value(fragments, "client", "performance_flags_force_not_present")
            .map(to_int)
            .unwrap_or(0);

    let not_present = performance_flag_tokens(force_not_present, true);
    let present = performance_flag_tokens(force_present, false);
    not_present
        .iter()
        .zip(present.iter())
        .filter_map(|(np, p)| {
            let token = if np.is_empty() { p } else { np };
            (!token.is_empty()).then(|| token.clone())
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Notification levels above 1 collapsed into 1.
fn clamp_cert_notification(value: &str, _fragments: &[Fragment]) -> String {
    to_int(value).min(1).to_string()
}

fn keys<const N: usize>(entries: [(&str, KeyRule); N]) -> SectionRule {
    SectionRule::Keys(
        entries
            .into_iter()
            .map(|(key, rule)| (key.to_string(), rule))
            .collect(),
    )
}

fn sections<const N: usize>(entries: [(&str, SectionRule); N]) -> SectionRules {
    entries
        .into_iter()
        .map(|(section, rule)| (section.to_string(), rule))
        .collect()
}

fn version(literal: &str) -> ProductVersion {
    literal.parse().expect("catalog version literal")
}

fn update_cert_notification() -> KeyRule {
    KeyRule::Update(UpdateItem::default().with_transform(clamp_cert_notification))
}

/// The shipped rule catalog, ordered by ascending version threshold.
pub fn catalog() -> Catalog {
    Catalog::new(vec![
        RuleSet {
            version: version("9.1.39"),
            sections: sections([(
                "globals",
                keys([(
                    "session_timeout",
                    KeyRule::Update(UpdateItem::renamed("base_inactivity_timeout")),
                )]),
            )]),
        },
        RuleSet {
            version: version("9.1.71"),
            sections: sections([
                (
                    "video",
                    keys([("replay_path", KeyRule::Update(UpdateItem::moved("mod_replay")))]),
                ),
                (
                    "mod_rdp",
                    keys([
                        (
                            "session_probe_exe_or_file",
                            KeyRule::Update(UpdateItem::moved_as("session_probe", "exe_or_file")),
                        ),
                        (
                            "session_probe_arguments",
                            KeyRule::Update(UpdateItem::moved_as("session_probe", "arguments")),
                        ),
                        (
                            "session_probe_enable_cleaner",
                            KeyRule::Update(UpdateItem::moved_as(
                                "session_probe",
                                "enable_cleaner",
                            )),
                        ),
                    ]),
                ),
            ]),
        },
        RuleSet {
            version: version("9.1.76"),
            sections: sections([(
                "all_target_mod",
                keys([(
                    "connection_retry_count",
                    KeyRule::Remove(RemoveItem::default()),
                )]),
            )]),
        },
        RuleSet {
            version: version("10.2.8"),
            sections: sections([(
                "video",
                keys([(
                    "capture_groupid",
                    KeyRule::Remove(RemoveItem::with_reason(
                        "Old mechanism for the web front end to access recordings.",
                    )),
                )]),
            )]),
        },
        RuleSet {
            version: version("10.3.3"),
            sections: sections([(
                "metrics",
                SectionRule::Remove(RemoveItem::with_reason("Abandoned project.")),
            )]),
        },
        RuleSet {
            version: version("10.5.27"),
            sections: sections([
                (
                    "globals",
                    keys([
                        (
                            "glyph_cache",
                            KeyRule::Remove(RemoveItem::with_reason(
                                "Covered by the disabled-orders setting.",
                            )),
                        ),
                        ("authfile", KeyRule::LegacyOnly(LegacyOnly::default())),
                        (
                            "trace_type",
                            KeyRule::LegacyOnly(LegacyOnly::with_reason(
                                "Overwritten by the management service.",
                            )),
                        ),
                    ]),
                ),
                (
                    "client",
                    keys([
                        (
                            "bogus_user_id",
                            KeyRule::Remove(RemoveItem::with_reason(
                                "Malformed packets are now always tolerated.",
                            )),
                        ),
                        (
                            "keyboard_layout_proposals",
                            KeyRule::Update(UpdateItem::moved("internal_mod")),
                        ),
                    ]),
                ),
                (
                    "mod_replay",
                    keys([(
                        "replay_path",
                        KeyRule::LegacyOnly(LegacyOnly::with_reason(
                            "Only meaningful for standalone replay setups.",
                        )),
                    )]),
                ),
            ]),
        },
        RuleSet {
            version: version("10.5.31"),
            sections: sections([
                (
                    "mod_rdp",
                    keys([
                        (
                            "allow_channels",
                            KeyRule::Update(
                                UpdateItem::renamed("allowed_channels").legacy_format_only(),
                            ),
                        ),
                        (
                            "deny_channels",
                            KeyRule::Update(
                                UpdateItem::renamed("denied_channels").legacy_format_only(),
                            ),
                        ),
                    ]),
                ),
                (
                    "globals",
                    keys([(
                        "encryptionLevel",
                        KeyRule::Update(
                            UpdateItem::moved_as("client", "encryption_level")
                                .with_transform(|_, _| "high".to_string())
                                .new_format_only()
                                .with_reason("Legacy encryption is always negotiated high now."),
                        ),
                    )]),
                ),
                (
                    "client",
                    keys([
                        (
                            "performance_flags_default",
                            KeyRule::Remove(RemoveItem::with_reason(
                                "Redundant with the force flags.",
                            )),
                        ),
                        (
                            "performance_flags_force_present",
                            KeyRule::Update(
                                UpdateItem::renamed("force_performance_flags")
                                    .with_transform(merge_performance_flags)
                                    .with_reason("Merged with the force-not-present mask."),
                            ),
                        ),
                        (
                            "performance_flags_force_not_present",
                            KeyRule::Update(
                                UpdateItem::renamed("force_performance_flags")
                                    .with_transform(merge_performance_flags)
                                    .with_reason("Merged with the force-present mask."),
                            ),
                        ),
                    ]),
                ),
                (
                    "session_log",
                    keys([
                        (
                            "enable_session_log",
                            KeyRule::Update(
                                UpdateItem::renamed("syslog_format")
                                    .with_transform(merge_syslog_format)
                                    .with_reason("Merged with the arcsight toggle."),
                            ),
                        ),
                        (
                            "enable_arcsight_log",
                            KeyRule::Update(
                                UpdateItem::renamed("syslog_format")
                                    .with_transform(merge_syslog_format)
                                    .with_reason("Merged with the session-log toggle."),
                            ),
                        ),
                    ]),
                ),
                (
                    "video",
                    keys([
                        (
                            "disable_keyboard_log",
                            KeyRule::Update(
                                UpdateItem::renamed("enable_keyboard_log")
                                    // bit 4 used to mean "no keyboard capture"
                                    .with_transform(|value, _| {
                                        ((to_int(value) & 4) == 0).to_string()
                                    }),
                            ),
                        ),
                        (
                            "disable_clipboard_log",
                            KeyRule::Update(UpdateItem::default().with_transform(|value, _| {
                                (to_int(value) >> 1).to_string()
                            })),
                        ),
                        (
                            "png_interval",
                            KeyRule::Update(
                                UpdateItem::default()
                                    .with_transform(|value, _| (to_int(value) * 100).to_string())
                                    .new_format_only(),
                            ),
                        ),
                    ]),
                ),
            ]),
        },
        RuleSet {
            version: version("10.5.35"),
            sections: sections([
                (
                    "globals",
                    keys([
                        (
                            "enable_close_box",
                            KeyRule::Update(UpdateItem::moved("internal_mod")),
                        ),
                        (
                            "close_timeout",
                            KeyRule::Update(UpdateItem::moved_as(
                                "internal_mod",
                                "close_box_timeout",
                            )),
                        ),
                        (
                            "allow_using_multiple_monitors",
                            KeyRule::Update(UpdateItem::moved("client")),
                        ),
                        (
                            "bogus_refresh_rect",
                            KeyRule::Update(UpdateItem::moved("mod_rdp")),
                        ),
                    ]),
                ),
                (
                    "client",
                    keys([
                        (
                            "force_performance_flags",
                            KeyRule::Update(UpdateItem::moved("mod_rdp")),
                        ),
                        (
                            "show_target_user_in_f12_message",
                            KeyRule::Update(UpdateItem::moved("globals")),
                        ),
                    ]),
                ),
            ]),
        },
        RuleSet {
            version: version("12.0.1"),
            sections: sections([
                (
                    "server_cert",
                    keys([
                        ("server_access_allowed_message", update_cert_notification()),
                        ("server_cert_create_message", update_cert_notification()),
                        ("server_cert_success_message", update_cert_notification()),
                        ("server_cert_failure_message", update_cert_notification()),
                    ]),
                ),
                (
                    "video",
                    keys([
                        ("capture_flags", KeyRule::Update(UpdateItem::moved("capture"))),
                        (
                            "disable_clipboard_log",
                            KeyRule::Update(UpdateItem::moved("capture")),
                        ),
                        (
                            "break_interval",
                            KeyRule::Update(UpdateItem::moved_as("capture", "wrm_break_interval")),
                        ),
                        (
                            "enable_keyboard_log",
                            KeyRule::Update(UpdateItem::moved("audit")),
                        ),
                        (
                            "framerate",
                            KeyRule::Update(UpdateItem::moved_as("audit", "video_frame_rate")),
                        ),
                        (
                            "codec_id",
                            KeyRule::Update(UpdateItem::moved_as("audit", "video_codec")),
                        ),
                        (
                            "png_interval",
                            KeyRule::Update(UpdateItem::moved_as("audit", "rt_png_interval")),
                        ),
                        ("record_path", KeyRule::Update(UpdateItem::moved("audit"))),
                        ("hash_path", KeyRule::Update(UpdateItem::moved("audit"))),
                    ]),
                ),
            ]),
        },
        // Emptied by the moves above; dropped by a second rule set at the
        // same threshold so ordering between the two stays explicit.
        RuleSet {
            version: version("12.0.1"),
            sections: sections([
                (
                    "video",
                    SectionRule::Remove(RemoveItem::with_reason("No keys left.")),
                ),
                (
                    "crypto",
                    SectionRule::Remove(RemoveItem::with_reason("Never used.")),
                ),
            ]),
        },
        RuleSet {
            version: version("12.0.29"),
            sections: sections([(
                "theme",
                keys([
                    (
                        "edit_focus_color",
                        KeyRule::Update(UpdateItem::renamed("edit_focus_border_color")),
                    ),
                    (
                        "edit_border_color",
                        KeyRule::Insert(copy_of("theme", "bgcolor")),
                    ),
                ]),
            )]),
        },
    ])
}
