//! Lossless tokenizer for the INI dialect.
//!
//! [`tokenize`] cuts raw file content into an ordered sequence of fragments
//! covering every input byte: concatenating the `text` of all fragments in
//! order reproduces the file exactly. That invariant is what lets the engine
//! rewrite a handful of lines while provably leaving everything else alone.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[ \t]*#").expect("comment regex"));

static RE_SECTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[ \t]*\[[ \t]*(.+?)[ \t]*\][ \t]*$").expect("section regex"));

static RE_KEY_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[ \t]*(\S+)[ \t]*=[ \t]*(.*?)[ \t]*$").expect("key-value regex"));

/// Decoded meaning of one fragment.
///
/// `Unknown` covers every line matching none of the grammars; such lines are
/// carried through migrations verbatim and never interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentKind {
    NewLine,
    Comment,
    /// Section header; carries the trimmed section name.
    Section(String),
    /// `key=value` line; carries the key and the trimmed value.
    KeyValue(String, String),
    Unknown,
}

/// One text-preserving unit of the configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// The exact original (or synthesized) text of this fragment.
    pub text: String,
    pub kind: FragmentKind,
}

impl Fragment {
    pub fn newline() -> Self {
        Self {
            text: "\n".to_string(),
            kind: FragmentKind::NewLine,
        }
    }

    /// A synthesized section header, rendered as `[name]`.
    pub fn section(name: &str) -> Self {
        Self {
            text: format!("[{name}]"),
            kind: FragmentKind::Section(name.to_string()),
        }
    }

    /// A synthesized key-value line, rendered as `key=value`.
    pub fn key_value(key: &str, value: &str) -> Self {
        Self {
            text: format!("{key}={value}"),
            kind: FragmentKind::KeyValue(key.to_string(), value.to_string()),
        }
    }

    pub fn is_newline(&self) -> bool {
        self.kind == FragmentKind::NewLine
    }

    /// Section name, when this fragment is a header.
    pub fn section_name(&self) -> Option<&str> {
        match &self.kind {
            FragmentKind::Section(name) => Some(name),
            _ => None,
        }
    }

    /// Key of a `key=value` fragment.
    pub fn key(&self) -> Option<&str> {
        match &self.kind {
            FragmentKind::KeyValue(key, _) => Some(key),
            _ => None,
        }
    }
}

/// Classify a single line (without its terminating newline).
///
/// Recognition order, first match wins: comment, section header, key-value,
/// anything else `Unknown`. The whole line is always consumed.
fn classify(line: &str) -> Fragment {
    let kind = if RE_COMMENT.is_match(line) {
        FragmentKind::Comment
    } else if let Some(caps) = RE_SECTION.captures(line) {
        FragmentKind::Section(caps[1].to_string())
    } else if let Some(caps) = RE_KEY_VALUE.captures(line) {
        FragmentKind::KeyValue(caps[1].to_string(), caps[2].to_string())
    } else {
        FragmentKind::Unknown
    };
    Fragment {
        text: line.to_string(),
        kind,
    }
}

/// Tokenize raw file content into a total, lossless fragment sequence.
///
/// Every `\n` becomes its own `NewLine` fragment; the text between newlines
/// (when non-empty) becomes exactly one line fragment. A file without a
/// trailing newline keeps its final line fragment without a `NewLine` after
/// it.
pub fn tokenize(content: &str) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    let mut rest = content;
    while let Some(pos) = rest.find('\n') {
        let line = &rest[..pos];
        if !line.is_empty() {
            fragments.push(classify(line));
        }
        fragments.push(Fragment::newline());
        rest = &rest[pos + 1..];
    }
    if !rest.is_empty() {
        fragments.push(classify(rest));
    }
    fragments
}

/// Serialize a fragment sequence back to text.
pub fn render(fragments: &[Fragment]) -> String {
    fragments.iter().map(|f| f.text.as_str()).collect()
}
