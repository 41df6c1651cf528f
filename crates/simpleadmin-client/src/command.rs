//! AT command text handling: sanitizing, prefix canonicalization and
//! batch normalization.

use std::fmt;

use serde::Serialize;

/// Case-insensitive substrings that mark a transient busy reply
pub const BUSY_PATTERNS: [&str; 4] = ["busy", "in use", "locked", "not available"];

/// Trim the command text. Missing input yields an empty string.
pub fn sanitize<'a>(text: impl Into<Option<&'a str>>) -> &'a str {
    text.into().map(str::trim).unwrap_or("")
}

/// Split response text on CRLF/LF, trimming lines and dropping blank ones.
pub fn split_lines<'a>(text: impl Into<Option<&'a str>>) -> Vec<&'a str> {
    match text.into() {
        Some(text) => text
            .split('\n')
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect(),
        None => Vec::new(),
    }
}

/// Check whether a reply reports a busy modem channel rather than a
/// rejected command.
pub fn is_busy_response(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }

    let lowered = text.to_lowercase();
    BUSY_PATTERNS.iter().any(|pattern| lowered.contains(pattern))
}

/// Prepend `AT` unless the command already starts with it (any case).
pub fn ensure_at_prefix(command: &str) -> String {
    if command.is_empty() {
        return String::new();
    }

    let has_prefix = command
        .get(..2)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("AT"));

    if has_prefix {
        command.to_string()
    } else {
        format!("AT{}", command)
    }
}

/// A single canonical AT command: trimmed, non-empty, `AT`-prefixed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Command(String);

impl Command {
    /// Build a command from raw caller text. Returns `None` for blank text.
    pub fn parse(raw: &str) -> Option<Self> {
        let sanitized = sanitize(raw);
        if sanitized.is_empty() {
            None
        } else {
            Some(Self(ensure_at_prefix(sanitized)))
        }
    }

    /// Wrap text that is already canonical (built with an `AT` prefix)
    pub(crate) fn from_canonical(text: String) -> Self {
        debug_assert!(text.starts_with("AT"));
        Self(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Command {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Ordered commands derived from one caller input
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandBatch {
    commands: Vec<Command>,
}

impl CommandBatch {
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Command> {
        self.commands.iter()
    }

    /// Commands as plain strings, in execution order
    pub fn to_strings(&self) -> Vec<String> {
        self.commands.iter().map(|c| c.0.clone()).collect()
    }
}

impl IntoIterator for CommandBatch {
    type Item = Command;
    type IntoIter = std::vec::IntoIter<Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.into_iter()
    }
}

impl<'a> IntoIterator for &'a CommandBatch {
    type Item = &'a Command;
    type IntoIter = std::slice::Iter<'a, Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}

/// Raw caller input: one command string or a list of them.
///
/// `None` entries stand for values that carry no command text and are
/// skipped during normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandInput {
    entries: Vec<Option<String>>,
}

impl CommandInput {
    pub fn entries(&self) -> &[Option<String>] {
        &self.entries
    }
}

impl From<&str> for CommandInput {
    fn from(value: &str) -> Self {
        Self {
            entries: vec![Some(value.to_string())],
        }
    }
}

impl From<String> for CommandInput {
    fn from(value: String) -> Self {
        Self {
            entries: vec![Some(value)],
        }
    }
}

impl From<&String> for CommandInput {
    fn from(value: &String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<Option<&str>> for CommandInput {
    fn from(value: Option<&str>) -> Self {
        Self {
            entries: vec![value.map(String::from)],
        }
    }
}

impl From<Vec<Option<String>>> for CommandInput {
    fn from(entries: Vec<Option<String>>) -> Self {
        Self { entries }
    }
}

impl From<Vec<String>> for CommandInput {
    fn from(values: Vec<String>) -> Self {
        Self {
            entries: values.into_iter().map(Some).collect(),
        }
    }
}

impl From<Vec<&str>> for CommandInput {
    fn from(values: Vec<&str>) -> Self {
        Self::from(values.as_slice())
    }
}

impl From<&[&str]> for CommandInput {
    fn from(values: &[&str]) -> Self {
        Self {
            entries: values.iter().map(|v| Some(v.to_string())).collect(),
        }
    }
}

impl From<&[String]> for CommandInput {
    fn from(values: &[String]) -> Self {
        Self {
            entries: values.iter().cloned().map(Some).collect(),
        }
    }
}

impl<const N: usize> From<[&str; N]> for CommandInput {
    fn from(values: [&str; N]) -> Self {
        Self::from(values.as_slice())
    }
}

impl From<&Command> for CommandInput {
    fn from(value: &Command) -> Self {
        Self::from(value.as_str())
    }
}

impl From<Command> for CommandInput {
    fn from(value: Command) -> Self {
        Self::from(value.0)
    }
}

/// Flatten caller input into an ordered batch.
///
/// Every entry is split on `;` and line breaks, segments are trimmed,
/// blanks are dropped and each survivor gets the `AT` prefix.
pub fn normalize_commands(input: impl Into<CommandInput>) -> CommandBatch {
    let input = input.into();
    let mut commands = Vec::new();

    for entry in input.entries.iter().flatten() {
        let sanitized = sanitize(entry.as_str());
        if sanitized.is_empty() {
            continue;
        }

        commands.extend(
            sanitized
                .split(|c: char| c == ';' || c == '\r' || c == '\n')
                .filter_map(Command::parse),
        );
    }

    CommandBatch { commands }
}
