//! Gcode command model: line parsing and lossless serialization
//!
//! One line of slicer output maps to one [`Command`]. The interpreted command
//! set is closed (see [`CommandName`]); everything else is carried through as
//! an opaque token so unknown dialect extensions survive a processing run
//! byte-for-byte.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

/// Parameter key used to store a trailing line comment.
pub const COMMENT_KEY: &str = ";";

/// The command token of a gcode line.
///
/// Commands the pipeline interprets semantically get their own variant;
/// every other token is preserved in [`CommandName::Other`]. Comment-only
/// and blank lines carry a sentinel so they flow through the pipeline
/// without being mistaken for machine instructions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CommandName {
    /// G0 - travel move
    RapidMove,
    /// G1 - print move
    LinearMove,
    /// G92 - set current position without moving
    SetPosition,
    /// G90 - absolute XYZ positioning
    AbsolutePositioning,
    /// G91 - relative XYZ positioning
    RelativePositioning,
    /// M82 - absolute extrusion
    AbsoluteExtrusion,
    /// M83 - relative extrusion
    RelativeExtrusion,
    /// M106 - set part-cooling fan duty
    SetFanSpeed,
    /// M107 - part-cooling fan off
    FanOff,
    /// Comment-only line
    Comment,
    /// Empty line
    Blank,
    /// Any command outside the interpreted set, upper-cased
    Other(String),
}

impl CommandName {
    /// Classify a single leading token.
    pub fn from_token(token: &str) -> Self {
        if token.is_empty() {
            return Self::Blank;
        }
        if token.starts_with(';') {
            return Self::Comment;
        }
        match token.to_ascii_uppercase().as_str() {
            "G0" => Self::RapidMove,
            "G1" => Self::LinearMove,
            "G92" => Self::SetPosition,
            "G90" => Self::AbsolutePositioning,
            "G91" => Self::RelativePositioning,
            "M82" => Self::AbsoluteExtrusion,
            "M83" => Self::RelativeExtrusion,
            "M106" => Self::SetFanSpeed,
            "M107" => Self::FanOff,
            other => Self::Other(other.to_string()),
        }
    }

    /// The wire token for this command, empty for the blank sentinel.
    pub fn as_str(&self) -> &str {
        match self {
            Self::RapidMove => "G0",
            Self::LinearMove => "G1",
            Self::SetPosition => "G92",
            Self::AbsolutePositioning => "G90",
            Self::RelativePositioning => "G91",
            Self::AbsoluteExtrusion => "M82",
            Self::RelativeExtrusion => "M83",
            Self::SetFanSpeed => "M106",
            Self::FanOff => "M107",
            Self::Comment => COMMENT_KEY,
            Self::Blank => "",
            Self::Other(token) => token,
        }
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Insertion-ordered gcode parameter map.
///
/// Keys are case-insensitive and upper-cased on ingestion. Re-inserting an
/// existing key replaces its value in place, preserving the original
/// position, so serialization reproduces the source ordering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    entries: Vec<(String, String)>,
}

impl Parameters {
    /// Create an empty parameter map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a parameter.
    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        let key = key.to_ascii_uppercase();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Look up a parameter value, case-insensitively.
    pub fn get(&self, key: &str) -> Option<&str> {
        let key = key.to_ascii_uppercase();
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Look up a parameter and parse it as a number.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|v| v.parse::<f64>().ok())
    }

    /// Whether the key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One line of gcode: a command token plus its ordered parameters.
///
/// Parsing never fails; a line that carries no recognizable token becomes an
/// inert [`CommandName::Blank`] command that no simulator reacts to.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// The command token (or comment/blank sentinel).
    pub name: CommandName,
    /// Ordered parameter map; a trailing comment lives under [`COMMENT_KEY`].
    pub parameters: Parameters,
    /// Original text, kept when the line was parsed in name-only mode so it
    /// can be re-emitted verbatim.
    raw_text: Option<String>,
}

impl Command {
    /// Create a command with no parameters.
    pub fn new(name: CommandName) -> Self {
        Self {
            name,
            parameters: Parameters::new(),
            raw_text: None,
        }
    }

    /// Parse one line of gcode.
    ///
    /// With `command_only` set, only the leading token is classified and the
    /// original text is retained for verbatim re-emission. This is the fast
    /// path for commands no pipe interprets. Otherwise the line is split on
    /// single spaces: a token starting with `;` opens a trailing comment that
    /// absorbs the rest of the line, `KEY=VALUE` tokens keep their explicit
    /// separator, and any other token is a single-character key followed
    /// immediately by its value (the two common slicer parameter dialects).
    pub fn parse(line: &str, command_only: bool) -> Self {
        if command_only {
            return Self::parse_name_only(line);
        }

        let trimmed = line.trim();
        let mut tokens = trimmed.split(' ');
        let first = tokens.next().unwrap_or("");
        let name = CommandName::from_token(first);

        let mut parameters = Parameters::new();
        let mut comment: Option<String> = if name == CommandName::Comment {
            Some(first[1..].to_string())
        } else {
            None
        };

        for token in tokens {
            if let Some(text) = comment.as_mut() {
                text.push(' ');
                text.push_str(token);
            } else if let Some(rest) = token.strip_prefix(';') {
                comment = Some(rest.to_string());
            } else if let Some((key, value)) = token.split_once('=') {
                parameters.insert(key, value);
            } else if !token.is_empty() {
                let (key, value) = token.split_at(1);
                parameters.insert(key, value);
            }
        }

        if let Some(text) = comment {
            parameters.insert(COMMENT_KEY, text);
        }

        Self {
            name,
            parameters,
            raw_text: None,
        }
    }

    /// Name-only fast path: classify the leading token with a single match
    /// and keep the raw line.
    fn parse_name_only(line: &str) -> Self {
        static TOKEN_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex = TOKEN_REGEX
            .get_or_init(|| Regex::new(r"^\s*(;|[^\s;]+)").expect("invalid regex pattern"));

        let name = match regex.captures(line) {
            Some(caps) => CommandName::from_token(&caps[1]),
            None => CommandName::Blank,
        };

        Self {
            name,
            parameters: Parameters::new(),
            raw_text: Some(line.to_string()),
        }
    }

    /// Whether this command was parsed in name-only mode.
    pub fn is_raw(&self) -> bool {
        self.raw_text.is_some()
    }

    /// Serialize back to one terminated gcode line.
    ///
    /// A raw command is re-emitted verbatim (trimmed, one newline). Anything
    /// else is rebuilt from the name and parameters: bare keys stay bare,
    /// single-character keys concatenate their value, longer keys keep the
    /// `=` separator, and a comment parameter is rendered behind its marker.
    pub fn serialize(&self) -> String {
        if let Some(raw) = &self.raw_text {
            return format!("{}\n", raw.trim());
        }

        let mut parts: Vec<String> = Vec::new();
        match &self.name {
            CommandName::Comment | CommandName::Blank => {}
            name => parts.push(name.to_string()),
        }

        for (key, value) in self.parameters.iter() {
            if key == COMMENT_KEY {
                parts.push(format!(";{}", value));
            } else if value.is_empty() {
                parts.push(key.to_string());
            } else if key.chars().count() == 1 {
                parts.push(format!("{}{}", key, value));
            } else {
                parts.push(format!("{}={}", key, value));
            }
        }

        let mut line = parts.join(" ");
        line.push('\n');
        line
    }

    /// Shorthand for a numeric parameter lookup.
    pub fn arg_f64(&self, key: &str) -> Option<f64> {
        self.parameters.get_f64(key)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.serialize().trim_end())
    }
}
