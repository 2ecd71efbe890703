use std::collections::BTreeMap;

use serde::Serialize;

use crate::slash::parse::{self, ParseError, ValueCasing};

pub const HELP_WORD: &str = "help";

/// Ordered bare words preceding the first `key = value` pair.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CommandPath(Vec<String>);

impl CommandPath {
    pub fn new(words: Vec<String>) -> Self {
        CommandPath(words)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn words(&self) -> &[String] {
        &self.0
    }

    pub fn first(&self) -> Option<&str> {
        self.word(0)
    }

    pub fn word(&self, idx: usize) -> Option<&str> {
        self.0.get(idx).map(String::as_str)
    }

    /// Words from `idx` on; empty when `idx` is past the end.
    pub fn words_from(&self, idx: usize) -> &[String] {
        self.0.get(idx..).unwrap_or(&[])
    }

    pub fn join(&self, sep: &str) -> String {
        self.0.join(sep)
    }
}

/// Parameter map: lower-cased keys, trimmed values, last occurrence wins.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, String>);

impl Params {
    pub fn new(entries: BTreeMap<String, String>) -> Self {
        Params(entries)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn has(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn value_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.value(key).unwrap_or(default)
    }

    /// Splits a comma-separated value into trimmed, non-empty entries.
    pub fn values(&self, key: &str) -> Vec<String> {
        match self.value(key) {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(str::to_string)
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn int_value(&self, key: &str) -> Option<i64> {
        self.value(key).and_then(|raw| raw.parse().ok())
    }

    pub fn int_value_or(&self, key: &str, default: i64) -> i64 {
        self.int_value(key).unwrap_or(default)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A fully parsed slash-command invocation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ParsedCommand {
    pub path: CommandPath,
    pub params: Params,
}

impl ParsedCommand {
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        Self::parse_with(text, ValueCasing::default())
    }

    pub fn parse_with(text: &str, casing: ValueCasing) -> Result<Self, ParseError> {
        let (words, remainder) = parse::split_command_path(text);
        let params = parse::parse_params(remainder, casing)?;
        Ok(ParsedCommand {
            path: CommandPath::new(words),
            params: Params::new(params),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty() && self.params.is_empty()
    }

    /// Decides whether this invocation asks for help, and for which topic.
    ///
    /// `Some(&[])` is the root topic. A bare invocation, a lone `help`, or a
    /// lone word with no parameters all read as help requests; so does `help`
    /// at either end of a longer path, which asks about the remaining words.
    /// An empty path with parameters is a real invocation and never help.
    pub fn help_path(&self) -> Option<&[String]> {
        let words = self.path.words();
        match words {
            [] if self.params.is_empty() => Some(&[]),
            [] => None,
            [only] if only == HELP_WORD => Some(&[]),
            [_] if self.params.is_empty() => Some(words),
            _ => {
                let last = words.len() - 1;
                if words[0] == HELP_WORD {
                    Some(&words[1..])
                } else if words[last] == HELP_WORD {
                    Some(&words[..last])
                } else {
                    None
                }
            }
        }
    }
}
