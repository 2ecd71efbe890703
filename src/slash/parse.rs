use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

use crate::slash::scanner::{KEY_VALUE_DELIM, find_next_key_start, trim_boundary};

/// Upper bound on `key = value` pairs accepted in one invocation.
pub const MAX_PARAM_PAIRS: usize = 32;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ParseErrorKind {
    MissingValue,
    TooManyPairs,
}

impl ParseErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ParseErrorKind::MissingValue => "missing-value",
            ParseErrorKind::TooManyPairs => "too-many-pairs",
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
}

impl ParseError {
    fn missing_value(key: &str) -> Self {
        ParseError {
            kind: ParseErrorKind::MissingValue,
            message: format!("no value for key '{key}'"),
        }
    }

    fn too_many_pairs() -> Self {
        ParseError {
            kind: ParseErrorKind::TooManyPairs,
            message: format!("more than {MAX_PARAM_PAIRS} key/value pairs"),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)
    }
}

impl std::error::Error for ParseError {}

/// Casing applied to parameter values. Keys are always lower-cased.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ValueCasing {
    Preserve,
    Lowercase,
}

impl Default for ValueCasing {
    fn default() -> Self {
        Self::Preserve
    }
}

impl ValueCasing {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "preserve" => Some(Self::Preserve),
            "lowercase" => Some(Self::Lowercase),
            _ => None,
        }
    }

    fn apply(self, value: &str) -> String {
        match self {
            Self::Preserve => value.to_string(),
            Self::Lowercase => value.to_lowercase(),
        }
    }
}

/// Splits invocation text into command-path words and the key/value remainder.
///
/// The remainder is a slice of the trimmed input: empty when the text is
/// words only, the whole text when it opens with a pair.
pub fn split_command_path(text: &str) -> (Vec<String>, &str) {
    let trimmed = trim_boundary(text);
    match find_next_key_start(trimmed) {
        Some(0) => (Vec::new(), trimmed),
        Some(idx) => {
            let words = collect_words(&trimmed[..idx]);
            (words, &trimmed[idx..])
        }
        None => (collect_words(trimmed), ""),
    }
}

fn collect_words(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

/// Extracts `key = value` pairs from the remainder of an invocation.
///
/// Keys are trimmed and lower-cased; a repeated key keeps its last value.
/// Values are trimmed and run through `casing`. A key with nothing after its
/// delimiter is an error, as is input still holding a parseable pair once
/// `MAX_PARAM_PAIRS` pairs were read.
pub fn parse_params(
    text: &str,
    casing: ValueCasing,
) -> Result<BTreeMap<String, String>, ParseError> {
    let mut params = BTreeMap::new();
    let mut rest = trim_boundary(text);
    for _ in 0..MAX_PARAM_PAIRS {
        let Some(delim) = rest.find(KEY_VALUE_DELIM) else {
            return Ok(params);
        };
        let key = trim_boundary(&rest[..delim]).to_lowercase();
        rest = trim_boundary(&rest[delim + KEY_VALUE_DELIM.len_utf8()..]);
        if rest.is_empty() {
            return Err(ParseError::missing_value(&key));
        }
        match find_next_key_start(rest) {
            None => {
                params.insert(key, casing.apply(rest));
                return Ok(params);
            }
            // The next pair begins immediately, so this key has no value.
            Some(0) => {
                params.insert(key, String::new());
            }
            Some(next) => {
                let value = trim_boundary(&rest[..next - 1]);
                params.insert(key, casing.apply(value));
                rest = &rest[next..];
            }
        }
    }
    if find_next_key_start(rest).is_some() {
        return Err(ParseError::too_many_pairs());
    }
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preserve(text: &str) -> BTreeMap<String, String> {
        parse_params(text, ValueCasing::Preserve).unwrap()
    }

    #[test]
    fn words_only_yields_path_and_empty_remainder() {
        let (words, rest) = split_command_path("get status now");
        assert_eq!(words, vec!["get", "status", "now"]);
        assert_eq!(rest, "");
    }

    #[test]
    fn single_word() {
        let (words, rest) = split_command_path("cmd1");
        assert_eq!(words, vec!["cmd1"]);
        assert_eq!(rest, "");
    }

    #[test]
    fn leading_pair_yields_empty_path() {
        let (words, rest) = split_command_path("title=test number 7");
        assert!(words.is_empty());
        assert_eq!(rest, "title=test number 7");
    }

    #[test]
    fn words_before_first_pair_become_the_path() {
        let (words, rest) = split_command_path("  new  title=fix the build  ");
        assert_eq!(words, vec!["new"]);
        assert_eq!(rest, "title=fix the build");
    }

    #[test]
    fn empty_input_yields_nothing() {
        let (words, rest) = split_command_path("   \r\n ");
        assert!(words.is_empty());
        assert_eq!(rest, "");
    }

    #[test]
    fn single_pair_with_spaced_value() {
        let params = preserve("title=test number 7");
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("title").map(String::as_str), Some("test number 7"));
    }

    #[test]
    fn two_pairs_with_comma_value() {
        let params = preserve("title=test number 7 labels=EPS, otherLabel");
        assert_eq!(params.len(), 2);
        assert_eq!(params.get("title").map(String::as_str), Some("test number 7"));
        assert_eq!(params.get("labels").map(String::as_str), Some("EPS, otherLabel"));
    }

    #[test]
    fn keys_are_lower_cased_and_trimmed() {
        let params = preserve("  TITLE = seven  ");
        assert_eq!(params.get("title").map(String::as_str), Some("seven"));
    }

    #[test]
    fn repeated_key_keeps_the_last_value() {
        let params = preserve("env=dev env=prod");
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("env").map(String::as_str), Some("prod"));
    }

    #[test]
    fn interior_newlines_are_separators() {
        let params = preserve("title \n = \n test number 7 \n labels \n = \n EPS, x \n");
        assert_eq!(params.len(), 2);
        assert_eq!(params.get("title").map(String::as_str), Some("test number 7"));
        assert_eq!(params.get("labels").map(String::as_str), Some("EPS, x"));
    }

    #[test]
    fn newline_only_separation_between_pairs() {
        let params = preserve("title=test\nlabels=EPS");
        assert_eq!(params.get("title").map(String::as_str), Some("test"));
        assert_eq!(params.get("labels").map(String::as_str), Some("EPS"));
    }

    #[test]
    fn lowercase_policy_applies_to_every_value() {
        let params = parse_params("title=Seven labels=EPS, Other", ValueCasing::Lowercase).unwrap();
        assert_eq!(params.get("title").map(String::as_str), Some("seven"));
        assert_eq!(params.get("labels").map(String::as_str), Some("eps, other"));
    }

    #[test]
    fn missing_value_is_an_error() {
        let err = parse_params("title=", ValueCasing::Preserve).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::MissingValue);
        assert!(err.message.contains("title"));
    }

    #[test]
    fn adjacent_pair_leaves_an_empty_value() {
        let params = preserve("a=b=c");
        assert_eq!(params.get("a").map(String::as_str), Some(""));
        assert_eq!(params.get("b").map(String::as_str), Some("c"));
    }

    #[test]
    fn empty_remainder_yields_no_params() {
        assert!(preserve("").is_empty());
        assert!(preserve("  \n ").is_empty());
    }

    #[test]
    fn pair_overflow_is_an_error() {
        let mut text = String::new();
        for i in 0..MAX_PARAM_PAIRS + 1 {
            text.push_str(&format!("key{i}=value{i} "));
        }
        let err = parse_params(&text, ValueCasing::Preserve).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::TooManyPairs);
    }

    #[test]
    fn exactly_max_pairs_parses() {
        let mut text = String::new();
        for i in 0..MAX_PARAM_PAIRS {
            text.push_str(&format!("key{i}=value{i} "));
        }
        let params = preserve(&text);
        assert_eq!(params.len(), MAX_PARAM_PAIRS);
    }

    #[test]
    fn every_character_lands_in_path_or_params() {
        let text = "new now title=test number 7 labels=EPS, x";
        let (words, rest) = split_command_path(text);
        let params = parse_params(rest, ValueCasing::Preserve).unwrap();
        let mut kept: Vec<char> = words.join("").chars().collect();
        for (key, value) in &params {
            kept.extend(key.chars());
            kept.extend(value.chars());
        }
        kept.retain(|ch| !ch.is_whitespace());
        kept.sort_unstable();
        let mut expected: Vec<char> = text
            .chars()
            .filter(|ch| !ch.is_whitespace() && *ch != '=')
            .collect();
        expected.sort_unstable();
        assert_eq!(kept, expected);
    }
}
