//! Channel patterns with named placeholders
//!
//! Patterns are matched against normalized channel names (tier prefix already
//! stripped). A pattern is a run of literal text and `{name}` placeholders:
//! - `orders` matches only `orders`
//! - `orders.{id}` matches `orders.17`, binding `id = "17"`
//! - `{team}-{room}.chat` matches `core-lobby.chat`
//!
//! A placeholder consumes the longest non-empty run of characters that are
//! not separators (`.` or `-`). There is no backtracking, so text following a
//! placeholder must begin with a separator.

use std::fmt;
use std::ops::Index;
use thiserror::Error;

fn is_separator(c: char) -> bool {
    c == '.' || c == '-'
}

fn is_valid_placeholder_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("channel pattern cannot be empty")]
    Empty,

    #[error("unclosed placeholder starting at byte {0}")]
    UnclosedPlaceholder(usize),

    #[error("unexpected '{ch}' at byte {pos}")]
    UnexpectedBrace { ch: char, pos: usize },

    #[error("invalid placeholder name '{0}': must match [a-zA-Z0-9_]+")]
    InvalidPlaceholder(String),

    #[error("placeholder '{0}' appears more than once")]
    DuplicatePlaceholder(String),

    #[error("placeholder '{0}' directly follows another placeholder")]
    AdjacentPlaceholders(String),

    #[error("placeholder '{name}' must be followed by '.' or '-', got '{literal}'")]
    UnseparatedPlaceholder { name: String, literal: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// Append a literal, refusing text a preceding placeholder would swallow
fn push_literal(segments: &mut Vec<Segment>, literal: &str) -> Result<(), PatternError> {
    if let Some(Segment::Placeholder(name)) = segments.last() {
        if !literal.starts_with(is_separator) {
            return Err(PatternError::UnseparatedPlaceholder {
                name: name.clone(),
                literal: literal.to_string(),
            });
        }
    }
    segments.push(Segment::Literal(literal.to_string()));
    Ok(())
}

/// A compiled channel pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelPattern {
    /// Pattern text as registered, used as the registry key
    source: String,
    segments: Vec<Segment>,
    placeholder_count: usize,
}

impl ChannelPattern {
    /// Parse and compile a pattern
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        if pattern.is_empty() {
            return Err(PatternError::Empty);
        }

        let mut segments = Vec::new();
        let mut names: Vec<&str> = Vec::new();
        let mut literal_start = 0;
        let mut chars = pattern.char_indices();

        while let Some((pos, ch)) = chars.next() {
            match ch {
                '{' => {
                    if literal_start < pos {
                        push_literal(&mut segments, &pattern[literal_start..pos])?;
                    }

                    let name_start = pos + 1;
                    let close = loop {
                        match chars.next() {
                            Some((end, '}')) => break end,
                            Some((inner, '{')) => {
                                return Err(PatternError::UnexpectedBrace { ch: '{', pos: inner })
                            }
                            Some(_) => continue,
                            None => return Err(PatternError::UnclosedPlaceholder(pos)),
                        }
                    };

                    let name = &pattern[name_start..close];
                    if name.is_empty() || !name.chars().all(is_valid_placeholder_char) {
                        return Err(PatternError::InvalidPlaceholder(name.to_string()));
                    }
                    if names.contains(&name) {
                        return Err(PatternError::DuplicatePlaceholder(name.to_string()));
                    }
                    if matches!(segments.last(), Some(Segment::Placeholder(_))) {
                        return Err(PatternError::AdjacentPlaceholders(name.to_string()));
                    }

                    names.push(name);
                    segments.push(Segment::Placeholder(name.to_string()));
                    literal_start = close + 1;
                }
                '}' => return Err(PatternError::UnexpectedBrace { ch: '}', pos }),
                _ => {}
            }
        }

        if literal_start < pattern.len() {
            push_literal(&mut segments, &pattern[literal_start..])?;
        }

        Ok(Self {
            source: pattern.to_string(),
            segments,
            placeholder_count: names.len(),
        })
    }

    /// Match a normalized channel name, binding placeholders left to right
    pub fn matches(&self, name: &str) -> Option<ChannelParams> {
        let mut rest = name;
        let mut bound = Vec::with_capacity(self.placeholder_count);

        for segment in &self.segments {
            match segment {
                Segment::Literal(literal) => {
                    rest = rest.strip_prefix(literal.as_str())?;
                }
                Segment::Placeholder(param) => {
                    let end = rest.find(is_separator).unwrap_or(rest.len());
                    if end == 0 {
                        return None;
                    }
                    bound.push((param.clone(), rest[..end].to_string()));
                    rest = &rest[end..];
                }
            }
        }

        rest.is_empty().then_some(ChannelParams { bound })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Placeholder names in pattern order
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// True when the pattern has no placeholders
    pub fn is_literal(&self) -> bool {
        self.placeholder_count == 0
    }
}

impl fmt::Display for ChannelPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

/// Parameters bound by a pattern match, in placeholder order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelParams {
    bound: Vec<(String, String)>,
}

impl ChannelParams {
    /// Look up a parameter by placeholder name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.bound
            .iter()
            .find(|(param, _)| param == name)
            .map(|(_, value)| value.as_str())
    }

    /// Bound values in placeholder order
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.bound.iter().map(|(_, value)| value.as_str())
    }

    /// `(name, value)` pairs in placeholder order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bound.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.bound.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }
}

impl Index<usize> for ChannelParams {
    type Output = str;

    fn index(&self, index: usize) -> &str {
        &self.bound[index].1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_parse_valid() {
        assert!(ChannelPattern::parse("test").is_ok());
        assert!(ChannelPattern::parse("test.{param}").is_ok());
        assert!(ChannelPattern::parse("{a}-{b}.{c}").is_ok());
        assert!(ChannelPattern::parse("user_{id}").is_ok());
    }

    #[test]
    fn test_pattern_parse_invalid() {
        assert_eq!(ChannelPattern::parse(""), Err(PatternError::Empty));
        assert_eq!(
            ChannelPattern::parse("test.{id"),
            Err(PatternError::UnclosedPlaceholder(5))
        );
        assert_eq!(
            ChannelPattern::parse("test.id}"),
            Err(PatternError::UnexpectedBrace { ch: '}', pos: 7 })
        );
        assert!(matches!(
            ChannelPattern::parse("test.{a{b}}"),
            Err(PatternError::UnexpectedBrace { ch: '{', .. })
        ));
        assert_eq!(
            ChannelPattern::parse("test.{}"),
            Err(PatternError::InvalidPlaceholder(String::new()))
        );
        assert_eq!(
            ChannelPattern::parse("test.{a b}"),
            Err(PatternError::InvalidPlaceholder("a b".to_string()))
        );
        assert_eq!(
            ChannelPattern::parse("{a}.{a}"),
            Err(PatternError::DuplicatePlaceholder("a".to_string()))
        );
        assert_eq!(
            ChannelPattern::parse("{a}{b}"),
            Err(PatternError::AdjacentPlaceholders("b".to_string()))
        );
    }

    #[test]
    fn test_literal_pattern_exact_match() {
        let pattern = ChannelPattern::parse("test").unwrap();
        assert!(pattern.is_literal());

        let params = pattern.matches("test").unwrap();
        assert!(params.is_empty());

        assert!(pattern.matches("test2").is_none());
        assert!(pattern.matches("tes").is_none());
        assert!(pattern.matches("private-test").is_none());
    }

    #[test]
    fn test_literal_dots_are_not_wildcards() {
        let pattern = ChannelPattern::parse("abcd.efgh").unwrap();
        assert!(pattern.matches("abcd.efgh").is_some());
        assert!(pattern.matches("abcdxefgh").is_none());
    }

    #[test]
    fn test_placeholder_binding() {
        let pattern = ChannelPattern::parse("orders.{id}").unwrap();
        let params = pattern.matches("orders.17").unwrap();

        assert_eq!(params.len(), 1);
        assert_eq!(params.get("id"), Some("17"));
        assert_eq!(&params[0], "17");
    }

    #[test]
    fn test_placeholder_stops_at_separators() {
        let pattern = ChannelPattern::parse("orders.{id}").unwrap();
        assert!(pattern.matches("orders.17.items").is_none());
        assert!(pattern.matches("orders.17-b").is_none());
        assert!(pattern.matches("orders.").is_none());
    }

    #[test]
    fn test_multiple_placeholders_in_order() {
        let pattern = ChannelPattern::parse("{a}-{b}.{c}").unwrap();
        let params = pattern.matches("core-lobby.chat").unwrap();

        let values: Vec<&str> = params.values().collect();
        assert_eq!(values, vec!["core", "lobby", "chat"]);

        let names: Vec<&str> = pattern.placeholders().collect();
        assert_eq!(names, vec!["a", "b", "c"]);

        let pairs: Vec<(&str, &str)> = params.iter().collect();
        assert_eq!(pairs, vec![("a", "core"), ("b", "lobby"), ("c", "chat")]);
    }

    #[test]
    fn test_placeholder_must_end_at_separator() {
        // A placeholder would swallow "x", so the pattern could never match
        assert_eq!(
            ChannelPattern::parse("room{id}x"),
            Err(PatternError::UnseparatedPlaceholder {
                name: "id".to_string(),
                literal: "x".to_string(),
            })
        );
        assert!(matches!(
            ChannelPattern::parse("orders_{id}_open"),
            Err(PatternError::UnseparatedPlaceholder { .. })
        ));

        let pattern = ChannelPattern::parse("orders_{id}.open").unwrap();
        assert_eq!(pattern.matches("orders_5.open").unwrap().get("id"), Some("5"));

        let pattern = ChannelPattern::parse("user_{id}").unwrap();
        assert_eq!(pattern.matches("user_42").unwrap().get("id"), Some("42"));
    }

    #[test]
    fn test_display_round_trips_source() {
        let pattern = ChannelPattern::parse("{a}-{b}.{c}").unwrap();
        assert_eq!(pattern.to_string(), "{a}-{b}.{c}");
        assert_eq!(pattern.as_str(), "{a}-{b}.{c}");
    }
}
