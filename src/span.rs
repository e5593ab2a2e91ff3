//! Locating a section of the assembled text between two markers.
//!
//! The start marker is searched for first; the end marker is searched for
//! after the end of the start match, in both literal and regex mode. A
//! missing end marker degrades to "until end of document" with a warning; a
//! missing start marker is reported on the [`Span`] rather than as an error.

use std::ops::Range;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::Result;

const START_NOT_FOUND: &str = "start marker not found; adjust the start pattern";
const END_NOT_FOUND: &str = "end marker not found; matched to end of document";
const START_EMPTY: &str = "start pattern is empty; no section located";

/// A start or end marker as given by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSpec {
    /// Literal text or regular expression
    pub pattern: String,
    /// Interpret `pattern` as a regular expression
    pub is_regex: bool,
}

impl MatchSpec {
    /// Create a marker.
    pub fn new(pattern: impl Into<String>, is_regex: bool) -> Self {
        Self {
            pattern: pattern.into(),
            is_regex,
        }
    }

    /// A literal (substring) marker.
    pub fn literal(pattern: impl Into<String>) -> Self {
        Self::new(pattern, false)
    }

    /// A regular-expression marker, matched with `^`/`$` at line boundaries.
    pub fn regex(pattern: impl Into<String>) -> Self {
        Self::new(pattern, true)
    }

    /// Whether the pattern is empty. Whitespace is a valid marker.
    pub fn is_empty(&self) -> bool {
        self.pattern.is_empty()
    }

    fn compile(&self) -> Result<Matcher> {
        if self.is_regex {
            let re = RegexBuilder::new(&self.pattern).multi_line(true).build()?;
            Ok(Matcher::Regex(re))
        } else {
            Ok(Matcher::Literal(self.pattern.clone()))
        }
    }
}

#[derive(Debug, Clone)]
enum Matcher {
    Literal(String),
    Regex(Regex),
}

impl Matcher {
    /// First match at or after byte offset `from`.
    fn find_from(&self, text: &str, from: usize) -> Option<Range<usize>> {
        match self {
            Matcher::Literal(needle) => text
                .get(from..)?
                .find(needle.as_str())
                .map(|i| from + i..from + i + needle.len()),
            // `find_at` keeps the surrounding text visible, so `^` and `\b`
            // still see what precedes `from`.
            Matcher::Regex(re) => re.find_at(text, from).map(|m| m.range()),
        }
    }
}

/// Half-open byte range `[start, end)` of the located section.
///
/// `start == None` means the start marker was not found; `end` is then
/// `None` as well. Once `start` is present `end` always is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    /// Offset of the start marker
    pub start: Option<usize>,
    /// Offset of the end marker, or the text length
    pub end: Option<usize>,
    /// Informational message for the caller
    pub warning: Option<String>,
}

impl Span {
    fn not_found() -> Self {
        Self::unlocated(START_NOT_FOUND)
    }

    fn unlocated(warning: &str) -> Self {
        Self {
            start: None,
            end: None,
            warning: Some(warning.to_string()),
        }
    }

    /// Whether the start marker was found.
    pub fn is_found(&self) -> bool {
        self.start.is_some()
    }

    /// The located range, if any.
    pub fn range(&self) -> Option<Range<usize>> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Some(start..end),
            _ => None,
        }
    }

    /// The located section of `text`, byte for byte.
    pub fn slice<'a>(&self, text: &'a str) -> Option<&'a str> {
        text.get(self.range()?)
    }
}

/// Compiled start/end markers, reusable across documents.
#[derive(Debug, Clone)]
pub struct SpanLocator {
    start: Option<Matcher>,
    end: Option<Matcher>,
}

impl SpanLocator {
    /// Compile the markers.
    ///
    /// An empty end marker counts as no end marker. An empty start marker
    /// compiles, but never locates a section.
    pub fn new(start: &MatchSpec, end: Option<&MatchSpec>) -> Result<Self> {
        let start = if start.is_empty() {
            None
        } else {
            Some(start.compile()?)
        };
        let end = match end {
            Some(spec) if !spec.is_empty() => Some(spec.compile()?),
            _ => None,
        };
        Ok(Self { start, end })
    }

    /// Locate the section in `text`. Never modifies or copies `text`.
    pub fn locate(&self, text: &str) -> Span {
        let Some(start_matcher) = &self.start else {
            log::warn!("{}", START_EMPTY);
            return Span::unlocated(START_EMPTY);
        };
        if text.is_empty() {
            return Span::not_found();
        }

        let Some(start) = start_matcher.find_from(text, 0) else {
            log::debug!("start marker not found in {} bytes", text.len());
            return Span::not_found();
        };

        let Some(end_matcher) = &self.end else {
            return Span {
                start: Some(start.start),
                end: Some(text.len()),
                warning: None,
            };
        };

        match end_matcher.find_from(text, start.end) {
            Some(end) => Span {
                start: Some(start.start),
                end: Some(end.start),
                warning: None,
            },
            None => {
                log::warn!("{}", END_NOT_FOUND);
                Span {
                    start: Some(start.start),
                    end: Some(text.len()),
                    warning: Some(END_NOT_FOUND.to_string()),
                }
            }
        }
    }
}

/// Locate the section between `start` and `end` in `text`.
pub fn locate(text: &str, start: &MatchSpec, end: Option<&MatchSpec>) -> Result<Span> {
    Ok(SpanLocator::new(start, end)?.locate(text))
}
