//! Matching engines and the match-query API.
//!
//! [`QueryEngine`] is the seam used by corpus export and replay: compile a
//! regexp once, then ask for the [`MatchRecord`] of any input under any
//! [`Anchor`] x [`Semantics`] combination. [`ReferenceEngine`] answers
//! queries with the in-crate [`Backtracker`]; [`AutomataSet`] wraps the
//! production engines from `regex-automata` and `regex` for differential
//! checks.

mod automata;
mod backtrack;
mod program;

use std::fmt;

use regex_automata::util::syntax;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use automata::AutomataSet;
pub use backtrack::{Backtracker, ReferenceEngine};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("parse error: {0}")]
    Parse(String),
    #[error("unsupported construct: {0}")]
    Unsupported(String),
}

/// Where a match may occur in the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    /// Anywhere in the input.
    Unanchored,
    /// Must span the entire input.
    Both,
}

impl Anchor {
    pub const ALL: [Anchor; 2] = [Anchor::Both, Anchor::Unanchored];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Semantics {
    /// Perl-style: the first alternative in priority order wins.
    LeftmostFirst,
    /// POSIX-style: leftmost start, then the longest end.
    Longest,
}

/// Half-open byte range `start..end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

impl From<regex_automata::Span> for Span {
    fn from(span: regex_automata::Span) -> Self {
        Self::new(span.start, span.end)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Outcome of one query: no match, or one optional span per capture group
/// (group 0 is the whole match and is always set).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchRecord {
    NoMatch,
    Groups(Vec<Option<Span>>),
}

impl MatchRecord {
    /// Span of the whole match.
    #[must_use]
    pub fn whole(&self) -> Option<Span> {
        match self {
            MatchRecord::NoMatch => None,
            MatchRecord::Groups(groups) => groups.first().copied().flatten(),
        }
    }

    #[must_use]
    pub fn is_match(&self) -> bool {
        matches!(self, MatchRecord::Groups(_))
    }
}

/// Identifies one matching strategy in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    Reference,
    Meta,
    PikeVm,
    Backtrack,
    OnePass,
    DenseDfa,
    LazyDfa,
    AllMatchDfa,
    RegexCrate,
}

impl EngineKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reference => "reference",
            Self::Meta => "meta",
            Self::PikeVm => "pikevm",
            Self::Backtrack => "backtrack",
            Self::OnePass => "onepass",
            Self::DenseDfa => "dense_dfa",
            Self::LazyDfa => "lazy_dfa",
            Self::AllMatchDfa => "all_match_dfa",
            Self::RegexCrate => "regex",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compiles regexps into queryable programs.
pub trait QueryEngine {
    type Compiled: CompiledQuery;

    fn compile(&self, pattern: &str) -> Result<Self::Compiled, EngineError>;
}

/// A compiled regexp that can answer match queries.
pub trait CompiledQuery {
    /// Number of capture groups, including group 0.
    fn group_len(&self) -> usize;

    fn query(&self, haystack: &[u8], anchor: Anchor, semantics: Semantics) -> MatchRecord;
}

/// Byte-oriented syntax shared by every engine: Unicode off, arbitrary
/// bytes allowed.
pub(crate) fn syntax_config() -> syntax::Config {
    syntax::Config::new().unicode(false).utf8(false)
}

pub(crate) fn parse(pattern: &str) -> Result<regex_syntax::hir::Hir, EngineError> {
    regex_syntax::ParserBuilder::new()
        .unicode(false)
        .utf8(false)
        .build()
        .parse(pattern)
        .map_err(|err| EngineError::Parse(err.to_string()))
}
