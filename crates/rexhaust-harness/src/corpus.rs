//! Corpus interchange format: rendering, parsing and replay.
//!
//! ```text
//! strings
//! ""
//! "a"
//! regexps
//! "(?:a*)"
//! 0-0;0-0;0-0;0-0
//! 0-1;0-1;0-1;0-1
//! ```
//!
//! After the `strings` header come the escaped candidate strings, one per
//! line. After the `regexps` header, every escaped regexp is followed by one
//! record line per string, holding four `;`-separated [`MatchRecord`]
//! renderings in [`RECORD_MODES`] order.

use rexhaust_core::{Anchor, CompiledQuery, MatchRecord, QueryEngine, Semantics, Span};
use thiserror::Error;

use crate::escape::{UnescapeError, escape_truncated, unescape};
use crate::report::{ReplayFailure, ReplayReport};

pub const STRINGS_HEADER: &str = "strings";
pub const REGEXPS_HEADER: &str = "regexps";

/// Query modes of the four fields of a record line, in order.
pub const RECORD_MODES: [(Anchor, Semantics); 4] = [
    (Anchor::Both, Semantics::LeftmostFirst),
    (Anchor::Unanchored, Semantics::LeftmostFirst),
    (Anchor::Both, Semantics::Longest),
    (Anchor::Unanchored, Semantics::Longest),
];

/// Most failing cases kept in a [`ReplayReport`].
const MAX_REPORTED_FAILURES: usize = 32;

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("line {line}: {source}")]
    Unescape {
        line: usize,
        #[source]
        source: UnescapeError,
    },
    #[error("line {line}: expected {expected:?} header")]
    MissingHeader { line: usize, expected: &'static str },
    #[error("line {line}: expected 4 fields, found {got}")]
    FieldCount { line: usize, got: usize },
    #[error("line {line}: bad match record {text:?}")]
    BadRecord { line: usize, text: String },
    #[error("line {line}: regexp is not UTF-8")]
    NotUtf8 { line: usize },
    #[error("regexp {regexp:?} has {got} record lines, expected {expected}")]
    Truncated {
        regexp: String,
        expected: usize,
        got: usize,
    },
}

/// Render one record: `-` for no match, else one token per group.
#[must_use]
pub fn render_record(record: &MatchRecord) -> String {
    match record {
        MatchRecord::NoMatch => "-".to_string(),
        MatchRecord::Groups(groups) => groups
            .iter()
            .map(|group| match group {
                Some(span) => span.to_string(),
                None => "-".to_string(),
            })
            .collect::<Vec<_>>()
            .join(" "),
    }
}

/// Invert [`render_record`]. `line` is only used in errors.
pub fn parse_record(text: &str, line: usize) -> Result<MatchRecord, CorpusError> {
    let bad = || CorpusError::BadRecord {
        line,
        text: text.to_string(),
    };
    if text == "-" {
        return Ok(MatchRecord::NoMatch);
    }
    let mut groups = Vec::new();
    for token in text.split(' ') {
        if token == "-" {
            groups.push(None);
            continue;
        }
        let (start, end) = token.split_once('-').ok_or_else(bad)?;
        let start: usize = start.parse().map_err(|_| bad())?;
        let end: usize = end.parse().map_err(|_| bad())?;
        if start > end {
            return Err(bad());
        }
        groups.push(Some(Span::new(start, end)));
    }
    if groups.first().is_none_or(Option::is_none) {
        return Err(bad());
    }
    Ok(MatchRecord::Groups(groups))
}

/// Render the four-field record line for `haystack`. A regexp that did not
/// compile renders as no match in every field.
pub fn render_line<C: CompiledQuery>(compiled: Option<&C>, haystack: &[u8]) -> String {
    RECORD_MODES
        .iter()
        .map(|&(anchor, semantics)| match compiled {
            Some(re) => render_record(&re.query(haystack, anchor, semantics)),
            None => render_record(&MatchRecord::NoMatch),
        })
        .collect::<Vec<_>>()
        .join(";")
}

/// One regexp and its expected records, one entry per corpus string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusCase {
    pub regexp: String,
    pub records: Vec<[MatchRecord; 4]>,
}

/// A parsed corpus.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corpus {
    pub strings: Vec<Vec<u8>>,
    pub cases: Vec<CorpusCase>,
}

impl Corpus {
    /// Parse exported corpus bytes. Empty input is an empty corpus.
    pub fn parse(bytes: &[u8]) -> Result<Self, CorpusError> {
        let mut lines: Vec<&[u8]> = bytes.split(|&b| b == b'\n').collect();
        if lines.last().is_some_and(|last| last.is_empty()) {
            lines.pop();
        }
        if lines.is_empty() {
            return Ok(Self::default());
        }
        let mut lines = lines.into_iter().enumerate().map(|(i, l)| (i + 1, l)).peekable();

        expect_header(lines.next(), STRINGS_HEADER)?;
        let mut strings = Vec::new();
        while let Some((line, text)) = lines.next_if(|(_, text)| *text != REGEXPS_HEADER.as_bytes()) {
            strings.push(unescape(text).map_err(|source| CorpusError::Unescape { line, source })?);
        }
        expect_header(lines.next(), REGEXPS_HEADER)?;

        let mut cases = Vec::new();
        while let Some((line, text)) = lines.next() {
            let raw = unescape(text).map_err(|source| CorpusError::Unescape { line, source })?;
            let regexp = String::from_utf8(raw).map_err(|_| CorpusError::NotUtf8 { line })?;
            let mut records = Vec::with_capacity(strings.len());
            for got in 0..strings.len() {
                let Some((line, text)) = lines.next() else {
                    return Err(CorpusError::Truncated {
                        regexp,
                        expected: strings.len(),
                        got,
                    });
                };
                records.push(parse_line(text, line)?);
            }
            cases.push(CorpusCase { regexp, records });
        }
        Ok(Self { strings, cases })
    }
}

fn expect_header(
    next: Option<(usize, &[u8])>,
    expected: &'static str,
) -> Result<(), CorpusError> {
    match next {
        Some((_, text)) if text == expected.as_bytes() => Ok(()),
        Some((line, _)) => Err(CorpusError::MissingHeader { line, expected }),
        None => Err(CorpusError::MissingHeader { line: 0, expected }),
    }
}

fn parse_line(text: &[u8], line: usize) -> Result<[MatchRecord; 4], CorpusError> {
    let text = std::str::from_utf8(text).map_err(|_| CorpusError::BadRecord {
        line,
        text: String::from_utf8_lossy(text).into_owned(),
    })?;
    let fields: Vec<&str> = text.split(';').collect();
    let [a, b, c, d] = fields.as_slice() else {
        return Err(CorpusError::FieldCount {
            line,
            got: fields.len(),
        });
    };
    Ok([
        parse_record(a, line)?,
        parse_record(b, line)?,
        parse_record(c, line)?,
        parse_record(d, line)?,
    ])
}

/// Re-run every recorded query against `engine` and compare.
pub fn replay<E: QueryEngine>(corpus: &Corpus, engine: &E, title: &str) -> ReplayReport {
    let mut total = 0;
    let mut failed = 0;
    let mut failures = Vec::new();
    for case in &corpus.cases {
        let compiled = engine.compile(&case.regexp).ok();
        for (input, expected) in corpus.strings.iter().zip(&case.records) {
            for (&(anchor, semantics), want) in RECORD_MODES.iter().zip(expected) {
                total += 1;
                let got = match &compiled {
                    Some(re) => re.query(input, anchor, semantics),
                    None => MatchRecord::NoMatch,
                };
                if &got == want {
                    continue;
                }
                failed += 1;
                if failures.len() < MAX_REPORTED_FAILURES {
                    failures.push(ReplayFailure {
                        regexp: case.regexp.clone(),
                        input: String::from_utf8_lossy(&escape_truncated(input)).into_owned(),
                        anchor,
                        semantics,
                        expected: render_record(want),
                        actual: render_record(&got),
                    });
                }
            }
        }
    }
    ReplayReport::new(title, corpus.cases.len(), total, failed, failures)
}
