//! Oracle seam: decides whether every strategy agrees on one input.
//!
//! An [`Oracle`] builds one [`Tester`] per regexp. The orchestrator only
//! sees these traits; [`DifferentialOracle`] is the implementation that
//! checks the production engines against the reference backtracker.

use rexhaust_core::{Anchor, AutomataSet, Backtracker, EngineKind, Semantics, Span};
use serde::Serialize;
use thiserror::Error;

use crate::corpus::render_record;

/// The regexp could not be turned into a tester. The orchestrator skips
/// such regexps without counting a failure.
#[derive(Debug, Error)]
#[error("cannot test {regexp:?}: {reason}")]
pub struct BuildError {
    pub regexp: String,
    pub reason: String,
}

/// Details of the first disagreement seen for an input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    pub engine: EngineKind,
    pub anchor: Anchor,
    pub semantics: Semantics,
    pub expected: String,
    pub actual: String,
}

pub trait Oracle {
    type Tester: Tester;

    fn tester(&self, regexp: &str) -> Result<Self::Tester, BuildError>;
}

pub trait Tester {
    /// True when every strategy agrees on `input`.
    fn test_input(&mut self, input: &[u8]) -> bool;

    /// Why the last failing input failed, when the tester can say.
    fn mismatch(&self) -> Option<&Mismatch> {
        None
    }
}

/// Compares the `regex-automata` engines and the `regex` crate with the
/// reference backtracker.
#[derive(Debug, Clone, Copy, Default)]
pub struct DifferentialOracle;

impl Oracle for DifferentialOracle {
    type Tester = DifferentialTester;

    fn tester(&self, regexp: &str) -> Result<DifferentialTester, BuildError> {
        let fail = |err: rexhaust_core::EngineError| BuildError {
            regexp: regexp.to_string(),
            reason: err.to_string(),
        };
        Ok(DifferentialTester {
            reference: Backtracker::new(regexp).map_err(fail)?,
            automata: AutomataSet::new(regexp).map_err(fail)?,
            last: None,
        })
    }
}

#[derive(Debug)]
pub struct DifferentialTester {
    reference: Backtracker,
    automata: AutomataSet,
    last: Option<Mismatch>,
}

fn render_span(span: Option<Span>) -> String {
    span.map_or_else(|| "-".to_string(), |s| s.to_string())
}

impl DifferentialTester {
    fn check(&mut self, input: &[u8], anchor: Anchor) -> Option<Mismatch> {
        let first = self.reference.search(input, anchor, Semantics::LeftmostFirst);
        for (engine, record) in self.automata.captures(input, anchor) {
            if record != first {
                return Some(Mismatch {
                    engine,
                    anchor,
                    semantics: Semantics::LeftmostFirst,
                    expected: render_record(&first),
                    actual: render_record(&record),
                });
            }
        }
        for (engine, span) in self.automata.spans(input, anchor) {
            if span != first.whole() {
                return Some(Mismatch {
                    engine,
                    anchor,
                    semantics: Semantics::LeftmostFirst,
                    expected: render_span(first.whole()),
                    actual: render_span(span),
                });
            }
        }

        let longest = self.reference.search(input, anchor, Semantics::Longest);
        match (first.whole(), longest.whole()) {
            (None, None) => None,
            (Some(f), Some(l)) if f.start == l.start && l.end >= f.end => {
                match self.automata.longest_end(input, anchor, l.start) {
                    Some(end) if end != Some(l.end) => Some(Mismatch {
                        engine: EngineKind::AllMatchDfa,
                        anchor,
                        semantics: Semantics::Longest,
                        expected: l.end.to_string(),
                        actual: end.map_or_else(|| "-".to_string(), |e| e.to_string()),
                    }),
                    _ => None,
                }
            }
            // Longest must start where leftmost-first starts and end no
            // earlier.
            (_, l) => Some(Mismatch {
                engine: EngineKind::Reference,
                anchor,
                semantics: Semantics::Longest,
                expected: render_span(first.whole()),
                actual: render_span(l),
            }),
        }
    }
}

impl Tester for DifferentialTester {
    fn test_input(&mut self, input: &[u8]) -> bool {
        self.last = None;
        for anchor in Anchor::ALL {
            if let Some(mismatch) = self.check(input, anchor) {
                self.last = Some(mismatch);
                return false;
            }
        }
        true
    }

    fn mismatch(&self) -> Option<&Mismatch> {
        self.last.as_ref()
    }
}
