//! Reference matcher: exhaustive backtracking over a [`Program`].
//!
//! Each `(state, offset)` pair is explored at most once per query, so a
//! search is bounded by `states * (len + 1)` steps even for nested empty
//! loops. A pair that was already explored from an earlier start offset led
//! nowhere, so the memo is kept across start offsets too.

use regex_automata::util::look::LookMatcher;

use super::program::{Inst, Program, StateId};
use super::{Anchor, CompiledQuery, EngineError, MatchRecord, QueryEngine, Semantics, Span};

#[derive(Debug, Clone, Copy)]
enum Frame {
    Step { pc: StateId, at: usize },
    Restore { slot: usize, old: Option<usize> },
}

/// A compiled regexp that is searched by backtracking.
#[derive(Debug, Clone)]
pub struct Backtracker {
    program: Program,
    looks: LookMatcher,
}

impl Backtracker {
    /// Parse `pattern` as byte-oriented syntax and compile it.
    pub fn new(pattern: &str) -> Result<Self, EngineError> {
        let hir = super::parse(pattern)?;
        Ok(Self {
            program: Program::compile(&hir)?,
            looks: LookMatcher::new(),
        })
    }

    #[must_use]
    pub fn group_len(&self) -> usize {
        self.program.group_len
    }

    /// Search `haystack`, returning the capture spans of the selected match.
    pub fn search(&self, haystack: &[u8], anchor: Anchor, semantics: Semantics) -> MatchRecord {
        let mut search = Search {
            program: &self.program,
            looks: &self.looks,
            haystack,
            anchor,
            semantics,
            visited: vec![false; self.program.insts.len() * (haystack.len() + 1)],
            stack: Vec::new(),
            slots: vec![None; self.program.slot_len()],
            best: None,
        };
        let last_start = match anchor {
            Anchor::Both => 0,
            Anchor::Unanchored => haystack.len(),
        };
        for start in 0..=last_start {
            if let Some((end, slots)) = search.run(start) {
                return record(start, end, &slots, self.program.group_len);
            }
        }
        MatchRecord::NoMatch
    }
}

fn record(start: usize, end: usize, slots: &[Option<usize>], group_len: usize) -> MatchRecord {
    let mut groups = Vec::with_capacity(group_len);
    groups.push(Some(Span::new(start, end)));
    for group in 1..group_len {
        let span = match (slots[group * 2], slots[group * 2 + 1]) {
            (Some(s), Some(e)) => Some(Span::new(s, e)),
            _ => None,
        };
        groups.push(span);
    }
    MatchRecord::Groups(groups)
}

struct Search<'a> {
    program: &'a Program,
    looks: &'a LookMatcher,
    haystack: &'a [u8],
    anchor: Anchor,
    semantics: Semantics,
    visited: Vec<bool>,
    stack: Vec<Frame>,
    slots: Vec<Option<usize>>,
    best: Option<(usize, Vec<Option<usize>>)>,
}

impl Search<'_> {
    /// Explore every path from `start`; returns the selected match end and
    /// the slots that produced it.
    fn run(&mut self, start: usize) -> Option<(usize, Vec<Option<usize>>)> {
        self.stack.clear();
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.best = None;
        self.stack.push(Frame::Step {
            pc: self.program.start,
            at: start,
        });
        while let Some(frame) = self.stack.pop() {
            match frame {
                Frame::Restore { slot, old } => self.slots[slot] = old,
                Frame::Step { pc, at } => {
                    if self.step(pc, at) {
                        return self.best.take();
                    }
                }
            }
        }
        self.best.take()
    }

    /// Follow one thread until it dies or matches. Returns true when the
    /// search can stop.
    fn step(&mut self, mut pc: StateId, mut at: usize) -> bool {
        let len = self.haystack.len();
        loop {
            let key = pc * (len + 1) + at;
            if self.visited[key] {
                return false;
            }
            self.visited[key] = true;
            match &self.program.insts[pc] {
                Inst::Match => {
                    if self.anchor == Anchor::Both && at != len {
                        return false;
                    }
                    match self.semantics {
                        Semantics::LeftmostFirst => {
                            self.best = Some((at, self.slots.clone()));
                            return true;
                        }
                        Semantics::Longest => {
                            if self.best.as_ref().is_none_or(|(end, _)| at > *end) {
                                self.best = Some((at, self.slots.clone()));
                            }
                            return false;
                        }
                    }
                }
                Inst::Fail => return false,
                Inst::Empty { next } => pc = *next,
                Inst::Ranges { ranges, next } => {
                    let Some(&byte) = self.haystack.get(at) else {
                        return false;
                    };
                    if !ranges.iter().any(|&(lo, hi)| lo <= byte && byte <= hi) {
                        return false;
                    }
                    pc = *next;
                    at += 1;
                }
                Inst::Union { alts } => {
                    let Some((&first, rest)) = alts.split_first() else {
                        return false;
                    };
                    for &alt in rest.iter().rev() {
                        self.stack.push(Frame::Step { pc: alt, at });
                    }
                    pc = first;
                }
                Inst::Capture { slot, next } => {
                    self.stack.push(Frame::Restore {
                        slot: *slot,
                        old: self.slots[*slot],
                    });
                    self.slots[*slot] = Some(at);
                    pc = *next;
                }
                Inst::Look { look, next } => {
                    if !self.looks.matches(*look, self.haystack, at) {
                        return false;
                    }
                    pc = *next;
                }
            }
        }
    }
}

/// [`QueryEngine`] backed by the reference backtracker.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceEngine;

impl QueryEngine for ReferenceEngine {
    type Compiled = Backtracker;

    fn compile(&self, pattern: &str) -> Result<Backtracker, EngineError> {
        Backtracker::new(pattern)
    }
}

impl CompiledQuery for Backtracker {
    fn group_len(&self) -> usize {
        self.program.group_len
    }

    fn query(&self, haystack: &[u8], anchor: Anchor, semantics: Semantics) -> MatchRecord {
        self.search(haystack, anchor, semantics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans(pattern: &str, haystack: &str, anchor: Anchor, semantics: Semantics) -> Vec<Option<(usize, usize)>> {
        let re = Backtracker::new(pattern).unwrap();
        match re.search(haystack.as_bytes(), anchor, semantics) {
            MatchRecord::NoMatch => Vec::new(),
            MatchRecord::Groups(groups) => groups
                .into_iter()
                .map(|g| g.map(|s| (s.start, s.end)))
                .collect(),
        }
    }

    use Anchor::{Both, Unanchored};
    use Semantics::{LeftmostFirst, Longest};

    #[test]
    fn leftmost_first_prefers_earlier_alternative() {
        assert_eq!(spans("a|ab", "ab", Unanchored, LeftmostFirst), vec![Some((0, 1))]);
        assert_eq!(spans("a|ab", "ab", Unanchored, Longest), vec![Some((0, 2))]);
    }

    #[test]
    fn anchored_both_requires_full_input() {
        assert_eq!(spans("a|ab", "ab", Both, LeftmostFirst), vec![Some((0, 2))]);
        assert!(spans("a", "ba", Both, LeftmostFirst).is_empty());
        assert_eq!(spans("a", "ba", Unanchored, LeftmostFirst), vec![Some((1, 2))]);
    }

    #[test]
    fn captures_track_last_iteration() {
        assert_eq!(
            spans("(a|b)*", "ab", Unanchored, LeftmostFirst),
            vec![Some((0, 2)), Some((1, 2))]
        );
        assert_eq!(
            spans("(a)|b", "b", Unanchored, LeftmostFirst),
            vec![Some((0, 1)), None]
        );
    }

    #[test]
    fn lazy_repetition_takes_shortest() {
        assert_eq!(spans("a*?", "aa", Unanchored, LeftmostFirst), vec![Some((0, 0))]);
        assert_eq!(spans("a*?", "aa", Unanchored, Longest), vec![Some((0, 2))]);
    }

    #[test]
    fn nested_empty_loops_terminate() {
        assert_eq!(
            spans("(?:(?:a*)*)*", "aaa", Unanchored, LeftmostFirst),
            vec![Some((0, 3))]
        );
        assert_eq!(spans("(?:a?)*b", "aab", Both, Longest), vec![Some((0, 3))]);
    }

    #[test]
    fn empty_match_at_end_of_input() {
        assert_eq!(spans("$", "ab", Unanchored, LeftmostFirst), vec![Some((2, 2))]);
        assert_eq!(spans("^", "", Both, LeftmostFirst), vec![Some((0, 0))]);
    }

    #[test]
    fn bounded_repetition() {
        assert_eq!(spans("a{1,2}", "aaa", Unanchored, LeftmostFirst), vec![Some((0, 2))]);
        assert!(spans("a{2}", "a", Unanchored, LeftmostFirst).is_empty());
    }

    #[test]
    fn word_boundary_is_ascii() {
        assert_eq!(spans(r"\bb", "a b", Unanchored, LeftmostFirst), vec![Some((2, 3))]);
    }

    #[test]
    fn reference_engine_reports_group_count() {
        let compiled = ReferenceEngine.compile("(a)(b)?").unwrap();
        assert_eq!(compiled.group_len(), 3);
        assert!(matches!(ReferenceEngine.compile("("), Err(EngineError::Parse(_))));
    }
}
