//! Lowering of `regex-syntax` HIR into a backtracking program.
//!
//! The graph mirrors the Thompson construction in `regex-automata`: same
//! union placement, same alternative order, and the same `(x+)?` rewrite of
//! `x*` when `x` can match the empty string. Priority order therefore
//! matches the production engines exactly, which is what lets the
//! backtracker serve as their leftmost-first reference.

use regex_automata::util::look::Look;
use regex_syntax::hir::{self, Hir, HirKind};
use regex_syntax::utf8::Utf8Sequences;

use super::EngineError;

pub(crate) type StateId = usize;

#[derive(Debug, Clone)]
pub(crate) enum Inst {
    Match,
    Fail,
    Empty { next: StateId },
    Ranges { ranges: Vec<(u8, u8)>, next: StateId },
    /// Alternatives in priority order.
    Union { alts: Vec<StateId> },
    /// Record the current offset in `slot`.
    Capture { slot: usize, next: StateId },
    Look { look: Look, next: StateId },
}

/// A compiled program. Slots `0` and `1` of group 0 are not part of the
/// graph; the search records them itself.
#[derive(Debug, Clone)]
pub(crate) struct Program {
    pub(crate) insts: Vec<Inst>,
    pub(crate) start: StateId,
    pub(crate) group_len: usize,
}

impl Program {
    pub(crate) fn compile(hir: &Hir) -> Result<Self, EngineError> {
        let mut compiler = Compiler {
            states: Vec::new(),
            reversed: Vec::new(),
        };
        let body = compiler.c(hir)?;
        let done = compiler.add(Inst::Match);
        compiler.patch(body.end, done);
        let mut insts = compiler.states;
        for id in compiler.reversed {
            if let Inst::Union { alts } = &mut insts[id] {
                alts.reverse();
            }
        }
        Ok(Self {
            insts,
            start: body.start,
            group_len: hir.properties().explicit_captures_len() + 1,
        })
    }

    pub(crate) fn slot_len(&self) -> usize {
        self.group_len * 2
    }
}

#[derive(Debug, Clone, Copy)]
struct Fragment {
    start: StateId,
    end: StateId,
}

struct Compiler {
    states: Vec<Inst>,
    /// Unions whose alternatives are added lowest priority first.
    reversed: Vec<StateId>,
}

impl Compiler {
    fn add(&mut self, inst: Inst) -> StateId {
        self.states.push(inst);
        self.states.len() - 1
    }

    fn add_empty(&mut self) -> StateId {
        self.add(Inst::Empty { next: 0 })
    }

    fn add_union(&mut self, greedy: bool) -> StateId {
        let id = self.add(Inst::Union { alts: Vec::new() });
        if !greedy {
            self.reversed.push(id);
        }
        id
    }

    fn patch(&mut self, from: StateId, to: StateId) {
        match &mut self.states[from] {
            Inst::Empty { next }
            | Inst::Ranges { next, .. }
            | Inst::Capture { next, .. }
            | Inst::Look { next, .. } => *next = to,
            Inst::Union { alts } => alts.push(to),
            Inst::Match | Inst::Fail => {}
        }
    }

    fn c(&mut self, hir: &Hir) -> Result<Fragment, EngineError> {
        match hir.kind() {
            HirKind::Empty => Ok(self.c_empty()),
            HirKind::Literal(hir::Literal(bytes)) => Ok(self.c_literal(bytes)),
            HirKind::Class(class) => Ok(self.c_class(class)),
            HirKind::Look(look) => self.c_look(*look),
            HirKind::Repetition(rep) => self.c_repetition(rep),
            HirKind::Capture(cap) => self.c_capture(cap),
            HirKind::Concat(subs) => self.c_concat(subs),
            HirKind::Alternation(subs) => self.c_alternation(subs),
        }
    }

    fn c_empty(&mut self) -> Fragment {
        let id = self.add_empty();
        Fragment { start: id, end: id }
    }

    fn c_fail(&mut self) -> Fragment {
        let id = self.add(Inst::Fail);
        Fragment { start: id, end: id }
    }

    fn c_range(&mut self, ranges: Vec<(u8, u8)>) -> Fragment {
        let id = self.add(Inst::Ranges { ranges, next: 0 });
        Fragment { start: id, end: id }
    }

    fn c_literal(&mut self, bytes: &[u8]) -> Fragment {
        let pieces: Vec<Fragment> = bytes.iter().map(|&b| self.c_range(vec![(b, b)])).collect();
        self.chain(pieces)
    }

    fn c_class(&mut self, class: &hir::Class) -> Fragment {
        match class {
            hir::Class::Bytes(bytes) => {
                let ranges: Vec<(u8, u8)> =
                    bytes.ranges().iter().map(|r| (r.start(), r.end())).collect();
                if ranges.is_empty() {
                    self.c_fail()
                } else {
                    self.c_range(ranges)
                }
            }
            hir::Class::Unicode(unicode) => self.c_unicode_class(unicode),
        }
    }

    /// Unicode classes become an alternation of UTF-8 byte sequences. The
    /// sequences are disjoint, so their order carries no priority.
    fn c_unicode_class(&mut self, class: &hir::ClassUnicode) -> Fragment {
        if let Some(ascii) = class.to_byte_class() {
            return self.c_class(&hir::Class::Bytes(ascii));
        }
        let mut alternatives = Vec::new();
        for range in class.iter() {
            for seq in Utf8Sequences::new(range.start(), range.end()) {
                let pieces: Vec<Fragment> = seq
                    .as_slice()
                    .iter()
                    .map(|r| self.c_range(vec![(r.start, r.end)]))
                    .collect();
                alternatives.push(self.chain(pieces));
            }
        }
        self.alternate(alternatives)
    }

    fn c_look(&mut self, look: hir::Look) -> Result<Fragment, EngineError> {
        let look = match look {
            hir::Look::Start => Look::Start,
            hir::Look::End => Look::End,
            hir::Look::StartLF => Look::StartLF,
            hir::Look::EndLF => Look::EndLF,
            hir::Look::StartCRLF => Look::StartCRLF,
            hir::Look::EndCRLF => Look::EndCRLF,
            hir::Look::WordAscii => Look::WordAscii,
            hir::Look::WordAsciiNegate => Look::WordAsciiNegate,
            hir::Look::WordStartAscii => Look::WordStartAscii,
            hir::Look::WordEndAscii => Look::WordEndAscii,
            hir::Look::WordStartHalfAscii => Look::WordStartHalfAscii,
            hir::Look::WordEndHalfAscii => Look::WordEndHalfAscii,
            other => return Err(EngineError::Unsupported(format!("{other:?}"))),
        };
        let id = self.add(Inst::Look { look, next: 0 });
        Ok(Fragment { start: id, end: id })
    }

    fn c_capture(&mut self, cap: &hir::Capture) -> Result<Fragment, EngineError> {
        let index = cap.index as usize;
        let open = self.add(Inst::Capture {
            slot: index * 2,
            next: 0,
        });
        let sub = self.c(&cap.sub)?;
        let close = self.add(Inst::Capture {
            slot: index * 2 + 1,
            next: 0,
        });
        self.patch(open, sub.start);
        self.patch(sub.end, close);
        Ok(Fragment {
            start: open,
            end: close,
        })
    }

    fn c_repetition(&mut self, rep: &hir::Repetition) -> Result<Fragment, EngineError> {
        match (rep.min, rep.max) {
            (0, Some(1)) => self.c_zero_or_one(&rep.sub, rep.greedy),
            (min, None) => self.c_at_least(&rep.sub, rep.greedy, min),
            (min, Some(max)) if min == max => self.c_exactly(&rep.sub, min),
            (min, Some(max)) => self.c_bounded(&rep.sub, rep.greedy, min, max),
        }
    }

    fn c_zero_or_one(&mut self, sub: &Hir, greedy: bool) -> Result<Fragment, EngineError> {
        let union = self.add_union(greedy);
        let compiled = self.c(sub)?;
        let empty = self.add_empty();
        self.patch(union, compiled.start);
        self.patch(union, empty);
        self.patch(compiled.end, empty);
        Ok(Fragment {
            start: union,
            end: empty,
        })
    }

    fn c_at_least(&mut self, sub: &Hir, greedy: bool, n: u32) -> Result<Fragment, EngineError> {
        if n == 0 {
            if sub.properties().minimum_len().is_some_and(|len| len > 0) {
                let union = self.add_union(greedy);
                let compiled = self.c(sub)?;
                self.patch(union, compiled.start);
                self.patch(compiled.end, union);
                return Ok(Fragment {
                    start: union,
                    end: union,
                });
            }
            // x* as (x+)? keeps the preference order right when x can
            // match the empty string.
            let compiled = self.c(sub)?;
            let plus = self.add_union(greedy);
            self.patch(compiled.end, plus);
            self.patch(plus, compiled.start);

            let question = self.add_union(greedy);
            let empty = self.add_empty();
            self.patch(question, compiled.start);
            self.patch(question, empty);
            self.patch(plus, empty);
            Ok(Fragment {
                start: question,
                end: empty,
            })
        } else if n == 1 {
            let compiled = self.c(sub)?;
            let union = self.add_union(greedy);
            self.patch(compiled.end, union);
            self.patch(union, compiled.start);
            Ok(Fragment {
                start: compiled.start,
                end: union,
            })
        } else {
            let prefix = self.c_exactly(sub, n - 1)?;
            let last = self.c(sub)?;
            let union = self.add_union(greedy);
            self.patch(prefix.end, last.start);
            self.patch(last.end, union);
            self.patch(union, last.start);
            Ok(Fragment {
                start: prefix.start,
                end: union,
            })
        }
    }

    fn c_exactly(&mut self, sub: &Hir, n: u32) -> Result<Fragment, EngineError> {
        let mut pieces = Vec::with_capacity(n as usize);
        for _ in 0..n {
            pieces.push(self.c(sub)?);
        }
        Ok(self.chain(pieces))
    }

    fn c_bounded(
        &mut self,
        sub: &Hir,
        greedy: bool,
        min: u32,
        max: u32,
    ) -> Result<Fragment, EngineError> {
        let prefix = self.c_exactly(sub, min)?;
        if min == max {
            return Ok(prefix);
        }
        let empty = self.add_empty();
        let mut prev_end = prefix.end;
        for _ in min..max {
            let union = self.add_union(greedy);
            let compiled = self.c(sub)?;
            self.patch(prev_end, union);
            self.patch(union, compiled.start);
            self.patch(union, empty);
            prev_end = compiled.end;
        }
        self.patch(prev_end, empty);
        Ok(Fragment {
            start: prefix.start,
            end: empty,
        })
    }

    fn c_concat(&mut self, subs: &[Hir]) -> Result<Fragment, EngineError> {
        let mut pieces = Vec::with_capacity(subs.len());
        for sub in subs {
            pieces.push(self.c(sub)?);
        }
        Ok(self.chain(pieces))
    }

    fn c_alternation(&mut self, subs: &[Hir]) -> Result<Fragment, EngineError> {
        let mut alternatives = Vec::with_capacity(subs.len());
        for sub in subs {
            alternatives.push(self.c(sub)?);
        }
        Ok(self.alternate(alternatives))
    }

    fn chain(&mut self, pieces: Vec<Fragment>) -> Fragment {
        let mut iter = pieces.into_iter();
        let Some(first) = iter.next() else {
            return self.c_empty();
        };
        let mut end = first.end;
        for piece in iter {
            self.patch(end, piece.start);
            end = piece.end;
        }
        Fragment {
            start: first.start,
            end,
        }
    }

    fn alternate(&mut self, alternatives: Vec<Fragment>) -> Fragment {
        match alternatives.len() {
            0 => return self.c_fail(),
            1 => return alternatives[0],
            _ => {}
        }
        let union = self.add_union(true);
        let end = self.add_empty();
        for alt in alternatives {
            self.patch(union, alt.start);
            self.patch(alt.end, end);
        }
        Fragment { start: union, end }
    }
}
