//! Adapters over the production engines under test.
//!
//! Every engine is built twice: once from the regexp itself for unanchored
//! searches, and once from `\A(?:(?:re)\z)` for searches that must span the
//! whole input. An engine that refuses to build (one-pass on a regexp that
//! is not one-pass, DFAs over their size limits) is left out, and a search
//! that returns an error is skipped rather than reported.

use regex_automata::dfa::{self, Automaton, StartKind, dense, onepass};
use regex_automata::nfa::thompson::{self, backtrack, pikevm};
use regex_automata::util::captures::Captures;
use regex_automata::{Anchored, Input, MatchKind, hybrid, meta};

use super::{Anchor, EngineError, EngineKind, MatchRecord, Span, syntax_config};

fn thompson_config() -> thompson::Config {
    thompson::Config::new().utf8(false)
}

fn record_from_captures(caps: &Captures) -> MatchRecord {
    if !caps.is_match() {
        return MatchRecord::NoMatch;
    }
    MatchRecord::Groups(
        (0..caps.group_len())
            .map(|group| caps.get_group(group).map(Span::from))
            .collect(),
    )
}

struct Variant {
    anchored: Anchored,
    meta: Option<(meta::Regex, Captures)>,
    pikevm: Option<(pikevm::PikeVM, pikevm::Cache, Captures)>,
    backtrack: Option<(backtrack::BoundedBacktracker, backtrack::Cache, Captures)>,
    onepass: Option<(onepass::DFA, onepass::Cache, Captures)>,
    dense: Option<dfa::regex::Regex>,
    lazy: Option<(hybrid::regex::Regex, hybrid::regex::Cache)>,
    all_match: Option<dense::DFA<Vec<u32>>>,
    regex: Option<regex::bytes::Regex>,
}

impl Variant {
    fn build(pattern: &str, anchored: Anchored, with_onepass: bool) -> Self {
        let meta = meta::Regex::builder()
            .syntax(syntax_config())
            .configure(meta::Config::new().utf8_empty(false))
            .build(pattern)
            .ok()
            .map(|re| {
                let caps = re.create_captures();
                (re, caps)
            });
        let pikevm = pikevm::PikeVM::builder()
            .syntax(syntax_config())
            .thompson(thompson_config())
            .build(pattern)
            .ok()
            .map(|vm| {
                let cache = vm.create_cache();
                let caps = vm.create_captures();
                (vm, cache, caps)
            });
        let backtrack = backtrack::BoundedBacktracker::builder()
            .syntax(syntax_config())
            .thompson(thompson_config())
            .build(pattern)
            .ok()
            .map(|bt| {
                let cache = bt.create_cache();
                let caps = bt.create_captures();
                (bt, cache, caps)
            });
        let onepass = if with_onepass {
            onepass::DFA::builder()
                .syntax(syntax_config())
                .thompson(thompson_config())
                .build(pattern)
                .ok()
                .map(|dfa| {
                    let cache = dfa.create_cache();
                    let caps = dfa.create_captures();
                    (dfa, cache, caps)
                })
        } else {
            None
        };
        let dense = dfa::regex::Regex::builder()
            .syntax(syntax_config())
            .thompson(thompson_config())
            .dense(dense::Config::new().start_kind(StartKind::Both))
            .build(pattern)
            .ok();
        let lazy = hybrid::regex::Regex::builder()
            .syntax(syntax_config())
            .thompson(thompson_config())
            .build(pattern)
            .ok()
            .map(|re| {
                let cache = re.create_cache();
                (re, cache)
            });
        let all_match = dense::Builder::new()
            .configure(
                dense::Config::new()
                    .match_kind(MatchKind::All)
                    .start_kind(StartKind::Anchored),
            )
            .syntax(syntax_config())
            .thompson(thompson_config())
            .build(pattern)
            .ok();
        let regex = regex::bytes::RegexBuilder::new(pattern)
            .unicode(false)
            .build()
            .ok();
        Self {
            anchored,
            meta,
            pikevm,
            backtrack,
            onepass,
            dense,
            lazy,
            all_match,
            regex,
        }
    }

    fn engines(&self) -> Vec<EngineKind> {
        let mut kinds = Vec::new();
        let present = [
            (self.meta.is_some(), EngineKind::Meta),
            (self.pikevm.is_some(), EngineKind::PikeVm),
            (self.backtrack.is_some(), EngineKind::Backtrack),
            (self.onepass.is_some(), EngineKind::OnePass),
            (self.dense.is_some(), EngineKind::DenseDfa),
            (self.lazy.is_some(), EngineKind::LazyDfa),
            (self.all_match.is_some(), EngineKind::AllMatchDfa),
            (self.regex.is_some(), EngineKind::RegexCrate),
        ];
        for (built, kind) in present {
            if built {
                kinds.push(kind);
            }
        }
        kinds
    }

    fn input<'h>(&self, haystack: &'h [u8]) -> Input<'h> {
        Input::new(haystack).anchored(self.anchored)
    }

    fn captures(&mut self, haystack: &[u8]) -> Vec<(EngineKind, MatchRecord)> {
        let input = self.input(haystack);
        let mut out = Vec::new();
        if let Some((re, caps)) = &mut self.meta {
            re.search_captures(&input, caps);
            out.push((EngineKind::Meta, record_from_captures(caps)));
        }
        if let Some((vm, cache, caps)) = &mut self.pikevm {
            vm.search(cache, &input, caps);
            out.push((EngineKind::PikeVm, record_from_captures(caps)));
        }
        if let Some((bt, cache, caps)) = &mut self.backtrack {
            if bt.try_search(cache, &input, caps).is_ok() {
                out.push((EngineKind::Backtrack, record_from_captures(caps)));
            }
        }
        if let Some((dfa, cache, caps)) = &mut self.onepass {
            let anchored = input.clone().anchored(Anchored::Yes);
            if dfa.try_search(cache, &anchored, caps).is_ok() {
                out.push((EngineKind::OnePass, record_from_captures(caps)));
            }
        }
        if let Some(re) = &self.regex {
            let record = match re.captures(haystack) {
                None => MatchRecord::NoMatch,
                Some(caps) => MatchRecord::Groups(
                    (0..caps.len())
                        .map(|group| caps.get(group).map(|m| Span::new(m.start(), m.end())))
                        .collect(),
                ),
            };
            out.push((EngineKind::RegexCrate, record));
        }
        out
    }

    fn spans(&mut self, haystack: &[u8]) -> Vec<(EngineKind, Option<Span>)> {
        let input = self.input(haystack);
        let mut out = Vec::new();
        if let Some(re) = &self.dense {
            if let Ok(found) = re.try_search(&input) {
                out.push((EngineKind::DenseDfa, found.map(|m| Span::from(m.span()))));
            }
        }
        if let Some((re, cache)) = &mut self.lazy {
            if let Ok(found) = re.try_search(cache, &input) {
                out.push((EngineKind::LazyDfa, found.map(|m| Span::from(m.span()))));
            }
        }
        out
    }

    fn longest_end(&self, haystack: &[u8], start: usize) -> Option<Option<usize>> {
        let dfa = self.all_match.as_ref()?;
        let input = Input::new(haystack)
            .range(start..)
            .anchored(Anchored::Yes);
        dfa.try_search_fwd(&input)
            .ok()
            .map(|found| found.map(|half| half.offset()))
    }
}

/// The production engines for one regexp, ready to search.
pub struct AutomataSet {
    body: Variant,
    whole: Variant,
}

impl AutomataSet {
    /// Build every engine that accepts `pattern`. Fails only when the
    /// pattern does not parse at all.
    pub fn new(pattern: &str) -> Result<Self, EngineError> {
        super::parse(pattern)?;
        let whole = format!(r"\A(?:(?:{pattern})\z)");
        Ok(Self {
            body: Variant::build(pattern, Anchored::No, false),
            whole: Variant::build(&whole, Anchored::No, true),
        })
    }

    fn variant(&mut self, anchor: Anchor) -> &mut Variant {
        match anchor {
            Anchor::Unanchored => &mut self.body,
            Anchor::Both => &mut self.whole,
        }
    }

    /// Engines that built for unanchored searches.
    #[must_use]
    pub fn engines(&self) -> Vec<EngineKind> {
        self.body.engines()
    }

    /// Leftmost-first capture records from every capture-capable engine.
    pub fn captures(&mut self, haystack: &[u8], anchor: Anchor) -> Vec<(EngineKind, MatchRecord)> {
        self.variant(anchor).captures(haystack)
    }

    /// Leftmost-first whole-match spans from the DFA engines.
    pub fn spans(&mut self, haystack: &[u8], anchor: Anchor) -> Vec<(EngineKind, Option<Span>)> {
        self.variant(anchor).spans(haystack)
    }

    /// End of the longest match starting exactly at `start`, from the
    /// all-matches DFA. `None` when that DFA is unavailable or gave up.
    pub fn longest_end(
        &mut self,
        haystack: &[u8],
        anchor: Anchor,
        start: usize,
    ) -> Option<Option<usize>> {
        self.variant(anchor).longest_end(haystack, start)
    }
}

impl std::fmt::Debug for AutomataSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutomataSet")
            .field("unanchored", &self.body.engines())
            .field("whole", &self.whole.engines())
            .finish()
    }
}
