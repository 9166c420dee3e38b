//! Integration test: the production engines agree with the reference
//! backtracker on hand-picked patterns over every short input.

use rexhaust_core::{Anchor, AutomataSet, Backtracker, Semantics, StringGenerator};

const PATTERNS: &[&str] = &[
    "a|ab",
    "(a|ab)(c|bcd)(d*)",
    "(a+)(b?)",
    "(a|b)*c",
    "^ab|c$",
    "(?:ab){1,2}",
    "[ab]{2}",
    "(a*)*",
    "(a*)+",
    "(a|)+",
    "a*?b",
    "(a{0,2}?)(a*)",
    r"\bab\b",
    "(?:a|ab)(?:c|bcd)?",
    "((a)|b)+",
];

fn inputs() -> Vec<Vec<u8>> {
    StringGenerator::new(4, &["a", "b", "c", " "]).collect()
}

#[test]
fn capture_engines_match_reference() {
    let inputs = inputs();
    for pattern in PATTERNS {
        let reference = Backtracker::new(pattern).expect("pattern should compile");
        let mut automata = AutomataSet::new(pattern).expect("pattern should compile");
        for input in &inputs {
            for anchor in Anchor::ALL {
                let expected = reference.search(input, anchor, Semantics::LeftmostFirst);
                for (engine, record) in automata.captures(input, anchor) {
                    assert_eq!(
                        record, expected,
                        "{engine} on {pattern:?} / {:?} ({anchor:?})",
                        String::from_utf8_lossy(input)
                    );
                }
                for (engine, span) in automata.spans(input, anchor) {
                    assert_eq!(span, expected.whole(), "{engine} on {pattern:?} / {input:?}");
                }
            }
        }
    }
}

#[test]
fn longest_agrees_with_all_match_dfa() {
    let inputs = inputs();
    for pattern in PATTERNS {
        let reference = Backtracker::new(pattern).expect("pattern should compile");
        let mut automata = AutomataSet::new(pattern).expect("pattern should compile");
        for input in &inputs {
            for anchor in Anchor::ALL {
                let first = reference.search(input, anchor, Semantics::LeftmostFirst).whole();
                let longest = reference.search(input, anchor, Semantics::Longest).whole();
                let (Some(first), Some(longest)) = (first, longest) else {
                    assert_eq!(first, longest, "{pattern:?} / {input:?}");
                    continue;
                };
                assert_eq!(first.start, longest.start);
                assert!(longest.end >= first.end);
                if let Some(end) = automata.longest_end(input, anchor, longest.start) {
                    assert_eq!(end, Some(longest.end), "{pattern:?} / {input:?} ({anchor:?})");
                }
            }
        }
    }
}

#[test]
fn anchored_both_matches_span_whole_input() {
    for pattern in PATTERNS {
        let reference = Backtracker::new(pattern).expect("pattern should compile");
        for input in inputs() {
            for semantics in [Semantics::LeftmostFirst, Semantics::Longest] {
                if let Some(span) = reference.search(&input, Anchor::Both, semantics).whole() {
                    assert_eq!((span.start, span.end), (0, input.len()));
                }
            }
        }
    }
}
