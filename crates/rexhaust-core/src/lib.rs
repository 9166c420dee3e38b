//! Building blocks for bounded-exhaustive regexp testing.
//!
//! This crate provides:
//! - Enumerators: every regexp and every input string within configured bounds
//! - A reference backtracking matcher with leftmost-first and longest semantics
//! - Adapters over the `regex-automata` engines and the `regex` crate
//! - The match-query API used to export conformance corpora

#![forbid(unsafe_code)]

pub mod engine;
pub mod generator;

pub use engine::{
    Anchor, AutomataSet, Backtracker, CompiledQuery, EngineError, EngineKind, MatchRecord,
    QueryEngine, ReferenceEngine, Semantics, Span,
};
pub use generator::{
    GeneratorError, RegexpGenerator, StringGenerator, Template, TemplateError, XorShift64,
};
