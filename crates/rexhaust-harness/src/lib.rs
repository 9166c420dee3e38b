//! Differential testing harness for regexp engines.
//!
//! This crate provides:
//! - Orchestration: every enumerated regexp against every enumerated string
//! - Oracles: the production engines checked against the reference matcher
//! - Corpus export and replay in a line-oriented interchange format
//! - Suites: the egrep operator set under each top-level anchoring
//! - Structured JSONL logs and artifact indexes for CI

#![forbid(unsafe_code)]

pub mod config;
pub mod corpus;
pub mod error;
pub mod escape;
pub mod orchestrator;
pub mod report;
pub mod structured_log;
pub mod suite;
pub mod tester;

pub use config::{Bounds, BoundsMode, RandomSample, RunConfig, RunOptions};
pub use corpus::{Corpus, replay};
pub use error::HarnessError;
pub use orchestrator::{ExhaustiveTester, RunCounters};
pub use report::{ReplayReport, RunSummary, SuiteReport};
pub use suite::{EgrepParams, SuiteRunner};
pub use tester::{DifferentialOracle, Oracle, Tester};
