//! The per-regexp, per-string test loop.
//!
//! [`ExhaustiveTester`] drives one [`RunConfig`] in one of two modes:
//! [`ExhaustiveTester::verify`] asks an [`Oracle`] about every
//! (regexp, string) pair and counts disagreements, while
//! [`ExhaustiveTester::export`] writes a corpus of match records from a
//! [`QueryEngine`] instead.

use std::io::Write;
use std::time::Instant;

use rexhaust_core::{QueryEngine, RegexpGenerator, StringGenerator, Template};
use serde::Serialize;

use crate::config::{Bounds, ConfigError, RandomSample, RunConfig, RunOptions};
use crate::corpus::{REGEXPS_HEADER, STRINGS_HEADER, render_line};
use crate::error::HarnessError;
use crate::escape::{escape, escape_truncated};
use crate::structured_log::{CounterSnapshot, LogEmitter, LogEntry, LogLevel, Outcome};
use crate::tester::{Oracle, Tester};

/// Totals of one run, zeroed when the run starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunCounters {
    pub regexps: u64,
    pub tests: u64,
    pub failures: u64,
    /// Regexps the oracle could not build a tester for.
    pub skipped: u64,
}

impl RunCounters {
    fn snapshot(self) -> CounterSnapshot {
        CounterSnapshot {
            regexps: self.regexps,
            tests: self.tests,
            failures: self.failures,
            skipped: self.skipped,
        }
    }
}

/// Executes one [`RunConfig`].
pub struct ExhaustiveTester<'a> {
    generator: RegexpGenerator,
    random_regexps: Option<RandomSample>,
    state: RunState<'a>,
}

/// Everything the per-regexp handlers mutate, kept apart from the
/// generator that drives them.
struct RunState<'a> {
    topwrapper: Option<Template>,
    options: RunOptions,
    bounds: Bounds,
    str_alphabet: Vec<String>,
    random_strings: Option<RandomSample>,
    strings: StringGenerator,
    counters: RunCounters,
    progress: Box<dyn Write + 'a>,
    log: Option<&'a mut LogEmitter>,
}

impl<'a> ExhaustiveTester<'a> {
    /// Prepare a run. Bounds are reduced here when `options.bounds` asks
    /// for it.
    pub fn new(config: RunConfig, options: RunOptions) -> Result<Self, ConfigError> {
        let bounds = options.bounds.apply(config.bounds);
        let atoms = match &config.wrapper {
            Some(wrapper) => config
                .alphabet
                .iter()
                .map(|atom| wrapper.apply(&[atom.as_str()]))
                .collect::<Result<Vec<_>, _>>()?,
            None => config.alphabet.clone(),
        };
        let generator = RegexpGenerator::new(bounds.max_atoms, bounds.max_ops, atoms, &config.ops)?;
        let strings = StringGenerator::new(bounds.max_strlen, &config.str_alphabet);
        Ok(Self {
            generator,
            random_regexps: config.random_regexps,
            state: RunState {
                topwrapper: config.topwrapper,
                options,
                bounds,
                str_alphabet: config.str_alphabet,
                random_strings: config.random_strings,
                strings,
                counters: RunCounters::default(),
                progress: Box::new(std::io::stdout()),
                log: None,
            },
        })
    }

    /// Send `--show-regexps` progress somewhere other than stdout.
    #[must_use]
    pub fn with_progress(mut self, progress: impl Write + 'a) -> Self {
        self.state.progress = Box::new(progress);
        self
    }

    #[must_use]
    pub fn with_log(mut self, log: &'a mut LogEmitter) -> Self {
        self.state.log = Some(log);
        self
    }

    /// Bounds in effect after any reduction.
    #[must_use]
    pub fn bounds(&self) -> Bounds {
        self.state.bounds
    }

    #[must_use]
    pub fn str_alphabet_len(&self) -> usize {
        self.state.str_alphabet.len()
    }

    #[must_use]
    pub fn counters(&self) -> RunCounters {
        self.state.counters
    }

    /// Test every regexp against every candidate string.
    pub fn verify<O: Oracle>(&mut self, oracle: &O) -> Result<RunCounters, HarnessError> {
        let started = Instant::now();
        let Self {
            generator,
            random_regexps,
            state,
        } = self;
        state.counters = RunCounters::default();
        state.strings = StringGenerator::new(state.bounds.max_strlen, &state.str_alphabet);
        state.strings.generate_empty();
        if let Some(sample) = state.random_strings {
            state.strings.random(sample.seed, sample.count);
        }
        state.log_run_start("verify")?;

        let mut handle = |raw: &str| state.verify_regexp(raw, oracle);
        match random_regexps {
            Some(sample) => generator.generate_random(sample.seed, sample.count, &mut handle)?,
            None => generator.generate(&mut handle)?,
        }

        let counters = state.counters;
        let outcome = if counters.failures == 0 {
            Outcome::Pass
        } else {
            Outcome::Fail
        };
        state.log(|log| {
            log.entry(LogLevel::Info, "run_complete")
                .with_outcome(outcome)
                .with_counters(counters.snapshot())
                .with_duration_ms(elapsed_ms(started))
        })?;
        Ok(counters)
    }

    /// Write a corpus of `engine`'s answers for every regexp and string.
    /// The corpus is built in memory and reaches `out` only when the whole
    /// run succeeds, so a failed export writes nothing. Random strings are
    /// refused.
    pub fn export<E: QueryEngine>(
        &mut self,
        engine: &E,
        out: &mut dyn Write,
    ) -> Result<RunCounters, HarnessError> {
        let started = Instant::now();
        let Self {
            generator,
            random_regexps,
            state,
        } = self;
        if state.random_strings.is_some() {
            return Err(ConfigError::RandomStringsWithExport.into());
        }
        state.counters = RunCounters::default();
        state.strings = StringGenerator::new(state.bounds.max_strlen, &state.str_alphabet);
        let strings: Vec<Vec<u8>> = state.strings.by_ref().collect();
        state.log_run_start("export")?;

        let mut corpus = Vec::new();
        let mut handle = |raw: &str| state.export_regexp(raw, engine, &strings, &mut corpus);
        let generated = match random_regexps {
            Some(sample) => generator.generate_random(sample.seed, sample.count, &mut handle),
            None => generator.generate(&mut handle),
        };
        if let Err(err) = generated {
            let counters = state.counters;
            let reason = err.to_string();
            state.log(|log| {
                log.entry(LogLevel::Error, "export_failed")
                    .with_outcome(Outcome::Fail)
                    .with_counters(counters.snapshot())
                    .with_details(serde_json::json!({ "error": reason }))
            })?;
            return Err(err);
        }
        out.write_all(&corpus)?;
        out.flush()?;

        let counters = state.counters;
        state.log(|log| {
            log.entry(LogLevel::Info, "export_complete")
                .with_outcome(Outcome::Pass)
                .with_counters(counters.snapshot())
                .with_duration_ms(elapsed_ms(started))
        })?;
        Ok(counters)
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

impl RunState<'_> {
    fn log(&mut self, build: impl FnOnce(&mut LogEmitter) -> LogEntry) -> Result<(), HarnessError> {
        if let Some(log) = self.log.as_deref_mut() {
            let entry = build(log);
            log.emit_entry(entry)?;
        }
        Ok(())
    }

    fn log_run_start(&mut self, mode: &str) -> Result<(), HarnessError> {
        let details = serde_json::json!({
            "mode": mode,
            "max_atoms": self.bounds.max_atoms,
            "max_ops": self.bounds.max_ops,
            "max_strlen": self.bounds.max_strlen,
            "bounds_mode": self.options.bounds.as_str(),
            "str_alphabet": self.str_alphabet,
            "topwrapper": self.topwrapper.as_ref().map(Template::source),
        });
        self.log(|log| log.entry(LogLevel::Info, "run_start").with_details(details))
    }

    /// Count the regexp, apply the top-level wrapper and show progress.
    fn prologue(&mut self, raw: &str) -> Result<String, HarnessError> {
        self.counters.regexps += 1;
        let regexp = match &self.topwrapper {
            Some(top) => top.apply(&[raw]).map_err(ConfigError::from)?,
            None => raw.to_string(),
        };
        if self.options.show_regexps {
            write!(self.progress, "\r{regexp}")?;
            self.progress.flush()?;
        }
        Ok(regexp)
    }

    fn verify_regexp<O: Oracle>(&mut self, raw: &str, oracle: &O) -> Result<(), HarnessError> {
        let regexp = self.prologue(raw)?;
        let mut tester = match oracle.tester(&regexp) {
            Ok(tester) => tester,
            Err(err) => {
                self.counters.skipped += 1;
                let reason = err.to_string();
                return self.log(|log| {
                    log.entry(LogLevel::Debug, "regexp_skipped")
                        .with_regexp(&regexp)
                        .with_outcome(Outcome::Skip)
                        .with_details(serde_json::json!({ "reason": reason }))
                });
            }
        };

        self.strings.reset();
        let mut bad_inputs = 0;
        while let Some(input) = self.strings.next() {
            self.counters.tests += 1;
            if tester.test_input(&input) {
                continue;
            }
            self.counters.failures += 1;
            bad_inputs += 1;
            let mismatch = tester.mismatch().cloned();
            self.log(|log| {
                let rendered = escape_truncated(&input);
                let mut entry = log
                    .entry(LogLevel::Warn, "mismatch")
                    .with_regexp(&regexp)
                    .with_input(&rendered)
                    .with_outcome(Outcome::Fail);
                if let Some(m) = mismatch {
                    entry = entry
                        .with_query(m.engine, m.anchor, m.semantics)
                        .with_details(serde_json::json!({
                            "expected": m.expected,
                            "actual": m.actual,
                        }));
                }
                entry
            })?;
            if bad_inputs >= self.options.max_bad_inputs {
                break;
            }
        }
        Ok(())
    }

    fn export_regexp<E: QueryEngine>(
        &mut self,
        raw: &str,
        engine: &E,
        strings: &[Vec<u8>],
        out: &mut dyn Write,
    ) -> Result<(), HarnessError> {
        let regexp = self.prologue(raw)?;
        if self.counters.regexps == 1 {
            writeln!(out, "{STRINGS_HEADER}")?;
            for input in strings {
                out.write_all(&escape(input)?)?;
                out.write_all(b"\n")?;
            }
            writeln!(out, "{REGEXPS_HEADER}")?;
        }
        out.write_all(&escape(regexp.as_bytes())?)?;
        out.write_all(b"\n")?;

        let compiled = engine.compile(&regexp).ok();
        for input in strings {
            writeln!(out, "{}", render_line(compiled.as_ref(), input))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BoundsMode;
    use crate::tester::{BuildError, Mismatch};
    use rexhaust_core::{Anchor, EngineKind, ReferenceEngine, Semantics};

    struct Agree;
    struct AgreeTester;

    impl Tester for AgreeTester {
        fn test_input(&mut self, _input: &[u8]) -> bool {
            true
        }
    }

    impl Oracle for Agree {
        type Tester = AgreeTester;
        fn tester(&self, _regexp: &str) -> Result<AgreeTester, BuildError> {
            Ok(AgreeTester)
        }
    }

    /// Fails every non-empty input and explains why.
    struct PickyTester(Option<Mismatch>);

    impl Tester for PickyTester {
        fn test_input(&mut self, input: &[u8]) -> bool {
            if input.is_empty() {
                return true;
            }
            self.0 = Some(Mismatch {
                engine: EngineKind::Meta,
                anchor: Anchor::Both,
                semantics: Semantics::LeftmostFirst,
                expected: "-".to_string(),
                actual: "0-1".to_string(),
            });
            false
        }

        fn mismatch(&self) -> Option<&Mismatch> {
            self.0.as_ref()
        }
    }

    struct Picky;

    impl Oracle for Picky {
        type Tester = PickyTester;
        fn tester(&self, regexp: &str) -> Result<PickyTester, BuildError> {
            if regexp == "b" {
                return Err(BuildError {
                    regexp: regexp.to_string(),
                    reason: "rejected".to_string(),
                });
            }
            Ok(PickyTester(None))
        }
    }

    fn config(max_atoms: usize, max_ops: usize, max_strlen: usize) -> RunConfig {
        RunConfig::builder()
            .alphabet(["a", "b"])
            .ops(RegexpGenerator::egrep_ops())
            .str_alphabet(["a", "b"])
            .bounds(Bounds {
                max_atoms,
                max_ops,
                max_strlen,
            })
            .build()
            .unwrap()
    }

    #[test]
    fn agreeing_oracle_counts_every_pair() {
        let mut tester = ExhaustiveTester::new(config(1, 0, 2), RunOptions::default()).unwrap();
        let counters = tester.verify(&Agree).unwrap();
        // 2 regexps x (leading empty + 7 enumerated strings).
        assert_eq!(counters.regexps, 2);
        assert_eq!(counters.tests, 16);
        assert_eq!(counters.failures, 0);
    }

    #[test]
    fn budget_stops_a_regexp_at_the_first_failure() {
        let mut tester = ExhaustiveTester::new(config(1, 0, 2), RunOptions::default()).unwrap();
        let counters = tester.verify(&Picky).unwrap();
        // "a": two empty strings pass, then "a" fails. "b" is skipped.
        assert_eq!(counters.regexps, 2);
        assert_eq!(counters.skipped, 1);
        assert_eq!(counters.tests, 3);
        assert_eq!(counters.failures, 1);
    }

    #[test]
    fn larger_budget_keeps_testing() {
        let options = RunOptions {
            max_bad_inputs: 3,
            ..RunOptions::default()
        };
        let mut tester = ExhaustiveTester::new(config(1, 0, 2), options).unwrap();
        let counters = tester.verify(&Picky).unwrap();
        assert_eq!(counters.tests, 5);
        assert_eq!(counters.failures, 3);
    }

    #[test]
    fn mismatches_and_skips_are_logged() {
        let (mut log, buffer) = LogEmitter::to_buffer("unit", "run-1");
        {
            let mut tester = ExhaustiveTester::new(config(1, 0, 1), RunOptions::default())
                .unwrap()
                .with_log(&mut log);
            tester.verify(&Picky).unwrap();
        }
        let text = buffer.contents();
        let events: Vec<serde_json::Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        let names: Vec<&str> = events.iter().map(|e| e["event"].as_str().unwrap()).collect();
        assert_eq!(names, ["run_start", "mismatch", "regexp_skipped", "run_complete"]);
        assert_eq!(events[1]["regexp"], "a");
        assert_eq!(events[1]["input"], "\"a\"");
        assert_eq!(events[1]["engine"], "meta");
        assert_eq!(events[3]["outcome"], "fail");
        assert_eq!(events[3]["counters"]["skipped"], 1);
    }

    #[test]
    fn topwrapper_and_progress() {
        let config = RunConfig::builder()
            .alphabet(["a"])
            .str_alphabet(["a"])
            .topwrapper("^(?:%s)$")
            .build()
            .unwrap();
        let options = RunOptions {
            show_regexps: true,
            ..RunOptions::default()
        };
        let mut progress = Vec::new();
        {
            let mut tester = ExhaustiveTester::new(config, options)
                .unwrap()
                .with_progress(&mut progress);
            tester.verify(&Agree).unwrap();
        }
        assert_eq!(progress, b"\r^(?:a)$");
    }

    #[test]
    fn wrapper_applies_to_atoms() {
        let config = RunConfig::builder()
            .alphabet(["a"])
            .ops(["%s%s"])
            .wrapper("(%s)")
            .str_alphabet(["a"])
            .bounds(Bounds {
                max_atoms: 2,
                max_ops: 1,
                max_strlen: 1,
            })
            .build()
            .unwrap();
        let mut out = Vec::new();
        ExhaustiveTester::new(config, RunOptions::default())
            .unwrap()
            .export(&ReferenceEngine, &mut out)
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "strings\n\"\"\n\"a\"\nregexps\n\
             \"(a)\"\n-;-;-;-\n0-1 0-1;0-1 0-1;0-1 0-1;0-1 0-1\n\
             \"(?:(a)(a))\"\n-;-;-;-\n-;-;-;-\n"
        );
    }

    #[test]
    fn reduced_bounds_shrink_the_run() {
        let options = RunOptions {
            bounds: BoundsMode::Reduced,
            ..RunOptions::default()
        };
        let mut full = ExhaustiveTester::new(config(2, 2, 2), RunOptions::default()).unwrap();
        let mut reduced = ExhaustiveTester::new(config(2, 2, 2), options).unwrap();
        assert_eq!(reduced.bounds().max_strlen, 1);
        let full = full.verify(&Agree).unwrap();
        let reduced = reduced.verify(&Agree).unwrap();
        assert!(reduced.regexps < full.regexps);
        assert!(reduced.tests < full.tests);
    }

    #[test]
    fn export_refuses_random_strings() {
        let config = RunConfig::builder()
            .alphabet(["a"])
            .random_strings(Some(RandomSample { seed: 1, count: 3 }))
            .build()
            .unwrap();
        let mut out = Vec::new();
        let err = ExhaustiveTester::new(config, RunOptions::default())
            .unwrap()
            .export(&ReferenceEngine, &mut out)
            .unwrap_err();
        assert!(matches!(
            err,
            HarnessError::Config(ConfigError::RandomStringsWithExport)
        ));
        assert!(out.is_empty());
    }

    #[test]
    fn overlong_symbol_fails_export_without_output() {
        let long = "a".repeat(600);
        let config = RunConfig::builder()
            .alphabet(["a"])
            .str_alphabet([long.as_str()])
            .bounds(Bounds {
                max_atoms: 1,
                max_ops: 0,
                max_strlen: 1,
            })
            .build()
            .unwrap();
        let (mut log, buffer) = LogEmitter::to_buffer("unit", "run-1");
        let mut out = Vec::new();
        let err = ExhaustiveTester::new(config, RunOptions::default())
            .unwrap()
            .with_log(&mut log)
            .export(&ReferenceEngine, &mut out)
            .unwrap_err();
        assert!(matches!(err, HarnessError::RenderOverflow(ref e) if e.len == 600));
        assert!(out.is_empty());
        let text = buffer.contents();
        let last: serde_json::Value = serde_json::from_str(text.lines().last().unwrap()).unwrap();
        assert_eq!(last["event"], "export_failed");
        assert_eq!(last["level"], "error");
        assert_eq!(last["outcome"], "fail");
        assert_eq!(last["counters"]["regexps"], 1);
        assert!(!text.contains("export_complete"));
    }

    #[test]
    fn overlong_mismatch_input_is_logged_truncated() {
        let long = "a".repeat(600);
        let config = RunConfig::builder()
            .alphabet(["a"])
            .str_alphabet([long.as_str()])
            .bounds(Bounds {
                max_atoms: 1,
                max_ops: 0,
                max_strlen: 1,
            })
            .build()
            .unwrap();
        let (mut log, buffer) = LogEmitter::to_buffer("unit", "run-1");
        {
            let mut tester = ExhaustiveTester::new(config, RunOptions::default())
                .unwrap()
                .with_log(&mut log);
            assert_eq!(tester.verify(&Picky).unwrap().failures, 1);
        }
        let text = buffer.contents();
        let mismatch: serde_json::Value = text
            .lines()
            .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap())
            .find(|e| e["event"] == "mismatch")
            .unwrap();
        let input = mismatch["input"].as_str().unwrap();
        assert!(input.starts_with("\"aaa"));
        assert!(input.ends_with("a\"..."));
        assert_eq!(input.len(), 508 + 3);
    }

    #[test]
    fn random_strings_are_appended() {
        let config = RunConfig::builder()
            .alphabet(["a"])
            .str_alphabet(["a", "b"])
            .bounds(Bounds {
                max_atoms: 1,
                max_ops: 0,
                max_strlen: 1,
            })
            .random_strings(Some(RandomSample { seed: 5, count: 4 }))
            .build()
            .unwrap();
        let mut tester = ExhaustiveTester::new(config, RunOptions::default()).unwrap();
        let counters = tester.verify(&Agree).unwrap();
        assert_eq!(counters.tests, 1 + 3 + 4);
    }
}
