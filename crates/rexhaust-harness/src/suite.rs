//! Suite builder: standard parameter sets on top of the orchestrator.

use std::io::Write;

use rexhaust_core::{QueryEngine, RegexpGenerator};

use crate::config::{Bounds, RandomSample, RunConfig, RunOptions};
use crate::error::HarnessError;
use crate::orchestrator::{ExhaustiveTester, RunCounters};
use crate::report::{RunSummary, SuiteReport};
use crate::structured_log::LogEmitter;
use crate::tester::Oracle;

/// Top-level wrappers of an egrep suite: unanchored, anchored at the
/// start, anchored at the end, anchored at both ends.
pub const TOP_WRAPPERS: [&str; 4] = ["", "^(?:%s)", "(?:%s)$", "^(?:%s)$"];

/// Parameters of an egrep suite. Alphabets are split into one atom or
/// symbol per character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EgrepParams {
    pub alphabet: String,
    pub bounds: Bounds,
    pub str_alphabet: String,
    pub wrapper: String,
    pub random_strings: Option<RandomSample>,
    pub random_regexps: Option<RandomSample>,
}

impl EgrepParams {
    #[must_use]
    pub fn new(alphabet: &str, max_atoms: usize, max_ops: usize, max_strlen: usize, str_alphabet: &str) -> Self {
        Self {
            alphabet: alphabet.to_string(),
            bounds: Bounds {
                max_atoms,
                max_ops,
                max_strlen,
            },
            str_alphabet: str_alphabet.to_string(),
            wrapper: String::new(),
            random_strings: None,
            random_regexps: None,
        }
    }

    #[must_use]
    pub fn with_wrapper(mut self, wrapper: &str) -> Self {
        self.wrapper = wrapper.to_string();
        self
    }
}

/// One character per element.
#[must_use]
pub fn split_chars(s: &str) -> Vec<String> {
    s.chars().map(String::from).collect()
}

/// Runs configurations and reports their summaries.
pub struct SuiteRunner<'a> {
    options: RunOptions,
    log: Option<&'a mut LogEmitter>,
    /// Summary lines and `--show-regexps` progress.
    output: Box<dyn Write + 'a>,
}

impl<'a> SuiteRunner<'a> {
    #[must_use]
    pub fn new(options: RunOptions) -> Self {
        Self {
            options,
            log: None,
            output: Box::new(std::io::stdout()),
        }
    }

    #[must_use]
    pub fn with_output(mut self, output: impl Write + 'a) -> Self {
        self.output = Box::new(output);
        self
    }

    #[must_use]
    pub fn with_log(mut self, log: &'a mut LogEmitter) -> Self {
        self.log = Some(log);
        self
    }

    #[must_use]
    pub fn options(&self) -> RunOptions {
        self.options
    }

    /// Verify one configuration and print its summary line.
    pub fn exhaustive_test<O: Oracle>(
        &mut self,
        config: RunConfig,
        oracle: &O,
    ) -> Result<RunSummary, HarnessError> {
        let topwrapper = config.topwrapper.as_ref().map(|t| t.source().to_string());
        let summary = {
            let mut tester = ExhaustiveTester::new(config, self.options)?.with_progress(&mut *self.output);
            if let Some(log) = self.log.as_deref_mut() {
                tester = tester.with_log(log);
            }
            let counters = tester.verify(oracle)?;
            RunSummary {
                topwrapper,
                regexps: counters.regexps,
                tests: counters.tests,
                failures: counters.failures,
                skipped: counters.skipped,
                max_strlen: tester.bounds().max_strlen,
                str_alphabet_len: tester.str_alphabet_len(),
            }
        };
        if self.options.show_regexps {
            writeln!(self.output)?;
        }
        writeln!(self.output, "{}", summary.line())?;
        Ok(summary)
    }

    /// Export one configuration's corpus to `out`.
    pub fn exhaustive_export<E: QueryEngine>(
        &mut self,
        config: RunConfig,
        engine: &E,
        out: &mut dyn Write,
    ) -> Result<RunCounters, HarnessError> {
        let mut tester = ExhaustiveTester::new(config, self.options)?.with_progress(&mut *self.output);
        if let Some(log) = self.log.as_deref_mut() {
            tester = tester.with_log(log);
        }
        tester.export(engine, out)
    }

    /// Run the egrep operators under each of the [`TOP_WRAPPERS`].
    pub fn egrep_test<O: Oracle>(
        &mut self,
        params: &EgrepParams,
        oracle: &O,
    ) -> Result<SuiteReport, HarnessError> {
        let mut report = SuiteReport::default();
        for top in TOP_WRAPPERS {
            let config = RunConfig::builder()
                .alphabet(split_chars(&params.alphabet))
                .ops(RegexpGenerator::egrep_ops())
                .bounds(params.bounds)
                .str_alphabet(split_chars(&params.str_alphabet))
                .wrapper(params.wrapper.as_str())
                .topwrapper(top)
                .random_strings(params.random_strings)
                .random_regexps(params.random_regexps)
                .build()?;
            report.runs.push(self.exhaustive_test(config, oracle)?);
        }
        Ok(report)
    }
}
