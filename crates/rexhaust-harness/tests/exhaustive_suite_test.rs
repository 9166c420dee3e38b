//! Integration test: exhaustive runs and the egrep suite.

use rexhaust_core::RegexpGenerator;
use rexhaust_harness::config::{Bounds, BoundsMode, RunConfig, RunOptions};
use rexhaust_harness::suite::{EgrepParams, SuiteRunner};
use rexhaust_harness::tester::BuildError;
use rexhaust_harness::{DifferentialOracle, ExhaustiveTester, HarnessError, Oracle, Tester};

/// Accepts everything.
struct Agree;

impl Tester for Agree {
    fn test_input(&mut self, _input: &[u8]) -> bool {
        true
    }
}

impl Oracle for Agree {
    type Tester = Agree;

    fn tester(&self, _regexp: &str) -> Result<Agree, BuildError> {
        Ok(Agree)
    }
}

/// Rejects every input of odd length.
struct OddLength;

impl Tester for OddLength {
    fn test_input(&mut self, input: &[u8]) -> bool {
        input.len() % 2 == 0
    }
}

impl Oracle for OddLength {
    type Tester = OddLength;

    fn tester(&self, _regexp: &str) -> Result<OddLength, BuildError> {
        Ok(OddLength)
    }
}

fn config(alphabet: &[&str], max_atoms: usize, max_ops: usize, max_strlen: usize) -> RunConfig {
    RunConfig::builder()
        .alphabet(alphabet.iter().copied())
        .ops(RegexpGenerator::egrep_ops())
        .str_alphabet(["a", "b"])
        .bounds(Bounds {
            max_atoms,
            max_ops,
            max_strlen,
        })
        .build()
        .expect("config should build")
}

#[test]
fn single_atoms_count_two_regexps() {
    let mut tester = ExhaustiveTester::new(config(&["a", "b"], 1, 0, 2), RunOptions::default())
        .expect("tester should build");
    let counters = tester.verify(&DifferentialOracle).expect("run should finish");
    assert_eq!(counters.regexps, 2);
    assert_eq!(counters.failures, 0);
    assert_eq!(counters.skipped, 0);
}

#[test]
fn egrep_suite_over_ab_is_clean() {
    let mut output = Vec::new();
    let report = SuiteRunner::new(RunOptions::default())
        .with_output(&mut output)
        .egrep_test(&EgrepParams::new("ab", 2, 1, 2, "ab"), &DifferentialOracle)
        .expect("suite should finish");
    assert_eq!(report.runs.len(), 4);
    assert_eq!(report.total_failures(), 0, "{}", String::from_utf8_lossy(&output));
    assert!(report.total_tests() > 0);
}

#[test]
fn wrapped_atoms_stay_clean() {
    let report = SuiteRunner::new(RunOptions::default())
        .with_output(std::io::sink())
        .egrep_test(
            &EgrepParams::new("ab", 2, 1, 2, "ab").with_wrapper("(%s)"),
            &DifferentialOracle,
        )
        .expect("suite should finish");
    assert_eq!(report.total_failures(), 0);
}

#[test]
fn broken_oracle_fails_but_never_exceeds_tests() {
    let mut output = Vec::new();
    let report = SuiteRunner::new(RunOptions::default())
        .with_output(&mut output)
        .egrep_test(&EgrepParams::new("ab", 2, 1, 2, "ab"), &OddLength)
        .expect("suite should finish");
    assert!(report.total_failures() > 0);
    for run in &report.runs {
        assert!(run.failures <= run.tests);
        // Each regexp fails once, on "a", after "" and "" pass.
        assert_eq!(run.failures, run.regexps);
        assert_eq!(run.tests, run.regexps * 3);
    }
    assert!(matches!(
        report.assert_clean(),
        Err(HarnessError::Failures { .. })
    ));
}

#[test]
fn reduced_bounds_never_grow_a_run() {
    for (max_atoms, max_ops, max_strlen) in [(1, 0, 0), (2, 1, 2), (3, 2, 3)] {
        let full = ExhaustiveTester::new(
            config(&["a", "b"], max_atoms, max_ops, max_strlen),
            RunOptions::default(),
        )
        .expect("tester should build")
        .verify(&Agree)
        .expect("run should finish");
        let options = RunOptions {
            bounds: BoundsMode::Reduced,
            ..RunOptions::default()
        };
        let reduced = ExhaustiveTester::new(config(&["a", "b"], max_atoms, max_ops, max_strlen), options)
            .expect("tester should build")
            .verify(&Agree)
            .expect("run should finish");
        assert!(reduced.regexps <= full.regexps);
        assert!(reduced.tests <= full.tests);
    }
}

#[test]
fn random_regexps_are_deterministic() {
    let run = || {
        let config = RunConfig::builder()
            .alphabet(["a", "b", "c"])
            .ops(RegexpGenerator::egrep_ops())
            .str_alphabet(["a", "b", "c"])
            .bounds(Bounds {
                max_atoms: 3,
                max_ops: 3,
                max_strlen: 3,
            })
            .random_regexps(Some("7:25".parse().expect("sample should parse")))
            .build()
            .expect("config should build");
        ExhaustiveTester::new(config, RunOptions::default())
            .expect("tester should build")
            .verify(&DifferentialOracle)
            .expect("run should finish")
    };
    let first = run();
    assert_eq!(first.regexps, 25);
    assert_eq!(first.failures, 0);
    assert_eq!(first, run());
}
