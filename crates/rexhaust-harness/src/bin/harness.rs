//! CLI entrypoint for the rexhaust harness.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use rexhaust_core::{ReferenceEngine, RegexpGenerator};
use rexhaust_harness::config::{Bounds, BoundsMode, RandomSample, RunConfig, RunOptions};
use rexhaust_harness::structured_log::{ArtifactIndex, LogEmitter, LogLevel, validate_log_file};
use rexhaust_harness::suite::{EgrepParams, SuiteRunner, split_chars};
use rexhaust_harness::{Corpus, DifferentialOracle, replay};

/// Bounded-exhaustive differential testing for regexp engines.
#[derive(Debug, Parser)]
#[command(name = "harness")]
#[command(about = "Bounded-exhaustive differential testing for regexp engines")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check every generated regexp against every generated string.
    Verify {
        #[command(flatten)]
        run: RunArgs,
        #[command(flatten)]
        options: OptionArgs,
    },
    /// Run the egrep operators under all four top-level anchorings.
    Egrep {
        /// Regexp atoms, one per character.
        #[arg(long, default_value = "abc")]
        alphabet: String,
        #[arg(long, default_value_t = 3)]
        max_atoms: usize,
        #[arg(long, default_value_t = 2)]
        max_ops: usize,
        #[arg(long, default_value_t = 4)]
        max_strlen: usize,
        /// String symbols, one per character.
        #[arg(long, default_value = "abc")]
        str_alphabet: String,
        /// Template applied to every atom.
        #[arg(long)]
        wrapper: Option<String>,
        /// Random strings appended to the enumeration (`SEED:COUNT`).
        #[arg(long)]
        random_strings: Option<RandomSample>,
        /// Random regexps instead of the enumeration (`SEED:COUNT`).
        #[arg(long)]
        random_regexps: Option<RandomSample>,
        /// Suite report path (JSON).
        #[arg(long)]
        report: Option<PathBuf>,
        #[command(flatten)]
        options: OptionArgs,
    },
    /// Write the reference engine's answers as a corpus.
    Export {
        #[command(flatten)]
        run: RunArgs,
        #[command(flatten)]
        options: OptionArgs,
        /// Corpus path (stdout when omitted).
        #[arg(long)]
        output: Option<PathBuf>,
        /// Artifact index JSON path.
        #[arg(long)]
        index: Option<PathBuf>,
    },
    /// Re-run an exported corpus against the reference engine.
    Replay {
        #[arg(long)]
        corpus: PathBuf,
        /// Output report path (markdown).
        #[arg(long)]
        report: Option<PathBuf>,
        /// Output report path (JSON).
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Check a JSONL log written with `--log`.
    ValidateLog {
        #[arg(long)]
        path: PathBuf,
    },
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Regexp atoms, one per character.
    #[arg(long, default_value = "")]
    alphabet: String,
    /// Additional multi-character atom (repeatable).
    #[arg(long = "atom")]
    atoms: Vec<String>,
    /// Operator template (repeatable); `egrep` selects the egrep set.
    #[arg(long = "ops", default_value = "egrep")]
    ops: Vec<String>,
    #[arg(long, default_value_t = 1)]
    max_atoms: usize,
    #[arg(long, default_value_t = 0)]
    max_ops: usize,
    #[arg(long, default_value_t = 0)]
    max_strlen: usize,
    /// String symbols, one per character.
    #[arg(long, default_value = "")]
    str_alphabet: String,
    /// Template applied to every atom.
    #[arg(long)]
    wrapper: Option<String>,
    /// Template applied to every generated regexp.
    #[arg(long)]
    topwrapper: Option<String>,
    /// Random strings appended to the enumeration (`SEED:COUNT`).
    #[arg(long)]
    random_strings: Option<RandomSample>,
    /// Random regexps instead of the enumeration (`SEED:COUNT`).
    #[arg(long)]
    random_regexps: Option<RandomSample>,
}

impl RunArgs {
    fn config(&self) -> Result<RunConfig, rexhaust_harness::config::ConfigError> {
        let mut atoms = split_chars(&self.alphabet);
        atoms.extend(self.atoms.iter().cloned());
        let ops: Vec<String> = if self.ops.iter().any(|op| op == "egrep") {
            RegexpGenerator::egrep_ops()
                .into_iter()
                .chain(self.ops.iter().filter(|op| *op != "egrep").cloned())
                .collect()
        } else {
            self.ops.clone()
        };
        let mut builder = RunConfig::builder()
            .alphabet(atoms)
            .ops(ops)
            .bounds(Bounds {
                max_atoms: self.max_atoms,
                max_ops: self.max_ops,
                max_strlen: self.max_strlen,
            })
            .str_alphabet(split_chars(&self.str_alphabet))
            .random_strings(self.random_strings)
            .random_regexps(self.random_regexps);
        if let Some(wrapper) = &self.wrapper {
            builder = builder.wrapper(wrapper.as_str());
        }
        if let Some(topwrapper) = &self.topwrapper {
            builder = builder.topwrapper(topwrapper.as_str());
        }
        builder.build()
    }
}

#[derive(Debug, Args)]
struct OptionArgs {
    /// Print each regexp as it is tested.
    #[arg(long)]
    show_regexps: bool,
    /// Stop testing a regexp after this many failing strings.
    #[arg(long, default_value_t = 1)]
    max_bad_inputs: u64,
    /// `full` or `reduced` (defaults to `$REXHAUST_BOUNDS`).
    #[arg(long)]
    bounds: Option<String>,
    /// Structured JSONL log path.
    #[arg(long)]
    log: Option<PathBuf>,
}

impl OptionArgs {
    fn options(&self) -> RunOptions {
        RunOptions {
            show_regexps: self.show_regexps,
            max_bad_inputs: self.max_bad_inputs,
            bounds: self
                .bounds
                .as_deref()
                .map_or_else(BoundsMode::from_env, BoundsMode::from_str_loose),
        }
    }

    fn open_log(&self, suite: &str) -> std::io::Result<Option<LogEmitter>> {
        self.log
            .as_deref()
            .map(|path| LogEmitter::to_file(path, suite, &format!("run-{}", std::process::id())))
            .transpose()
    }
}

fn runner<'a>(options: &OptionArgs, log: Option<&'a mut LogEmitter>) -> SuiteRunner<'a> {
    let runner = SuiteRunner::new(options.options());
    match log {
        Some(log) => runner.with_log(log),
        None => runner,
    }
}

fn write_file(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)
}

/// Ok(false) when the run completed with failures.
fn run(cli: Cli) -> Result<bool, Box<dyn std::error::Error>> {
    match cli.command {
        Command::Verify { run, options } => {
            let mut log = options.open_log("verify")?;
            let summary = runner(&options, log.as_mut()).exhaustive_test(run.config()?, &DifferentialOracle)?;
            if let Some(log) = log.as_mut() {
                log.flush()?;
            }
            Ok(summary.failures == 0)
        }
        Command::Egrep {
            alphabet,
            max_atoms,
            max_ops,
            max_strlen,
            str_alphabet,
            wrapper,
            random_strings,
            random_regexps,
            report: report_path,
            options,
        } => {
            let mut params = EgrepParams::new(&alphabet, max_atoms, max_ops, max_strlen, &str_alphabet);
            if let Some(wrapper) = wrapper {
                params = params.with_wrapper(&wrapper);
            }
            params.random_strings = random_strings;
            params.random_regexps = random_regexps;
            let mut log = options.open_log("egrep")?;
            let report = runner(&options, log.as_mut()).egrep_test(&params, &DifferentialOracle)?;
            if let Some(log) = log.as_mut() {
                log.flush()?;
            }
            if let Some(path) = report_path {
                write_file(&path, report.to_json().as_bytes())?;
            }
            if report.total_failures() > 0 {
                eprintln!("{} failures in {} tests", report.total_failures(), report.total_tests());
            }
            Ok(report.total_failures() == 0)
        }
        Command::Export {
            run,
            options,
            output,
            index,
        } => {
            let mut log = options.open_log("export")?;
            let mut corpus = Vec::new();
            let counters = runner(&options, log.as_mut())
                .with_output(std::io::stderr())
                .exhaustive_export(run.config()?, &ReferenceEngine, &mut corpus)?;
            let mut written = Vec::new();
            match &output {
                Some(path) => {
                    write_file(path, &corpus)?;
                    written.push(path.display().to_string());
                    eprintln!("Wrote {} regexps to {}", counters.regexps, path.display());
                }
                None => {
                    let mut stdout = std::io::stdout().lock();
                    stdout.write_all(&corpus)?;
                    stdout.flush()?;
                }
            }
            if let Some(index_path) = index {
                let name = output
                    .as_ref()
                    .map_or_else(|| "-".to_string(), |p| p.display().to_string());
                let mut artifacts = ArtifactIndex::new(format!("run-{}", std::process::id()), "export");
                artifacts.add(name, "corpus", &corpus);
                write_file(&index_path, artifacts.to_json()?.as_bytes())?;
                written.push(index_path.display().to_string());
            }
            if let Some(log) = log.as_mut() {
                if !written.is_empty() {
                    let entry = log
                        .entry(LogLevel::Info, "artifacts_written")
                        .with_artifacts(written);
                    log.emit_entry(entry)?;
                }
                log.flush()?;
            }
            Ok(true)
        }
        Command::Replay {
            corpus,
            report,
            json,
        } => {
            let bytes = std::fs::read(&corpus)?;
            let parsed = Corpus::parse(&bytes)?;
            let result = replay(&parsed, &ReferenceEngine, &format!("Replay of {}", corpus.display()));
            if let Some(path) = report {
                write_file(&path, result.to_markdown().as_bytes())?;
            }
            if let Some(path) = json {
                write_file(&path, result.to_json().as_bytes())?;
            }
            println!(
                "{} regexps, {} queries, {} failed",
                result.summary.regexps, result.summary.total, result.summary.failed
            );
            Ok(result.all_passed())
        }
        Command::ValidateLog { path } => {
            let (lines, errors) = validate_log_file(&path)?;
            for err in &errors {
                eprintln!("{err}");
            }
            println!("{lines} lines, {} errors", errors.len());
            Ok(errors.is_empty())
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
