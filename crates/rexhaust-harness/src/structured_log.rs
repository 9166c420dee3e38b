//! Structured JSONL logging for exhaustive runs.
//!
//! Provides:
//! - [`LogEntry`]: one JSONL record with required + optional fields.
//! - [`ArtifactIndex`]: links a run to its exported corpora with SHA-256 digests.
//! - [`LogEmitter`]: writes JSONL lines to a file or an in-memory buffer.
//! - [`validate_log_line`]: validates a single JSONL line against the schema.
//! - [`validate_log_file`]: validates an entire JSONL file.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::cell::RefCell;
use std::io::Write;
use std::path::Path;
use std::rc::Rc;

use rexhaust_core::{Anchor, EngineKind, Semantics};

// ---------------------------------------------------------------------------
// Log entry
// ---------------------------------------------------------------------------

/// Severity level for log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Outcome of a regexp, a string, or a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Pass,
    Fail,
    Skip,
}

/// Counter snapshot attached to run-level events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    pub regexps: u64,
    pub tests: u64,
    pub failures: u64,
    pub skipped: u64,
}

/// Canonical structured log entry.
///
/// Required fields: `timestamp`, `trace_id`, `level`, `event`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    // Required
    pub timestamp: String,
    pub trace_id: String,
    pub level: LogLevel,
    pub event: String,

    // Optional
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suite: Option<String>,
    /// Regexp text after top-level wrapping.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regexp: Option<String>,
    /// Input string, escaped the way the corpus escapes it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine: Option<EngineKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<Anchor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantics: Option<Semantics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counters: Option<CounterSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Paths of files the event wrote.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_refs: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl LogEntry {
    /// Create a new log entry with required fields only.
    #[must_use]
    pub fn new(trace_id: impl Into<String>, level: LogLevel, event: impl Into<String>) -> Self {
        Self {
            timestamp: now_utc(),
            trace_id: trace_id.into(),
            level,
            event: event.into(),
            suite: None,
            regexp: None,
            input: None,
            engine: None,
            anchor: None,
            semantics: None,
            outcome: None,
            counters: None,
            duration_ms: None,
            artifact_refs: None,
            details: None,
        }
    }

    #[must_use]
    pub fn with_suite(mut self, suite: impl Into<String>) -> Self {
        self.suite = Some(suite.into());
        self
    }

    #[must_use]
    pub fn with_regexp(mut self, regexp: impl Into<String>) -> Self {
        self.regexp = Some(regexp.into());
        self
    }

    /// Attach an input string. Non-UTF-8 bytes are replaced.
    #[must_use]
    pub fn with_input(mut self, escaped: &[u8]) -> Self {
        self.input = Some(String::from_utf8_lossy(escaped).into_owned());
        self
    }

    /// Set the engine, anchor and semantics of a disagreement.
    #[must_use]
    pub fn with_query(mut self, engine: EngineKind, anchor: Anchor, semantics: Semantics) -> Self {
        self.engine = Some(engine);
        self.anchor = Some(anchor);
        self.semantics = Some(semantics);
        self
    }

    #[must_use]
    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    #[must_use]
    pub fn with_counters(mut self, counters: CounterSnapshot) -> Self {
        self.counters = Some(counters);
        self
    }

    #[must_use]
    pub fn with_duration_ms(mut self, ms: u64) -> Self {
        self.duration_ms = Some(ms);
        self
    }

    #[must_use]
    pub fn with_artifacts(mut self, refs: Vec<String>) -> Self {
        self.artifact_refs = Some(refs);
        self
    }

    /// Set free-form details.
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Serialize to a single JSONL line (no trailing newline).
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ---------------------------------------------------------------------------
// Artifact index
// ---------------------------------------------------------------------------

/// A single artifact entry in the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactEntry {
    pub path: String,
    pub kind: String,
    pub sha256: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Artifact index linking a run to the corpora it produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactIndex {
    pub index_version: u32,
    pub run_id: String,
    pub suite: String,
    pub generated_utc: String,
    pub artifacts: Vec<ArtifactEntry>,
}

impl ArtifactIndex {
    #[must_use]
    pub fn new(run_id: impl Into<String>, suite: impl Into<String>) -> Self {
        Self {
            index_version: 1,
            run_id: run_id.into(),
            suite: suite.into(),
            generated_utc: now_utc(),
            artifacts: Vec::new(),
        }
    }

    /// Add an artifact, hashing its bytes.
    pub fn add(&mut self, path: impl Into<String>, kind: impl Into<String>, bytes: &[u8]) -> &mut Self {
        self.artifacts.push(ArtifactEntry {
            path: path.into(),
            kind: kind.into(),
            sha256: sha256_hex(bytes),
            size_bytes: Some(bytes.len() as u64),
            description: None,
        });
        self
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Lowercase hex SHA-256 digest.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

// ---------------------------------------------------------------------------
// Log emitter
// ---------------------------------------------------------------------------

/// Writes structured JSONL log entries to a file or a shared buffer.
pub struct LogEmitter {
    writer: Box<dyn Write>,
    seq: u64,
    suite: String,
    run_id: String,
}

/// In-memory sink shared with a [`LogEmitter`] created by
/// [`LogEmitter::to_buffer`].
#[derive(Debug, Clone, Default)]
pub struct LogBuffer(Rc<RefCell<Vec<u8>>>);

impl LogBuffer {
    /// Everything written so far, as text.
    #[must_use]
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl LogEmitter {
    /// Create an emitter that writes to a file.
    pub fn to_file(path: &Path, suite: &str, run_id: &str) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self {
            writer: Box::new(std::io::BufWriter::new(file)),
            seq: 0,
            suite: suite.to_string(),
            run_id: run_id.to_string(),
        })
    }

    /// Create an emitter that writes to memory. The returned buffer sees
    /// every line the emitter writes.
    #[must_use]
    pub fn to_buffer(suite: &str, run_id: &str) -> (Self, LogBuffer) {
        let buffer = LogBuffer::default();
        let emitter = Self {
            writer: Box::new(buffer.clone()),
            seq: 0,
            suite: suite.to_string(),
            run_id: run_id.to_string(),
        };
        (emitter, buffer)
    }

    fn next_trace_id(&mut self) -> String {
        self.seq += 1;
        format!("{}::{}::{:03}", self.suite, self.run_id, self.seq)
    }

    /// Start an entry with a fresh trace id and the suite name filled in.
    pub fn entry(&mut self, level: LogLevel, event: &str) -> LogEntry {
        let trace_id = self.next_trace_id();
        LogEntry::new(trace_id, level, event).with_suite(&self.suite)
    }

    /// Emit a fully-populated log entry.
    pub fn emit_entry(&mut self, mut entry: LogEntry) -> std::io::Result<()> {
        if entry.trace_id.is_empty() {
            entry.trace_id = self.next_trace_id();
        }
        if entry.suite.is_none() {
            entry.suite = Some(self.suite.clone());
        }
        self.write_line(&entry)
    }

    fn write_line(&mut self, entry: &LogEntry) -> std::io::Result<()> {
        let line = entry.to_jsonl().map_err(std::io::Error::other)?;
        writeln!(self.writer, "{line}")
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validation error for a log line.
#[derive(Debug)]
pub struct LogValidationError {
    pub line_number: usize,
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for LogValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "line {}: field '{}': {}",
            self.line_number, self.field, self.message
        )
    }
}

fn check_enum(
    obj: &serde_json::Map<String, serde_json::Value>,
    field: &str,
    allowed: &[&str],
    line_number: usize,
    errors: &mut Vec<LogValidationError>,
) {
    if let Some(value) = obj.get(field).and_then(|v| v.as_str())
        && !allowed.contains(&value)
    {
        errors.push(LogValidationError {
            line_number,
            field: field.to_string(),
            message: format!("invalid {field}: '{value}'"),
        });
    }
}

/// Validate a single JSONL line against the schema.
pub fn validate_log_line(
    line: &str,
    line_number: usize,
) -> Result<LogEntry, Vec<LogValidationError>> {
    let mut errors = Vec::new();

    let value: serde_json::Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            errors.push(LogValidationError {
                line_number,
                field: "<json>".to_string(),
                message: format!("invalid JSON: {e}"),
            });
            return Err(errors);
        }
    };

    let Some(obj) = value.as_object() else {
        errors.push(LogValidationError {
            line_number,
            field: "<root>".to_string(),
            message: "expected JSON object".to_string(),
        });
        return Err(errors);
    };

    for field in ["timestamp", "trace_id", "level", "event"] {
        if !obj.contains_key(field) {
            errors.push(LogValidationError {
                line_number,
                field: field.to_string(),
                message: "required field missing".to_string(),
            });
        }
    }

    check_enum(
        obj,
        "level",
        &["debug", "info", "warn", "error"],
        line_number,
        &mut errors,
    );
    check_enum(
        obj,
        "outcome",
        &["pass", "fail", "skip"],
        line_number,
        &mut errors,
    );
    check_enum(obj, "anchor", &["unanchored", "both"], line_number, &mut errors);
    check_enum(
        obj,
        "semantics",
        &["leftmost_first", "longest"],
        line_number,
        &mut errors,
    );

    // Mismatch events must say which regexp and input disagreed.
    if obj.get("event").and_then(|v| v.as_str()) == Some("mismatch") {
        for field in ["regexp", "input"] {
            if !obj.get(field).is_some_and(serde_json::Value::is_string) {
                errors.push(LogValidationError {
                    line_number,
                    field: field.to_string(),
                    message: "mismatch events must include this field".to_string(),
                });
            }
        }
    }

    if obj.get("event").and_then(|v| v.as_str()) == Some("artifacts_written")
        && !obj
            .get("artifact_refs")
            .and_then(|v| v.as_array())
            .is_some_and(|refs| !refs.is_empty())
    {
        errors.push(LogValidationError {
            line_number,
            field: "artifact_refs".to_string(),
            message: "artifacts_written events must list at least one artifact".to_string(),
        });
    }

    if let Some(trace_id) = obj.get("trace_id").and_then(|v| v.as_str())
        && trace_id.split("::").count() != 3
    {
        errors.push(LogValidationError {
            line_number,
            field: "trace_id".to_string(),
            message: format!(
                "trace_id should follow <suite>::<run_id>::<seq> format, got: '{trace_id}'"
            ),
        });
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    match serde_json::from_value::<LogEntry>(value) {
        Ok(entry) => Ok(entry),
        Err(e) => {
            errors.push(LogValidationError {
                line_number,
                field: "<deserialization>".to_string(),
                message: format!("failed to deserialize: {e}"),
            });
            Err(errors)
        }
    }
}

/// Validate an entire JSONL file.
///
/// Returns the total line count and any validation errors found.
pub fn validate_log_file(path: &Path) -> Result<(usize, Vec<LogValidationError>), std::io::Error> {
    let content = std::fs::read_to_string(path)?;
    let mut all_errors = Vec::new();
    let mut line_count = 0;

    for (i, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        line_count += 1;
        if let Err(errs) = validate_log_line(line, i + 1) {
            all_errors.extend(errs);
        }
    }

    Ok((line_count, all_errors))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Current time as RFC 3339 UTC with millisecond precision.
#[must_use]
pub fn now_utc() -> String {
    let duration = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    format_utc(duration.as_secs(), duration.subsec_millis())
}

fn format_utc(secs: u64, millis: u32) -> String {
    let days = secs / 86_400;
    let rem = secs % 86_400;
    let (year, month, day) = civil_from_days(days);
    format!(
        "{year:04}-{month:02}-{day:02}T{:02}:{:02}:{:02}.{millis:03}Z",
        rem / 3600,
        (rem % 3600) / 60,
        rem % 60,
    )
}

/// Days since 1970-01-01 to a proleptic Gregorian date.
fn civil_from_days(days: u64) -> (u64, u64, u64) {
    let z = days + 719_468;
    let era = z / 146_097;
    let doe = z % 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + u64::from(month <= 2);
    (year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_entry_serializes_required_fields() {
        let entry = LogEntry::new("egrep::run-1::001", LogLevel::Info, "run_start");
        let json = entry.to_jsonl().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(parsed["timestamp"].is_string());
        assert_eq!(parsed["trace_id"], "egrep::run-1::001");
        assert_eq!(parsed["level"], "info");
        assert_eq!(parsed["event"], "run_start");
        assert!(parsed.get("suite").is_none());
        assert!(parsed.get("regexp").is_none());
        assert!(parsed.get("counters").is_none());
    }

    #[test]
    fn log_entry_with_mismatch_fields() {
        let entry = LogEntry::new("egrep::run-1::002", LogLevel::Warn, "mismatch")
            .with_suite("egrep")
            .with_regexp("(?:a*)")
            .with_input(br#""ab""#)
            .with_query(EngineKind::PikeVm, Anchor::Both, Semantics::LeftmostFirst)
            .with_outcome(Outcome::Fail)
            .with_details(serde_json::json!({"expected": "0-2"}));
        let json = entry.to_jsonl().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["regexp"], "(?:a*)");
        assert_eq!(parsed["input"], "\"ab\"");
        assert_eq!(parsed["engine"], "pike_vm");
        assert_eq!(parsed["anchor"], "both");
        assert_eq!(parsed["semantics"], "leftmost_first");
        assert_eq!(parsed["outcome"], "fail");
        assert!(validate_log_line(&json, 1).is_ok());
    }

    #[test]
    fn validate_missing_required_field() {
        let json = r#"{"timestamp":"2026-01-01T00:00:00Z","level":"info","event":"test"}"#;
        let errors = validate_log_line(json, 1).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "trace_id"));
    }

    #[test]
    fn validate_invalid_level() {
        let json = r#"{"timestamp":"2026-01-01T00:00:00Z","trace_id":"a::b::c","level":"critical","event":"test"}"#;
        let errors = validate_log_line(json, 1).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "level"));
    }

    #[test]
    fn validate_mismatch_requires_regexp() {
        let json = r#"{"timestamp":"2026-01-01T00:00:00Z","trace_id":"a::b::c","level":"warn","event":"mismatch"}"#;
        let errors = validate_log_line(json, 1).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "regexp"));
        assert!(errors.iter().any(|e| e.field == "input"));
    }

    #[test]
    fn validate_bad_trace_id_format() {
        let json = r#"{"timestamp":"2026-01-01T00:00:00Z","trace_id":"no-separator","level":"info","event":"test"}"#;
        let errors = validate_log_line(json, 1).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "trace_id"));
        assert!(validate_log_line("not json at all", 1).is_err());
    }

    #[test]
    fn artifacts_written_requires_refs() {
        let bare = LogEntry::new("export::run-1::004", LogLevel::Info, "artifacts_written");
        let errors = validate_log_line(&bare.to_jsonl().unwrap(), 1).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "artifact_refs"));

        let listed = bare.with_artifacts(vec!["out/corpus.txt".to_string()]);
        let json = listed.to_jsonl().unwrap();
        let parsed = validate_log_line(&json, 1).unwrap();
        assert_eq!(parsed.artifact_refs, Some(vec!["out/corpus.txt".to_string()]));
    }

    #[test]
    fn artifact_index_hashes_contents() {
        let mut idx = ArtifactIndex::new("run-001", "export");
        idx.add("corpus.txt", "corpus", b"abc");
        let json = idx.to_json().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["index_version"], 1);
        assert_eq!(
            parsed["artifacts"][0]["sha256"],
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(parsed["artifacts"][0]["size_bytes"], 3);
    }

    #[test]
    fn emitter_generates_sequential_trace_ids() {
        let (mut emitter, buffer) = LogEmitter::to_buffer("egrep", "run-42");
        let e1 = emitter.entry(LogLevel::Info, "run_start");
        let e2 = emitter.entry(LogLevel::Info, "run_complete");
        assert_eq!(e1.trace_id, "egrep::run-42::001");
        assert_eq!(e2.trace_id, "egrep::run-42::002");
        emitter.emit_entry(e1).unwrap();
        emitter.emit_entry(e2).unwrap();
        let text = buffer.contents();
        assert_eq!(text.lines().count(), 2);
        for (i, line) in text.lines().enumerate() {
            assert!(validate_log_line(line, i + 1).is_ok());
        }
    }

    #[test]
    fn utc_formatting_is_calendar_exact() {
        assert_eq!(format_utc(0, 0), "1970-01-01T00:00:00.000Z");
        assert_eq!(format_utc(951_782_400, 5), "2000-02-29T00:00:00.005Z");
        assert_eq!(format_utc(1_767_225_599, 999), "2025-12-31T23:59:59.999Z");
    }
}
