//! CLI entrypoint for the abiprobe conformance harness.

use std::path::{Path, PathBuf};

use abiprobe_harness::catalog_export::CatalogExport;
use abiprobe_harness::error::{HarnessError, write_file};
use abiprobe_harness::fixtures::fixture_paths;
use abiprobe_harness::layout_report::LayoutReport;
use abiprobe_harness::object_audit::ObjectAudit;
use abiprobe_harness::structured_log::{
    ArtifactIndex, LogEmitter, LogEntry, LogLevel, Outcome, StreamKind, now_utc, validate_log_file,
};
use abiprobe_harness::verify::{VerificationResult, VerificationSummary};
use abiprobe_harness::{ConformanceReport, FixtureSet, TestRunner};
use clap::{Parser, Subcommand};

/// Conformance tooling for abiprobe.
#[derive(Debug, Parser)]
#[command(name = "abiprobe-harness")]
#[command(about = "Conformance testing harness for the abiprobe interop boundary")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Verify the exported entry points against captured fixtures.
    Verify {
        /// Directory containing fixture JSON files.
        #[arg(long)]
        fixture: PathBuf,
        /// Output report path (markdown; JSON is written next to it).
        #[arg(long)]
        report: Option<PathBuf>,
        /// Structured JSONL log path.
        #[arg(long)]
        log: Option<PathBuf>,
    },
    /// Emit the layout descriptor of every canonical shape with digests.
    LayoutReport {
        /// Output path (markdown; JSON is written next to it).
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Export the entry point and interface registry as JSON.
    Catalog {
        /// Output JSON path; stdout when absent.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Run object lifecycle scenarios and report live-object accounting.
    ObjectAudit {
        /// Output JSON path; a markdown summary goes to stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Validate a structured JSONL log.
    ValidateLog {
        /// JSONL log path.
        #[arg(long)]
        path: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Verify { fixture, report, log } => verify(&fixture, report.as_deref(), log.as_deref())?,
        Command::LayoutReport { output } => {
            let report = LayoutReport::build();
            match output {
                Some(path) => {
                    write_file(&path, report.to_markdown())?;
                    write_file(&path.with_extension("json"), report.to_json()?)?;
                    eprintln!("Layout report written to {}", path.display());
                }
                None => print!("{}", report.to_markdown()),
            }
            let invalid = report.invalid().count();
            if invalid > 0 {
                return Err(HarnessError::LayoutInvalid(invalid).into());
            }
        }
        Command::Catalog { output } => {
            let export = CatalogExport::build();
            let json = export.to_json()?;
            match output {
                Some(path) => {
                    write_file(&path, json)?;
                    eprintln!(
                        "Catalog written to {}: {} entry points, {} interfaces",
                        path.display(),
                        export.entry_points.len(),
                        export.interfaces.len()
                    );
                }
                None => println!("{json}"),
            }
        }
        Command::ObjectAudit { output } => {
            let audit = ObjectAudit::run();
            print!("{}", audit.to_markdown());
            if let Some(path) = output {
                write_file(&path, audit.to_json()?)?;
            }
            if !audit.passed() {
                return Err(HarnessError::AuditFailed(audit.failures().join(", ")).into());
            }
        }
        Command::ValidateLog { path } => {
            let (lines, errors) = validate_log_file(&path).map_err(|e| HarnessError::Io {
                path: path.clone(),
                source: e,
            })?;
            for err in &errors {
                eprintln!("{err}");
            }
            eprintln!("{lines} line(s), {} error(s)", errors.len());
            if !errors.is_empty() {
                return Err(format!("{} invalid log line(s) in {}", errors.len(), path.display()).into());
            }
        }
    }
    Ok(())
}

fn verify(fixture: &Path, report: Option<&Path>, log: Option<&Path>) -> Result<(), HarnessError> {
    eprintln!("Verifying against fixtures in {}", fixture.display());
    let mut fixture_sets = Vec::new();
    for path in fixture_paths(fixture)? {
        match FixtureSet::from_file(&path) {
            Ok(set) => fixture_sets.push(set),
            Err(err) => eprintln!("Skipping {err}"),
        }
    }
    if fixture_sets.is_empty() {
        return Err(HarnessError::NoFixtures(fixture.to_path_buf()));
    }

    let runners = ["strict", "hardened", "off"].map(|mode| TestRunner::new("fixture-verify", mode));
    let mut results = Vec::new();
    for set in &fixture_sets {
        for runner in &runners {
            results.extend(runner.run(set));
        }
    }

    let summary = VerificationSummary::from_results(results);
    let report_doc = ConformanceReport {
        title: String::from("abiprobe Conformance Report"),
        mode: String::from("strict+hardened+off"),
        timestamp: now_utc(),
        summary,
    };

    eprintln!(
        "Verification complete: total={}, passed={}, failed={}",
        report_doc.summary.total, report_doc.summary.passed, report_doc.summary.failed
    );

    let mut artifacts = ArtifactIndex::new(run_id());
    if let Some(report_path) = report {
        eprintln!("Writing report to {}", report_path.display());
        let markdown = report_doc.to_markdown();
        let json = report_doc.to_json();
        let json_path = report_path.with_extension("json");
        write_file(report_path, &markdown)?;
        write_file(&json_path, &json)?;
        artifacts.add_contents(report_path.display().to_string(), "report", markdown.as_bytes());
        artifacts.add_contents(json_path.display().to_string(), "report_json", json.as_bytes());
    }

    if let Some(log_path) = log {
        write_log(log_path, &artifacts, &report_doc.summary)?;
        eprintln!("Structured log written to {}", log_path.display());
    }

    if !report_doc.summary.all_passed() {
        return Err(HarnessError::VerificationFailed {
            failed: report_doc.summary.failed,
            total: report_doc.summary.total,
        });
    }
    Ok(())
}

fn run_id() -> String {
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| d.as_secs());
    format!("run-{secs}")
}

fn case_entry(result: &VerificationResult) -> LogEntry {
    let (level, outcome) = if result.passed {
        (LogLevel::Info, Outcome::Pass)
    } else if result.actual.starts_with("unsupported:") {
        (LogLevel::Error, Outcome::Error)
    } else {
        (LogLevel::Error, Outcome::Fail)
    };
    let mut entry = LogEntry::new(String::new(), level, "case_result")
        .with_stream(StreamKind::Conformance)
        .with_mode(&result.mode)
        .with_symbol(&result.function, &result.contract)
        .with_outcome(outcome)
        .with_violations(result.violations);
    if !result.passed {
        entry = entry.with_details(serde_json::json!({
            "case": result.case_name,
            "expected": result.expected,
            "actual": result.actual,
            "reference": result.reference,
            "diff": result.diff,
        }));
    }
    entry
}

fn write_log(path: &Path, artifacts: &ArtifactIndex, summary: &VerificationSummary) -> Result<(), HarnessError> {
    let io = |e| HarnessError::Io {
        path: path.to_path_buf(),
        source: e,
    };
    let mut emitter = LogEmitter::to_file(path, "fixture-verify", &artifacts.run_id).map_err(io)?;
    emitter.emit(LogLevel::Info, "verify_start").map_err(io)?;
    for result in &summary.results {
        emitter.emit_entry(case_entry(result)).map_err(io)?;
    }
    let outcome = if summary.all_passed() { Outcome::Pass } else { Outcome::Fail };
    let mut done = LogEntry::new(String::new(), LogLevel::Info, "verify_complete")
        .with_stream(StreamKind::Conformance)
        .with_outcome(outcome)
        .with_violations(summary.violations)
        .with_details(serde_json::json!({
            "total": summary.total,
            "passed": summary.passed,
            "failed": summary.failed,
        }));
    if outcome == Outcome::Fail {
        done = done.with_symbol("*", "");
    }
    if !artifacts.artifacts.is_empty() {
        done = done.with_artifacts(artifacts.artifacts.iter().map(|a| a.path.clone()).collect());
    }
    emitter.emit_entry(done).map_err(io)?;
    emitter.flush().map_err(io)?;

    let index_path = path.with_extension("artifacts.json");
    write_file(&index_path, artifacts.to_json()?)
}
