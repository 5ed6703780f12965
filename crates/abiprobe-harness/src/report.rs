//! Report generation for conformance results.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::verify::VerificationSummary;

/// A conformance report over one or more contract modes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConformanceReport {
    /// Report title.
    pub title: String,
    /// Contract modes tested (e.g. `strict+hardened`).
    pub mode: String,
    /// Timestamp (UTC).
    pub timestamp: String,
    /// Verification summary.
    pub summary: VerificationSummary,
}

impl ConformanceReport {
    /// Render the report as markdown.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# {}\n", self.title);
        let _ = writeln!(out, "- Mode: {}", self.mode);
        let _ = writeln!(out, "- Timestamp: {}", self.timestamp);
        let _ = writeln!(out, "- Total: {}", self.summary.total);
        let _ = writeln!(out, "- Passed: {}", self.summary.passed);
        let _ = writeln!(out, "- Failed: {}", self.summary.failed);
        let _ = writeln!(out, "- Violations recorded: {}\n", self.summary.violations);

        out.push_str("| Case | Function | Contract | Mode | Violations | Status |\n");
        out.push_str("|------|----------|----------|------|------------|--------|\n");
        for r in &self.summary.results {
            let status = if r.passed { "PASS" } else { "FAIL" };
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} | {} | {} |",
                r.case_name, r.function, r.contract, r.mode, r.violations, status
            );
        }

        if !self.summary.all_passed() {
            out.push_str("\n## Failures\n");
            for r in self.summary.failures() {
                let _ = writeln!(out, "\n### {}\n", r.case_name);
                out.push_str("```\n");
                out.push_str(r.diff.as_deref().unwrap_or("[no diff]"));
                if !out.ends_with('\n') {
                    out.push('\n');
                }
                out.push_str("```\n");
            }
        }
        out
    }

    /// Render the report as JSON.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::VerificationResult;

    fn report(passed: bool) -> ConformanceReport {
        ConformanceReport {
            title: "abiprobe Conformance Report".to_string(),
            mode: "strict+hardened".to_string(),
            timestamp: "2026-10-01T00:00:00Z".to_string(),
            summary: VerificationSummary::from_results(vec![VerificationResult {
                case_name: "sum_negative [hardened]".to_string(),
                function: "Sum".to_string(),
                contract: "explicit-length".to_string(),
                mode: "hardened".to_string(),
                passed,
                expected: "0".to_string(),
                actual: if passed { "0" } else { "7" }.to_string(),
                reference: Some("0".to_string()),
                violations: 1,
                diff: (!passed).then(|| "--- expected\n+++ actual\n@@ line 1 @@\n-0\n+7\n".to_string()),
            }]),
        }
    }

    #[test]
    fn markdown_lists_every_case() {
        let md = report(true).to_markdown();
        assert!(md.starts_with("# abiprobe Conformance Report\n"));
        assert!(md.contains("| sum_negative [hardened] | Sum | explicit-length | hardened | 1 | PASS |"));
        assert!(!md.contains("## Failures"));
    }

    #[test]
    fn markdown_includes_failure_diffs() {
        let md = report(false).to_markdown();
        assert!(md.contains("## Failures"));
        assert!(md.contains("-0\n+7\n```"));
    }

    #[test]
    fn json_round_trips_summary_counts() {
        let json = report(false).to_json();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["summary"]["failed"], 1);
        assert_eq!(parsed["summary"]["violations"], 1);
    }
}
