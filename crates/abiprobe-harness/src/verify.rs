//! Output comparison and verification.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Result of verifying a single fixture case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Name of the test case.
    pub case_name: String,
    /// Exported symbol under test.
    pub function: String,
    /// Contract clause the case exercises.
    pub contract: String,
    /// Contract mode the case ran under.
    pub mode: String,
    /// Whether the case passed.
    pub passed: bool,
    /// Expected output.
    pub expected: String,
    /// Actual output from the exported entry point.
    pub actual: String,
    /// Output of the reference model, when the case executed.
    pub reference: Option<String>,
    /// Contract violations the entry point recorded.
    pub violations: u64,
    /// Diff or notes if the case failed.
    pub diff: Option<String>,
}

/// Per-function pass/fail tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionTally {
    pub passed: usize,
    pub failed: usize,
}

/// Aggregate verification summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationSummary {
    /// Total cases run.
    pub total: usize,
    /// Cases passed.
    pub passed: usize,
    /// Cases failed.
    pub failed: usize,
    /// Violations recorded across all cases.
    pub violations: u64,
    /// Individual results.
    pub results: Vec<VerificationResult>,
}

impl VerificationSummary {
    /// Build a summary from a list of results.
    #[must_use]
    pub fn from_results(results: Vec<VerificationResult>) -> Self {
        let total = results.len();
        let passed = results.iter().filter(|r| r.passed).count();
        let failed = total - passed;
        let violations = results.iter().map(|r| r.violations).sum();
        Self {
            total,
            passed,
            failed,
            violations,
            results,
        }
    }

    /// Returns true if all cases passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    /// Failed results, in run order.
    pub fn failures(&self) -> impl Iterator<Item = &VerificationResult> {
        self.results.iter().filter(|r| !r.passed)
    }

    /// Tally per exported symbol, sorted by name.
    #[must_use]
    pub fn by_function(&self) -> BTreeMap<&str, FunctionTally> {
        let mut tally: BTreeMap<&str, FunctionTally> = BTreeMap::new();
        for r in &self.results {
            let entry = tally.entry(r.function.as_str()).or_default();
            if r.passed {
                entry.passed += 1;
            } else {
                entry.failed += 1;
            }
        }
        tally
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(function: &str, passed: bool, violations: u64) -> VerificationResult {
        VerificationResult {
            case_name: format!("{function}_case"),
            function: function.to_string(),
            contract: String::new(),
            mode: "hardened".to_string(),
            passed,
            expected: "1".to_string(),
            actual: if passed { "1" } else { "2" }.to_string(),
            reference: Some("1".to_string()),
            violations,
            diff: None,
        }
    }

    #[test]
    fn summary_counts_and_tallies() {
        let summary = VerificationSummary::from_results(vec![
            result("Add", true, 0),
            result("Add", false, 1),
            result("Sum", true, 2),
        ]);
        assert_eq!((summary.total, summary.passed, summary.failed), (3, 2, 1));
        assert_eq!(summary.violations, 3);
        assert!(!summary.all_passed());
        assert_eq!(summary.failures().count(), 1);
        let tally = summary.by_function();
        assert_eq!(tally["Add"], FunctionTally { passed: 1, failed: 1 });
        assert_eq!(tally["Sum"], FunctionTally { passed: 1, failed: 0 });
    }

    #[test]
    fn empty_summary_passes() {
        assert!(VerificationSummary::from_results(Vec::new()).all_passed());
    }
}
