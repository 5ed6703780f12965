//! Test execution engine.

use abiprobe_fixture_exec::{UNDEFINED, execute_fixture_case};

use crate::fixtures::FixtureSet;
use crate::verify::VerificationResult;
use crate::{FixtureCase, diff};

/// Runs a fixture set and collects verification results.
pub struct TestRunner {
    /// Name of the test campaign.
    pub campaign: String,
    /// Contract mode being tested (strict, hardened or off).
    pub mode: String,
}

impl TestRunner {
    /// Create a new test runner.
    #[must_use]
    pub fn new(campaign: impl Into<String>, mode: impl Into<String>) -> Self {
        Self {
            campaign: campaign.into(),
            mode: mode.into(),
        }
    }

    /// Run all fixtures in a set that apply to this runner's mode.
    pub fn run(&self, fixture_set: &FixtureSet) -> Vec<VerificationResult> {
        fixture_set
            .cases
            .iter()
            .filter(|case| mode_matches(&self.mode, &case.mode))
            .map(|case| self.run_case(case))
            .collect()
    }

    fn run_case(&self, case: &FixtureCase) -> VerificationResult {
        let case_name = if case.mode.eq_ignore_ascii_case("both") {
            format!("{} [{}]", case.name, self.mode)
        } else {
            case.name.clone()
        };
        let checked = execute_case(case, &self.mode);
        VerificationResult {
            case_name,
            function: case.function.clone(),
            contract: case.contract.clone(),
            mode: self.mode.to_ascii_lowercase(),
            passed: checked.passed,
            expected: case.expected_output.clone(),
            actual: checked.actual,
            reference: checked.reference,
            violations: checked.violations,
            diff: checked.diff,
        }
    }
}

fn mode_matches(active_mode: &str, case_mode: &str) -> bool {
    let active = active_mode.to_ascii_lowercase();
    let case = case_mode.to_ascii_lowercase();
    case == active || (case == "both" && (active == "strict" || active == "hardened"))
}

struct Checked {
    passed: bool,
    actual: String,
    reference: Option<String>,
    violations: u64,
    diff: Option<String>,
}

/// First token of the status segment of a rendered output: `"ok; flags=1"`
/// has status `ok`, `"invalid_argument (0x80070057)"` has `invalid_argument`.
fn status_class(output: &str) -> &str {
    output
        .split(';')
        .next()
        .and_then(|segment| segment.split_whitespace().next())
        .unwrap_or("")
}

fn execute_case(case: &FixtureCase, active_mode: &str) -> Checked {
    // Fixture cases with mode=both execute under the runner's active mode.
    match execute_fixture_case(&case.function, &case.inputs, active_mode) {
        Ok(run) => {
            let mut notes = Vec::new();
            // Both sides report UB for a case that was not executed.
            if !run.parity {
                notes.push(format!(
                    "reference parity mismatch: reference={}, impl={}",
                    run.reference_output, run.impl_output
                ));
            }
            let status_ok = case.expected_status.as_deref().is_none_or(|expected| {
                run.impl_output == UNDEFINED || status_class(&run.impl_output).eq_ignore_ascii_case(expected)
            });
            if !status_ok {
                notes.push(format!(
                    "status mismatch: expected={}, actual={}",
                    case.expected_status.as_deref().unwrap_or_default(),
                    status_class(&run.impl_output)
                ));
            }
            let output_ok = run.impl_output == case.expected_output;

            let diff_out = if !output_ok {
                let mut rendered = diff::render_diff(&case.expected_output, &run.impl_output);
                for note in &notes {
                    rendered.push_str(note);
                    rendered.push('\n');
                }
                Some(rendered)
            } else if !notes.is_empty() {
                Some(notes.join("\n"))
            } else {
                run.note.clone()
            };

            Checked {
                passed: output_ok && run.parity && status_ok,
                actual: run.impl_output,
                reference: Some(run.reference_output),
                violations: run.violations,
                diff: diff_out,
            }
        }
        Err(err) => {
            let actual = format!("unsupported:{err}");
            Checked {
                passed: false,
                diff: Some(diff::render_diff(&case.expected_output, &actual)),
                actual,
                reference: None,
                violations: 0,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FixtureSet;

    fn fixture(cases: &str) -> FixtureSet {
        FixtureSet::from_json(&format!(
            r#"{{"version":"v1","family":"functions","captured_at":"2026-10-01T00:00:00Z","cases":[{cases}]}}"#
        ))
        .expect("valid fixture json")
    }

    #[test]
    fn strict_runner_executes_matching_cases() {
        let set = fixture(
            r#"{"name":"add_strict","function":"Add","inputs":{"lhs":2,"rhs":3},"expected_output":"5","mode":"strict"},
               {"name":"add_hardened","function":"Add","inputs":{"lhs":null,"rhs":3},"expected_output":"0","mode":"hardened"}"#,
        );
        let strict = TestRunner::new("smoke", "strict").run(&set);
        assert_eq!(strict.len(), 1);
        assert!(strict[0].passed, "{:?}", strict[0].diff);
        assert_eq!(strict[0].reference.as_deref(), Some("5"));
    }

    #[test]
    fn hardened_runner_records_violations() {
        let set = fixture(
            r#"{"name":"add_null","function":"Add","contract":"required-pointer","inputs":{"lhs":null,"rhs":3},"expected_output":"0","mode":"hardened"}"#,
        );
        let hardened = TestRunner::new("smoke", "hardened").run(&set);
        assert_eq!(hardened.len(), 1);
        assert!(hardened[0].passed, "{:?}", hardened[0].diff);
        assert_eq!(hardened[0].violations, 1);
        assert_eq!(hardened[0].contract, "required-pointer");
    }

    #[test]
    fn both_mode_fixture_executes_under_active_mode() {
        let set = fixture(
            r#"{"name":"add_both","function":"Add","inputs":{"lhs":1,"rhs":1},"expected_output":"2","mode":"both"}"#,
        );
        let strict = TestRunner::new("both", "strict").run(&set);
        let hardened = TestRunner::new("both", "hardened").run(&set);
        let off = TestRunner::new("both", "off").run(&set);
        assert_eq!(strict[0].case_name, "add_both [strict]");
        assert_eq!(hardened[0].case_name, "add_both [hardened]");
        assert!(strict[0].passed && hardened[0].passed);
        assert!(off.is_empty());
    }

    #[test]
    fn wrong_expectation_fails_with_diff() {
        let set = fixture(
            r#"{"name":"add_wrong","function":"Add","inputs":{"lhs":1,"rhs":1},"expected_output":"3","mode":"strict"}"#,
        );
        let results = TestRunner::new("smoke", "strict").run(&set);
        assert!(!results[0].passed);
        assert!(results[0].diff.as_deref().unwrap().contains("-3\n+2\n"));
    }

    #[test]
    fn unsupported_function_fails() {
        let set = fixture(
            r#"{"name":"nope","function":"NoSuchSymbol","inputs":{},"expected_output":"0","mode":"strict"}"#,
        );
        let results = TestRunner::new("smoke", "strict").run(&set);
        assert!(!results[0].passed);
        assert!(results[0].actual.starts_with("unsupported:"));
        assert_eq!(results[0].reference, None);
    }

    #[test]
    fn status_class_reads_leading_token() {
        assert_eq!(status_class("ok; flags=1 value=2"), "ok");
        assert_eq!(status_class("invalid_argument (0x80070057); flags=0 value=0"), "invalid_argument");
        assert_eq!(status_class(""), "");
    }
}
