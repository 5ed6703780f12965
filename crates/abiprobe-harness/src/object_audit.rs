//! Object audit: lifecycle scenarios plus live-object accounting.

use std::collections::BTreeMap;
use std::fmt::Write;

use abiprobe_abi::runtime_policy;
use abiprobe_fixture_exec::run_lifecycle_scenarios;
use abiprobe_membrane::global_tracker;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioRow {
    pub name: String,
    pub passed: bool,
    pub failures: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectAudit {
    pub scenarios: Vec<ScenarioRow>,
    /// Objects created during the audit run.
    pub created: u64,
    /// Objects destroyed during the audit run.
    pub destroyed: u64,
    /// Objects still live afterwards, by type.
    pub live_by_type: BTreeMap<String, usize>,
    /// Contract violations recorded by the process so far.
    pub violations_recorded: u64,
}

impl ObjectAudit {
    /// Run every lifecycle scenario and account for the objects it made.
    #[must_use]
    pub fn run() -> Self {
        let run = run_lifecycle_scenarios();
        let scenarios = run
            .checks
            .into_iter()
            .map(|check| ScenarioRow {
                name: check.name.to_string(),
                passed: check.passed,
                failures: check.failures,
            })
            .collect();

        let mut live_by_type = BTreeMap::new();
        for meta in global_tracker().snapshot() {
            *live_by_type.entry(meta.type_name.to_string()).or_insert(0) += 1;
        }

        Self {
            scenarios,
            created: run.created,
            destroyed: run.destroyed,
            live_by_type,
            violations_recorded: runtime_policy::snapshot().total_violations,
        }
    }

    /// Every scenario passed and the run destroyed what it created.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.scenarios.iter().all(|s| s.passed) && self.created == self.destroyed
    }

    /// Names of failed scenarios, plus `leak` when the run left objects alive.
    #[must_use]
    pub fn failures(&self) -> Vec<String> {
        let mut failed: Vec<String> = self
            .scenarios
            .iter()
            .filter(|s| !s.passed)
            .map(|s| s.name.clone())
            .collect();
        if self.created != self.destroyed {
            failed.push(format!("leak ({} created, {} destroyed)", self.created, self.destroyed));
        }
        failed
    }

    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::from("# abiprobe Object Audit\n\n");
        let _ = writeln!(out, "- Created: {}", self.created);
        let _ = writeln!(out, "- Destroyed: {}", self.destroyed);
        let _ = writeln!(out, "- Violations recorded: {}\n", self.violations_recorded);
        out.push_str("| Scenario | Status |\n|----------|--------|\n");
        for s in &self.scenarios {
            let _ = writeln!(out, "| {} | {} |", s.name, if s.passed { "PASS" } else { "FAIL" });
        }
        for s in self.scenarios.iter().filter(|s| !s.passed) {
            let _ = writeln!(out, "\n## {}\n", s.name);
            for failure in &s.failures {
                let _ = writeln!(out, "- {failure}");
            }
        }
        out
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
