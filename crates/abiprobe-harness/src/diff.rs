//! Diff rendering for fixture comparison.

use std::fmt::Write;

/// Render a line diff between expected and actual output.
///
/// Lines present on only one side are reported as added or removed.
#[must_use]
pub fn render_diff(expected: &str, actual: &str) -> String {
    if expected == actual {
        return String::from("[identical]");
    }

    let expected_lines: Vec<&str> = expected.lines().collect();
    let actual_lines: Vec<&str> = actual.lines().collect();
    let mut out = String::new();
    out.push_str("--- expected\n");
    out.push_str("+++ actual\n");
    for i in 0..expected_lines.len().max(actual_lines.len()) {
        let e = expected_lines.get(i);
        let a = actual_lines.get(i);
        if e == a {
            continue;
        }
        let _ = writeln!(out, "@@ line {} @@", i + 1);
        if let Some(e) = e {
            let _ = writeln!(out, "-{e}");
        }
        if let Some(a) = a {
            let _ = writeln!(out, "+{a}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_outputs() {
        assert_eq!(render_diff("3", "3"), "[identical]");
    }

    #[test]
    fn changed_line_is_reported_once() {
        let diff = render_diff("[1, 2]", "[1, 3]");
        assert_eq!(diff, "--- expected\n+++ actual\n@@ line 1 @@\n-[1, 2]\n+[1, 3]\n");
    }

    #[test]
    fn extra_actual_line_is_an_addition() {
        let diff = render_diff("ok", "ok\nextra");
        assert!(diff.ends_with("@@ line 2 @@\n+extra\n"));
    }
}
