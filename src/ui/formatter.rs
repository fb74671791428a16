//! Pure formatting functions for UI output.
//!
//! Everything here writes to the terminal and nothing else. Colors come
//! from `console`, which drops them when the output is not a terminal.

use console::style;

use crate::increment::ReleasePlan;
use crate::validate::{Finding, ValidationReport};

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red(), message);
}

/// Format and print a warning message in yellow.
pub fn display_warning(message: &str) {
    eprintln!("{} {}", style("⚠ WARNING:").yellow(), message);
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

/// Title followed by an underline of the same width
pub fn format_header(title: &str, underline: char) -> String {
    let rule: String = std::iter::repeat(underline)
        .take(title.chars().count())
        .collect();
    format!("{}\n{}", title, rule)
}

/// Print a section header, e.g. `Checking deliverables/2024.1/nova.yaml`
pub fn display_header(title: &str) {
    println!("\n{}", style(format_header(title, '=')).bold());
}

fn format_findings(label: &str, findings: &[Finding]) -> String {
    let mut out = format!("{} {} found", findings.len(), label);
    for finding in findings {
        out.push_str("\n  ");
        out.push_str(&finding.to_string());
    }
    out
}

/// Plain-text summary: warnings first, then errors
pub fn format_summary(report: &ValidationReport) -> String {
    format!(
        "{}\n\n{}",
        format_findings("warnings", &report.warnings),
        format_findings("errors", &report.errors)
    )
}

pub fn display_summary(report: &ValidationReport) {
    println!("\n{}", style(format_header("Summary", '=')).bold());
    println!("\n{}", format_findings("warnings", &report.warnings));
    if report.errors.is_empty() {
        println!("\n{}", style(format_findings("errors", &report.errors)).green());
    } else {
        println!("\n{}", style(format_findings("errors", &report.errors)).red());
    }
}

/// One line per repository: `repo hash`, marking unchanged commits
pub fn format_release_plan(plan: &ReleasePlan) -> String {
    let mut out = format!(
        "{} {} {}: {} -> {}",
        plan.series, plan.deliverable, plan.release_type, plan.previous_version, plan.version
    );
    for project in &plan.projects {
        let marker = if project.is_changed() { "" } else { " (unchanged)" };
        out.push_str(&format!("\n  {} {}{}", project.repo, project.hash, marker));
    }
    if let Some(branch) = &plan.branch {
        out.push_str(&format!("\n  new branch {}", branch.name));
    }
    out
}

pub fn display_release_plan(plan: &ReleasePlan) {
    println!("\n{}", style("Proposed release:").bold());
    println!("{}", format_release_plan(plan));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::branch::{Branch, BranchLocation};
    use crate::increment::{PlannedProject, ReleaseType};
    use crate::validate::Severity;

    #[test]
    fn test_display_functions() {
        // Visual verification test - output goes to stdout/stderr
        display_error("test error");
        display_warning("test warning");
        display_success("test success");
        display_status("test status");
        display_header("Checking test.yaml");
    }

    #[test]
    fn test_format_header() {
        assert_eq!(format_header("Summary", '='), "Summary\n=======");
    }

    #[test]
    fn test_format_summary() {
        let report = ValidationReport {
            warnings: vec![],
            errors: vec![Finding {
                severity: Severity::Error,
                filename: "2024.1/nova.yaml".into(),
                rule: "team".into(),
                message: "no team specified".into(),
            }],
        };
        assert_eq!(
            format_summary(&report),
            "0 warnings found\n\n1 errors found\n  2024.1/nova.yaml [team]: no team specified"
        );
    }

    #[test]
    fn test_format_release_plan() {
        let plan = ReleasePlan {
            series: "2024.1".into(),
            deliverable: "nova".into(),
            release_type: ReleaseType::Rc,
            previous_version: "29.0.0.0b3".into(),
            version: "29.0.0.0rc1".into(),
            projects: vec![PlannedProject {
                repo: "openstack/nova".into(),
                hash: "abc".into(),
                previous_hash: Some("abc".into()),
            }],
            branch: Some(Branch::new(
                "stable/2024.1",
                BranchLocation::Version("29.0.0.0rc1".into()),
            )),
            has_changes: true,
        };
        let text = format_release_plan(&plan);
        assert!(text.starts_with("2024.1 nova rc: 29.0.0.0b3 -> 29.0.0.0rc1"));
        assert!(text.contains("openstack/nova abc (unchanged)"));
        assert!(text.ends_with("new branch stable/2024.1"));
    }
}
