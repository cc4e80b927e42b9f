//! Preflight capability gate.
//!
//! One check at process entry, never re-checked per stage: the host tools the
//! pipeline shells out to must be resolvable and the scratch locations must
//! be usable. The report is consumed by the top-level orchestrator; any
//! failure aborts before the resolver runs.

use std::path::Path;

use crate::archive::SEVEN_ZIP_BIN;
use crate::config::Config;
use crate::packager::WIMLIB_BIN;

/// Result of a single preflight check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub details: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    /// Check passed.
    Pass,
    /// Check failed - the run will fail.
    Fail,
}

impl CheckResult {
    fn pass(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Pass,
            details: None,
        }
    }

    fn fail(name: &str, details: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Fail,
            details: Some(details.to_string()),
        }
    }
}

/// Results of all preflight checks.
pub struct PreflightReport {
    pub checks: Vec<CheckResult>,
}

impl PreflightReport {
    /// Returns true if every check passed.
    pub fn all_passed(&self) -> bool {
        !self.checks.iter().any(|c| c.status == CheckStatus::Fail)
    }

    /// Print the report to stdout.
    pub fn print(&self) {
        for check in &self.checks {
            let status = match check.status {
                CheckStatus::Pass => "PASS",
                CheckStatus::Fail => "FAIL",
            };
            match &check.details {
                Some(details) => println!("  [{}] {}: {}", status, check.name, details),
                None => println!("  [{}] {}", status, check.name),
            }
        }
    }
}

/// Run the capability gate.
///
/// Check-only runs resolve the feed and write one text file, so the
/// extraction and capture tools are not required for them.
pub fn run_preflight(config: &Config, check_only: bool) -> PreflightReport {
    let mut checks = Vec::new();

    if !check_only {
        let required_tools = [
            (SEVEN_ZIP_BIN, "required to open the nested containers"),
            (WIMLIB_BIN, "required to capture the final image"),
        ];
        for (tool, purpose) in required_tools {
            checks.push(check_tool(tool, purpose));
        }
        checks.push(check_location("work directory", &config.work_dir));
    }
    checks.push(check_location("output directory", &config.output_dir));

    PreflightReport { checks }
}

fn check_tool(tool: &str, purpose: &str) -> CheckResult {
    match which::which(tool) {
        Ok(path) => CheckResult::pass(&format!("{} ({})", tool, path.display())),
        Err(_) => CheckResult::fail(tool, &format!("not found in PATH; {}", purpose)),
    }
}

/// A scratch location must either not exist yet or be a directory.
fn check_location(name: &str, path: &Path) -> CheckResult {
    if path.exists() && !path.is_dir() {
        CheckResult::fail(name, &format!("{} exists but is not a directory", path.display()))
    } else {
        CheckResult::pass(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn config_in(dir: &Path) -> Config {
        Config {
            feed_url: "https://feed.example/api/products".to_string(),
            work_dir: dir.join("work"),
            output_dir: dir.join("output"),
        }
    }

    #[test]
    fn nonexistent_directories_pass() {
        let tmp = TempDir::new().unwrap();
        let report = run_preflight(&config_in(tmp.path()), true);
        assert!(report.all_passed());
    }

    #[test]
    fn file_in_place_of_output_dir_fails() {
        let tmp = TempDir::new().unwrap();
        let config = config_in(tmp.path());
        fs::write(&config.output_dir, "in the way").unwrap();

        let report = run_preflight(&config, true);
        assert!(!report.all_passed());
    }

    #[test]
    fn check_only_skips_tool_checks() {
        let tmp = TempDir::new().unwrap();
        let report = run_preflight(&config_in(tmp.path()), true);
        assert!(report
            .checks
            .iter()
            .all(|c| !c.name.contains(SEVEN_ZIP_BIN) && !c.name.contains(WIMLIB_BIN)));
    }
}
