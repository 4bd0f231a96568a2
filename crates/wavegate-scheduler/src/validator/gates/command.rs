use async_trait::async_trait;
use regex::Regex;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::debug;
use wavegate_core::{Error, GateCheck, GateReport, Result};

/// Output markers that turn a successful exit into a failed boolean report.
pub const DEFAULT_FAILURE_INDICATORS: &[&str] = &["FAILED", "panicked"];

/// Gate check that runs an external command.
///
/// Success is a zero exit status. When a value pattern is set, its first
/// capture group (or the whole match) is parsed from stdout as the report value.
#[derive(Debug, Clone)]
pub struct CommandCheck {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    value_pattern: Option<Regex>,
    failure_indicators: Vec<String>,
}

impl CommandCheck {
    /// Runs `program` with no arguments and the default failure indicators.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            value_pattern: None,
            failure_indicators: DEFAULT_FAILURE_INDICATORS
                .iter()
                .map(|indicator| (*indicator).to_owned())
                .collect(),
        }
    }

    /// Sets the command arguments.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Runs the command inside `working_dir`.
    #[must_use]
    pub fn with_working_dir(mut self, working_dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(working_dir.into());
        self
    }

    /// Sets the regex used to extract the numeric value from stdout.
    ///
    /// # Errors
    /// Returns `Error::Config` if the pattern does not compile.
    pub fn with_value_pattern(mut self, pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern)
            .map_err(|error| Error::Config(format!("Invalid value pattern '{pattern}': {error}")))?;
        self.value_pattern = Some(regex);
        Ok(self)
    }

    /// Replaces the output markers that fail a boolean check.
    #[must_use]
    pub fn with_failure_indicators(mut self, indicators: Vec<String>) -> Self {
        self.failure_indicators = indicators;
        self
    }

    fn extract_value(&self, stdout: &str) -> Option<f64> {
        let captures = self.value_pattern.as_ref()?.captures(stdout)?;
        let matched = captures.get(1).or_else(|| captures.get(0))?;
        matched.as_str().trim().parse().ok()
    }
}

#[async_trait]
impl GateCheck for CommandCheck {
    async fn check(&self) -> Result<GateReport> {
        let mut command = Command::new(&self.program);
        command.args(&self.args).kill_on_drop(true);
        if let Some(working_dir) = &self.working_dir {
            command.current_dir(working_dir);
        }

        let output = command.output().await.map_err(|error| {
            Error::Other(format!("Failed to run {}: {error}", self.describe()))
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        let found: Vec<String> = self
            .failure_indicators
            .iter()
            .filter(|indicator| {
                stdout.contains(indicator.as_str()) || stderr.contains(indicator.as_str())
            })
            .cloned()
            .collect();

        debug!(
            command = %self.describe(),
            status = %output.status,
            indicators = found.len(),
            "Command check finished"
        );

        Ok(GateReport {
            success: output.status.success(),
            value: self.extract_value(&stdout),
            message: format!("{} exited with {}", self.program, output.status),
            failure_indicators: found,
        })
    }

    fn describe(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::assertions_on_result_states,
    reason = "Test code has different conventions"
)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_successful_command_with_value() {
        let check = match CommandCheck::new("echo")
            .with_args(["coverage: 85.5%"])
            .with_value_pattern(r"coverage: ([0-9.]+)%")
        {
            Ok(check) => check,
            Err(error) => panic!("pattern rejected: {error}"),
        };

        let report = match check.check().await {
            Ok(report) => report,
            Err(error) => panic!("command failed to run: {error}"),
        };
        assert!(report.success);
        assert_eq!(report.value, Some(85.5));
        assert!(report.failure_indicators.is_empty());
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_failure() {
        let check = CommandCheck::new("sh").with_args(["-c", "exit 3"]);
        let report = match check.check().await {
            Ok(report) => report,
            Err(error) => panic!("command failed to run: {error}"),
        };
        assert!(!report.success);
        assert_eq!(report.value, None);
    }

    #[tokio::test]
    async fn test_failure_indicators_are_reported() {
        let check = CommandCheck::new("echo").with_args(["test result: FAILED. 1 passed; 2 failed"]);
        let report = match check.check().await {
            Ok(report) => report,
            Err(error) => panic!("command failed to run: {error}"),
        };
        assert!(report.success);
        assert_eq!(report.failure_indicators, vec!["FAILED".to_owned()]);
    }

    #[tokio::test]
    async fn test_missing_program_is_error() {
        let check = CommandCheck::new("wavegate-definitely-missing-binary");
        assert!(check.check().await.is_err());
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        match CommandCheck::new("echo").with_value_pattern("(unclosed") {
            Ok(_) => panic!("expected invalid pattern"),
            Err(error) => assert!(error.is_configuration_error()),
        }
    }

    #[test]
    fn test_describe() {
        let check = CommandCheck::new("cargo").with_args(["test", "--quiet"]);
        assert_eq!(check.describe(), "cargo test --quiet");
    }
}
