use super::Validator;
use super::handoff::validate_handoff;
use crate::config::ValidationConfig;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info, warn};
use wavegate_core::{
    Checkpoint, CheckpointOutcome, CheckpointResult, Error, GateDescriptor, GateKind, GateReport,
    QualityGateResult,
};

/// Runs a checkpoint's gates one after another, then its handoff checks.
pub struct CheckpointValidator {
    /// Timeout for gates that do not set their own
    default_timeout: Duration,
}

impl CheckpointValidator {
    /// Default per-gate timeout
    pub const DEFAULT_GATE_TIMEOUT: Duration = Duration::from_secs(120);

    /// Validator with the 120 second default gate timeout.
    #[must_use]
    pub fn new() -> Self {
        Self {
            default_timeout: Self::DEFAULT_GATE_TIMEOUT,
        }
    }

    /// Validator using the configured default gate timeout.
    #[must_use]
    pub fn from_config(config: &ValidationConfig) -> Self {
        Self::new().with_default_timeout(config.gate_timeout())
    }

    /// Timeout for gates that do not set their own.
    #[must_use]
    pub fn with_default_timeout(mut self, default_timeout: Duration) -> Self {
        self.default_timeout = default_timeout;
        self
    }

    /// Runs one gate under its timeout and judges the report.
    ///
    /// The check runs on its own tokio task so a panicking check is recorded
    /// as a failed gate.
    pub async fn evaluate_gate(&self, gate: &GateDescriptor) -> QualityGateResult {
        let limit = gate.timeout.unwrap_or(self.default_timeout);
        let start = Instant::now();

        let check = Arc::clone(&gate.check);
        let mut handle = tokio::spawn(async move { check.check().await });
        let outcome = timeout(limit, &mut handle).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let report = match outcome {
            Err(_) => {
                handle.abort();
                let error = Error::GateTimeout {
                    label: gate.label.clone(),
                    timeout_ms: limit.as_millis() as u64,
                };
                warn!(gate = %gate.label, "{error}");
                return QualityGateResult {
                    label: gate.label.clone(),
                    passed: false,
                    message: error.to_string(),
                    duration_ms,
                    value: None,
                    timed_out: true,
                };
            }
            Ok(Err(join_error)) => Err(Error::GateExecution {
                label: gate.label.clone(),
                message: join_error.to_string(),
            }),
            Ok(Ok(Err(error))) => Err(Error::GateExecution {
                label: gate.label.clone(),
                message: error.to_string(),
            }),
            Ok(Ok(Ok(report))) => Ok(report),
        };

        match report {
            Ok(report) => judge(gate, &report, duration_ms),
            Err(error) => {
                warn!(gate = %gate.label, "{error}");
                QualityGateResult {
                    label: gate.label.clone(),
                    passed: false,
                    message: error.to_string(),
                    duration_ms,
                    value: None,
                    timed_out: false,
                }
            }
        }
    }
}

impl Default for CheckpointValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Validator for CheckpointValidator {
    async fn validate(&self, checkpoint: &Checkpoint) -> CheckpointResult {
        let mut gates = Vec::with_capacity(checkpoint.gates.len());
        for gate in &checkpoint.gates {
            let result = self.evaluate_gate(gate).await;
            debug!(
                checkpoint = %checkpoint.name,
                gate = %result.label,
                passed = result.passed,
                duration_ms = result.duration_ms,
                "Gate evaluated"
            );
            gates.push(result);
        }

        let handoffs: Vec<_> = checkpoint.handoffs.iter().map(validate_handoff).collect();

        let passed = gates.iter().all(|gate| gate.passed)
            && handoffs.iter().all(|handoff| handoff.valid);
        let outcome = CheckpointOutcome::decide(checkpoint.blocking, passed);

        info!(
            checkpoint = %checkpoint.name,
            blocking = checkpoint.blocking,
            %outcome,
            "Checkpoint validated"
        );

        CheckpointResult {
            checkpoint: checkpoint.name.clone(),
            blocking: checkpoint.blocking,
            passed,
            gates,
            handoffs,
            outcome,
        }
    }
}

fn judge(gate: &GateDescriptor, report: &GateReport, duration_ms: u64) -> QualityGateResult {
    let (passed, message) = match gate.kind {
        GateKind::Boolean => {
            if !report.failure_indicators.is_empty() {
                (
                    false,
                    format!(
                        "failure indicators found: {}",
                        report.failure_indicators.join(", ")
                    ),
                )
            } else {
                (report.success, report.message.clone())
            }
        }
        GateKind::Threshold { required } => match report.value {
            Some(actual) if actual >= required => {
                (true, format!("{actual} meets required {required}"))
            }
            Some(actual) => (false, format!("{actual} is below required {required}")),
            None => (false, format!("no value reported (required {required})")),
        },
    };

    QualityGateResult {
        label: gate.label.clone(),
        passed,
        message,
        duration_ms,
        value: report.value,
        timed_out: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::{FnCheck, StaticCheck};
    use tokio::time::sleep;
    use wavegate_core::{GateCheck, HandoffDescriptor};

    fn fixed(report: GateReport) -> Arc<dyn GateCheck> {
        Arc::new(StaticCheck::new(report))
    }

    #[tokio::test]
    async fn test_threshold_gate_compares_value() {
        let validator = CheckpointValidator::new();

        let below = GateDescriptor::threshold(
            "coverage",
            80.0,
            fixed(GateReport::measured(75.0, "coverage 75%")),
        );
        let result = validator.evaluate_gate(&below).await;
        assert!(!result.passed);
        assert_eq!(result.value, Some(75.0));

        let equal = GateDescriptor::threshold(
            "coverage",
            80.0,
            fixed(GateReport::measured(80.0, "coverage 80%")),
        );
        assert!(validator.evaluate_gate(&equal).await.passed);

        let missing = GateDescriptor::threshold("coverage", 80.0, fixed(GateReport::success("ok")));
        assert!(!validator.evaluate_gate(&missing).await.passed);
    }

    #[tokio::test]
    async fn test_boolean_gate_respects_indicators() {
        let validator = CheckpointValidator::new();

        let clean = GateDescriptor::boolean("tests", fixed(GateReport::success("all green")));
        assert!(validator.evaluate_gate(&clean).await.passed);

        let flagged = GateDescriptor::boolean(
            "tests",
            fixed(GateReport::success("done").with_failure_indicators(vec!["FAILED".to_owned()])),
        );
        let result = validator.evaluate_gate(&flagged).await;
        assert!(!result.passed);
        assert!(result.message.contains("FAILED"));

        let failed = GateDescriptor::boolean("tests", fixed(GateReport::failure("exit 1")));
        assert!(!validator.evaluate_gate(&failed).await.passed);
    }

    #[tokio::test]
    async fn test_gate_error_and_timeout_fail_the_gate() {
        let validator = CheckpointValidator::new();

        let erroring = GateDescriptor::boolean(
            "lint",
            Arc::new(FnCheck::new("broken", || async {
                Err(Error::Other("linter missing".to_owned()))
            })),
        );
        let result = validator.evaluate_gate(&erroring).await;
        assert!(!result.passed);
        assert!(!result.timed_out);
        assert!(result.message.contains("linter missing"));

        let hanging = GateDescriptor::boolean(
            "slow",
            Arc::new(FnCheck::new("hang", || async {
                sleep(Duration::from_secs(60)).await;
                Ok(GateReport::success("late"))
            })),
        )
        .with_timeout(Duration::from_millis(20));
        let result = validator.evaluate_gate(&hanging).await;
        assert!(!result.passed);
        assert!(result.timed_out);
        assert!(result.message.contains("timed out"));
    }

    #[tokio::test]
    async fn test_outcomes() {
        let validator = CheckpointValidator::new();

        let passing = Checkpoint::new("green", true)
            .with_gate(GateDescriptor::boolean("ok", fixed(GateReport::success("ok"))))
            .with_handoff(HandoffDescriptor::new("a", "b", "ctx"));
        let result = validator.validate(&passing).await;
        assert!(result.passed);
        assert_eq!(result.outcome, CheckpointOutcome::Continue);

        let blocking = Checkpoint::new("red", true)
            .with_gate(GateDescriptor::boolean("bad", fixed(GateReport::failure("no"))));
        assert_eq!(
            validator.validate(&blocking).await.outcome,
            CheckpointOutcome::Halt
        );

        let advisory = Checkpoint::new("amber", false)
            .with_handoff(HandoffDescriptor::new("a", "", "ctx"));
        let result = validator.validate(&advisory).await;
        assert!(!result.passed);
        assert_eq!(result.outcome, CheckpointOutcome::Warn);
        assert_eq!(result.invalid_handoffs(), vec!["a -> ".to_owned()]);
    }

    #[tokio::test]
    async fn test_empty_checkpoint_continues() {
        let result = CheckpointValidator::new()
            .validate(&Checkpoint::new("empty", true))
            .await;
        assert!(result.passed);
        assert_eq!(result.outcome, CheckpointOutcome::Continue);
    }

    #[tokio::test]
    async fn test_blocking_checkpoint_accepts_whitespace_handoff_context() {
        let checkpoint = Checkpoint::new("cp", true)
            .with_handoff(HandoffDescriptor::new("planner", "coder", " "));
        let result = CheckpointValidator::new().validate(&checkpoint).await;
        assert!(result.passed);
        assert!(result.handoffs[0].valid);
        assert_eq!(result.outcome, CheckpointOutcome::Continue);
    }
}
