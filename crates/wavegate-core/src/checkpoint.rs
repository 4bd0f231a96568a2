//! Checkpoint descriptors and validation results.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::traits::GateCheck;
use crate::{Error, Result};

/// Tagged result reported by a gate check.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GateReport {
    /// Whether the underlying validation reported success
    pub success: bool,
    /// Numeric value extracted by the check (coverage, score, ...)
    pub value: Option<f64>,
    /// Human-readable detail
    pub message: String,
    /// Failure indicators the check recognised in its output
    #[serde(default)]
    pub failure_indicators: Vec<String>,
}

impl GateReport {
    /// Successful report without a numeric value.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            value: None,
            message: message.into(),
            failure_indicators: Vec::new(),
        }
    }

    /// Failed report without a numeric value.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            value: None,
            message: message.into(),
            failure_indicators: Vec::new(),
        }
    }

    /// Successful report carrying a measured value.
    pub fn measured(value: f64, message: impl Into<String>) -> Self {
        Self {
            success: true,
            value: Some(value),
            message: message.into(),
            failure_indicators: Vec::new(),
        }
    }

    /// Attaches recognised failure indicators.
    #[must_use]
    pub fn with_failure_indicators(mut self, indicators: Vec<String>) -> Self {
        self.failure_indicators = indicators;
        self
    }
}

/// How a gate's report is judged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GateKind {
    /// Passes iff the check succeeds and reports no failure indicator
    Boolean,
    /// Passes iff the reported value is at least `required`
    Threshold {
        /// Minimum acceptable value
        required: f64,
    },
}

impl fmt::Display for GateKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean => formatter.write_str("boolean"),
            Self::Threshold { required } => write!(formatter, "threshold >= {required}"),
        }
    }
}

/// One named check inside a checkpoint.
#[derive(Clone)]
pub struct GateDescriptor {
    /// Gate label, unique within its checkpoint
    pub label: String,
    /// How the report is judged
    pub kind: GateKind,
    /// Reference to the external check
    pub check: Arc<dyn GateCheck>,
    /// Per-gate timeout overriding the validator default
    pub timeout: Option<Duration>,
}

impl GateDescriptor {
    /// Creates a boolean gate.
    pub fn boolean(label: impl Into<String>, check: Arc<dyn GateCheck>) -> Self {
        Self {
            label: label.into(),
            kind: GateKind::Boolean,
            check,
            timeout: None,
        }
    }

    /// Creates a threshold gate.
    pub fn threshold(label: impl Into<String>, required: f64, check: Arc<dyn GateCheck>) -> Self {
        Self {
            label: label.into(),
            kind: GateKind::Threshold { required },
            check,
            timeout: None,
        }
    }

    /// Overrides the timeout for this gate.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl fmt::Debug for GateDescriptor {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("GateDescriptor")
            .field("label", &self.label)
            .field("kind", &self.kind)
            .field("check", &self.check.describe())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Declared context transfer between two workers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffDescriptor {
    /// Worker handing off
    pub from: String,
    /// Worker receiving
    pub to: String,
    /// Context being transferred
    pub context: String,
}

impl HandoffDescriptor {
    /// Creates a handoff descriptor.
    pub fn new(from: impl Into<String>, to: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            context: context.into(),
        }
    }

    /// Names of the empty fields, if any. Whitespace counts as content.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.from.is_empty() {
            missing.push("from");
        }
        if self.to.is_empty() {
            missing.push("to");
        }
        if self.context.is_empty() {
            missing.push("context");
        }
        missing
    }
}

/// A named, optionally blocking validation step between waves.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    /// Checkpoint name
    pub name: String,
    /// Whether a failure halts the run
    pub blocking: bool,
    /// Ordered quality gates
    pub gates: Vec<GateDescriptor>,
    /// Handoffs validated structurally
    pub handoffs: Vec<HandoffDescriptor>,
}

impl Checkpoint {
    /// Creates an empty checkpoint.
    pub fn new(name: impl Into<String>, blocking: bool) -> Self {
        Self {
            name: name.into(),
            blocking,
            gates: Vec::new(),
            handoffs: Vec::new(),
        }
    }

    /// Appends a gate.
    #[must_use]
    pub fn with_gate(mut self, gate: GateDescriptor) -> Self {
        self.gates.push(gate);
        self
    }

    /// Appends a handoff.
    #[must_use]
    pub fn with_handoff(mut self, handoff: HandoffDescriptor) -> Self {
        self.handoffs.push(handoff);
        self
    }

    /// Structural validation of the descriptor itself.
    ///
    /// Handoff content is not checked here; empty handoff fields are a
    /// checkpoint *failure*, not a malformed descriptor.
    ///
    /// # Errors
    /// Returns `Error::InvalidCheckpoint` if the name is empty, a gate label is
    /// empty or repeated, or a threshold is not finite.
    pub fn validate_descriptor(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(self.invalid("checkpoint name is empty"));
        }

        let mut labels = HashSet::new();
        for gate in &self.gates {
            if gate.label.trim().is_empty() {
                return Err(self.invalid("gate label is empty"));
            }
            if !labels.insert(gate.label.as_str()) {
                return Err(self.invalid(&format!("duplicate gate label '{}'", gate.label)));
            }
            if let GateKind::Threshold { required } = gate.kind
                && !required.is_finite()
            {
                return Err(self.invalid(&format!(
                    "gate '{}' has a non-finite threshold",
                    gate.label
                )));
            }
            if gate.timeout.is_some_and(|timeout| timeout.is_zero()) {
                return Err(self.invalid(&format!("gate '{}' has a zero timeout", gate.label)));
            }
        }

        Ok(())
    }

    fn invalid(&self, reason: &str) -> Error {
        Error::InvalidCheckpoint {
            checkpoint: self.name.clone(),
            reason: reason.to_owned(),
        }
    }
}

/// Result of a single quality gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityGateResult {
    /// Gate label
    pub label: String,
    /// Whether the gate passed
    pub passed: bool,
    /// Detail message (includes the error for failed or timed out checks)
    pub message: String,
    /// Duration in milliseconds
    pub duration_ms: u64,
    /// Measured value, when the check reported one
    pub value: Option<f64>,
    /// Whether the check exceeded its timeout
    #[serde(default)]
    pub timed_out: bool,
}

/// Structural validity of a handoff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffResult {
    /// Worker handing off
    pub from: String,
    /// Worker receiving
    pub to: String,
    /// Whether all fields are non-empty
    pub valid: bool,
    /// Why the handoff is invalid
    pub reason: Option<String>,
}

/// Decision produced by a checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckpointOutcome {
    /// Proceed to the next wave
    Continue,
    /// Proceed, but record the failure
    Warn,
    /// Stop the run
    Halt,
}

impl CheckpointOutcome {
    /// Derives the outcome from the blocking flag and the aggregate verdict.
    pub fn decide(blocking: bool, passed: bool) -> Self {
        match (passed, blocking) {
            (true, _) => Self::Continue,
            (false, true) => Self::Halt,
            (false, false) => Self::Warn,
        }
    }
}

impl fmt::Display for CheckpointOutcome {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Continue => "CONTINUE",
            Self::Warn => "WARN",
            Self::Halt => "HALT",
        };
        formatter.write_str(label)
    }
}

/// Result of validating a checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointResult {
    /// Checkpoint name
    pub checkpoint: String,
    /// Whether the checkpoint was blocking
    pub blocking: bool,
    /// All gates passed and all handoffs valid
    pub passed: bool,
    /// Per-gate results in declaration order
    pub gates: Vec<QualityGateResult>,
    /// Per-handoff validity in declaration order
    pub handoffs: Vec<HandoffResult>,
    /// Resulting decision
    pub outcome: CheckpointOutcome,
}

impl CheckpointResult {
    /// Labels of failed gates.
    pub fn failing_gates(&self) -> Vec<String> {
        self.gates
            .iter()
            .filter(|gate| !gate.passed)
            .map(|gate| gate.label.clone())
            .collect()
    }

    /// `from -> to` descriptions of invalid handoffs.
    pub fn invalid_handoffs(&self) -> Vec<String> {
        self.handoffs
            .iter()
            .filter(|handoff| !handoff.valid)
            .map(|handoff| format!("{} -> {}", handoff.from, handoff.to))
            .collect()
    }
}

#[cfg(test)]
#[allow(
    clippy::assertions_on_result_states,
    reason = "Test code has different conventions"
)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct NoopCheck;

    #[async_trait]
    impl GateCheck for NoopCheck {
        async fn check(&self) -> Result<GateReport> {
            Ok(GateReport::success("ok"))
        }

        fn describe(&self) -> String {
            "noop".to_owned()
        }
    }

    #[test]
    fn test_outcome_decision_table() {
        assert_eq!(CheckpointOutcome::decide(true, true), CheckpointOutcome::Continue);
        assert_eq!(CheckpointOutcome::decide(false, true), CheckpointOutcome::Continue);
        assert_eq!(CheckpointOutcome::decide(true, false), CheckpointOutcome::Halt);
        assert_eq!(CheckpointOutcome::decide(false, false), CheckpointOutcome::Warn);
    }

    #[test]
    fn test_handoff_missing_fields() {
        let complete = HandoffDescriptor::new("planner", "coder", "api shape");
        assert!(complete.missing_fields().is_empty());

        let partial = HandoffDescriptor::new("planner", "", "");
        assert_eq!(partial.missing_fields(), vec!["to", "context"]);

        let blank = HandoffDescriptor::new(" ", "coder", "  ");
        assert!(blank.missing_fields().is_empty());
    }

    #[test]
    fn test_descriptor_validation() {
        let check: Arc<dyn GateCheck> = Arc::new(NoopCheck);

        let valid = Checkpoint::new("post-build", true)
            .with_gate(GateDescriptor::boolean("lint", Arc::clone(&check)))
            .with_gate(GateDescriptor::threshold("coverage", 80.0, Arc::clone(&check)));
        assert!(valid.validate_descriptor().is_ok());

        let unnamed = Checkpoint::new(" ", true);
        assert!(matches!(
            unnamed.validate_descriptor(),
            Err(Error::InvalidCheckpoint { .. })
        ));

        let duplicate = Checkpoint::new("cp", false)
            .with_gate(GateDescriptor::boolean("lint", Arc::clone(&check)))
            .with_gate(GateDescriptor::boolean("lint", Arc::clone(&check)));
        assert!(duplicate.validate_descriptor().is_err());

        let nan = Checkpoint::new("cp", false)
            .with_gate(GateDescriptor::threshold("coverage", f64::NAN, check));
        assert!(nan.validate_descriptor().is_err());
    }

    #[test]
    fn test_failing_gate_names() {
        let result = CheckpointResult {
            checkpoint: "cp".to_owned(),
            blocking: true,
            passed: false,
            gates: vec![
                QualityGateResult {
                    label: "lint".to_owned(),
                    passed: true,
                    message: String::new(),
                    duration_ms: 1,
                    value: None,
                    timed_out: false,
                },
                QualityGateResult {
                    label: "coverage".to_owned(),
                    passed: false,
                    message: "75 < 80".to_owned(),
                    duration_ms: 1,
                    value: Some(75.0),
                    timed_out: false,
                },
            ],
            handoffs: vec![HandoffResult {
                from: "a".to_owned(),
                to: String::new(),
                valid: false,
                reason: Some("missing to".to_owned()),
            }],
            outcome: CheckpointOutcome::Halt,
        };

        assert_eq!(result.failing_gates(), vec!["coverage".to_owned()]);
        assert_eq!(result.invalid_handoffs(), vec!["a -> ".to_owned()]);
    }
}
