use wavegate_core::{HandoffDescriptor, HandoffResult};

/// Structural handoff check: valid iff `from`, `to`, and `context` are non-empty.
pub fn validate_handoff(handoff: &HandoffDescriptor) -> HandoffResult {
    let missing = handoff.missing_fields();
    HandoffResult {
        from: handoff.from.clone(),
        to: handoff.to.clone(),
        valid: missing.is_empty(),
        reason: (!missing.is_empty()).then(|| format!("missing {}", missing.join(", "))),
    }
}
