use async_trait::async_trait;
use wavegate_core::{GateCheck, GateReport, Result};

/// Check that always returns the same report.
#[derive(Debug, Clone)]
pub struct StaticCheck {
    report: GateReport,
}

impl StaticCheck {
    /// Always returns `report`.
    #[must_use]
    pub fn new(report: GateReport) -> Self {
        Self { report }
    }

    /// Successful report without a value.
    #[must_use]
    pub fn passing() -> Self {
        Self::new(GateReport::success("static pass"))
    }

    /// Failed report without a value.
    #[must_use]
    pub fn failing() -> Self {
        Self::new(GateReport::failure("static failure"))
    }
}

#[async_trait]
impl GateCheck for StaticCheck {
    async fn check(&self) -> Result<GateReport> {
        Ok(self.report.clone())
    }

    fn describe(&self) -> String {
        format!("static({})", self.report.message)
    }
}
