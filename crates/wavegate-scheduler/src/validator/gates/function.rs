use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use wavegate_core::{GateCheck, GateReport, Result};

/// In-process gate check backed by an async closure.
pub struct FnCheck<F> {
    name: String,
    check: F,
}

impl<F, Fut> FnCheck<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<GateReport>> + Send,
{
    /// Wraps `check`; `name` is used in logs and reports.
    pub fn new(name: impl Into<String>, check: F) -> Self {
        Self {
            name: name.into(),
            check,
        }
    }
}

impl<F> fmt::Debug for FnCheck<F> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("FnCheck")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, Fut> GateCheck for FnCheck<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<GateReport>> + Send,
{
    async fn check(&self) -> Result<GateReport> {
        (self.check)().await
    }

    fn describe(&self) -> String {
        format!("fn({})", self.name)
    }
}
