//! Structured operation logs.
//!
//! Every reconciliation and cleanup run produces one `OperationLog`:
//! per-step timing and outcome plus an aggregate summary. Failure detail
//! is a first-class return value, not a side-channel log line. The
//! builder is append-only during a run and the finished log is immutable;
//! the engine does not persist logs, callers may.

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

/// One recorded step of a run.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub index: usize,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub finished_at: OffsetDateTime,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate accounting for a finished run.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_steps: usize,
    pub successful_steps: usize,
    pub failed_steps: usize,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

/// A finished, immutable run log.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationLog {
    pub order_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub finished_at: OffsetDateTime,
    pub steps: Vec<Step>,
    pub summary: Summary,
}

impl OperationLog {
    pub fn success(&self) -> bool {
        self.summary.failed_steps == 0
    }

    pub fn has_warnings(&self) -> bool {
        !self.summary.warnings.is_empty()
    }
}

/// Timer handle for a step in flight. Produced by [`RunLog::begin_step`],
/// consumed by [`RunLog::succeed`] or [`RunLog::fail`].
#[must_use]
pub struct StepTimer {
    name: String,
    started_at: OffsetDateTime,
}

/// Append-only log builder for one run.
pub struct RunLog {
    order_id: Uuid,
    started_at: OffsetDateTime,
    steps: Vec<Step>,
    warnings: Vec<String>,
    errors: Vec<String>,
}

impl RunLog {
    pub fn new(order_id: Uuid) -> Self {
        Self {
            order_id,
            started_at: OffsetDateTime::now_utc(),
            steps: Vec::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn begin_step(&self, name: impl Into<String>) -> StepTimer {
        StepTimer {
            name: name.into(),
            started_at: OffsetDateTime::now_utc(),
        }
    }

    /// Record a successful step.
    pub fn succeed(&mut self, timer: StepTimer, details: impl Into<String>) {
        self.push(timer, true, Some(details.into()), None);
    }

    /// Record a failed step. The error also lands in the summary.
    pub fn fail(&mut self, timer: StepTimer, error: impl Into<String>) {
        let error = error.into();
        self.errors.push(format!("{}: {}", timer.name, error));
        self.push(timer, false, None, Some(error));
    }

    /// Record a run-level warning (advisory, never fails the run).
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    fn push(
        &mut self,
        timer: StepTimer,
        success: bool,
        details: Option<String>,
        error: Option<String>,
    ) {
        self.steps.push(Step {
            index: self.steps.len(),
            name: timer.name,
            started_at: timer.started_at,
            finished_at: OffsetDateTime::now_utc(),
            success,
            details,
            error,
        });
    }

    /// Stamp the end time and freeze the log.
    pub fn finish(self) -> OperationLog {
        let finished_at = OffsetDateTime::now_utc();
        let successful_steps = self.steps.iter().filter(|s| s.success).count();
        let failed_steps = self.steps.len() - successful_steps;
        let duration = finished_at - self.started_at;
        let duration_ms = u64::try_from(duration.whole_milliseconds().max(0)).unwrap_or(u64::MAX);

        OperationLog {
            order_id: self.order_id,
            started_at: self.started_at,
            finished_at,
            summary: Summary {
                total_steps: self.steps.len(),
                successful_steps,
                failed_steps,
                warnings: self.warnings,
                errors: self.errors,
                duration_ms,
            },
            steps: self.steps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_accounts_for_outcomes_and_warnings() {
        let mut log = RunLog::new(Uuid::nil());

        let t = log.begin_step("load_order");
        log.succeed(t, "order ORD-1 loaded");

        let t = log.begin_step("delete_removed");
        log.fail(t, "1 of 2 deletions failed");

        log.warn("metadata write lagged");

        let done = log.finish();
        assert_eq!(done.summary.total_steps, 2);
        assert_eq!(done.summary.successful_steps, 1);
        assert_eq!(done.summary.failed_steps, 1);
        assert_eq!(done.summary.errors.len(), 1);
        assert!(done.summary.errors[0].starts_with("delete_removed:"));
        assert!(!done.success());
        assert!(done.has_warnings());
        assert_eq!(done.steps[0].index, 0);
        assert_eq!(done.steps[1].index, 1);
        assert!(done.finished_at >= done.started_at);
    }

    #[test]
    fn empty_run_is_successful() {
        let done = RunLog::new(Uuid::nil()).finish();
        assert!(done.success());
        assert!(!done.has_warnings());
        assert_eq!(done.summary.total_steps, 0);
    }
}
