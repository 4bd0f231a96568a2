use crate::streaming::EventChannel;
use std::collections::HashMap;
use std::fmt;
use wavegate_core::{CheckpointFailure, Error, Result, RunEvent, Task, TaskId, TaskStatus};

/// Phase of the run state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunPhase {
    /// Accepted, no wave started yet
    Pending,
    /// Executing the tasks of wave `i`
    RunningWave(usize),
    /// Validating the checkpoint that follows wave `i`
    ValidatingCheckpoint(usize),
    /// Checkpoint after wave `i` warned; the run goes on
    WarnedContinue(usize),
    /// A blocking checkpoint failed
    Halted,
    /// Every wave ran
    Completed,
}

impl RunPhase {
    /// Whether no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Halted | Self::Completed)
    }

    /// Whether `next` is a legal successor of this phase.
    pub fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Pending, Self::RunningWave(0) | Self::Completed) => true,
            (Self::RunningWave(current), Self::ValidatingCheckpoint(validated)) => {
                current == validated
            }
            (Self::ValidatingCheckpoint(current), Self::RunningWave(next_wave)) => {
                next_wave == current + 1
            }
            (Self::ValidatingCheckpoint(current), Self::WarnedContinue(warned)) => {
                current == warned
            }
            (Self::WarnedContinue(current), Self::RunningWave(next_wave)) => {
                next_wave == current + 1
            }
            (
                Self::ValidatingCheckpoint(_) | Self::WarnedContinue(_),
                Self::Completed,
            )
            | (Self::ValidatingCheckpoint(_), Self::Halted) => true,
            _ => false,
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => formatter.write_str("PENDING"),
            Self::RunningWave(index) => write!(formatter, "RUNNING_WAVE({index})"),
            Self::ValidatingCheckpoint(index) => {
                write!(formatter, "VALIDATING_CHECKPOINT({index})")
            }
            Self::WarnedContinue(index) => write!(formatter, "WARNED_CONTINUE({index})"),
            Self::Halted => formatter.write_str("HALTED"),
            Self::Completed => formatter.write_str("COMPLETED"),
        }
    }
}

/// Mutable state of a single run, owned by the driving executor.
#[derive(Debug)]
pub struct RunState {
    phase: RunPhase,
    statuses: HashMap<TaskId, TaskStatus>,
    log: Vec<RunEvent>,
    warnings: Vec<CheckpointFailure>,
    halt: Option<CheckpointFailure>,
    events: Option<EventChannel>,
}

impl RunState {
    /// Creates a pending run over `tasks`.
    pub fn new<'task>(tasks: impl IntoIterator<Item = &'task Task>) -> Self {
        Self {
            phase: RunPhase::Pending,
            statuses: tasks
                .into_iter()
                .map(|task| (task.id.clone(), TaskStatus::Pending))
                .collect(),
            log: Vec::new(),
            warnings: Vec::new(),
            halt: None,
            events: None,
        }
    }

    /// Forwards every logged event to `channel` as well.
    #[must_use]
    pub fn with_events(mut self, channel: Option<EventChannel>) -> Self {
        self.events = channel;
        self
    }

    /// Current phase.
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Moves the run to `next`.
    ///
    /// # Errors
    /// Returns `Error::InvalidTransition` for transitions the machine does not allow.
    pub fn transition(&mut self, next: RunPhase) -> Result<()> {
        if !self.phase.can_transition_to(next) {
            return Err(Error::InvalidTransition(format!(
                "{} -> {next}",
                self.phase
            )));
        }
        self.phase = next;
        Ok(())
    }

    /// Appends an event to the log and forwards it.
    pub fn record(&mut self, event: RunEvent) {
        if let Some(channel) = &self.events {
            channel.send(event.clone());
        }
        self.log.push(event);
    }

    /// Status of a task, if it belongs to the run.
    pub fn status(&self, task_id: &TaskId) -> Option<TaskStatus> {
        self.statuses.get(task_id).copied()
    }

    /// Updates a task's status.
    ///
    /// # Errors
    /// Returns `Error::InvalidTransition` for unknown tasks or illegal status changes.
    pub fn set_status(&mut self, task_id: &TaskId, next: TaskStatus) -> Result<()> {
        let Some(status) = self.statuses.get_mut(task_id) else {
            return Err(Error::InvalidTransition(format!(
                "task {task_id} is not part of this run"
            )));
        };
        if !status.can_transition_to(next) {
            return Err(Error::InvalidTransition(format!(
                "task {task_id}: {status} -> {next}"
            )));
        }
        *status = next;
        Ok(())
    }

    /// Tasks that never left `Pending`.
    pub fn pending_tasks(&self) -> Vec<TaskId> {
        let mut pending: Vec<TaskId> = self
            .statuses
            .iter()
            .filter(|(_, status)| **status == TaskStatus::Pending)
            .map(|(task_id, _)| task_id.clone())
            .collect();
        pending.sort();
        pending
    }

    /// Records a non-blocking checkpoint failure.
    pub fn warn(&mut self, failure: CheckpointFailure) {
        self.record(RunEvent::CheckpointWarning(failure.clone()));
        self.warnings.push(failure);
    }

    /// Records the blocking failure and enters `Halted`.
    ///
    /// # Errors
    /// Returns `Error::InvalidTransition` if the run is not validating a checkpoint.
    pub fn halt(&mut self, failure: CheckpointFailure) -> Result<()> {
        self.transition(RunPhase::Halted)?;
        self.record(RunEvent::RunHalted(failure.clone()));
        self.halt = Some(failure);
        Ok(())
    }

    /// Consumes the state into its log, warnings, and halt report.
    pub fn finish(self) -> (Vec<RunEvent>, Vec<CheckpointFailure>, Option<CheckpointFailure>) {
        (self.log, self.warnings, self.halt)
    }
}

#[cfg(test)]
#[allow(
    clippy::assertions_on_result_states,
    reason = "Test code has different conventions"
)]
mod tests {
    use super::*;

    fn failure(wave_index: usize) -> CheckpointFailure {
        CheckpointFailure {
            wave_index,
            checkpoint: "cp".to_owned(),
            failing_gates: vec!["lint".to_owned()],
            invalid_handoffs: Vec::new(),
            failed_tasks: Vec::new(),
        }
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut state = RunState::new(&Vec::<Task>::new());
        let path = [
            RunPhase::RunningWave(0),
            RunPhase::ValidatingCheckpoint(0),
            RunPhase::WarnedContinue(0),
            RunPhase::RunningWave(1),
            RunPhase::ValidatingCheckpoint(1),
            RunPhase::Completed,
        ];
        for phase in path {
            if let Err(error) = state.transition(phase) {
                panic!("transition to {phase} rejected: {error}");
            }
        }
        assert!(state.phase().is_terminal());
    }

    #[test]
    fn test_illegal_transitions_rejected() {
        let mut state = RunState::new(&Vec::<Task>::new());
        assert!(state.transition(RunPhase::RunningWave(1)).is_err());
        assert!(state.transition(RunPhase::Halted).is_err());

        assert!(state.transition(RunPhase::RunningWave(0)).is_ok());
        assert!(state.transition(RunPhase::RunningWave(1)).is_err());
        assert!(state.transition(RunPhase::ValidatingCheckpoint(0)).is_ok());
        assert!(state.halt(failure(0)).is_ok());

        assert!(state.transition(RunPhase::RunningWave(1)).is_err());
        assert!(state.transition(RunPhase::Completed).is_err());
        assert_eq!(state.phase(), RunPhase::Halted);
    }

    #[test]
    fn test_task_status_tracking() {
        let tasks = vec![Task::new("a", "w"), Task::new("b", "w")];
        let mut state = RunState::new(&tasks);
        let task_a = TaskId::new("a");

        assert!(state.set_status(&task_a, TaskStatus::Running).is_ok());
        assert!(state.set_status(&task_a, TaskStatus::Completed).is_ok());
        assert!(state.set_status(&task_a, TaskStatus::Running).is_err());
        assert!(state.set_status(&TaskId::new("ghost"), TaskStatus::Running).is_err());

        assert_eq!(state.pending_tasks(), vec![TaskId::new("b")]);
        assert_eq!(state.status(&task_a), Some(TaskStatus::Completed));
    }

    #[tokio::test]
    async fn test_recorded_events_are_forwarded() {
        let (channel, mut receiver) = EventChannel::new();
        let mut state = RunState::new(&Vec::<Task>::new()).with_events(Some(channel));

        state.warn(failure(0));
        let (log, warnings, halt) = state.finish();

        assert_eq!(log.len(), 1);
        assert_eq!(warnings.len(), 1);
        assert!(halt.is_none());
        assert!(matches!(
            receiver.recv().await,
            Some(RunEvent::CheckpointWarning(_))
        ));
    }
}
