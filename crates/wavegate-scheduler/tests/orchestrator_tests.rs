//! End-to-end runs through the orchestrator
#![cfg(test)]
#![allow(
    clippy::panic,
    clippy::tests_outside_test_module,
    reason = "Test code prioritizes clarity over efficiency"
)]

mod common;

use common::{ScriptedWorker, ids, init_tracing};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use wavegate_core::{
    CheckpointOutcome, Error, ExecutionMode, ResolutionStrategy, RunEvent, RunStatus, Task,
    TaskStatus, WaveDescriptor, Worker,
};
use wavegate_scheduler::{
    CollisionConfig, EventChannel, ExecutionConfig, SchedulerConfig, ValidationConfig,
    WaveOrchestrator, WorkerRegistry,
};

fn orchestrator(worker: &Arc<ScriptedWorker>) -> WaveOrchestrator {
    WaveOrchestrator::new(SchedulerConfig::default(), Arc::<ScriptedWorker>::clone(worker))
}

fn write_plan(dir: &TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join("plan.toml");
    if let Err(error) = fs::write(&path, contents) {
        panic!("failed to write plan: {error}");
    }
    path
}

fn plan_with_coverage(percent: u32) -> String {
    format!(
        r#"
[[tasks]]
id = "schema"
worker = "coder"
modifies = ["src/schema.rs"]

[[tasks]]
id = "api"
worker = "coder"
depends_on = ["schema"]
reads = ["src/schema.rs"]

[[tasks]]
id = "docs"
worker = "writer"
depends_on = ["schema"]
reads = ["src/schema.rs"]

[[waves]]
index = 0

[waves.checkpoint]
name = "post-schema"

[[waves.checkpoint.gates]]
label = "build"
command = "echo"
args = ["build ok"]

[[waves.checkpoint.gates]]
label = "coverage"
kind = "threshold"
required = 80.0
command = "echo"
args = ["coverage: {percent}%"]
value_pattern = 'coverage: (\d+)%'
"#
    )
}

#[tokio::test]
async fn test_cycle_is_rejected_before_any_task_runs() {
    init_tracing();
    let worker = Arc::new(ScriptedWorker::succeeding());
    let tasks = vec![
        Task::new("a", "w").with_dependencies(["c"]),
        Task::new("b", "w").with_dependencies(["a"]),
        Task::new("c", "w").with_dependencies(["b"]),
        Task::new("free", "w"),
    ];

    match orchestrator(&worker).run(&tasks, Vec::new()).await {
        Ok(result) => panic!("expected a cycle error, got {:?}", result.status),
        Err(Error::CyclicDependency(members)) => assert_eq!(members, ids(&["a", "b", "c"])),
        Err(error) => panic!("unexpected error: {error}"),
    }
    assert!(worker.started().is_empty());
}

#[tokio::test]
async fn test_unknown_dependency_is_a_configuration_error() {
    init_tracing();
    let worker = Arc::new(ScriptedWorker::succeeding());
    let tasks = vec![Task::new("a", "w").with_dependencies(["ghost"])];

    match orchestrator(&worker).run(&tasks, Vec::new()).await {
        Ok(_) => panic!("expected rejection"),
        Err(error) => assert!(error.is_configuration_error()),
    }
    assert!(worker.started().is_empty());
}

#[tokio::test]
async fn test_dependencies_run_in_earlier_waves() {
    init_tracing();
    let worker = Arc::new(ScriptedWorker::delayed(10));
    let tasks = vec![
        Task::new("deploy", "ops").with_dependencies(["test", "build"]),
        Task::new("build", "ops"),
        Task::new("test", "ops").with_dependencies(["build"]),
        Task::new("lint", "ops"),
    ];

    let result = match orchestrator(&worker).run(&tasks, Vec::new()).await {
        Ok(result) => result,
        Err(error) => panic!("run failed: {error}"),
    };

    assert_eq!(result.status, RunStatus::Completed);
    let layout: Vec<Vec<_>> = result.waves.iter().map(|wave| wave.task_ids.clone()).collect();
    assert_eq!(
        layout,
        vec![ids(&["build", "lint"]), ids(&["test"]), ids(&["deploy"])]
    );

    let started = worker.started();
    let position = |name: &str| started.iter().position(|id| id.as_str() == name);
    assert!(position("build") < position("test"));
    assert!(position("test") < position("deploy"));
}

#[tokio::test]
async fn test_descriptors_override_wave_mode() {
    init_tracing();
    let worker = Arc::new(ScriptedWorker::delayed(20));
    let tasks = vec![Task::new("a", "w"), Task::new("b", "w")];
    let descriptors = vec![WaveDescriptor::new(0).with_parallel(false)];

    let result = match orchestrator(&worker).run(&tasks, descriptors).await {
        Ok(result) => result,
        Err(error) => panic!("run failed: {error}"),
    };

    assert_eq!(result.waves[0].mode, ExecutionMode::Serial);
    assert_eq!(worker.max_concurrency(), 1);
}

#[tokio::test]
async fn test_descriptor_for_missing_wave_is_rejected() {
    init_tracing();
    let worker = Arc::new(ScriptedWorker::succeeding());
    let tasks = vec![Task::new("a", "w")];

    match orchestrator(&worker)
        .run(&tasks, vec![WaveDescriptor::new(3)])
        .await
    {
        Ok(_) => panic!("expected rejection"),
        Err(error) => assert!(matches!(error, Error::InvalidWave(_))),
    }
}

#[tokio::test]
async fn test_plan_file_run_passes_command_gates() {
    init_tracing();
    let dir = match TempDir::new() {
        Ok(dir) => dir,
        Err(error) => panic!("tempdir: {error}"),
    };
    let path = write_plan(&dir, &plan_with_coverage(91));
    let worker = Arc::new(ScriptedWorker::succeeding());

    let result = match orchestrator(&worker).run_plan(&path).await {
        Ok(result) => result,
        Err(error) => panic!("run failed: {error}"),
    };

    assert_eq!(result.status, RunStatus::Completed);
    assert_eq!(result.waves.len(), 2);
    let Some(checkpoint) = &result.waves[0].checkpoint else {
        panic!("checkpoint result missing");
    };
    assert!(checkpoint.passed);
    assert_eq!(checkpoint.gates[1].value, Some(91.0));
    assert_eq!(result.waves[1].mode, ExecutionMode::Parallel);
    assert_eq!(result.tasks_with_status(TaskStatus::Completed).len(), 3);
}

#[tokio::test]
async fn test_plan_file_run_halts_on_low_coverage() {
    init_tracing();
    let dir = match TempDir::new() {
        Ok(dir) => dir,
        Err(error) => panic!("tempdir: {error}"),
    };
    let path = write_plan(&dir, &plan_with_coverage(62));
    let worker = Arc::new(ScriptedWorker::succeeding());

    let result = match orchestrator(&worker).run_plan(&path).await {
        Ok(result) => result,
        Err(error) => panic!("run failed: {error}"),
    };

    assert!(result.is_halted());
    assert_eq!(result.waves[0].outcome, CheckpointOutcome::Halt);
    let Some(halt) = &result.halt else {
        panic!("halt report missing");
    };
    assert_eq!(halt.checkpoint, "post-schema");
    assert_eq!(halt.failing_gates, vec!["coverage".to_owned()]);
    assert_eq!(worker.started(), ids(&["schema"]));
    assert_eq!(result.tasks_with_status(TaskStatus::Blocked).len(), 2);

    let report = match serde_json::to_value(&result) {
        Ok(report) => report,
        Err(error) => panic!("failed to serialize run result: {error}"),
    };
    assert_eq!(report["status"], "HALTED");
    assert_eq!(report["halt"]["checkpoint"], "post-schema");
    assert_eq!(report["halt"]["failing_gates"][0], "coverage");
    assert_eq!(report["waves"][0]["task_ids"][0], "schema");
}

#[tokio::test]
async fn test_zero_gate_timeout_is_rejected_before_any_task_runs() {
    init_tracing();
    let worker = Arc::new(ScriptedWorker::succeeding());
    let config = SchedulerConfig {
        validation: ValidationConfig {
            gate_timeout_seconds: 0,
            ..ValidationConfig::default()
        },
        ..SchedulerConfig::default()
    };
    let orchestrator = WaveOrchestrator::new(config, Arc::<ScriptedWorker>::clone(&worker));

    match orchestrator.run(&[Task::new("a", "w")], Vec::new()).await {
        Ok(result) => panic!("expected rejection, got {:?}", result.status),
        Err(error) => assert!(matches!(error, Error::Config(_))),
    }
    assert!(worker.started().is_empty());
}

#[tokio::test]
async fn test_event_channel_mirrors_run_log() {
    init_tracing();
    let worker = Arc::new(ScriptedWorker::succeeding());
    let (events, mut receiver) = EventChannel::new();
    let tasks = vec![
        Task::new("a", "w").with_modifies(["shared.rs"]),
        Task::new("b", "w").with_modifies(["shared.rs"]),
        Task::new("c", "w").with_dependencies(["a"]),
    ];

    let result = match orchestrator(&worker).with_events(events).run(&tasks, Vec::new()).await {
        Ok(result) => result,
        Err(error) => panic!("run failed: {error}"),
    };

    let mut streamed = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        streamed.push(event);
    }
    assert_eq!(streamed, result.log);

    assert!(matches!(
        streamed.first(),
        Some(RunEvent::RunStarted {
            wave_count: 2,
            task_count: 3
        })
    ));
    assert!(matches!(
        streamed.last(),
        Some(RunEvent::RunCompleted { wave_count: 2 })
    ));
    assert!(
        streamed
            .iter()
            .any(|event| matches!(event, RunEvent::CollisionOverride { wave_index: 0, .. }))
    );
    let wave_starts: Vec<usize> = streamed
        .iter()
        .filter(|event| matches!(event, RunEvent::WaveStarted { .. }))
        .filter_map(RunEvent::wave_index)
        .collect();
    assert_eq!(wave_starts, vec![0, 1]);
    assert!(
        !streamed
            .iter()
            .any(|event| matches!(event, RunEvent::CheckpointResolved { .. }))
    );
}

#[tokio::test]
async fn test_registry_dispatches_by_worker_id() {
    init_tracing();
    let coder = Arc::new(ScriptedWorker::succeeding());
    let writer = Arc::new(ScriptedWorker::succeeding());
    let registry = WorkerRegistry::new()
        .with_worker("coder", Arc::clone(&coder) as Arc<dyn Worker>)
        .with_worker("writer", Arc::clone(&writer) as Arc<dyn Worker>);
    let orchestrator = WaveOrchestrator::new(SchedulerConfig::default(), Arc::new(registry));
    let tasks = vec![
        Task::new("impl", "coder"),
        Task::new("guide", "writer"),
        Task::new("mystery", "nobody"),
    ];

    let result = match orchestrator.run(&tasks, Vec::new()).await {
        Ok(result) => result,
        Err(error) => panic!("run failed: {error}"),
    };

    assert_eq!(coder.started(), ids(&["impl"]));
    assert_eq!(writer.started(), ids(&["guide"]));
    let Some(mystery) = result.outcome_for(&ids(&["mystery"])[0]) else {
        panic!("missing outcome");
    };
    assert_eq!(mystery.status, TaskStatus::Failed);
    assert_eq!(result.status, RunStatus::Completed);
}

#[tokio::test]
async fn test_config_controls_collision_policy_and_parallelism() {
    init_tracing();
    let worker = Arc::new(ScriptedWorker::delayed(20));
    let config = SchedulerConfig {
        execution: ExecutionConfig {
            enable_parallel: false,
            ..ExecutionConfig::default()
        },
        ..SchedulerConfig::default()
    };
    let orchestrator = WaveOrchestrator::new(config, Arc::<ScriptedWorker>::clone(&worker));
    let tasks = vec![
        Task::new("reader-1", "w").with_reads(["c"]),
        Task::new("reader-2", "w").with_reads(["c"]),
    ];

    let result = match orchestrator.run(&tasks, Vec::new()).await {
        Ok(result) => result,
        Err(error) => panic!("run failed: {error}"),
    };

    assert_eq!(result.waves[0].mode, ExecutionMode::Serial);
    assert!(result.waves[0].collision.is_none());
    assert!(result.serialized_waves().is_empty());
    assert_eq!(worker.max_concurrency(), 1);

    let escalating = WaveOrchestrator::new(
        SchedulerConfig {
            collision: CollisionConfig {
                escalate_critical: true,
            },
            ..SchedulerConfig::default()
        },
        Arc::new(ScriptedWorker::succeeding()),
    );
    let destructive = vec![
        Task::new("drop", "w").with_deletes(["db.sql"]),
        Task::new("edit", "w").with_modifies(["db.sql"]),
    ];
    let escalated = match escalating.run(&destructive, Vec::new()).await {
        Ok(result) => result,
        Err(error) => panic!("run failed: {error}"),
    };
    assert_eq!(
        escalated.waves[0]
            .collision
            .as_ref()
            .map(|collision| collision.resolution),
        Some(ResolutionStrategy::ManualReview)
    );
    assert_eq!(escalated.serialized_waves(), vec![0]);
}
