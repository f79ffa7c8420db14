//! Concurrent executions over the same source never share artifacts.

mod common;

use std::collections::BTreeSet;

use chunkscribe::model::{ExecutionId, ExecutionPhase};
use chunkscribe::orchestrator::OrchestratorError;
use chunkscribe::storage::ObjectStore;

use common::TestHarness;

#[test]
fn test_concurrent_executions_on_same_source_are_isolated() {
    let harness = TestHarness::new();
    harness.write_source("shared/lecture.mp4", 75.0);

    let ids: Vec<ExecutionId> = ["run", "run-2", "other"]
        .iter()
        .map(|s| ExecutionId::parse(s).unwrap())
        .collect();

    std::thread::scope(|scope| {
        for id in &ids {
            let orchestrator = &harness.orchestrator;
            scope.spawn(move || {
                let record = orchestrator
                    .start_execution(id.clone(), "shared/lecture.mp4")
                    .unwrap();
                assert_eq!(record.phase, ExecutionPhase::Waiting);
            });
        }
    });

    for id in &ids {
        let done = harness.run_to_completion(id);
        assert_eq!(done.phase, ExecutionPhase::Completed, "{:?}", done.error);
    }

    for id in &ids {
        let keys: BTreeSet<String> = harness
            .objects
            .list(&format!("{}/", id))
            .unwrap()
            .into_iter()
            .collect();
        let expected: BTreeSet<String> = [
            "0",
            "1",
            "2",
            "result",
            "transcripts/0.json",
            "transcripts/1.json",
            "transcripts/2.json",
        ]
        .iter()
        .map(|suffix| format!("{}/{}", id, suffix))
        .collect();
        assert_eq!(keys, expected, "artifacts of {}", id);

        let jobs = harness.orchestrator.chunk_jobs(id).unwrap();
        assert_eq!(jobs.len(), 3);
        assert!(jobs.iter().all(|j| j.job_id.starts_with(&format!("{}_chunk_", id))));
    }

    // One job per (execution, chunk), no resubmissions across namespaces.
    assert_eq!(harness.engine.submitted_job_ids().len(), 9);
    assert_eq!(harness.engine.duplicate_submissions(), 0);
}

#[test]
fn test_prefix_sharing_ids_do_not_leak_results() {
    let harness = TestHarness::new();
    harness.write_source("a.mp4", 30.0);
    harness.write_source("b.mp4", 90.0);

    let short = ExecutionId::parse("job").unwrap();
    let long = ExecutionId::parse("job-1").unwrap();
    harness.orchestrator.start_execution(short.clone(), "a.mp4").unwrap();
    harness.orchestrator.start_execution(long.clone(), "b.mp4").unwrap();

    // `job` completes first while `job-1` outputs already exist.
    let done = harness.run_to_completion(&long);
    assert_eq!(done.phase, ExecutionPhase::Completed);
    let done = harness.run_to_completion(&short);
    assert_eq!(done.phase, ExecutionPhase::Completed, "{:?}", done.error);

    assert_eq!(harness.object("job/result").unwrap(), "transcript 0");
    assert_eq!(
        harness.object("job-1/result").unwrap(),
        "transcript 0 transcript 1 transcript 2"
    );
}

#[test]
fn test_reused_identity_is_rejected_and_leaves_artifacts_alone() {
    let harness = TestHarness::new();
    harness.write_source("a.mp4", 30.0);
    harness.write_source("b.mp4", 60.0);

    let id = ExecutionId::parse("fixed").unwrap();
    harness.orchestrator.start_execution(id.clone(), "a.mp4").unwrap();
    harness.run_to_completion(&id);
    let before = harness.object("fixed/result").unwrap();

    assert!(harness
        .orchestrator
        .start_execution(id.clone(), "b.mp4")
        .is_err());
    assert_eq!(harness.object("fixed/result").unwrap(), before);
    assert!(!harness.objects.head("fixed/1").unwrap());
}

#[test]
fn test_scratch_cleanup_keeps_uploads_in_a_folder_named_like_the_execution() {
    let harness = TestHarness::new();
    harness.write_source("shared/lecture.mp4", 60.0);
    harness.write_source("shared/other.mp4", 30.0);

    let id = ExecutionId::parse("shared").unwrap();
    harness
        .orchestrator
        .start_execution(id.clone(), "shared/lecture.mp4")
        .unwrap();
    let done = harness.run_to_completion(&id);
    assert_eq!(done.phase, ExecutionPhase::Completed, "{:?}", done.error);

    assert!(harness.workspace_dir.join("shared/lecture.mp4").is_file());
    assert!(harness.workspace_dir.join("shared/other.mp4").is_file());
    assert!(!harness.workspace_dir.join(".executions/shared").exists());

    let again = ExecutionId::parse("shared-2").unwrap();
    harness
        .orchestrator
        .start_execution(again.clone(), "shared/lecture.mp4")
        .unwrap();
    assert_eq!(harness.run_to_completion(&again).phase, ExecutionPhase::Completed);
}

#[test]
fn test_trigger_into_scratch_area_is_rejected() {
    let harness = TestHarness::new();
    harness.write_source(".executions/victim/0_talk.mp4", 30.0);

    let id = ExecutionId::parse("intruder").unwrap();
    let err = harness
        .orchestrator
        .start_execution(id, ".executions/victim/0_talk.mp4")
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::InvalidTrigger { .. }), "{}", err);
}
