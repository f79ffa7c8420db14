//! End-to-end runs of the orchestrator over a filesystem object store.
//!
//! Each case names a source duration and the chunks and transcript it must
//! produce; adding a case is a new entry in `TEST_CASES`.

mod common;

use chunkscribe::model::{ExecutionId, ExecutionPhase, JobId, TriggerEvent};
use chunkscribe::storage::ObjectStore;
use chunkscribe::transcription::MockEngine;

use common::TestHarness;

struct TestCase {
    name: &'static str,
    duration_secs: f64,
    /// Expected `(start, duration)` of every chunk, by index.
    expected_chunks: &'static [(f64, f64)],
    transcripts: &'static [&'static str],
    expected_result: &'static str,
}

const TEST_CASES: &[TestCase] = &[
    TestCase {
        name: "seventy_five_seconds",
        duration_secs: 75.0,
        expected_chunks: &[(0.0, 30.0), (30.0, 30.0), (60.0, 15.0)],
        transcripts: &["the quick", "brown fox", "jumps"],
        expected_result: "the quick brown fox jumps",
    },
    TestCase {
        name: "exact_multiple",
        duration_secs: 60.0,
        expected_chunks: &[(0.0, 30.0), (30.0, 30.0)],
        transcripts: &["first half", "second half"],
        expected_result: "first half second half",
    },
    TestCase {
        name: "shorter_than_one_slice",
        duration_secs: 12.5,
        expected_chunks: &[(0.0, 12.5)],
        transcripts: &["only"],
        expected_result: "only",
    },
    TestCase {
        name: "empty_chunk_transcript_is_skipped",
        duration_secs: 90.0,
        expected_chunks: &[(0.0, 30.0), (30.0, 30.0), (60.0, 30.0)],
        transcripts: &["before", "", "after"],
        expected_result: "before after",
    },
];

fn run_case(case: &TestCase) {
    let transcripts = case.transcripts;
    let harness = TestHarness::with_engine(|objects| {
        transcripts
            .iter()
            .enumerate()
            .fold(MockEngine::new(objects), |engine, (i, text)| {
                engine.with_transcript(i as u32, text)
            })
    });
    harness.write_source("uploads/talk.mp4", case.duration_secs);

    let id = ExecutionId::parse(case.name.replace('_', "-").as_str()).unwrap();
    let started = harness
        .orchestrator
        .start_execution(id.clone(), "uploads/talk.mp4")
        .unwrap();
    assert_eq!(started.phase, ExecutionPhase::Waiting, "{}", case.name);
    assert_eq!(
        started.chunk_count,
        Some(case.expected_chunks.len() as u32),
        "{}",
        case.name
    );

    let jobs = harness.orchestrator.chunk_jobs(&id).unwrap();
    assert_eq!(jobs.len(), case.expected_chunks.len());
    for (i, (job, (start, duration))) in jobs.iter().zip(case.expected_chunks).enumerate() {
        assert_eq!(job.job_id, JobId::for_chunk(&id, i as u32).to_string());
        assert_eq!(job.start_offset, *start, "{} chunk {}", case.name, i);
        assert_eq!(job.duration, *duration, "{} chunk {}", case.name, i);

        let media = harness.object(&format!("{}/{}", id, i)).unwrap();
        assert_eq!(media, format!("talk.mp4:{}-{}", start, start + duration));
    }

    let done = harness.run_to_completion(&id);
    assert_eq!(done.phase, ExecutionPhase::Completed, "{}: {:?}", case.name, done.error);
    assert_eq!(done.result_key, Some(format!("{}/result", id)));
    assert_eq!(
        harness.object(&format!("{}/result", id)).unwrap(),
        case.expected_result,
        "{}",
        case.name
    );
}

#[test]
fn test_all_cases() {
    for case in TEST_CASES {
        run_case(case);
    }
}

#[test]
fn test_trigger_assigns_fresh_identity() {
    let harness = TestHarness::new();
    harness.write_source("talk.mp4", 45.0);

    let first = harness
        .orchestrator
        .handle_trigger(&TriggerEvent::new("talk.mp4"))
        .unwrap();
    let second = harness
        .orchestrator
        .handle_trigger(&TriggerEvent::new("talk.mp4"))
        .unwrap();
    assert_ne!(first.execution_id(), second.execution_id());

    for record in [&first, &second] {
        let done = harness.run_to_completion(record.execution_id());
        assert_eq!(done.phase, ExecutionPhase::Completed);
        assert_eq!(
            harness.object(&format!("{}/result", record.execution_id())).unwrap(),
            "transcript 0 transcript 1"
        );
    }
}

#[test]
fn test_trigger_event_wire_shape() {
    let event: TriggerEvent =
        serde_json::from_str(r#"{"sourceFileKey":"uploads/a.mp4"}"#).unwrap();
    assert_eq!(event.source_file_key, "uploads/a.mp4");
}

#[test]
fn test_slow_engine_is_polled_until_done() {
    let harness =
        TestHarness::with_engine(|objects| MockEngine::new(objects).with_checks_to_complete(4));
    harness.write_source("talk.mp4", 75.0);
    let id = ExecutionId::parse("slow").unwrap();
    harness.orchestrator.start_execution(id.clone(), "talk.mp4").unwrap();

    let done = harness.run_to_completion(&id);
    assert_eq!(done.phase, ExecutionPhase::Completed);
    assert_eq!(done.poll_attempts, 3);
    assert_eq!(harness.engine.list_calls(), 4);
}

#[test]
fn test_scratch_files_removed_after_completion() {
    let harness = TestHarness::new();
    harness.write_source("talk.mp4", 40.0);
    let id = ExecutionId::parse("tidy").unwrap();
    harness.orchestrator.start_execution(id.clone(), "talk.mp4").unwrap();
    assert!(harness.workspace_dir.join(".executions/tidy/0_talk.mp4").is_file());

    harness.run_to_completion(&id);
    assert!(!harness.workspace_dir.join(".executions/tidy").exists());
    assert!(harness.workspace_dir.join("talk.mp4").is_file());
    assert!(harness.objects.head("tidy/0").unwrap());
}
