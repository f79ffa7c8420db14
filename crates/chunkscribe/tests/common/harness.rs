//! Test harness for isolated orchestrator runs.
//!
//! The `TestHarness` struct wires a real [`Orchestrator`] to:
//! - a temporary workspace (shared working filesystem) and object store root
//! - an in-memory SQLite database
//! - the deterministic [`MockEngine`] and the fakes in `super::fakes`

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use chunkscribe::broadcast::ExecutionProgressBroadcaster;
use chunkscribe::db::Database;
use chunkscribe::model::{ExecutionId, ExecutionPhase};
use chunkscribe::orchestrator::{Collaborators, ExecutionRecord, Orchestrator, OrchestratorSettings};
use chunkscribe::pipeline::ChunkExtractor;
use chunkscribe::results::SqliteResultStore;
use chunkscribe::storage::{FsObjectStore, ObjectStore, Workspace};
use chunkscribe::transcription::MockEngine;

use super::fakes::{SliceExtractor, TextDurationProbe};

/// Upper bound on ticks before a run is considered stuck.
const MAX_TICKS: usize = 50;

pub struct TestHarness {
    temp_dir: TempDir,
    /// Root of the shared working filesystem.
    pub workspace_dir: PathBuf,
    /// Root of the filesystem-backed object store.
    pub objects_dir: PathBuf,
    pub objects: Arc<FsObjectStore>,
    pub engine: Arc<MockEngine>,
    pub db: Database,
    pub orchestrator: Orchestrator,
}

impl TestHarness {
    /// Default settings and an engine that finishes every job on the first check.
    pub fn new() -> Self {
        Self::build(
            OrchestratorSettings::default(),
            SliceExtractor::default(),
            |objects| MockEngine::new(objects),
        )
    }

    pub fn with_engine(engine: impl FnOnce(Arc<dyn ObjectStore>) -> MockEngine) -> Self {
        Self::build(OrchestratorSettings::default(), SliceExtractor::default(), engine)
    }

    pub fn build(
        settings: OrchestratorSettings,
        extractor: impl ChunkExtractor + 'static,
        engine: impl FnOnce(Arc<dyn ObjectStore>) -> MockEngine,
    ) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let workspace_dir = temp_dir.path().join("workspace");
        let objects_dir = temp_dir.path().join("objects");
        std::fs::create_dir_all(&workspace_dir).expect("Failed to create workspace dir");

        let objects = Arc::new(FsObjectStore::new(&objects_dir));
        let store: Arc<dyn ObjectStore> = objects.clone();
        let engine = Arc::new(engine(store));
        let db = Database::open_in_memory().expect("Failed to open database");

        let orchestrator = Orchestrator::new(
            settings,
            db.clone(),
            Workspace::new(&workspace_dir),
            Collaborators {
                probe: Arc::new(TextDurationProbe),
                extractor: Arc::new(extractor),
                engine: engine.clone(),
                objects: objects.clone(),
                results: Arc::new(SqliteResultStore::new(db.clone())),
            },
            ExecutionProgressBroadcaster::default(),
        );

        Self {
            temp_dir,
            workspace_dir,
            objects_dir,
            objects,
            engine,
            db,
            orchestrator,
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes a source file of the given duration into the workspace.
    pub fn write_source(&self, key: &str, seconds: f64) -> PathBuf {
        let path = self.workspace_dir.join(key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create source dir");
        }
        std::fs::write(&path, seconds.to_string()).expect("Failed to write source file");
        path
    }

    pub fn object(&self, key: &str) -> Option<String> {
        let bytes = self.objects.get(key).ok()?;
        Some(String::from_utf8(bytes).expect("object is not UTF-8"))
    }

    /// Ticks at each execution's scheduled check time until it is terminal.
    pub fn run_to_completion(&self, id: &ExecutionId) -> ExecutionRecord {
        for _ in 0..MAX_TICKS {
            let record = self.orchestrator.status(id).expect("status failed");
            if record.phase.is_terminal() {
                return record;
            }
            assert_eq!(record.phase, ExecutionPhase::Waiting);
            let at = record.next_check_at.expect("waiting without next check");
            self.orchestrator.tick(at).expect("tick failed");
        }
        panic!("execution {} did not finish within {} ticks", id, MAX_TICKS);
    }
}
