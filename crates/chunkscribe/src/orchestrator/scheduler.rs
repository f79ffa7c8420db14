//! Background driver for [`Orchestrator::tick`].
//!
//! Waiting between completion checks is a timer on the persisted
//! `next_check_at`, never a sleep inside an execution, so the process may
//! stop at any point and a new scheduler resumes from the database.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;

use super::runner::Orchestrator;

/// Periodic poll scheduler with manual trigger support.
pub struct PollScheduler {
    orchestrator: Arc<Orchestrator>,
    interval: Duration,
    shutdown: Arc<AtomicBool>,
}

impl PollScheduler {
    pub fn new(orchestrator: Arc<Orchestrator>, interval: Duration) -> Self {
        Self {
            orchestrator,
            interval: interval.max(Duration::from_millis(1)),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Ticks at the orchestrator's configured `scheduler_tick`.
    pub fn from_settings(orchestrator: Arc<Orchestrator>) -> Self {
        let interval = orchestrator.settings().scheduler_tick;
        Self::new(orchestrator, interval)
    }

    /// Start the tick loop in a background thread.
    /// A message on `trigger_rx` runs a tick immediately.
    pub fn start(&self, mut trigger_rx: broadcast::Receiver<()>) -> JoinHandle<()> {
        let orchestrator = Arc::clone(&self.orchestrator);
        let shutdown = Arc::clone(&self.shutdown);
        let interval = self.interval;

        std::thread::spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    log::error!("Failed to start poll scheduler runtime: {}", e);
                    return;
                }
            };

            rt.block_on(async {
                let mut interval_timer = tokio::time::interval(interval);
                interval_timer.tick().await; // skip immediate first tick

                loop {
                    if shutdown.load(Ordering::Acquire) {
                        break;
                    }

                    tokio::select! {
                        _ = interval_timer.tick() => {},
                        Ok(()) = trigger_rx.recv() => {
                            log::info!("Manual poll triggered");
                        },
                    }

                    if shutdown.load(Ordering::Acquire) {
                        break;
                    }

                    match orchestrator.tick(Utc::now()) {
                        Ok(report) if report.completed > 0 || report.failed > 0 => {
                            log::info!(
                                "Poll tick: {} completed, {} failed, {} rescheduled",
                                report.completed,
                                report.failed,
                                report.rescheduled
                            );
                        }
                        Err(e) => log::error!("Poll tick failed: {}", e),
                        _ => {}
                    }
                }
            });
        })
    }

    /// Signals the scheduler to stop.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::ExecutionProgressBroadcaster;
    use crate::db::Database;
    use crate::error::PlanningError;
    use crate::model::{Chunk, ExecutionId, ExecutionPhase};
    use crate::orchestrator::{Collaborators, OrchestratorSettings};
    use crate::pipeline::{ChunkExtractor, ExtractError};
    use crate::planner::MediaProbe;
    use crate::results::SqliteResultStore;
    use crate::storage::{MemoryObjectStore, Workspace};
    use crate::transcription::MockEngine;
    use std::path::Path;
    use std::time::Instant;
    use tempfile::TempDir;

    struct TenSeconds;

    impl MediaProbe for TenSeconds {
        fn duration(&self, _path: &Path) -> Result<f64, PlanningError> {
            Ok(10.0)
        }
    }

    struct TouchExtractor;

    impl ChunkExtractor for TouchExtractor {
        fn extract(&self, _source: &Path, _chunk: &Chunk, dest: &Path) -> Result<(), ExtractError> {
            std::fs::write(dest, b"x").map_err(|e| ExtractError::Prepare {
                path: dest.to_path_buf(),
                source: e,
            })
        }
    }

    fn orchestrator(dir: &TempDir) -> Arc<Orchestrator> {
        let objects = Arc::new(MemoryObjectStore::new());
        let db = Database::open_in_memory().unwrap();
        let settings = OrchestratorSettings {
            poll_interval: Duration::ZERO,
            scheduler_tick: Duration::from_millis(20),
            ..OrchestratorSettings::default()
        };
        Arc::new(Orchestrator::new(
            settings,
            db.clone(),
            Workspace::new(dir.path()),
            Collaborators {
                probe: Arc::new(TenSeconds),
                extractor: Arc::new(TouchExtractor),
                engine: Arc::new(MockEngine::new(objects.clone()).with_checks_to_complete(2)),
                objects,
                results: Arc::new(SqliteResultStore::new(db)),
            },
            ExecutionProgressBroadcaster::default(),
        ))
    }

    #[test]
    fn test_scheduler_drives_execution_to_completion() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("clip.mp4"), b"media").unwrap();
        let orchestrator = orchestrator(&dir);
        let id = ExecutionId::parse("sched-1").unwrap();
        orchestrator.start_execution(id.clone(), "clip.mp4").unwrap();

        let scheduler = PollScheduler::from_settings(Arc::clone(&orchestrator));
        assert_eq!(scheduler.interval, Duration::from_millis(20));
        let (trigger_tx, trigger_rx) = broadcast::channel(16);
        let handle = scheduler.start(trigger_rx);

        let deadline = Instant::now() + Duration::from_secs(5);
        while orchestrator.status(&id).unwrap().phase != ExecutionPhase::Completed {
            assert!(Instant::now() < deadline, "scheduler did not complete execution");
            std::thread::sleep(Duration::from_millis(10));
        }

        scheduler.stop();
        let _ = trigger_tx.send(());
        handle.join().expect("scheduler thread panicked");
    }

    #[test]
    fn test_scheduler_shutdown() {
        let dir = TempDir::new().unwrap();
        let scheduler = PollScheduler::new(orchestrator(&dir), Duration::from_millis(50));

        let (trigger_tx, trigger_rx) = broadcast::channel(16);
        let handle = scheduler.start(trigger_rx);

        std::thread::sleep(Duration::from_millis(100));
        scheduler.stop();

        // Wake the select loop so it sees the shutdown.
        let _ = trigger_tx.send(());

        handle.join().expect("scheduler thread panicked");
    }
}
