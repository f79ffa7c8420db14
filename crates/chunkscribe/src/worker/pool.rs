use std::collections::BTreeMap;
use std::thread;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use log::{debug, error, info};

use crate::model::TranscriptionJob;
use crate::pipeline::StageError;

use super::task::{ChunkOutcome, ChunkTask, ChunkWorker};

/// Runs a [`ChunkWorker`] once per task on a fixed pool of at most
/// `max_concurrency` threads.
///
/// A failing chunk never cancels its siblings: [`FanOutExecutor::run`]
/// returns only after every task has a terminal outcome.
#[derive(Debug, Clone, Copy)]
pub struct FanOutExecutor {
    max_concurrency: usize,
}

impl FanOutExecutor {
    /// A limit of zero is treated as one.
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn run<W>(&self, worker: &W, tasks: Vec<ChunkTask>) -> FanOutReport
    where
        W: ChunkWorker + ?Sized,
    {
        if tasks.is_empty() {
            return FanOutReport::default();
        }

        let worker_count = self.max_concurrency.min(tasks.len());
        let expected: Vec<u32> = tasks.iter().map(ChunkTask::index).collect();
        let (task_sender, task_receiver) = bounded::<ChunkTask>(worker_count * 2);
        let (result_sender, result_receiver) = unbounded::<ChunkOutcome>();

        info!(
            "Fanning out {} chunks over {} workers",
            tasks.len(),
            worker_count
        );

        thread::scope(|scope| {
            let mut workers = Vec::with_capacity(worker_count);
            for worker_id in 0..worker_count {
                let task_rx = task_receiver.clone();
                let result_tx = result_sender.clone();
                workers.push(scope.spawn(move || run_worker(worker_id, worker, task_rx, result_tx)));
            }
            drop(task_receiver);
            drop(result_sender);

            for task in tasks {
                if let Err(e) = task_sender.send(task) {
                    error!("No worker left to take chunk {}", e.0.index());
                }
            }
            drop(task_sender);

            for (i, handle) in workers.into_iter().enumerate() {
                if handle.join().is_err() {
                    error!("Fan-out worker {} panicked", i);
                }
            }
        });

        let mut outcomes: BTreeMap<u32, ChunkOutcome> = result_receiver
            .try_iter()
            .map(|outcome| (outcome.index, outcome))
            .collect();

        for index in expected {
            outcomes.entry(index).or_insert_with(|| ChunkOutcome {
                index,
                result: Err(StageError::WorkerLost {
                    index,
                    reason: "no outcome reported".to_string(),
                }),
            });
        }

        FanOutReport {
            outcomes: outcomes.into_values().collect(),
        }
    }
}

fn run_worker<W>(
    worker_id: usize,
    worker: &W,
    task_receiver: Receiver<ChunkTask>,
    result_sender: Sender<ChunkOutcome>,
) where
    W: ChunkWorker + ?Sized,
{
    debug!("Fan-out worker {} started", worker_id);

    for task in task_receiver.iter() {
        let outcome = ChunkOutcome {
            index: task.index(),
            result: worker.process(&task),
        };
        if result_sender.send(outcome).is_err() {
            break;
        }
    }

    debug!("Fan-out worker {} stopped", worker_id);
}

/// Every chunk's outcome, ascending by chunk index.
#[derive(Debug, Clone, Default)]
pub struct FanOutReport {
    pub outcomes: Vec<ChunkOutcome>,
}

impl FanOutReport {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(ChunkOutcome::is_success)
    }

    pub fn submitted(&self) -> impl Iterator<Item = &TranscriptionJob> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &StageError> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().err())
    }

    /// Indices of the chunks whose pipeline failed.
    pub fn failed_indices(&self) -> Vec<u32> {
        self.failures().map(StageError::index).collect()
    }
}
