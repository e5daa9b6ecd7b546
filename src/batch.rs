//! Running many inferences over one shared graph.
//!
//! Parallelism is across runs, never within one: each worker owns its
//! engine and per-run state while every run borrows the same immutable
//! [`ASGraph`]. Output order always matches input order.

use std::thread;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use log::info;

use crate::as_graph::ASGraph;
use crate::propagation::{Announcement, PropagationEngine, RelationshipPolicy, Rib};
use crate::shared::AnnouncementError;

type RunResult = (usize, Result<Rib, AnnouncementError>);

pub struct BatchRunner<'g> {
    graph: &'g ASGraph,
    policy: RelationshipPolicy,
    record_alternates: bool,
    workers: usize,
    show_progress: bool,
}

impl<'g> BatchRunner<'g> {
    pub fn new(graph: &'g ASGraph) -> Self {
        BatchRunner {
            graph,
            policy: RelationshipPolicy::default(),
            record_alternates: false,
            workers: num_cpus::get().max(2) - 1,
            show_progress: false,
        }
    }

    pub fn with_policy(mut self, policy: RelationshipPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_alternate_paths(mut self, record: bool) -> Self {
        self.record_alternates = record;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Runs every announcement and returns the RIBs in input order.
    pub fn run(&self, announcements: &[Announcement]) -> Result<Vec<Rib>, AnnouncementError> {
        for announcement in announcements {
            announcement.validate(self.graph)?;
        }
        let started = Instant::now();
        let progress = self.progress_bar(announcements.len());

        let graph = self.graph;
        let policy = self.policy;
        let record_alternates = self.record_alternates;
        let workers = self.workers.min(announcements.len()).max(1);

        let mut results: Vec<Option<Rib>> = vec![None; announcements.len()];
        thread::scope(|scope| -> Result<(), AnnouncementError> {
            let mut handles = Vec::with_capacity(workers);
            for worker in 0..workers {
                let progress = progress.as_ref();
                handles.push(scope.spawn(move || -> Vec<RunResult> {
                    let engine = PropagationEngine::new(graph)
                        .with_policy(policy)
                        .with_alternate_paths(record_alternates);
                    let mut completed = Vec::new();
                    let mut index = worker;
                    while index < announcements.len() {
                        completed.push((index, engine.infer(&announcements[index])));
                        if let Some(bar) = progress {
                            bar.inc(1);
                        }
                        index += workers;
                    }
                    completed
                }));
            }
            for handle in handles {
                for (index, result) in handle.join().expect("batch worker panicked") {
                    results[index] = Some(result?);
                }
            }
            Ok(())
        })?;

        if let Some(bar) = progress {
            bar.finish();
        }
        info!(
            "completed {} propagation runs in {:?}",
            announcements.len(),
            started.elapsed()
        );
        Ok(results
            .into_iter()
            .map(|rib| rib.expect("every run is assigned to exactly one worker"))
            .collect())
    }

    fn progress_bar(&self, total: usize) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }
        let bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} runs")
            .map(|style| style.progress_chars("##-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        Some(bar)
    }
}
