//! Batch scheduler: a bounded worker pool plus one coordinator thread.
//!
//! - `submit` resolves name conflicts for the whole batch, then hands one
//!   executor per descriptor to the pool.
//! - The coordinator waits for results in submission order, at most
//!   `item_timeout` each. A move that misses its deadline is cancelled
//!   (best-effort), reported failed once, and abandoned.
//! - `shutdown` cancels everything: queued moves are discarded without touching
//!   the filesystem, running copies stop at the next chunk.
//!
//! CREATED -> RUNNING -> DRAINED

use anyhow::{bail, Result};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::types::{Config, MoveSettings};
use crate::descriptor::{lock, MoveStatus, SharedDescriptor};
use crate::errors::MoveError;
use crate::fs_ops::{resolve_conflicts, MoveExecutor, MoveOutcome};
use crate::progress::{CancelToken, CompletionSink, ProgressObserver, Silent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Created,
    Running,
    Drained,
}

#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub workers: usize,
    pub item_timeout: Duration,
}

impl From<&Config> for SchedulerConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            workers: cfg.workers,
            item_timeout: cfg.item_timeout,
        }
    }
}

/// One unit of work: a descriptor plus whoever wants to hear about it.
pub struct MoveJob {
    descriptor: SharedDescriptor,
    observer: Arc<dyn ProgressObserver>,
}

impl MoveJob {
    pub fn new(descriptor: SharedDescriptor) -> Self {
        Self {
            descriptor,
            observer: Arc::new(Silent),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }
}

/// Tally of a drained batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub total: usize,
    pub renamed: usize,
    pub failed: usize,
    pub not_found: usize,
    /// Subset of `failed` abandoned by the coordinator.
    pub timed_out: usize,
    /// Subset of `failed` discarded or interrupted by shutdown.
    pub cancelled: usize,
}

impl DrainReport {
    fn record(&mut self, outcome: &MoveOutcome) {
        match outcome.status {
            MoveStatus::Renamed => self.renamed += 1,
            MoveStatus::NotFound => self.not_found += 1,
            _ => {
                self.failed += 1;
                if matches!(outcome.error, Some(MoveError::Cancelled(_))) {
                    self.cancelled += 1;
                }
            }
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.renamed == self.total
    }
}

/// Cloneable trigger for [`MoveScheduler::shutdown`], e.g. for a signal handler.
#[derive(Clone, Default)]
pub struct ShutdownHandle {
    requested: Arc<AtomicBool>,
    tokens: Arc<Mutex<Vec<CancelToken>>>,
}

impl ShutdownHandle {
    /// Cancel every submitted move. Idempotent.
    pub fn trigger(&self) {
        if !self.requested.swap(true, Ordering::SeqCst) {
            info!("Shutdown requested; cancelling outstanding moves");
        }
        let tokens = self.tokens.lock().unwrap_or_else(|p| p.into_inner());
        for t in tokens.iter() {
            t.cancel();
        }
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    fn register(&self, token: CancelToken) {
        if self.is_requested() {
            token.cancel();
        }
        self.tokens
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(token);
    }
}

/// A submitted move as the coordinator sees it.
struct Pending {
    rx: Receiver<MoveOutcome>,
    cancel: CancelToken,
    descriptor: SharedDescriptor,
    observer: Arc<dyn ProgressObserver>,
}

pub struct MoveScheduler {
    pool: rayon::ThreadPool,
    settings: Arc<MoveSettings>,
    item_timeout: Duration,
    completion: Arc<dyn CompletionSink>,
    state: Arc<Mutex<SchedulerState>>,
    shutdown: ShutdownHandle,
    coordinator: Option<JoinHandle<DrainReport>>,
}

impl MoveScheduler {
    /// Build the worker pool. Nothing runs until [`submit`](Self::submit).
    pub fn start(
        config: SchedulerConfig,
        settings: MoveSettings,
        completion: Arc<dyn CompletionSink>,
    ) -> Result<Self> {
        if config.workers == 0 {
            bail!("scheduler needs at least one worker");
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|i| format!("mover-{i}"))
            .panic_handler(|_| error!("move worker panicked"))
            .build()?;
        debug!(workers = config.workers, timeout = ?config.item_timeout, "scheduler created");
        Ok(Self {
            pool,
            settings: Arc::new(settings),
            item_timeout: config.item_timeout,
            completion,
            state: Arc::new(Mutex::new(SchedulerState::Created)),
            shutdown: ShutdownHandle::default(),
            coordinator: None,
        })
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Interrupt in-flight moves and discard queued ones.
    pub fn shutdown(&self) {
        self.shutdown.trigger();
    }

    /// Resolve conflicts for the batch and start every move. Only valid once.
    pub fn submit(&mut self, jobs: Vec<MoveJob>) -> Result<()> {
        {
            let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
            if *state != SchedulerState::Created {
                bail!("scheduler already started (state {:?})", *state);
            }
            *state = SchedulerState::Running;
        }

        let descriptors: Vec<SharedDescriptor> =
            jobs.iter().map(|j| j.descriptor.clone()).collect();
        resolve_conflicts(&descriptors);

        let mut queue = VecDeque::with_capacity(jobs.len());
        for job in jobs {
            let cancel = CancelToken::new();
            self.shutdown.register(cancel.clone());
            let (tx, rx) = mpsc::sync_channel(1);

            let executor = MoveExecutor::new(job.descriptor.clone(), Arc::clone(&self.settings))
                .with_observer(Arc::clone(&job.observer))
                .with_cancel(cancel.clone());
            self.pool.spawn_fifo(move || {
                // The coordinator may have given up on us already; nobody to tell then.
                let _ = tx.send(executor.run());
            });

            queue.push_back(Pending {
                rx,
                cancel,
                descriptor: job.descriptor,
                observer: job.observer,
            });
        }
        info!(count = queue.len(), "Submitted moves");

        let coordinator = Coordinator {
            queue,
            item_timeout: self.item_timeout,
            completion: Arc::clone(&self.completion),
            state: Arc::clone(&self.state),
        };
        let handle = std::thread::Builder::new()
            .name("move-coordinator".into())
            .spawn(move || coordinator.drain())?;
        self.coordinator = Some(handle);
        Ok(())
    }

    /// Block until the coordinator has drained the batch.
    pub fn wait(mut self) -> DrainReport {
        match self.coordinator.take() {
            Some(handle) => handle.join().unwrap_or_else(|_| {
                error!("coordinator thread panicked");
                *self.state.lock().unwrap_or_else(|p| p.into_inner()) = SchedulerState::Drained;
                self.completion.finished();
                DrainReport::default()
            }),
            None => {
                *self.state.lock().unwrap_or_else(|p| p.into_inner()) = SchedulerState::Drained;
                self.completion.finished();
                DrainReport::default()
            }
        }
    }
}

struct Coordinator {
    queue: VecDeque<Pending>,
    item_timeout: Duration,
    completion: Arc<dyn CompletionSink>,
    state: Arc<Mutex<SchedulerState>>,
}

impl Coordinator {
    fn drain(mut self) -> DrainReport {
        let total = self.queue.len();
        let mut report = DrainReport {
            total,
            ..Default::default()
        };
        let mut remaining = total;

        while let Some(p) = self.queue.pop_front() {
            match p.rx.recv_timeout(self.item_timeout) {
                Ok(outcome) => report.record(&outcome),
                Err(RecvTimeoutError::Timeout) => {
                    p.cancel.cancel();
                    let src = lock(&p.descriptor).source().to_path_buf();
                    let err = MoveError::TimedOut(src, self.item_timeout);
                    warn!(code = err.code(), kind = err.kind(), error = %err, "Abandoning move");
                    abandon(&p, &err.to_string());
                    report.failed += 1;
                    report.timed_out += 1;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    let src = lock(&p.descriptor).source().to_path_buf();
                    error!(src = %src.display(), "Move worker ended without a result");
                    abandon(&p, "Move worker ended without a result");
                    report.failed += 1;
                }
            }
            remaining -= 1;
            self.completion.progress(total, remaining);
        }

        *self.state.lock().unwrap_or_else(|p| p.into_inner()) = SchedulerState::Drained;
        info!(
            total = report.total,
            renamed = report.renamed,
            failed = report.failed,
            not_found = report.not_found,
            timed_out = report.timed_out,
            "Batch drained"
        );
        self.completion.finished();
        report
    }
}

/// Mark a move failed on the coordinator's side; the observer hears about it
/// only if the executor has not already concluded.
fn abandon(p: &Pending, reason: &str) {
    let first = lock(&p.descriptor).conclude(MoveStatus::Failed);
    if first {
        p.observer.status(reason);
        p.observer.finish(false);
    }
}
