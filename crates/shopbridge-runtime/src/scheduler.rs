//! Job scheduler
//!
//! Owns one cancellable task per scheduled connection. The registry lock is
//! held only while the map changes; runs happen outside it, and runs of one
//! job never overlap.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use shopbridge_core::Connection;

use crate::error::{Error, Result};
use crate::jobs::{DEFAULT_ERROR_HISTORY, Job, JobSnapshot, JobStatus, parse_schedule};
use crate::pipeline::PipelineRunner;
use crate::store::ConfigStore;

struct JobEntry {
    job: Arc<StdMutex<Job>>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Registry of scheduled jobs, cheap to clone
#[derive(Clone)]
pub struct Scheduler {
    runner: PipelineRunner,
    jobs: Arc<Mutex<HashMap<String, JobEntry>>>,
    error_history: usize,
}

impl Scheduler {
    /// Create a scheduler that runs pipelines with `runner`
    pub fn new(runner: PipelineRunner) -> Self {
        Self {
            runner,
            jobs: Arc::new(Mutex::new(HashMap::new())),
            error_history: DEFAULT_ERROR_HISTORY,
        }
    }

    /// Set how many recent errors each job keeps
    pub fn with_error_history(mut self, error_history: usize) -> Self {
        self.error_history = error_history;
        self
    }

    /// Register a job for a connection and start its loop.
    ///
    /// The job runs the connection as given, so it need not be in the
    /// configuration store; its transformer is read from the store on every
    /// run. Returns the job id, which is the connection id. The schedule is
    /// parsed inside the loop; a bad schedule leaves the job registered in
    /// the `error` state.
    pub async fn schedule_job(&self, connection: &Connection) -> Result<String> {
        debug!(connection = %connection.id, schedule = %connection.schedule, "schedule_job called");
        let mut jobs = self.jobs.lock().await;
        if jobs.contains_key(&connection.id) {
            return Err(Error::JobExists(connection.id.clone()));
        }

        let job = Arc::new(StdMutex::new(Job::new(
            connection.clone(),
            self.error_history,
        )));
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_loop(
            self.runner.clone(),
            job.clone(),
            cancel.clone(),
        ));

        jobs.insert(
            connection.id.clone(),
            JobEntry {
                job,
                cancel,
                handle,
            },
        );
        info!(connection = %connection.id, schedule = %connection.schedule, "job scheduled");
        Ok(connection.id.clone())
    }

    /// Cancel a job and remove it from the registry.
    ///
    /// A run already in flight completes; no further run starts.
    pub async fn cancel_job(&self, connection_id: &str) -> Result<()> {
        debug!(connection = %connection_id, "cancel_job called");
        let entry = self
            .jobs
            .lock()
            .await
            .remove(connection_id)
            .ok_or_else(|| Error::JobNotFound(connection_id.to_string()))?;
        entry.cancel.cancel();
        info!(connection = %connection_id, "job cancelled");
        Ok(())
    }

    /// Current status of a job
    pub async fn job_status(&self, connection_id: &str) -> Result<JobStatus> {
        Ok(self.job(connection_id).await?.status)
    }

    /// Snapshot of a job
    pub async fn job(&self, connection_id: &str) -> Result<JobSnapshot> {
        let jobs = self.jobs.lock().await;
        let entry = jobs
            .get(connection_id)
            .ok_or_else(|| Error::JobNotFound(connection_id.to_string()))?;
        let snapshot = lock(&entry.job).snapshot();
        Ok(snapshot)
    }

    /// Snapshots of every registered job, ordered by connection id
    pub async fn jobs(&self) -> Vec<JobSnapshot> {
        let mut snapshots: Vec<JobSnapshot> = self
            .jobs
            .lock()
            .await
            .values()
            .map(|entry| lock(&entry.job).snapshot())
            .collect();
        snapshots.sort_by(|a, b| a.connection_id.cmp(&b.connection_id));
        snapshots
    }

    /// Schedule every active connection that carries a schedule.
    ///
    /// Connections that fail to schedule are logged and skipped. Returns the
    /// number of jobs started.
    pub async fn initialize_from_persistence(&self, store: &dyn ConfigStore) -> Result<usize> {
        let mut started = 0;
        for connection in store.connections().await? {
            if !connection.is_scheduled() {
                continue;
            }
            match self.schedule_job(&connection).await {
                Ok(_) => started += 1,
                Err(e) => {
                    warn!(connection = %connection.id, error = %e, "failed to schedule connection")
                }
            }
        }
        info!(jobs = started, "scheduler initialized");
        Ok(started)
    }

    /// Cancel every job and wait for the loops to exit
    pub async fn shutdown(&self) {
        let entries: Vec<(String, JobEntry)> = self.jobs.lock().await.drain().collect();
        info!(jobs = entries.len(), "shutting down scheduler");

        for (_, entry) in &entries {
            entry.cancel.cancel();
        }
        for (id, entry) in entries {
            if let Err(e) = entry.handle.await {
                error!(connection = %id, error = %e, "job task failed");
            }
        }
        info!("scheduler stopped");
    }
}

fn lock(job: &StdMutex<Job>) -> MutexGuard<'_, Job> {
    job.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn run_loop(runner: PipelineRunner, job: Arc<StdMutex<Job>>, cancel: CancellationToken) {
    let connection = lock(&job).connection.clone();
    let connection_id = connection.id.as_str();

    let interval: Duration = match parse_schedule(&connection.schedule) {
        Ok(interval) => interval,
        Err(e) => {
            error!(connection = %connection_id, error = %e, "job not started");
            lock(&job).fail(e.to_string());
            return;
        }
    };

    loop {
        if cancel.is_cancelled() {
            break;
        }

        lock(&job).begin_run();
        let result = runner.run_connection(&connection).await;
        match result {
            Ok(outcome) => {
                debug!(connection = %connection_id, pushed = outcome.pushed, "scheduled run finished");
                lock(&job).succeed();
            }
            Err(e) => {
                warn!(connection = %connection_id, error = %e, "scheduled run failed");
                lock(&job).fail(e.to_string());
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    lock(&job).status = JobStatus::Stopped;
    debug!(connection = %connection_id, "job loop exited");
}
