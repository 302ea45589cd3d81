use anyhow::{anyhow, Result};
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::app::reaper;
use crate::infra::db::Db;

const STOP_GRACE: Duration = Duration::from_secs(5);

/// Owned handle over the recurring expiry sweep. `start` is idempotent (a
/// second call while the loop is alive is a no-op), `stop` interrupts any
/// outstanding sleep and joins the loop within a bounded grace period.
pub struct Scheduler {
    db: Db,
    sweep_interval: Duration,
    retry_interval: Duration,
    worker: Mutex<Option<Worker>>,
}

struct Worker {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Scheduler {
    pub fn new(db: Db, sweep_interval: Duration, retry_interval: Duration) -> Self {
        Self {
            db,
            sweep_interval,
            retry_interval,
            worker: Mutex::new(None),
        }
    }

    /// Spawn the sweep loop. Returns false (and spawns nothing) if a loop is
    /// already running.
    pub async fn start(&self) -> bool {
        let mut slot = self.worker.lock().await;
        if let Some(worker) = slot.as_ref() {
            if !worker.handle.is_finished() {
                return false;
            }
        }

        let (shutdown, signal) = watch::channel(false);
        let handle = tokio::spawn(run_loop(
            self.db.clone(),
            self.sweep_interval,
            self.retry_interval,
            signal,
        ));
        *slot = Some(Worker { shutdown, handle });
        true
    }

    pub async fn stop(&self) -> Result<()> {
        let worker = self.worker.lock().await.take();
        let Some(worker) = worker else {
            return Ok(());
        };

        let _ = worker.shutdown.send(true);
        tokio::time::timeout(STOP_GRACE, worker.handle)
            .await
            .map_err(|_| anyhow!("scheduler did not stop within {:?}", STOP_GRACE))??;
        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        self.worker
            .lock()
            .await
            .as_ref()
            .map(|worker| !worker.handle.is_finished())
            .unwrap_or(false)
    }
}

/// Sweep, then wait. A failed sweep logs and shortens the next wait to the
/// retry interval; the normal cadence resumes after the next success. The
/// wait races against the shutdown signal so stop is never blocked by a
/// pending sleep.
async fn run_loop(
    db: Db,
    sweep_interval: Duration,
    retry_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    info!("expiry scheduler started");
    loop {
        let wait = match reaper::sweep(&db).await {
            Ok(_) => sweep_interval,
            Err(err) => {
                error!(error = ?err, "scheduled sweep failed, retrying sooner");
                retry_interval
            }
        };

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            changed = shutdown.changed() => {
                // A dropped sender means the handle is gone; treat it as stop.
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    info!("expiry scheduler stopped");
}
