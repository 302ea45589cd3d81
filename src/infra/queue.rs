use tokio::sync::mpsc;
use tracing::warn;

use crate::domain::notice::Notice;

/// Work handed off from request handlers to the background worker. Handlers
/// enqueue and return immediately; the worker owns execution and its own
/// error handling.
#[derive(Debug, Clone)]
pub enum Job {
    /// Delete expired notices.
    Sweep,
    /// Fan a notice out to every registered user.
    Broadcast(Notice),
}

#[derive(Clone)]
pub struct JobQueue {
    tx: mpsc::UnboundedSender<Job>,
}

impl JobQueue {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Job>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Fire-and-forget: a queue with no worker (process shutting down) drops
    /// the job with a warning rather than failing the request.
    pub fn enqueue(&self, job: Job) {
        if self.tx.send(job).is_err() {
            warn!("job worker is gone, dropping background job");
        }
    }
}
