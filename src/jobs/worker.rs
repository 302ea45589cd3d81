use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{error, info};

use crate::app::notifier::Notifier;
use crate::app::reaper;
use crate::infra::db::Db;
use crate::infra::queue::Job;

/// Drain the job queue until every sender is gone. Job failures are logged
/// and never escape the loop; one bad job must not take the worker down.
pub async fn run(db: Db, notifier: Notifier, mut jobs: UnboundedReceiver<Job>) {
    info!("job worker started");
    while let Some(job) = jobs.recv().await {
        match job {
            Job::Sweep => {
                if let Err(err) = reaper::sweep(&db).await {
                    error!(error = ?err, "background sweep failed");
                }
            }
            Job::Broadcast(notice) => match notifier.broadcast(&notice).await {
                Ok(summary) => {
                    info!(
                        notice_id = %notice.id,
                        recipients = summary.recipients,
                        email_sent = summary.email_sent,
                        sms_sent = summary.sms_sent,
                        "notice broadcast complete"
                    );
                }
                Err(err) => {
                    error!(error = ?err, notice_id = %notice.id, "notice broadcast failed");
                }
            },
        }
    }
    info!("job worker stopped");
}
