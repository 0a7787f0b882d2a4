//! Scheduled-post publication sweep.

use tokio_cron_scheduler::JobSchedulerError;
use uuid::Uuid;

use pulse_core::DomainResult;
use pulse_core::services::PostService;

use super::Scheduler;

/// Flips matured scheduled posts to published.
///
/// Each run is one conditional update, so overlapping runs (or several
/// server processes) publish every post at most once. A failed run is logged
/// and the next tick picks the same posts up again.
#[derive(Clone)]
pub struct PublicationSweep {
    posts: PostService,
}

impl PublicationSweep {
    pub fn new(posts: PostService) -> Self {
        Self { posts }
    }

    /// Run one sweep, returning the ids it published.
    pub async fn run_once(&self) -> DomainResult<Vec<Uuid>> {
        let published = self.posts.publish_due().await?;
        if published.is_empty() {
            tracing::debug!("No scheduled posts due");
        } else {
            tracing::info!(count = published.len(), ids = ?published, "Published scheduled posts");
        }
        Ok(published)
    }

    async fn tick(&self) {
        if let Err(e) = self.run_once().await {
            tracing::error!(error = %e, "Scheduled post publication failed");
        }
    }
}

/// Register the sweep on `scheduler` using its configured cron expression.
pub async fn register_publication_sweep(
    scheduler: &Scheduler,
    sweep: PublicationSweep,
) -> Result<Uuid, JobSchedulerError> {
    let schedule = scheduler.config().publish_schedule.clone();
    scheduler
        .add_cron(&schedule, move || {
            let sweep = sweep.clone();
            async move { sweep.tick().await }
        })
        .await
}
