use std::sync::Arc;
use std::time::Instant;
use tokio::time::{interval, Duration};
use tracing::{error, info};

use crate::metrics;

pub mod tasks;

/// Job scheduler for background tasks
pub struct JobScheduler {
    context: Arc<crate::context::AppContext>,
}

impl JobScheduler {
    pub fn new(context: Arc<crate::context::AppContext>) -> Self {
        Self { context }
    }

    /// Start all background jobs
    pub fn start(self: Arc<Self>) {
        info!("Starting background job scheduler");

        tokio::spawn(Self::expired_session_cleanup_job(Arc::clone(&self)));
        tokio::spawn(Self::archival_job(Arc::clone(&self)));
        tokio::spawn(Self::health_check_job(Arc::clone(&self)));

        info!("Background jobs started");
    }

    /// Cleanup expired sessions (runs every hour)
    async fn expired_session_cleanup_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(3600)); // Every hour

        loop {
            interval.tick().await;
            info!("Running expired session cleanup");

            let started = Instant::now();
            match tasks::cleanup_expired_sessions(&scheduler.context).await {
                Ok(count) => {
                    metrics::record_background_job(
                        "session_cleanup",
                        "success",
                        started.elapsed().as_secs_f64(),
                    );
                    if count > 0 {
                        info!("Cleaned up {} expired sessions and email tokens", count);
                    } else {
                        info!("Session cleanup: nothing expired");
                    }
                }
                Err(e) => {
                    metrics::record_background_job(
                        "session_cleanup",
                        "failure",
                        started.elapsed().as_secs_f64(),
                    );
                    error!("Failed to cleanup expired sessions: {}", e);
                }
            }
        }
    }

    /// Archival sweep (runs daily)
    async fn archival_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(86400)); // Every 24 hours

        loop {
            interval.tick().await;
            info!("Running archival sweep");

            let started = Instant::now();
            match tasks::run_archival(&scheduler.context).await {
                Ok(report) => {
                    metrics::record_background_job(
                        "archival",
                        "success",
                        started.elapsed().as_secs_f64(),
                    );
                    info!(
                        "Archival sweep: {} applications, {} re-applications, {} leaves archived, {} purged, {} failed",
                        report.applications_archived,
                        report.re_applications_archived,
                        report.leaves_archived,
                        report.purged,
                        report.failed
                    );
                }
                Err(e) => {
                    metrics::record_background_job(
                        "archival",
                        "failure",
                        started.elapsed().as_secs_f64(),
                    );
                    error!("Archival sweep failed: {}", e);
                }
            }
        }
    }

    /// Health check job (runs every 5 minutes)
    async fn health_check_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(300)); // Every 5 minutes

        loop {
            interval.tick().await;

            match tasks::health_check(&scheduler.context).await {
                Ok(_) => {
                    // Silent success
                }
                Err(e) => error!("Health check failed: {}", e),
            }
        }
    }
}
