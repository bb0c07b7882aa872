/// Background task implementations
use crate::{archival::ArchivalReport, context::AppContext, error::AppResult, metrics};

/// Cleanup expired sessions and email tokens
pub async fn cleanup_expired_sessions(ctx: &AppContext) -> AppResult<u64> {
    let (sessions_deleted, tokens_deleted) =
        ctx.account_manager.cleanup_expired_sessions().await?;

    Ok(sessions_deleted + tokens_deleted)
}

/// Run the archival sweep: move stale terminal records into the archive
/// tables and purge archive rows past their retention date.
pub async fn run_archival(ctx: &AppContext) -> AppResult<ArchivalReport> {
    let report = ctx.archival_manager.run().await?;

    metrics::record_archived("application", report.applications_archived);
    metrics::record_archived("re_application", report.re_applications_archived);
    metrics::record_archived("leave_request", report.leaves_archived);

    if report.failed > 0 {
        tracing::warn!("Archival sweep finished with {} failed records", report.failed);
    }

    Ok(report)
}

/// Health check - verify the database is reachable
pub async fn health_check(ctx: &AppContext) -> AppResult<()> {
    sqlx::query("SELECT 1").fetch_one(&ctx.db).await?;

    Ok(())
}
