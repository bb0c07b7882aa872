/// API routes and handlers
pub mod applications;
pub mod archival;
pub mod audit;
pub mod auth;
pub mod dtr;
pub mod leave;
pub mod middleware;
pub mod profiles;
pub mod uploads;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(auth::routes())
        .merge(profiles::routes())
        .merge(applications::routes())
        .merge(dtr::routes())
        .merge(leave::routes())
        .merge(archival::routes())
        .merge(audit::routes())
        .merge(uploads::routes())
}
