/// SASM-IMS - Scholarship and Student-Assistant Management backend
///
/// REST backend for the scholarship application workflow: accounts and
/// sessions, office sub-profiles, applications, daily time records,
/// leave requests, and the retention/archival pipeline.

mod account;
mod api;
mod archival;
mod audit;
mod auth;
mod config;
mod context;
mod db;
mod error;
mod jobs;
mod mailer;
mod metrics;
mod office;
mod scholarship;
mod server;
mod uploads;

use config::ServerConfig;
use context::AppContext;
use error::AppResult;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> AppResult<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sasm_ims=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    print_banner();

    // Load configuration
    let config = ServerConfig::from_env()?;

    // Create application context
    let ctx = AppContext::new(config).await?;
    let ctx = Arc::new(ctx);

    // Start background jobs
    let scheduler = Arc::new(jobs::JobScheduler::new(Arc::clone(&ctx)));
    scheduler.start();

    // Start server
    server::serve((*ctx).clone()).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
   _____ ___   _____ __  ___      ________  ___________
  / ___//   | / ___//  |/  /     /  _/  |/  / ___/ ___/
  \__ \/ /| | \__ \/ /|_/ /_____ / // /|_/ /\__ \\__ \
 ___/ / ___ |___/ / /  / /_____// // /  / /___/ /__/ /
/____/_/  |_/____/_/  /_/     /___/_/  /_//____/____/

        Scholarship Management Backend v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
