//! Hexeko Server — Application entry point.

mod config;

use std::time::Duration;

use anyhow::Context;
use hexeko_access::{InvitationMetricsService, InvitedUserService};
use hexeko_core::repository::RoleRepository;
use hexeko_db::DbManager;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::HexekoConfig;

/// Guard the seeded role records belong to.
const ROLE_GUARD: &str = "api";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = HexekoConfig::load().context("failed to load configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .context("invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).json().init();

    info!("Starting Hexeko server...");

    let db = DbManager::connect(&config.database)
        .await
        .context("failed to prepare SurrealDB")?;

    let roles = db
        .roles()
        .seed_hierarchy(ROLE_GUARD)
        .await
        .context("failed to seed role hierarchy")?;

    let invitations = InvitedUserService::new(
        db.users(),
        db.memberships(),
        db.financers(),
        config.invitation.clone(),
    );
    let metrics = InvitationMetricsService::new(db.users());

    let summary = metrics.summary().await.context("failed to read invitation metrics")?;
    info!(
        roles = roles.len(),
        pending = summary.metrics.pending,
        accepted = summary.metrics.accepted,
        expired = summary.metrics.expired,
        revoked = summary.metrics.revoked,
        acceptance_rate = summary.acceptance_rate,
        "Hexeko server ready"
    );

    let mut sweep = tokio::time::interval(Duration::from_secs(
        config.expiry_sweep_interval_secs.max(1),
    ));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = sweep.tick() => {
                if let Err(e) = invitations.expire_stale_invitations().await {
                    warn!(error = %e, "Invitation expiry sweep failed");
                }
            }
            result = &mut shutdown => {
                result.context("failed to listen for shutdown signal")?;
                break;
            }
        }
    }

    info!("Hexeko server stopped.");
    Ok(())
}
