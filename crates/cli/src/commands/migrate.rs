//! Database migration command.
//!
//! Migrations live in `crates/api/migrations/` and are embedded in the
//! `cartage-api` crate, so the CLI and the service always agree on the
//! schema version.

use cartage_api::db;

/// Apply all pending migrations.
///
/// # Errors
///
/// Returns an error if the connection fails or a migration cannot be applied.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let pool = super::connect().await?;

    tracing::info!("Running migrations...");
    db::run_migrations(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
