//! Database migration command.
//!
//! Applies `crates/tickets/migrations/`, which hold both the `tickets`
//! schema and the session table.
//!
//! # Environment Variables
//!
//! - `TICKETS_DATABASE_URL` - `PostgreSQL` connection string (or `DATABASE_URL`)

use convention_tickets::db;

use super::{CommandError, database_url};

/// Run the ticket shop migrations.
///
/// # Errors
///
/// Returns an error if the database URL is missing, the database cannot be
/// reached or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let database_url = database_url()?;

    tracing::info!("Connecting to tickets database...");
    let pool = db::create_pool(&database_url).await?;

    tracing::info!("Running tickets migrations...");
    sqlx::migrate!("../tickets/migrations").run(&pool).await?;

    tracing::info!("Tickets migrations complete!");
    Ok(())
}
