/// Database layer for ChoreShare
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool with health checks
/// - `migrations`: embedded schema migrations
///
/// Queries live in [`crate::repository::postgres`].

pub mod migrations;
pub mod pool;
