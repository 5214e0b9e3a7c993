/// Postgres plumbing for the document store
///
/// - `pool`: connection pool creation, health checks and shutdown
/// - `migrations`: embedded schema migrations for the `documents` table
///
/// The store itself lives in [`crate::store::postgres`]; this module only
/// manages the connection lifecycle, which is owned by the process entry point.

pub mod migrations;
pub mod pool;
