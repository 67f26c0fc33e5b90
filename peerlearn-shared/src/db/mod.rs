/// Database layer for PeerLearn
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool management with health checks
/// - `migrations`: Embedded schema migrations
/// - Models are in the `models` module at crate root level

pub mod migrations;
pub mod pool;

/// True when `err` is a violation of the named constraint or unique index
pub fn violates_constraint(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db) => db.constraint() == Some(constraint),
        _ => false,
    }
}
