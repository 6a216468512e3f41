//! Database migrations - embedded SQL files
//!
//! Compiled into the binary with `include_str!` as `(name, sql)` pairs,
//! applied in name order by [`crate::services::MigrationService`].

/// All migrations, embedded at compile time.
///
/// New migrations get a `NNN_description.sql` file and an entry here, in order.
pub const MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_initial_schema.sql", include_str!("001_initial_schema.sql")),
];
