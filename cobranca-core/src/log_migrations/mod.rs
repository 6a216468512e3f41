//! Log database migrations, kept apart from the main schema so `logs.duckdb`
//! can be deleted or exported on its own.

/// All log migrations as `(name, sql)`, in order
pub const LOG_MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_initial_schema.sql", include_str!("001_initial_schema.sql")),
];
