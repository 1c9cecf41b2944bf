//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! Tenant and rating configuration rows are keyed by the owning
//! principal id; brand slug claims are keyed by the slug itself.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1: tenants, slug claims, employees, ratings
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Tenants (global scope, record id = owning principal id)
-- =======================================================================
DEFINE TABLE tenant SCHEMAFULL;
DEFINE FIELD principal_id ON TABLE tenant TYPE string;
DEFINE FIELD email ON TABLE tenant TYPE option<string>;
DEFINE FIELD first_name ON TABLE tenant TYPE option<string>;
DEFINE FIELD last_name ON TABLE tenant TYPE option<string>;
DEFINE FIELD brand_name ON TABLE tenant TYPE option<string>;
DEFINE FIELD brand_slug ON TABLE tenant TYPE option<string>;
DEFINE FIELD admin_path ON TABLE tenant TYPE option<string>;
DEFINE FIELD store_path ON TABLE tenant TYPE option<string>;
DEFINE FIELD phone ON TABLE tenant TYPE option<string>;
DEFINE FIELD address ON TABLE tenant TYPE option<string>;
DEFINE FIELD logo_url ON TABLE tenant TYPE option<string>;
DEFINE FIELD onboarding_complete ON TABLE tenant TYPE bool DEFAULT false;
DEFINE FIELD created_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD last_seen_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_tenant_brand_slug ON TABLE tenant COLUMNS brand_slug;

-- =======================================================================
-- Brand slug claims (record id = slug)
-- =======================================================================
DEFINE TABLE brand_slug SCHEMAFULL;
DEFINE FIELD principal_id ON TABLE brand_slug TYPE string;
DEFINE FIELD claimed_at ON TABLE brand_slug TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_brand_slug_principal ON TABLE brand_slug \
    COLUMNS principal_id;

-- =======================================================================
-- Employees (owner scope)
-- =======================================================================
DEFINE TABLE employee SCHEMAFULL;
DEFINE FIELD owner_id ON TABLE employee TYPE string;
DEFINE FIELD first_name ON TABLE employee TYPE string;
DEFINE FIELD last_name ON TABLE employee TYPE string;
DEFINE FIELD dni ON TABLE employee TYPE string;
DEFINE FIELD phone ON TABLE employee TYPE string;
DEFINE FIELD payment_link ON TABLE employee TYPE string;
DEFINE FIELD photo_url ON TABLE employee TYPE option<string>;
DEFINE FIELD created_at ON TABLE employee TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE employee TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_employee_owner ON TABLE employee COLUMNS owner_id;

-- =======================================================================
-- Rating configuration (record id = owner principal id)
-- =======================================================================
DEFINE TABLE rating_config SCHEMAFULL;
DEFINE FIELD owner_id ON TABLE rating_config TYPE string;
DEFINE FIELD features ON TABLE rating_config TYPE array<string> \
    DEFAULT [] \
    ASSERT array::len($value) <= 5;
DEFINE FIELD updated_at ON TABLE rating_config TYPE datetime \
    DEFAULT time::now();

-- =======================================================================
-- Rating submissions (append-only)
-- =======================================================================
DEFINE TABLE rating_submission SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE rating_submission TYPE string;
DEFINE FIELD brand_slug ON TABLE rating_submission TYPE string;
DEFINE FIELD scores ON TABLE rating_submission TYPE array<int> \
    ASSERT array::len($value) <= 5 \
    AND array::all($value, |$score| $score >= 1 AND $score <= 5);
DEFINE FIELD comment ON TABLE rating_submission TYPE option<string>;
DEFINE FIELD created_at ON TABLE rating_submission TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_rating_submission_tenant ON TABLE rating_submission \
    COLUMNS tenant_id, created_at;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
/// All DEFINE statements are idempotent so re-running is safe.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    // Ensure migration tracking table exists (idempotent).
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    // Determine current schema version.
    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            // Record the applied migration.
            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            info!(
                version = migration.version,
                "Migration applied successfully"
            );
        }
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
///
/// Exposed for testing with in-memory SurrealDB instances that
/// bypass the migration runner.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_v1_is_nonempty() {
        assert!(!SCHEMA_V1.is_empty());
    }

    #[test]
    fn schema_v1_defines_every_table() {
        for table in [
            "tenant",
            "brand_slug",
            "employee",
            "rating_config",
            "rating_submission",
        ] {
            assert!(
                SCHEMA_V1.contains(&format!("DEFINE TABLE {table} SCHEMAFULL")),
                "missing table {table}"
            );
        }
    }

    #[test]
    fn migrations_are_ordered() {
        for window in MIGRATIONS.windows(2) {
            assert!(
                window[0].version < window[1].version,
                "Migrations must be in ascending version order"
            );
        }
    }
}
