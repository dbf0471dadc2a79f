//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings. Enums are stored as strings with
//! ASSERT constraints for validation.

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

static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "initial_schema",
        sql: SCHEMA_V1,
    },
    Migration {
        version: 2,
        name: "invitation_lookup_indexes",
        sql: SCHEMA_V2,
    },
];

// -----------------------------------------------------------------------
// Schema v1 — tenancy, roles, users and memberships
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Divisions (global scope)
-- =======================================================================
DEFINE TABLE division SCHEMAFULL;
DEFINE FIELD name ON TABLE division TYPE string;
DEFINE FIELD metadata ON TABLE division TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD created_at ON TABLE division TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE division TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_division_name ON TABLE division COLUMNS name UNIQUE;

-- =======================================================================
-- Financers (tenants, scoped to a division)
-- =======================================================================
DEFINE TABLE financer SCHEMAFULL;
DEFINE FIELD division_id ON TABLE financer TYPE string;
DEFINE FIELD name ON TABLE financer TYPE string;
DEFINE FIELD metadata ON TABLE financer TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD created_at ON TABLE financer TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE financer TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_financer_division ON TABLE financer COLUMNS division_id;

-- =======================================================================
-- Roles (seeded; team_id NONE = global)
-- =======================================================================
DEFINE TABLE role SCHEMAFULL;
DEFINE FIELD name ON TABLE role TYPE string \
    ASSERT $value IN ['god', 'hexeko_super_admin', 'hexeko_admin', \
    'division_super_admin', 'division_admin', 'financer_super_admin', \
    'financer_admin', 'beneficiary'];
DEFINE FIELD team_id ON TABLE role TYPE option<string>;
DEFINE FIELD guard ON TABLE role TYPE string;
DEFINE FIELD created_at ON TABLE role TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE role TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_role_guard_team_name ON TABLE role \
    COLUMNS guard, team_id, name UNIQUE;

-- =======================================================================
-- Users (onboarded users and pending invitees)
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD first_name ON TABLE user TYPE string;
DEFINE FIELD last_name ON TABLE user TYPE string;
DEFINE FIELD enabled ON TABLE user TYPE bool DEFAULT false;
DEFINE FIELD cognito_id ON TABLE user TYPE option<string>;
DEFINE FIELD locale ON TABLE user TYPE string;
DEFINE FIELD currency ON TABLE user TYPE string;
DEFINE FIELD timezone ON TABLE user TYPE string;
DEFINE FIELD global_roles ON TABLE user TYPE array<string> DEFAULT [];
DEFINE FIELD invitation_status ON TABLE user TYPE option<string> \
    ASSERT $value = NONE OR $value IN ['pending', 'accepted', \
    'expired', 'revoked'];
DEFINE FIELD invitation_token ON TABLE user TYPE option<string>;
DEFINE FIELD invited_at ON TABLE user TYPE option<datetime>;
DEFINE FIELD invitation_expires_at ON TABLE user TYPE option<datetime>;
DEFINE FIELD invitation_accepted_at ON TABLE user TYPE option<datetime>;
DEFINE FIELD invited_by ON TABLE user TYPE option<string>;
DEFINE FIELD invitation_metadata ON TABLE user TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_email ON TABLE user COLUMNS email UNIQUE;
DEFINE INDEX idx_user_invitation_token ON TABLE user \
    COLUMNS invitation_token UNIQUE;

-- =======================================================================
-- Memberships (user <-> financer pivot, one scalar role)
-- =======================================================================
DEFINE TABLE membership SCHEMAFULL;
DEFINE FIELD user_id ON TABLE membership TYPE string;
DEFINE FIELD financer_id ON TABLE membership TYPE string;
DEFINE FIELD role ON TABLE membership TYPE string \
    ASSERT $value IN ['god', 'hexeko_super_admin', 'hexeko_admin', \
    'division_super_admin', 'division_admin', 'financer_super_admin', \
    'financer_admin', 'beneficiary'];
DEFINE FIELD active ON TABLE membership TYPE bool DEFAULT false;
DEFINE FIELD valid_from ON TABLE membership TYPE option<datetime>;
DEFINE FIELD valid_to ON TABLE membership TYPE option<datetime>;
DEFINE FIELD language ON TABLE membership TYPE option<string>;
DEFINE FIELD attributes ON TABLE membership TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD created_at ON TABLE membership TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE membership TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_membership_user_financer ON TABLE membership \
    COLUMNS user_id, financer_id UNIQUE;
";

// -----------------------------------------------------------------------
// Schema v2 — secondary indexes for invitation metrics and expiry scans
// -----------------------------------------------------------------------

const SCHEMA_V2: &str = "\
DEFINE INDEX idx_user_invitation_status ON TABLE user \
    COLUMNS invitation_status;
DEFINE INDEX idx_user_invitation_expiry ON TABLE user \
    COLUMNS invitation_status, invitation_expires_at;
DEFINE INDEX idx_user_invited_by ON TABLE user COLUMNS invited_by;
DEFINE INDEX idx_membership_user ON TABLE membership COLUMNS user_id;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
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
