//! Database-specific error types and conversions.

use hexeko_core::error::HexekoError;

/// Unique indexes whose violations are reported as domain conflicts,
/// as `(index, entity, field)`.
const UNIQUE_INDEXES: &[(&str, &str, &str)] = &[
    ("idx_user_invitation_token", "user", "invitation_token"),
    ("idx_user_email", "user", "email"),
    ("idx_membership_user_financer", "membership", "financer_id"),
    ("idx_role_guard_team_name", "role", "name"),
    ("idx_division_name", "division", "name"),
];

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Cannot reach SurrealDB at {url}: {source}")]
    Connection {
        url: String,
        #[source]
        source: surrealdb::Error,
    },

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Unique index {index} violated on {entity}.{field}")]
    Conflict {
        index: &'static str,
        entity: &'static str,
        field: &'static str,
    },

    #[error("Corrupt record: {0}")]
    Decode(String),
}

impl DbError {
    /// Classify an error returned by `Response::check`.
    ///
    /// Unique-index violations become [`DbError::Conflict`]; everything
    /// else is kept as a SurrealDB error.
    pub(crate) fn from_check(err: surrealdb::Error) -> Self {
        let message = err.to_string();
        if message.contains("already contains") {
            if let Some(&(index, entity, field)) = UNIQUE_INDEXES
                .iter()
                .find(|(index, _, _)| message.contains(*index))
            {
                return DbError::Conflict {
                    index,
                    entity,
                    field,
                };
            }
        }
        DbError::Surreal(err)
    }
}

impl From<DbError> for HexekoError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => HexekoError::NotFound { entity, id },
            DbError::Conflict { entity, field, .. } => HexekoError::AlreadyExists {
                entity: entity.into(),
                field: field.into(),
            },
            other => HexekoError::Database(other.to_string()),
        }
    }
}
