//! Error types for the Hexeko platform.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HexekoError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity} ({field} must be unique)")]
    AlreadyExists { entity: String, field: String },

    /// The acting user may not assign or manage `role`.
    #[error("Not authorized to assign role: {role}")]
    UnauthorizedRoleAssignment { role: String },

    #[error("Unknown role identifier: {0}")]
    UnknownRole(String),

    /// Any persistence failure while creating an invited user.
    #[error("Failed to create invited user: {source}")]
    InvitedUserCreation {
        #[source]
        source: Box<HexekoError>,
    },

    /// The invitation exists but can no longer be redeemed or changed.
    #[error("Invitation unavailable: {reason}")]
    InvitationUnavailable { reason: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl HexekoError {
    /// HTTP status class an API boundary should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            HexekoError::NotFound { .. } => 404,
            HexekoError::AlreadyExists { .. } => 409,
            HexekoError::UnauthorizedRoleAssignment { .. } | HexekoError::Validation { .. } => 422,
            HexekoError::InvitationUnavailable { .. } => 410,
            HexekoError::UnknownRole(_)
            | HexekoError::InvitedUserCreation { .. }
            | HexekoError::Database(_)
            | HexekoError::Internal(_) => 500,
        }
    }

    /// True when this is a unique-index conflict on `field`.
    pub fn is_conflict_on(&self, field: &str) -> bool {
        matches!(self, HexekoError::AlreadyExists { field: f, .. } if f == field)
    }
}

pub type HexekoResult<T> = Result<T, HexekoError>;
