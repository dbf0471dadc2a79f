//! SurrealDB repository implementations.

mod division;
mod financer;
mod membership;
mod role;
mod user;

pub use division::SurrealDivisionRepository;
pub use financer::SurrealFinancerRepository;
pub use membership::SurrealMembershipRepository;
pub use role::SurrealRoleRepository;
pub use user::SurrealUserRepository;

use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// Parse a UUID stored as a string column.
fn parse_uuid(column: &str, value: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::Decode(format!("invalid {column} UUID: {e}")))
}
