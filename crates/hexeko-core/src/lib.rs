//! Hexeko Core — domain models, the error taxonomy and the repository
//! traits implemented by the storage layer.

pub mod error;
pub mod models;
pub mod repository;

pub use error::{HexekoError, HexekoResult};
pub use models::role::{RoleName, RoleScope, UnknownRoleError};
