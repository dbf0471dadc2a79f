//! Financer domain model.
//!
//! A financer is a tenant organization (an employer). Users join financers
//! through memberships; every financer belongs to exactly one division.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Financer {
    pub id: Uuid,
    /// The division this financer belongs to.
    pub division_id: Uuid,
    pub name: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a new financer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFinancer {
    pub division_id: Uuid,
    pub name: String,
    pub metadata: Option<serde_json::Value>,
}

/// A financer together with the division it sits in.
///
/// This is the tenant a role assignment targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TenantScope {
    pub financer_id: Uuid,
    pub division_id: Uuid,
}

impl From<&Financer> for TenantScope {
    fn from(financer: &Financer) -> Self {
        Self {
            financer_id: financer.id,
            division_id: financer.division_id,
        }
    }
}
