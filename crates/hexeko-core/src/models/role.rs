//! Role domain model and the fixed role hierarchy.
//!
//! The hierarchy is a total order over [`RoleName`]. Rank 0 is the highest
//! authority; a role may only manage roles strictly below it.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::error::HexekoError;

/// Raised for role identifiers outside the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role identifier: {0}")]
pub struct UnknownRoleError(pub String);

impl From<UnknownRoleError> for HexekoError {
    fn from(err: UnknownRoleError) -> Self {
        HexekoError::UnknownRole(err.0)
    }
}

/// Every role identifier, declared in hierarchy order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleName {
    God,
    HexekoSuperAdmin,
    HexekoAdmin,
    DivisionSuperAdmin,
    DivisionAdmin,
    FinancerSuperAdmin,
    FinancerAdmin,
    Beneficiary,
}

/// Where a role's authority applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleScope {
    /// Platform-wide; bypasses tenant checks.
    Global,
    /// All financers of the divisions the holder belongs to.
    Division,
    /// Only the financers the holder belongs to.
    Financer,
    /// No administrative scope.
    Member,
}

impl RoleName {
    /// The hierarchy, highest authority first. `HIERARCHY[rank] == role`.
    pub const HIERARCHY: [RoleName; 8] = [
        RoleName::God,
        RoleName::HexekoSuperAdmin,
        RoleName::HexekoAdmin,
        RoleName::DivisionSuperAdmin,
        RoleName::DivisionAdmin,
        RoleName::FinancerSuperAdmin,
        RoleName::FinancerAdmin,
        RoleName::Beneficiary,
    ];

    /// Position in the hierarchy; lower means more authority.
    pub const fn rank(self) -> u8 {
        match self {
            RoleName::God => 0,
            RoleName::HexekoSuperAdmin => 1,
            RoleName::HexekoAdmin => 2,
            RoleName::DivisionSuperAdmin => 3,
            RoleName::DivisionAdmin => 4,
            RoleName::FinancerSuperAdmin => 5,
            RoleName::FinancerAdmin => 6,
            RoleName::Beneficiary => 7,
        }
    }

    /// Rank of a raw role identifier.
    pub fn rank_of(identifier: &str) -> Result<u8, UnknownRoleError> {
        identifier.parse::<RoleName>().map(RoleName::rank)
    }

    /// `self` has strictly less authority than `other`.
    pub const fn is_strictly_below(self, other: RoleName) -> bool {
        self.rank() > other.rank()
    }

    /// Every role strictly below `self`, highest first.
    pub fn roles_below(self) -> impl Iterator<Item = RoleName> {
        Self::HIERARCHY
            .into_iter()
            .filter(move |candidate| candidate.is_strictly_below(self))
    }

    pub const fn scope(self) -> RoleScope {
        match self {
            RoleName::God | RoleName::HexekoSuperAdmin | RoleName::HexekoAdmin => RoleScope::Global,
            RoleName::DivisionSuperAdmin | RoleName::DivisionAdmin => RoleScope::Division,
            RoleName::FinancerSuperAdmin | RoleName::FinancerAdmin => RoleScope::Financer,
            RoleName::Beneficiary => RoleScope::Member,
        }
    }

    pub const fn is_global(self) -> bool {
        matches!(self.scope(), RoleScope::Global)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            RoleName::God => "god",
            RoleName::HexekoSuperAdmin => "hexeko_super_admin",
            RoleName::HexekoAdmin => "hexeko_admin",
            RoleName::DivisionSuperAdmin => "division_super_admin",
            RoleName::DivisionAdmin => "division_admin",
            RoleName::FinancerSuperAdmin => "financer_super_admin",
            RoleName::FinancerAdmin => "financer_admin",
            RoleName::Beneficiary => "beneficiary",
        }
    }

    /// Highest-authority role of a set, if any.
    pub fn highest<I: IntoIterator<Item = RoleName>>(roles: I) -> Option<RoleName> {
        roles.into_iter().min_by_key(|role| role.rank())
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleName {
    type Err = UnknownRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::HIERARCHY
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRoleError(s.to_string()))
    }
}

/// Persisted role record, seeded at bootstrap.
///
/// Names are unique within a `(guard, team_id)` pair; `team_id = None`
/// denotes a global role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub name: RoleName,
    pub team_id: Option<Uuid>,
    pub guard: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRole {
    pub name: RoleName,
    pub team_id: Option<Uuid>,
    pub guard: String,
}
