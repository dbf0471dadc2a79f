//! Financer membership (the user/financer pivot).
//!
//! A membership carries exactly one scalar role. Memberships are never
//! removed: they are deactivated with `active = false`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::role::RoleName;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Membership {
    pub id: Uuid,
    pub user_id: Uuid,
    pub financer_id: Uuid,
    pub role: RoleName,
    pub active: bool,
    /// Start of the validity window (inclusive). `None` = open.
    pub valid_from: Option<DateTime<Utc>>,
    /// End of the validity window (exclusive). `None` = open.
    pub valid_to: Option<DateTime<Utc>>,
    pub language: Option<String>,
    /// Job metadata (title, department, external payroll ids...).
    pub attributes: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMembership {
    pub user_id: Uuid,
    pub financer_id: Uuid,
    pub role: RoleName,
    pub active: bool,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    pub language: Option<String>,
    pub attributes: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateMembership {
    pub role: Option<RoleName>,
    pub active: Option<bool>,
    /// `Some(Some(v))` = set, `Some(None)` = clear, `None` = no change.
    pub valid_to: Option<Option<DateTime<Utc>>>,
}
