//! Division domain model.
//!
//! Divisions group financers under a shared administrative scope. Division
//! roles (`division_super_admin`, `division_admin`) extend to every financer
//! of the division.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Division {
    pub id: Uuid,
    /// Human-readable name, unique across the platform.
    pub name: String,
    /// Arbitrary key-value metadata.
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a new division.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDivision {
    pub name: String,
    pub metadata: Option<serde_json::Value>,
}
