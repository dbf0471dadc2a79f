//! SurrealDB implementation of [`MembershipRepository`].
//!
//! Memberships are plain records rather than graph edges so the
//! `(user_id, financer_id)` pair can carry a unique index.

use chrono::{DateTime, Utc};
use hexeko_core::error::HexekoResult;
use hexeko_core::models::membership::{CreateMembership, Membership, UpdateMembership};
use hexeko_core::models::role::RoleName;
use hexeko_core::repository::MembershipRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct MembershipRow {
    user_id: String,
    financer_id: String,
    role: String,
    active: bool,
    valid_from: Option<DateTime<Utc>>,
    valid_to: Option<DateTime<Utc>>,
    language: Option<String>,
    attributes: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl MembershipRow {
    fn into_membership(self, id: Uuid) -> Result<Membership, DbError> {
        Ok(Membership {
            id,
            user_id: parse_uuid("user", &self.user_id)?,
            financer_id: parse_uuid("financer", &self.financer_id)?,
            role: self
                .role
                .parse::<RoleName>()
                .map_err(|e| DbError::Decode(e.to_string()))?,
            active: self.active,
            valid_from: self.valid_from,
            valid_to: self.valid_to,
            language: self.language,
            attributes: self.attributes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct MembershipRowWithId {
    record_id: String,
    user_id: String,
    financer_id: String,
    role: String,
    active: bool,
    valid_from: Option<DateTime<Utc>>,
    valid_to: Option<DateTime<Utc>>,
    language: Option<String>,
    attributes: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl MembershipRowWithId {
    fn try_into_membership(self) -> Result<Membership, DbError> {
        let id = parse_uuid("membership", &self.record_id)?;
        MembershipRow {
            user_id: self.user_id,
            financer_id: self.financer_id,
            role: self.role,
            active: self.active,
            valid_from: self.valid_from,
            valid_to: self.valid_to,
            language: self.language,
            attributes: self.attributes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_membership(id)
    }
}

/// SurrealDB implementation of the Membership repository.
#[derive(Clone)]
pub struct SurrealMembershipRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealMembershipRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> MembershipRepository for SurrealMembershipRepository<C> {
    async fn attach(&self, input: CreateMembership) -> HexekoResult<Membership> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let attributes = input
            .attributes
            .unwrap_or(serde_json::Value::Object(Default::default()));

        let result = self
            .db
            .query(
                "CREATE type::record('membership', $id) SET \
                 user_id = $user_id, financer_id = $financer_id, \
                 role = $role, active = $active, \
                 valid_from = $valid_from, valid_to = $valid_to, \
                 language = $language, attributes = $attributes",
            )
            .bind(("id", id_str.clone()))
            .bind(("user_id", input.user_id.to_string()))
            .bind(("financer_id", input.financer_id.to_string()))
            .bind(("role", input.role.as_str().to_string()))
            .bind(("active", input.active))
            .bind(("valid_from", input.valid_from))
            .bind(("valid_to", input.valid_to))
            .bind(("language", input.language))
            .bind(("attributes", attributes))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(DbError::from_check)?;

        let rows: Vec<MembershipRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "membership".into(),
            id: id_str,
        })?;

        Ok(row.into_membership(id)?)
    }

    async fn find(&self, user_id: Uuid, financer_id: Uuid) -> HexekoResult<Option<Membership>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM membership \
                 WHERE user_id = $user_id AND financer_id = $financer_id",
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("financer_id", financer_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MembershipRowWithId> = result.take(0).map_err(DbError::from)?;
        let membership = rows
            .into_iter()
            .next()
            .map(MembershipRowWithId::try_into_membership)
            .transpose()?;

        Ok(membership)
    }

    async fn list_for_user(&self, user_id: Uuid) -> HexekoResult<Vec<Membership>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM membership \
                 WHERE user_id = $user_id ORDER BY created_at ASC",
            )
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MembershipRowWithId> = result.take(0).map_err(DbError::from)?;
        let memberships = rows
            .into_iter()
            .map(MembershipRowWithId::try_into_membership)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(memberships)
    }

    async fn update(
        &self,
        user_id: Uuid,
        financer_id: Uuid,
        input: UpdateMembership,
    ) -> HexekoResult<Membership> {
        let mut sets = Vec::new();
        if input.role.is_some() {
            sets.push("role = $role");
        }
        if input.active.is_some() {
            sets.push("active = $active");
        }
        if input.valid_to.is_some() {
            sets.push("valid_to = $valid_to");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE membership SET {} \
             WHERE user_id = $user_id AND financer_id = $financer_id",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("user_id", user_id.to_string()))
            .bind(("financer_id", financer_id.to_string()));

        if let Some(role) = input.role {
            builder = builder.bind(("role", role.as_str().to_string()));
        }
        if let Some(active) = input.active {
            builder = builder.bind(("active", active));
        }
        if let Some(valid_to) = input.valid_to {
            // valid_to is Option<Option<_>>: Some(None) clears the bound.
            builder = builder.bind(("valid_to", valid_to));
        }

        builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from_check)?;

        self.find(user_id, financer_id).await?.ok_or_else(|| {
            DbError::NotFound {
                entity: "membership".into(),
                id: format!("user={user_id},financer={financer_id}"),
            }
            .into()
        })
    }
}
