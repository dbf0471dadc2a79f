//! SurrealDB implementation of [`RoleRepository`].

use chrono::{DateTime, Utc};
use hexeko_core::error::{HexekoError, HexekoResult};
use hexeko_core::models::role::{CreateRole, Role, RoleName};
use hexeko_core::repository::RoleRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct RoleRow {
    name: String,
    team_id: Option<String>,
    guard: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RoleRow {
    fn into_role(self, id: Uuid) -> Result<Role, DbError> {
        let name = self
            .name
            .parse::<RoleName>()
            .map_err(|e| DbError::Decode(e.to_string()))?;
        let team_id = self
            .team_id
            .as_deref()
            .map(|team| parse_uuid("team", team))
            .transpose()?;
        Ok(Role {
            id,
            name,
            team_id,
            guard: self.guard,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct RoleRowWithId {
    record_id: String,
    name: String,
    team_id: Option<String>,
    guard: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RoleRowWithId {
    fn try_into_role(self) -> Result<Role, DbError> {
        let id = parse_uuid("role", &self.record_id)?;
        RoleRow {
            name: self.name,
            team_id: self.team_id,
            guard: self.guard,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_role(id)
    }
}

/// SurrealDB implementation of the Role repository.
#[derive(Clone)]
pub struct SurrealRoleRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRoleRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> RoleRepository for SurrealRoleRepository<C> {
    async fn create(&self, input: CreateRole) -> HexekoResult<Role> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('role', $id) SET \
                 name = $name, team_id = $team_id, guard = $guard",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name.as_str().to_string()))
            .bind(("team_id", input.team_id.map(|t| t.to_string())))
            .bind(("guard", input.guard))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(DbError::from_check)?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "role".into(),
            id: id_str,
        })?;

        Ok(row.into_role(id)?)
    }

    async fn get_by_name(
        &self,
        guard: &str,
        team_id: Option<Uuid>,
        name: RoleName,
    ) -> HexekoResult<Role> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM role \
                 WHERE guard = $guard AND team_id = $team_id AND name = $name",
            )
            .bind(("guard", guard.to_string()))
            .bind(("team_id", team_id.map(|t| t.to_string())))
            .bind(("name", name.as_str().to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "role".into(),
            id: format!("guard={guard},name={name}"),
        })?;

        Ok(row.try_into_role()?)
    }

    async fn list(&self, guard: &str) -> HexekoResult<Vec<Role>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM role \
                 WHERE guard = $guard ORDER BY created_at ASC",
            )
            .bind(("guard", guard.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRowWithId> = result.take(0).map_err(DbError::from)?;
        let mut roles = rows
            .into_iter()
            .map(RoleRowWithId::try_into_role)
            .collect::<Result<Vec<_>, DbError>>()?;
        roles.sort_by_key(|role| (role.team_id, role.name.rank()));

        Ok(roles)
    }

    async fn seed_hierarchy(&self, guard: &str) -> HexekoResult<Vec<Role>> {
        let mut seeded = Vec::with_capacity(RoleName::HIERARCHY.len());

        for name in RoleName::HIERARCHY {
            let role = match self.get_by_name(guard, None, name).await {
                Ok(role) => role,
                Err(HexekoError::NotFound { .. }) => {
                    info!(guard, role = %name, "Seeding role");
                    self.create(CreateRole {
                        name,
                        team_id: None,
                        guard: guard.to_string(),
                    })
                    .await?
                }
                Err(e) => return Err(e),
            };
            seeded.push(role);
        }

        Ok(seeded)
    }
}
