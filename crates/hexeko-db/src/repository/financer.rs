//! SurrealDB implementation of [`FinancerRepository`].

use chrono::{DateTime, Utc};
use hexeko_core::error::HexekoResult;
use hexeko_core::models::financer::{CreateFinancer, Financer};
use hexeko_core::repository::{FinancerRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, parse_uuid};
use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct FinancerRow {
    division_id: String,
    name: String,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl FinancerRow {
    fn into_financer(self, id: Uuid) -> Result<Financer, DbError> {
        Ok(Financer {
            id,
            division_id: parse_uuid("division", &self.division_id)?,
            name: self.name,
            metadata: self.metadata,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct FinancerRowWithId {
    record_id: String,
    division_id: String,
    name: String,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl FinancerRowWithId {
    fn try_into_financer(self) -> Result<Financer, DbError> {
        Ok(Financer {
            id: parse_uuid("financer", &self.record_id)?,
            division_id: parse_uuid("division", &self.division_id)?,
            name: self.name,
            metadata: self.metadata,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Financer repository.
#[derive(Clone)]
pub struct SurrealFinancerRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealFinancerRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> FinancerRepository for SurrealFinancerRepository<C> {
    async fn create(&self, input: CreateFinancer) -> HexekoResult<Financer> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let division_id_str = input.division_id.to_string();
        let metadata = input
            .metadata
            .unwrap_or(serde_json::Value::Object(Default::default()));

        // Reject financers pointing at an unknown division.
        let mut exists = self
            .db
            .query("SELECT count() AS total FROM type::record('division', $division_id) GROUP ALL")
            .bind(("division_id", division_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let found: Vec<CountRow> = exists.take(0).map_err(DbError::from)?;
        if found.first().map(|r| r.total).unwrap_or(0) == 0 {
            return Err(DbError::NotFound {
                entity: "division".into(),
                id: division_id_str,
            }
            .into());
        }

        let result = self
            .db
            .query(
                "CREATE type::record('financer', $id) SET \
                 division_id = $division_id, \
                 name = $name, metadata = $metadata",
            )
            .bind(("id", id_str.clone()))
            .bind(("division_id", division_id_str))
            .bind(("name", input.name))
            .bind(("metadata", metadata))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(DbError::from_check)?;

        let rows: Vec<FinancerRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "financer".into(),
            id: id_str,
        })?;

        Ok(row.into_financer(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> HexekoResult<Financer> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('financer', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<FinancerRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "financer".into(),
            id: id_str,
        })?;

        Ok(row.into_financer(id)?)
    }

    async fn list_by_division(
        &self,
        division_id: Uuid,
        pagination: Pagination,
    ) -> HexekoResult<PaginatedResult<Financer>> {
        let division_id_str = division_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM financer \
                 WHERE division_id = $division_id GROUP ALL",
            )
            .bind(("division_id", division_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM financer \
                 WHERE division_id = $division_id \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("division_id", division_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<FinancerRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(FinancerRowWithId::try_into_financer)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
