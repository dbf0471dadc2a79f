//! SurrealDB implementation of [`DivisionRepository`].

use chrono::{DateTime, Utc};
use hexeko_core::error::HexekoResult;
use hexeko_core::models::division::{CreateDivision, Division};
use hexeko_core::repository::{DivisionRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, parse_uuid};
use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct DivisionRow {
    name: String,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DivisionRow {
    fn into_division(self, id: Uuid) -> Division {
        Division {
            id,
            name: self.name,
            metadata: self.metadata,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct DivisionRowWithId {
    record_id: String,
    name: String,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DivisionRowWithId {
    fn try_into_division(self) -> Result<Division, DbError> {
        Ok(Division {
            id: parse_uuid("division", &self.record_id)?,
            name: self.name,
            metadata: self.metadata,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Division repository.
#[derive(Clone)]
pub struct SurrealDivisionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealDivisionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> DivisionRepository for SurrealDivisionRepository<C> {
    async fn create(&self, input: CreateDivision) -> HexekoResult<Division> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let metadata = input
            .metadata
            .unwrap_or(serde_json::Value::Object(Default::default()));

        let result = self
            .db
            .query(
                "CREATE type::record('division', $id) SET \
                 name = $name, metadata = $metadata",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("metadata", metadata))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(DbError::from_check)?;

        let rows: Vec<DivisionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "division".into(),
            id: id_str,
        })?;

        Ok(row.into_division(id))
    }

    async fn get_by_id(&self, id: Uuid) -> HexekoResult<Division> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('division', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<DivisionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "division".into(),
            id: id_str,
        })?;

        Ok(row.into_division(id))
    }

    async fn list(&self, pagination: Pagination) -> HexekoResult<PaginatedResult<Division>> {
        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM division GROUP ALL")
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM division \
                 ORDER BY name ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<DivisionRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(DivisionRowWithId::try_into_division)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
