//! SurrealDB implementation of [`UserRepository`].
//!
//! Invited and onboarded users share the `user` table. Invitation buckets
//! are evaluated against a caller-supplied `now`, so a pending row past its
//! expiry is reported as expired without being rewritten.

use chrono::{DateTime, Utc};
use hexeko_core::error::HexekoResult;
use hexeko_core::models::role::RoleName;
use hexeko_core::models::user::{
    CreateUser, InvitationMetadata, InvitationStatus, UpdateUser, User,
};
use hexeko_core::repository::{PaginatedResult, Pagination, UserRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, parse_uuid};
use crate::error::DbError;

const USER_PROJECTION: &str = "SELECT meta::id(id) AS record_id, * FROM";

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct UserRowWithId {
    record_id: String,
    email: String,
    first_name: String,
    last_name: String,
    enabled: bool,
    cognito_id: Option<String>,
    locale: String,
    currency: String,
    timezone: String,
    global_roles: serde_json::Value,
    invitation_status: Option<String>,
    invitation_token: Option<String>,
    invited_at: Option<DateTime<Utc>>,
    invitation_expires_at: Option<DateTime<Utc>>,
    invitation_accepted_at: Option<DateTime<Utc>>,
    invited_by: Option<String>,
    invitation_metadata: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRowWithId {
    fn try_into_user(self) -> Result<User, DbError> {
        let global_roles: Vec<RoleName> = serde_json::from_value(self.global_roles)
            .map_err(|e| DbError::Decode(format!("invalid global_roles: {e}")))?;
        let invitation_status = self
            .invitation_status
            .as_deref()
            .map(str::parse::<InvitationStatus>)
            .transpose()
            .map_err(DbError::Decode)?;
        let invitation_metadata: InvitationMetadata =
            serde_json::from_value(self.invitation_metadata)
                .map_err(|e| DbError::Decode(format!("invalid invitation_metadata: {e}")))?;
        let invited_by = self
            .invited_by
            .as_deref()
            .map(|inviter| parse_uuid("inviter", inviter))
            .transpose()?;

        Ok(User {
            id: parse_uuid("user", &self.record_id)?,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            enabled: self.enabled,
            cognito_id: self.cognito_id,
            locale: self.locale,
            currency: self.currency,
            timezone: self.timezone,
            global_roles,
            invitation_status,
            invitation_token: self.invitation_token,
            invited_at: self.invited_at,
            invitation_expires_at: self.invitation_expires_at,
            invitation_accepted_at: self.invitation_accepted_at,
            invited_by,
            invitation_metadata,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn encode_roles(roles: &[RoleName]) -> Result<serde_json::Value, DbError> {
    serde_json::to_value(roles).map_err(|e| DbError::Decode(format!("global_roles: {e}")))
}

/// WHERE clause selecting one invitation bucket at `$now`.
///
/// The four clauses are mutually exclusive and together cover every row
/// with a non-null `invitation_status`.
fn bucket_predicate(status: InvitationStatus) -> &'static str {
    match status {
        InvitationStatus::Pending => {
            "invitation_status = 'pending' \
             AND (invitation_expires_at = NONE OR invitation_expires_at >= $now)"
        }
        InvitationStatus::Expired => {
            "(invitation_status = 'expired' \
             OR (invitation_status = 'pending' \
                 AND invitation_expires_at != NONE \
                 AND invitation_expires_at < $now))"
        }
        InvitationStatus::Accepted => "invitation_status = 'accepted'",
        InvitationStatus::Revoked => "invitation_status = 'revoked'",
    }
}

/// SurrealDB implementation of the User repository.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn select_one(
        &self,
        clause: &str,
        key: &'static str,
        value: String,
    ) -> HexekoResult<Option<User>> {
        let query = format!("{USER_PROJECTION} user WHERE {clause} LIMIT 1");
        let mut result = self
            .db
            .query(query)
            .bind((key, value))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRowWithId> = result.take(0).map_err(DbError::from)?;
        let user = rows
            .into_iter()
            .next()
            .map(UserRowWithId::try_into_user)
            .transpose()?;

        Ok(user)
    }

    async fn count_where(
        &self,
        clause: &str,
        now: DateTime<Utc>,
        inviter: Option<String>,
    ) -> HexekoResult<u64> {
        let query = format!("SELECT count() AS total FROM user WHERE {clause} GROUP ALL");
        let mut result = self
            .db
            .query(query)
            .bind(("now", now))
            .bind(("inviter", inviter))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn create(&self, input: CreateUser) -> HexekoResult<User> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let global_roles = encode_roles(&input.global_roles)?;
        let metadata = serde_json::to_value(&input.invitation_metadata)
            .map_err(|e| DbError::Decode(format!("invitation_metadata: {e}")))?;

        // Statement 0 is the CREATE, statement 1 re-reads it with its id.
        let query = format!(
            "CREATE type::record('user', $id) SET \
             email = $email, first_name = $first_name, last_name = $last_name, \
             enabled = $enabled, cognito_id = $cognito_id, \
             locale = $locale, currency = $currency, timezone = $timezone, \
             global_roles = $global_roles, \
             invitation_status = $invitation_status, \
             invitation_token = $invitation_token, \
             invited_at = $invited_at, \
             invitation_expires_at = $invitation_expires_at, \
             invited_by = $invited_by, \
             invitation_metadata = $invitation_metadata; \
             {USER_PROJECTION} type::record('user', $id);"
        );

        let result = self
            .db
            .query(query)
            .bind(("id", id_str.clone()))
            .bind(("email", input.email))
            .bind(("first_name", input.first_name))
            .bind(("last_name", input.last_name))
            .bind(("enabled", input.enabled))
            .bind(("cognito_id", input.cognito_id))
            .bind(("locale", input.locale))
            .bind(("currency", input.currency))
            .bind(("timezone", input.timezone))
            .bind(("global_roles", global_roles))
            .bind((
                "invitation_status",
                input.invitation_status.map(|s| s.as_str().to_string()),
            ))
            .bind(("invitation_token", input.invitation_token))
            .bind(("invited_at", input.invited_at))
            .bind(("invitation_expires_at", input.invitation_expires_at))
            .bind(("invited_by", input.invited_by.map(|u| u.to_string())))
            .bind(("invitation_metadata", metadata))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(DbError::from_check)?;

        let rows: Vec<UserRowWithId> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;

        Ok(row.try_into_user()?)
    }

    async fn get_by_id(&self, id: Uuid) -> HexekoResult<User> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(format!("{USER_PROJECTION} type::record('user', $id)"))
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;

        Ok(row.try_into_user()?)
    }

    async fn get_by_email(&self, email: &str) -> HexekoResult<User> {
        self.select_one("email = $email", "email", email.to_string())
            .await?
            .ok_or_else(|| {
                DbError::NotFound {
                    entity: "user".into(),
                    id: format!("email={email}"),
                }
                .into()
            })
    }

    async fn find_by_invitation_token(&self, token: &str) -> HexekoResult<Option<User>> {
        self.select_one(
            "invitation_token = $invitation_token",
            "invitation_token",
            token.to_string(),
        )
        .await
    }

    async fn update(&self, id: Uuid, input: UpdateUser) -> HexekoResult<User> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.first_name.is_some() {
            sets.push("first_name = $first_name");
        }
        if input.last_name.is_some() {
            sets.push("last_name = $last_name");
        }
        if input.enabled.is_some() {
            sets.push("enabled = $enabled");
        }
        if input.cognito_id.is_some() {
            sets.push("cognito_id = $cognito_id");
        }
        if input.global_roles.is_some() {
            sets.push("global_roles = $global_roles");
        }
        if input.invitation_status.is_some() {
            sets.push("invitation_status = $invitation_status");
        }
        if input.invitation_accepted_at.is_some() {
            sets.push("invitation_accepted_at = $invitation_accepted_at");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('user', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(first_name) = input.first_name {
            builder = builder.bind(("first_name", first_name));
        }
        if let Some(last_name) = input.last_name {
            builder = builder.bind(("last_name", last_name));
        }
        if let Some(enabled) = input.enabled {
            builder = builder.bind(("enabled", enabled));
        }
        if let Some(cognito_id) = input.cognito_id {
            // cognito_id is Option<Option<String>>: Some(None) = clear
            builder = builder.bind(("cognito_id", cognito_id));
        }
        if let Some(ref global_roles) = input.global_roles {
            builder = builder.bind(("global_roles", encode_roles(global_roles)?));
        }
        if let Some(status) = input.invitation_status {
            builder = builder.bind(("invitation_status", status.as_str().to_string()));
        }
        if let Some(accepted_at) = input.invitation_accepted_at {
            builder = builder.bind(("invitation_accepted_at", accepted_at));
        }

        builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from_check)?;

        self.get_by_id(id).await
    }

    async fn accept_pending_invitation(
        &self,
        id: Uuid,
        cognito_id: &str,
        now: DateTime<Utc>,
    ) -> HexekoResult<Option<User>> {
        let mut result = self
            .db
            .query(format!(
                "UPDATE type::record('user', $id) SET \
                 enabled = true, \
                 cognito_id = $cognito_id, \
                 invitation_status = 'accepted', \
                 invitation_accepted_at = $now, \
                 updated_at = time::now() \
                 WHERE {} \
                 RETURN AFTER",
                bucket_predicate(InvitationStatus::Pending)
            ))
            .bind(("id", id.to_string()))
            .bind(("cognito_id", cognito_id.to_string()))
            .bind(("now", now))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from_check)?;

        let rows: Vec<surrealdb_types::Value> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            return Ok(None);
        }

        self.get_by_id(id).await.map(Some)
    }

    async fn delete(&self, id: Uuid) -> HexekoResult<()> {
        self.db
            .query("DELETE type::record('user', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from_check)?;

        Ok(())
    }

    async fn list_by_invitation_status(
        &self,
        status: InvitationStatus,
        pagination: Pagination,
    ) -> HexekoResult<PaginatedResult<User>> {
        let status_str = status.as_str().to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM user \
                 WHERE invitation_status = $status GROUP ALL",
            )
            .bind(("status", status_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(format!(
                "{USER_PROJECTION} user \
                 WHERE invitation_status = $status \
                 ORDER BY invited_at ASC \
                 LIMIT $limit START $offset"
            ))
            .bind(("status", status_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(UserRowWithId::try_into_user)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn count_by_invitation_status(
        &self,
        status: InvitationStatus,
        now: DateTime<Utc>,
    ) -> HexekoResult<u64> {
        self.count_where(bucket_predicate(status), now, None).await
    }

    async fn count_invited_by(&self, inviter_id: Uuid) -> HexekoResult<u64> {
        self.count_where(
            "invited_by = $inviter AND invitation_status != NONE",
            Utc::now(),
            Some(inviter_id.to_string()),
        )
        .await
    }

    async fn list_expiring_between(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> HexekoResult<Vec<User>> {
        let mut result = self
            .db
            .query(format!(
                "{USER_PROJECTION} user \
                 WHERE invitation_status = 'pending' \
                 AND invitation_expires_at != NONE \
                 AND invitation_expires_at >= $from \
                 AND invitation_expires_at <= $until \
                 ORDER BY invitation_expires_at ASC"
            ))
            .bind(("from", from))
            .bind(("until", until))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRowWithId> = result.take(0).map_err(DbError::from)?;
        let users = rows
            .into_iter()
            .map(UserRowWithId::try_into_user)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(users)
    }

    async fn mark_expired(&self, now: DateTime<Utc>) -> HexekoResult<u64> {
        let mut result = self
            .db
            .query(
                "UPDATE user SET invitation_status = 'expired', \
                 updated_at = time::now() \
                 WHERE invitation_status = 'pending' \
                 AND invitation_expires_at != NONE \
                 AND invitation_expires_at < $now \
                 RETURN AFTER",
            )
            .bind(("now", now))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from_check)?;

        let rows: Vec<surrealdb_types::Value> = result.take(0).map_err(DbError::from)?;
        Ok(rows.len() as u64)
    }
}
