//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Lookups by primary key fail with
//! [`HexekoError::NotFound`](crate::error::HexekoError::NotFound); lookups
//! by an optional secondary key (invitation token, membership pair) return
//! `Option` instead.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::HexekoResult;
use crate::models::{
    division::{CreateDivision, Division},
    financer::{CreateFinancer, Financer},
    membership::{CreateMembership, Membership, UpdateMembership},
    role::{CreateRole, Role, RoleName},
    user::{CreateUser, InvitationStatus, UpdateUser, User},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Tenancy (global scope)
// ---------------------------------------------------------------------------

pub trait DivisionRepository: Send + Sync {
    fn create(&self, input: CreateDivision) -> impl Future<Output = HexekoResult<Division>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = HexekoResult<Division>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = HexekoResult<PaginatedResult<Division>>> + Send;
}

pub trait FinancerRepository: Send + Sync {
    fn create(&self, input: CreateFinancer) -> impl Future<Output = HexekoResult<Financer>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = HexekoResult<Financer>> + Send;
    fn list_by_division(
        &self,
        division_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = HexekoResult<PaginatedResult<Financer>>> + Send;
}

pub trait RoleRepository: Send + Sync {
    fn create(&self, input: CreateRole) -> impl Future<Output = HexekoResult<Role>> + Send;
    fn get_by_name(
        &self,
        guard: &str,
        team_id: Option<Uuid>,
        name: RoleName,
    ) -> impl Future<Output = HexekoResult<Role>> + Send;
    fn list(&self, guard: &str) -> impl Future<Output = HexekoResult<Vec<Role>>> + Send;

    /// Create any missing global role record of the hierarchy for `guard`.
    ///
    /// Idempotent; returns every hierarchy role in rank order.
    fn seed_hierarchy(&self, guard: &str) -> impl Future<Output = HexekoResult<Vec<Role>>> + Send;
}

// ---------------------------------------------------------------------------
// Users and memberships
// ---------------------------------------------------------------------------

pub trait MembershipRepository: Send + Sync {
    /// Attach a user to a financer. Fails with `AlreadyExists` if the pair
    /// already has a membership.
    fn attach(
        &self,
        input: CreateMembership,
    ) -> impl Future<Output = HexekoResult<Membership>> + Send;
    fn find(
        &self,
        user_id: Uuid,
        financer_id: Uuid,
    ) -> impl Future<Output = HexekoResult<Option<Membership>>> + Send;
    fn list_for_user(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = HexekoResult<Vec<Membership>>> + Send;
    fn update(
        &self,
        user_id: Uuid,
        financer_id: Uuid,
        input: UpdateMembership,
    ) -> impl Future<Output = HexekoResult<Membership>> + Send;
}

pub trait UserRepository: Send + Sync {
    /// Insert a user. Unique-index violations (email, invitation token)
    /// surface as `AlreadyExists` naming the field.
    fn create(&self, input: CreateUser) -> impl Future<Output = HexekoResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = HexekoResult<User>> + Send;
    fn get_by_email(&self, email: &str) -> impl Future<Output = HexekoResult<User>> + Send;
    fn find_by_invitation_token(
        &self,
        token: &str,
    ) -> impl Future<Output = HexekoResult<Option<User>>> + Send;
    fn update(&self, id: Uuid, input: UpdateUser) -> impl Future<Output = HexekoResult<User>> + Send;

    /// Enable the user, link `cognito_id` and store `accepted`, but only
    /// while the row is still pending and unexpired at `now`.
    ///
    /// Returns `None` when the guard does not match, so of two concurrent
    /// acceptances exactly one gets the updated user back.
    fn accept_pending_invitation(
        &self,
        id: Uuid,
        cognito_id: &str,
        now: DateTime<Utc>,
    ) -> impl Future<Output = HexekoResult<Option<User>>> + Send;

    /// Hard delete. Only used to roll back a half-created invitation;
    /// users are otherwise never removed.
    fn delete(&self, id: Uuid) -> impl Future<Output = HexekoResult<()>> + Send;

    /// Users whose stored status is `status`, oldest invitation first.
    fn list_by_invitation_status(
        &self,
        status: InvitationStatus,
        pagination: Pagination,
    ) -> impl Future<Output = HexekoResult<PaginatedResult<User>>> + Send;

    /// Count users in one invitation bucket as observed at `now`.
    ///
    /// Buckets partition every invited user: `Pending` excludes stored
    /// pending rows whose expiry is strictly before `now`, and `Expired`
    /// counts those rows together with rows stored as expired.
    fn count_by_invitation_status(
        &self,
        status: InvitationStatus,
        now: DateTime<Utc>,
    ) -> impl Future<Output = HexekoResult<u64>> + Send;

    fn count_invited_by(&self, inviter_id: Uuid) -> impl Future<Output = HexekoResult<u64>> + Send;

    /// Pending invitations expiring within `[from, until]`, soonest first.
    fn list_expiring_between(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> impl Future<Output = HexekoResult<Vec<User>>> + Send;

    /// Persist `expired` on every pending row lapsed at `now`.
    /// Returns the number of rows changed.
    fn mark_expired(&self, now: DateTime<Utc>) -> impl Future<Output = HexekoResult<u64>> + Send;
}
