//! Role management: who may assign, change or revoke which role.

use std::collections::BTreeSet;

use chrono::Utc;
use hexeko_core::error::{HexekoError, HexekoResult};
use hexeko_core::models::financer::TenantScope;
use hexeko_core::models::membership::{Membership, UpdateMembership};
use hexeko_core::repository::{FinancerRepository, MembershipRepository, UserRepository};
use hexeko_core::RoleName;
use tracing::{info, warn};
use uuid::Uuid;

use crate::context::{Actor, AuthorizationContext, MembershipGrant};

/// Fail with [`HexekoError::UnauthorizedRoleAssignment`] naming `role`
/// unless `ctx` may manage it in `scope`.
pub fn ensure_can_manage(
    ctx: &AuthorizationContext,
    role: RoleName,
    scope: Option<&TenantScope>,
) -> HexekoResult<()> {
    if ctx.can_manage(role, scope) {
        return Ok(());
    }

    warn!(
        actor = %ctx.user_id,
        effective_role = ?ctx.effective_role,
        role = %role,
        financer = ?scope.map(|s| s.financer_id),
        "Role management denied"
    );
    Err(HexekoError::UnauthorizedRoleAssignment {
        role: role.to_string(),
    })
}

/// Role management service.
///
/// Generic over repository implementations so that the access layer
/// has no dependency on the database crate.
pub struct RoleManagementService<U: UserRepository, M: MembershipRepository, F: FinancerRepository>
{
    user_repo: U,
    membership_repo: M,
    financer_repo: F,
}

impl<U, M, F> RoleManagementService<U, M, F>
where
    U: UserRepository,
    M: MembershipRepository,
    F: FinancerRepository,
{
    pub fn new(user_repo: U, membership_repo: M, financer_repo: F) -> Self {
        Self {
            user_repo,
            membership_repo,
            financer_repo,
        }
    }

    /// Load the user's roles and memberships and resolve their context
    /// for this request.
    pub async fn resolve_context(
        &self,
        user_id: Uuid,
        requested_financer: Option<Uuid>,
    ) -> HexekoResult<AuthorizationContext> {
        let user = self.user_repo.get_by_id(user_id).await?;
        let memberships = self.membership_repo.list_for_user(user_id).await?;

        let mut grants = Vec::with_capacity(memberships.len());
        for membership in &memberships {
            let financer = self.financer_repo.get_by_id(membership.financer_id).await?;
            grants.push(MembershipGrant::new(membership, financer.division_id));
        }

        let actor = Actor {
            user_id,
            global_roles: user.global_roles,
            memberships: grants,
        };

        Ok(AuthorizationContext::resolve(
            &actor,
            requested_financer,
            Utc::now(),
        ))
    }

    /// Whether `ctx` may manage `role`, optionally within a target tenant.
    /// Never fails: anything unresolvable is a denial.
    pub fn can_manage_role(
        &self,
        ctx: &AuthorizationContext,
        role: RoleName,
        scope: Option<&TenantScope>,
    ) -> bool {
        ctx.can_manage(role, scope)
    }

    pub fn roles_user_can_assign(&self, ctx: &AuthorizationContext) -> BTreeSet<RoleName> {
        ctx.assignable_roles()
    }

    /// Change the scalar role of an existing membership.
    ///
    /// The actor must be able to manage both the new role and the role the
    /// member currently holds in that financer.
    pub async fn assign_role(
        &self,
        ctx: &AuthorizationContext,
        user_id: Uuid,
        financer_id: Uuid,
        role: RoleName,
    ) -> HexekoResult<Membership> {
        let (scope, current) = self.load_membership(user_id, financer_id).await?;

        ensure_can_manage(ctx, role, Some(&scope))?;
        ensure_can_manage(ctx, current.role, Some(&scope))?;

        let updated = self
            .membership_repo
            .update(
                user_id,
                financer_id,
                UpdateMembership {
                    role: Some(role),
                    ..Default::default()
                },
            )
            .await?;

        info!(
            actor = %ctx.user_id,
            user = %user_id,
            financer = %financer_id,
            from = %current.role,
            to = %role,
            "Membership role changed"
        );
        Ok(updated)
    }

    /// Deactivate a membership. Memberships are never deleted.
    pub async fn deactivate_membership(
        &self,
        ctx: &AuthorizationContext,
        user_id: Uuid,
        financer_id: Uuid,
    ) -> HexekoResult<Membership> {
        let (scope, current) = self.load_membership(user_id, financer_id).await?;

        ensure_can_manage(ctx, current.role, Some(&scope))?;

        let updated = self
            .membership_repo
            .update(
                user_id,
                financer_id,
                UpdateMembership {
                    active: Some(false),
                    ..Default::default()
                },
            )
            .await?;

        info!(
            actor = %ctx.user_id,
            user = %user_id,
            financer = %financer_id,
            "Membership deactivated"
        );
        Ok(updated)
    }

    async fn load_membership(
        &self,
        user_id: Uuid,
        financer_id: Uuid,
    ) -> HexekoResult<(TenantScope, Membership)> {
        let financer = self.financer_repo.get_by_id(financer_id).await?;
        let membership = self
            .membership_repo
            .find(user_id, financer_id)
            .await?
            .ok_or_else(|| HexekoError::NotFound {
                entity: "membership".into(),
                id: format!("user={user_id},financer={financer_id}"),
            })?;

        Ok((TenantScope::from(&financer), membership))
    }
}
