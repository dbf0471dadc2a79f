//! Per-request authorization context.
//!
//! The context is resolved once from everything the acting user holds
//! (global roles plus financer memberships) and then passed explicitly to
//! every authorization decision. Nothing here reads ambient state.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use hexeko_core::models::financer::TenantScope;
use hexeko_core::models::membership::Membership;
use hexeko_core::{RoleName, RoleScope};
use uuid::Uuid;

/// One financer membership of the acting user, with the financer's
/// division already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct MembershipGrant {
    pub scope: TenantScope,
    pub role: RoleName,
    pub active: bool,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
}

impl MembershipGrant {
    pub fn new(membership: &Membership, division_id: Uuid) -> Self {
        Self {
            scope: TenantScope {
                financer_id: membership.financer_id,
                division_id,
            },
            role: membership.role,
            active: membership.active,
            valid_from: membership.valid_from,
            valid_to: membership.valid_to,
        }
    }

    pub fn grants_authority_at(&self, now: DateTime<Utc>) -> bool {
        self.active
            && self.valid_from.is_none_or(|from| from <= now)
            && self.valid_to.is_none_or(|to| now < to)
    }

    /// Division and financer roles administer the financer they are held in.
    fn administers_financer(&self) -> bool {
        matches!(self.role.scope(), RoleScope::Division | RoleScope::Financer)
    }

    /// Only division roles reach the rest of the financer's division.
    fn administers_division(&self) -> bool {
        matches!(self.role.scope(), RoleScope::Division)
    }
}

/// Everything an authenticated user holds, as loaded from storage.
#[derive(Debug, Clone, Default)]
pub struct Actor {
    pub user_id: Uuid,
    pub global_roles: Vec<RoleName>,
    pub memberships: Vec<MembershipGrant>,
}

/// How far the context reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationMode {
    /// Limited to the financers and divisions the user belongs to.
    SelfScope,
    /// Effective role is a platform role; tenant checks are bypassed.
    Elevated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizationContext {
    pub user_id: Uuid,
    pub mode: AuthorizationMode,
    /// Highest-ranked role among the global roles and the role held in
    /// `current_financer_id`. `None` when nothing grants authority.
    pub effective_role: Option<RoleName>,
    pub current_financer_id: Option<Uuid>,
    pub accessible_financer_ids: BTreeSet<Uuid>,
    pub accessible_division_ids: BTreeSet<Uuid>,
}

impl AuthorizationContext {
    /// Resolve the context of `actor` at `now`.
    ///
    /// Only memberships granting authority at `now` are considered. When no
    /// financer is requested and exactly one membership qualifies, that
    /// financer becomes the current one.
    ///
    /// A membership widens the accessible sets only as far as its role
    /// administers: beneficiary memberships add nothing, financer roles add
    /// their financer, division roles add their financer and division.
    pub fn resolve(actor: &Actor, requested_financer: Option<Uuid>, now: DateTime<Utc>) -> Self {
        let live: Vec<&MembershipGrant> = actor
            .memberships
            .iter()
            .filter(|grant| grant.grants_authority_at(now))
            .collect();

        let accessible_financer_ids: BTreeSet<Uuid> = live
            .iter()
            .filter(|grant| grant.administers_financer())
            .map(|grant| grant.scope.financer_id)
            .collect();
        let accessible_division_ids: BTreeSet<Uuid> = live
            .iter()
            .filter(|grant| grant.administers_division())
            .map(|grant| grant.scope.division_id)
            .collect();

        let current_financer_id = requested_financer.or_else(|| match live.as_slice() {
            [only] => Some(only.scope.financer_id),
            _ => None,
        });

        let tenant_role = current_financer_id.and_then(|financer_id| {
            live.iter()
                .find(|grant| grant.scope.financer_id == financer_id)
                .map(|grant| grant.role)
        });

        let effective_role =
            RoleName::highest(actor.global_roles.iter().copied().chain(tenant_role));

        let mode = match effective_role {
            Some(role) if role.is_global() => AuthorizationMode::Elevated,
            _ => AuthorizationMode::SelfScope,
        };

        Self {
            user_id: actor.user_id,
            mode,
            effective_role,
            current_financer_id,
            accessible_financer_ids,
            accessible_division_ids,
        }
    }

    /// Whether the effective role may manage `target` in `scope`.
    ///
    /// The effective role must rank strictly above `target`. Division-scoped
    /// roles additionally need the target division among their accessible
    /// divisions, financer-scoped roles the target financer among their
    /// accessible financers. Without a scope only the rank rule applies.
    pub fn can_manage(&self, target: RoleName, scope: Option<&TenantScope>) -> bool {
        let Some(acting) = self.effective_role else {
            return false;
        };
        if !target.is_strictly_below(acting) {
            return false;
        }

        match (acting.scope(), scope) {
            (RoleScope::Global, _) | (_, None) => true,
            (RoleScope::Division, Some(scope)) => {
                self.accessible_division_ids.contains(&scope.division_id)
            }
            (RoleScope::Financer, Some(scope)) => {
                self.accessible_financer_ids.contains(&scope.financer_id)
            }
            (RoleScope::Member, Some(_)) => false,
        }
    }

    /// Every role strictly below the effective role.
    pub fn assignable_roles(&self) -> BTreeSet<RoleName> {
        self.effective_role
            .map(|role| role.roles_below().collect())
            .unwrap_or_default()
    }
}
