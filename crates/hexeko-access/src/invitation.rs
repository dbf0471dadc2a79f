//! Invited-user service: invitation creation, token lookup and the
//! pending → accepted / revoked / expired lifecycle.

use chrono::{DateTime, Duration, Utc};
use hexeko_core::error::{HexekoError, HexekoResult};
use hexeko_core::models::financer::TenantScope;
use hexeko_core::models::membership::{CreateMembership, UpdateMembership};
use hexeko_core::models::user::{
    CreateUser, InvitationMetadata, InvitationState, InvitationStatus, UpdateUser, User,
};
use hexeko_core::repository::{
    FinancerRepository, MembershipRepository, PaginatedResult, Pagination, UserRepository,
};
use hexeko_core::RoleName;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::cache::InvitationTokenCache;
use crate::config::InvitationConfig;
use crate::context::AuthorizationContext;
use crate::error::AccessError;
use crate::roles::ensure_can_manage;
use crate::token;

/// Who to invite, and where.
#[derive(Debug, Clone)]
pub struct InviteUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Financer the invitee will join.
    pub financer_id: Uuid,
    /// Falls back to [`InvitationConfig::default_locale`].
    pub locale: Option<String>,
    pub currency: Option<String>,
    pub timezone: Option<String>,
    /// Membership language.
    pub language: Option<String>,
    pub external_id: Option<String>,
    pub extra: serde_json::Value,
}

impl InviteUser {
    pub fn new(
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        financer_id: Uuid,
    ) -> Self {
        Self {
            email: email.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            financer_id,
            locale: None,
            currency: None,
            timezone: None,
            language: None,
            external_id: None,
            extra: serde_json::Value::Null,
        }
    }
}

/// Refuse anything but a pending invitation that has not lapsed at `now`.
fn ensure_acceptable(user: &User, now: DateTime<Utc>) -> Result<(), AccessError> {
    match user.invitation_state(now) {
        InvitationState::Pending => Ok(()),
        InvitationState::Expired => Err(AccessError::Expired),
        state => Err(AccessError::NotPending(state)),
    }
}

fn creation_failed(source: HexekoError) -> HexekoError {
    HexekoError::InvitedUserCreation {
        source: Box::new(source),
    }
}

/// Invited-user service.
pub struct InvitedUserService<U: UserRepository, M: MembershipRepository, F: FinancerRepository> {
    user_repo: U,
    membership_repo: M,
    financer_repo: F,
    cache: InvitationTokenCache,
    config: InvitationConfig,
}

impl<U, M, F> InvitedUserService<U, M, F>
where
    U: UserRepository,
    M: MembershipRepository,
    F: FinancerRepository,
{
    pub fn new(
        user_repo: U,
        membership_repo: M,
        financer_repo: F,
        config: InvitationConfig,
    ) -> Self {
        Self {
            user_repo,
            membership_repo,
            financer_repo,
            cache: InvitationTokenCache::new(&config),
            config,
        }
    }

    /// A fresh 32-byte random token, base64url-encoded.
    pub fn generate_token(&self) -> String {
        token::generate_invitation_token()
    }

    /// Invite a user to a financer with the role they should hold once
    /// onboarded.
    ///
    /// The acting user must be able to manage `intended_role` in the
    /// target financer; otherwise nothing is written and the error names
    /// the rejected role. The invitee starts disabled, with an inactive
    /// `beneficiary` membership that acceptance upgrades.
    pub async fn create_with_role(
        &self,
        ctx: &AuthorizationContext,
        data: InviteUser,
        intended_role: RoleName,
    ) -> HexekoResult<User> {
        let financer = self.financer_repo.get_by_id(data.financer_id).await?;
        ensure_can_manage(ctx, intended_role, Some(&TenantScope::from(&financer)))?;

        let user = self
            .insert_invitee(data, Some(intended_role), Some(ctx.user_id))
            .await?;

        info!(
            user = %user.id,
            inviter = %ctx.user_id,
            financer = %financer.id,
            role = %intended_role,
            "Invitation created"
        );
        Ok(user)
    }

    /// Create a pending invitee without any role authorization check.
    ///
    /// Every persistence failure, including unique-constraint violations
    /// on email or token, comes back as
    /// [`HexekoError::InvitedUserCreation`].
    pub async fn create(&self, data: InviteUser) -> HexekoResult<User> {
        self.financer_repo
            .get_by_id(data.financer_id)
            .await
            .map_err(creation_failed)?;

        let user = self.insert_invitee(data, None, None).await?;
        info!(user = %user.id, "Invitation created");
        Ok(user)
    }

    async fn insert_invitee(
        &self,
        data: InviteUser,
        intended_role: Option<RoleName>,
        inviter: Option<Uuid>,
    ) -> HexekoResult<User> {
        let now = Utc::now();
        let financer_id = data.financer_id;
        let language = data.language.clone();
        let attempts = self.config.token_retry_attempts.max(1);

        let mut attempt = 1;
        let user = loop {
            let input = self.invitee_record(&data, intended_role, inviter, now);
            match self.user_repo.create(input).await {
                Ok(user) => break user,
                Err(e) if e.is_conflict_on("invitation_token") && attempt < attempts => {
                    warn!(attempt, "Invitation token collision, regenerating");
                    attempt += 1;
                }
                Err(e) => return Err(creation_failed(e)),
            }
        };

        let membership = CreateMembership {
            user_id: user.id,
            financer_id,
            role: RoleName::Beneficiary,
            active: false,
            valid_from: None,
            valid_to: None,
            language,
            attributes: None,
        };

        if let Err(e) = self.membership_repo.attach(membership).await {
            // Roll back so the email stays available for a retry.
            if let Err(cleanup) = self.user_repo.delete(user.id).await {
                error!(
                    user = %user.id,
                    error = %cleanup,
                    "Failed to remove half-created invitee"
                );
            }
            return Err(creation_failed(e));
        }

        Ok(user)
    }

    fn invitee_record(
        &self,
        data: &InviteUser,
        intended_role: Option<RoleName>,
        inviter: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> CreateUser {
        CreateUser {
            email: data.email.clone(),
            first_name: data.first_name.clone(),
            last_name: data.last_name.clone(),
            enabled: false,
            cognito_id: None,
            locale: data
                .locale
                .clone()
                .unwrap_or_else(|| self.config.default_locale.clone()),
            currency: data
                .currency
                .clone()
                .unwrap_or_else(|| self.config.default_currency.clone()),
            timezone: data
                .timezone
                .clone()
                .unwrap_or_else(|| self.config.default_timezone.clone()),
            global_roles: Vec::new(),
            invitation_status: Some(InvitationStatus::Pending),
            invitation_token: Some(self.generate_token()),
            invited_at: Some(now),
            invitation_expires_at: Some(
                now + Duration::days(i64::from(self.config.expiry_days)),
            ),
            invited_by: inviter,
            invitation_metadata: InvitationMetadata {
                intended_role,
                financer_id: Some(data.financer_id),
                external_id: data.external_id.clone(),
                extra: data.extra.clone(),
            },
        }
    }

    /// Pending invitation whose expiry is strictly in the past.
    pub fn is_expired(&self, user: &User) -> bool {
        user.is_invitation_expired_at(Utc::now())
    }

    pub async fn find_by_token(&self, token: &str) -> HexekoResult<Option<User>> {
        self.user_repo.find_by_invitation_token(token).await
    }

    /// [`find_by_token`](Self::find_by_token) behind the token cache.
    ///
    /// Misses are not cached.
    pub async fn find_by_token_cached(&self, token: &str) -> HexekoResult<Option<User>> {
        if let Some(user) = self.cache.get(token).await {
            debug!("Invitation token cache hit");
            return Ok(Some(user));
        }

        let user = self.find_by_token(token).await?;
        if let Some(ref user) = user {
            self.cache.insert(token, user.clone()).await;
        }
        Ok(user)
    }

    pub async fn invalidate_cache(&self, token: &str) {
        self.cache.invalidate(token).await;
    }

    /// Redeem a pending, unexpired invitation.
    ///
    /// Enables the user, links the identity-provider subject, and activates
    /// the membership with the intended role. The user row is claimed first
    /// under a pending guard, so a concurrent acceptance of the same token
    /// fails instead of applying twice.
    pub async fn accept_invitation(&self, token: &str, cognito_id: &str) -> HexekoResult<User> {
        let now = Utc::now();
        let user = self
            .find_by_token(token)
            .await?
            .ok_or(AccessError::UnknownToken)?;
        ensure_acceptable(&user, now)?;

        let Some(accepted) = self
            .user_repo
            .accept_pending_invitation(user.id, cognito_id, now)
            .await?
        else {
            // Someone else changed the row since it was read.
            let current = self.user_repo.get_by_id(user.id).await?;
            ensure_acceptable(&current, now)?;
            return Err(AccessError::NotPending(current.invitation_state(now)).into());
        };

        let metadata = &accepted.invitation_metadata;
        if let Some(financer_id) = metadata.financer_id {
            let activation = UpdateMembership {
                role: Some(metadata.intended_role.unwrap_or(RoleName::Beneficiary)),
                active: Some(true),
                ..Default::default()
            };
            if let Err(e) = self
                .membership_repo
                .update(accepted.id, financer_id, activation)
                .await
            {
                self.reopen_invitation(accepted.id).await;
                self.invalidate_cache(token).await;
                return Err(e);
            }
        }
        self.invalidate_cache(token).await;

        info!(user = %accepted.id, "Invitation accepted");
        Ok(accepted)
    }

    /// Put a claimed invitation back to pending after a failed acceptance.
    async fn reopen_invitation(&self, user_id: Uuid) {
        let reopen = UpdateUser {
            enabled: Some(false),
            cognito_id: Some(None),
            invitation_status: Some(InvitationStatus::Pending),
            invitation_accepted_at: Some(None),
            ..Default::default()
        };
        if let Err(e) = self.user_repo.update(user_id, reopen).await {
            error!(user = %user_id, error = %e, "Failed to reopen invitation");
        }
    }

    /// Revoke a pending invitation.
    ///
    /// The actor must be able to manage the intended role in the financer
    /// the invitation targets.
    pub async fn revoke_invitation(
        &self,
        ctx: &AuthorizationContext,
        user_id: Uuid,
    ) -> HexekoResult<User> {
        let user = self.user_repo.get_by_id(user_id).await?;

        match user.invitation_status {
            None => return Err(AccessError::NotInvited(user_id).into()),
            Some(InvitationStatus::Pending) => {}
            Some(_) => {
                let state = user.invitation_state(Utc::now());
                return Err(AccessError::NotPending(state).into());
            }
        }

        let financer_id = user
            .invitation_metadata
            .financer_id
            .ok_or(AccessError::MissingFinancer)?;
        let financer = self.financer_repo.get_by_id(financer_id).await?;
        let role = user
            .invitation_metadata
            .intended_role
            .unwrap_or(RoleName::Beneficiary);
        ensure_can_manage(ctx, role, Some(&TenantScope::from(&financer)))?;

        let revoked = self
            .user_repo
            .update(
                user_id,
                UpdateUser {
                    invitation_status: Some(InvitationStatus::Revoked),
                    ..Default::default()
                },
            )
            .await?;
        if let Some(token) = &user.invitation_token {
            self.invalidate_cache(token).await;
        }

        info!(user = %user_id, actor = %ctx.user_id, "Invitation revoked");
        Ok(revoked)
    }

    /// Persist `expired` on every pending invitation already past its
    /// expiry. Returns how many rows changed.
    pub async fn expire_stale_invitations(&self) -> HexekoResult<u64> {
        let expired = self.user_repo.mark_expired(Utc::now()).await?;
        if expired > 0 {
            self.cache.invalidate_all();
            info!(count = expired, "Stale invitations expired");
        }
        Ok(expired)
    }

    /// Invitations stored as pending, oldest first. Time-lapsed rows that
    /// the expiry job has not reached yet are included.
    pub async fn list_pending(
        &self,
        pagination: Pagination,
    ) -> HexekoResult<PaginatedResult<User>> {
        self.user_repo
            .list_by_invitation_status(InvitationStatus::Pending, pagination)
            .await
    }
}
