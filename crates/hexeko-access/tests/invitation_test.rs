//! Integration tests for the invited-user service.

mod common;

use chrono::{Duration, Utc};
use common::World;
use hexeko_access::{InvitationConfig, InviteUser};
use hexeko_core::models::user::{InvitationState, InvitationStatus};
use hexeko_core::repository::{MembershipRepository, Pagination, UserRepository};
use hexeko_core::{HexekoError, RoleName};
use uuid::Uuid;

fn invite(email: &str, financer_id: Uuid) -> InviteUser {
    InviteUser::new(email, "Ines", "Vitee", financer_id)
}

/// Move an invitation's expiry into the past.
async fn lapse(world: &World, user_id: Uuid) {
    world
        .db
        .query("UPDATE type::record('user', $id) SET invitation_expires_at = time::now() - 1d")
        .bind(("id", user_id.to_string()))
        .await
        .unwrap()
        .check()
        .unwrap();
}

#[tokio::test]
async fn division_admin_invites_financer_admin() {
    let world = World::new().await;
    let inviter = world
        .member("da@example.com", &world.acme, RoleName::DivisionAdmin)
        .await;
    let ctx = world.context(&inviter, None).await;
    let service = world.invitations(InvitationConfig::default());

    // Globex sits in the same division as Acme.
    let user = service
        .create_with_role(
            &ctx,
            invite("new@example.com", world.globex.id),
            RoleName::FinancerAdmin,
        )
        .await
        .unwrap();

    assert_eq!(user.invitation_status, Some(InvitationStatus::Pending));
    assert!(!user.enabled);
    assert_eq!(user.cognito_id, None);
    assert_eq!(user.invited_by, Some(inviter.id));
    assert_eq!(user.locale, "fr-FR");
    assert_eq!(user.currency, "EUR");
    assert_eq!(user.timezone, "Europe/Paris");
    assert_eq!(
        user.invitation_metadata.intended_role,
        Some(RoleName::FinancerAdmin)
    );
    assert_eq!(user.invitation_metadata.financer_id, Some(world.globex.id));

    let token = user.invitation_token.clone().expect("token is set");
    assert_eq!(token.len(), 43);

    let invited_at = user.invited_at.unwrap();
    let expires_at = user.invitation_expires_at.unwrap();
    assert_eq!(expires_at - invited_at, Duration::days(7));

    let membership = world
        .memberships()
        .find(user.id, world.globex.id)
        .await
        .unwrap()
        .expect("membership attached");
    assert_eq!(membership.role, RoleName::Beneficiary);
    assert!(!membership.active);
}

#[tokio::test]
async fn division_admin_cannot_invite_division_super_admin() {
    let world = World::new().await;
    let inviter = world
        .member("da@example.com", &world.acme, RoleName::DivisionAdmin)
        .await;
    let ctx = world.context(&inviter, None).await;
    let service = world.invitations(InvitationConfig::default());
    let before = world.user_count().await;

    let err = service
        .create_with_role(
            &ctx,
            invite("boss@example.com", world.acme.id),
            RoleName::DivisionSuperAdmin,
        )
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Not authorized to assign role: division_super_admin");
    assert_eq!(err.status_code(), 422);
    assert_eq!(world.user_count().await, before);
    assert!(
        world
            .users()
            .get_by_email("boss@example.com")
            .await
            .is_err()
    );
}

#[tokio::test]
async fn invitation_outside_accessible_division_is_denied() {
    let world = World::new().await;
    let inviter = world
        .member("da@example.com", &world.acme, RoleName::DivisionAdmin)
        .await;
    let ctx = world.context(&inviter, None).await;
    let service = world.invitations(InvitationConfig::default());

    // Initech belongs to another division.
    let result = service
        .create_with_role(
            &ctx,
            invite("far@example.com", world.initech.id),
            RoleName::Beneficiary,
        )
        .await;

    assert!(matches!(
        result,
        Err(HexekoError::UnauthorizedRoleAssignment { ref role }) if role == "beneficiary"
    ));
}

#[tokio::test]
async fn beneficiary_membership_elsewhere_grants_no_division_reach() {
    let world = World::new().await;
    let inviter = world
        .member("da@example.com", &world.acme, RoleName::DivisionAdmin)
        .await;
    world
        .attach(&inviter, &world.initech, RoleName::Beneficiary, true)
        .await;
    let ctx = world.context(&inviter, Some(&world.acme)).await;
    let service = world.invitations(InvitationConfig::default());
    let before = world.user_count().await;

    assert_eq!(ctx.effective_role, Some(RoleName::DivisionAdmin));
    assert!(!ctx.accessible_financer_ids.contains(&world.initech.id));
    assert_eq!(ctx.accessible_division_ids.len(), 1);

    let result = service
        .create_with_role(
            &ctx,
            invite("reach@example.com", world.initech.id),
            RoleName::FinancerSuperAdmin,
        )
        .await;

    assert!(matches!(
        result,
        Err(HexekoError::UnauthorizedRoleAssignment { ref role }) if role == "financer_super_admin"
    ));
    assert_eq!(world.user_count().await, before);
}

#[tokio::test]
async fn explicit_profile_settings_override_defaults() {
    let world = World::new().await;
    let service = world.invitations(InvitationConfig::default());

    let mut data = invite("uk@example.com", world.acme.id);
    data.locale = Some("en-GB".into());
    data.currency = Some("GBP".into());
    data.timezone = Some("Europe/London".into());
    data.external_id = Some("HR-42".into());

    let user = service.create(data).await.unwrap();

    assert_eq!(user.locale, "en-GB");
    assert_eq!(user.currency, "GBP");
    assert_eq!(user.timezone, "Europe/London");
    assert_eq!(user.invitation_metadata.external_id.as_deref(), Some("HR-42"));
    assert_eq!(user.invitation_metadata.intended_role, None);
    assert_eq!(user.invited_by, None);
}

#[tokio::test]
async fn duplicate_email_is_wrapped() {
    let world = World::new().await;
    let service = world.invitations(InvitationConfig::default());

    service
        .create(invite("twice@example.com", world.acme.id))
        .await
        .unwrap();
    let err = service
        .create(invite("twice@example.com", world.globex.id))
        .await
        .unwrap_err();

    match err {
        HexekoError::InvitedUserCreation { source } => {
            assert!(source.is_conflict_on("email"), "got {source:?}");
        }
        other => panic!("expected InvitedUserCreation, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_financer_is_wrapped_by_create() {
    let world = World::new().await;
    let service = world.invitations(InvitationConfig::default());

    let result = service.create(invite("lost@example.com", Uuid::new_v4())).await;

    assert!(matches!(result, Err(HexekoError::InvitedUserCreation { .. })));
}

#[tokio::test]
async fn concurrent_invitations_get_distinct_tokens() {
    let world = World::new().await;
    let inviter = world.user("god@example.com", vec![RoleName::God]).await;
    let ctx = world.context(&inviter, None).await;
    let service = world.invitations(InvitationConfig::default());

    let role = RoleName::Beneficiary;
    let (first, second) = tokio::join!(
        service.create_with_role(&ctx, invite("one@example.com", world.acme.id), role),
        service.create_with_role(&ctx, invite("two@example.com", world.acme.id), role),
    );

    let first = first.unwrap();
    let second = second.unwrap();
    assert_ne!(first.invitation_token, second.invitation_token);
}

#[tokio::test]
async fn is_expired_follows_expiry() {
    let world = World::new().await;
    let service = world.invitations(InvitationConfig::default());

    let user = service
        .create(invite("clock@example.com", world.acme.id))
        .await
        .unwrap();
    assert!(!service.is_expired(&user));

    let mut lapsed = user.clone();
    lapsed.invitation_expires_at = Some(Utc::now() - Duration::seconds(1));
    assert!(service.is_expired(&lapsed));

    let mut open_ended = user;
    open_ended.invitation_expires_at = None;
    assert!(!service.is_expired(&open_ended));
}

#[tokio::test]
async fn cached_lookup_matches_direct_lookup() {
    let world = World::new().await;
    let service = world.invitations(InvitationConfig::default());
    let user = service
        .create(invite("cache@example.com", world.acme.id))
        .await
        .unwrap();
    let token = user.invitation_token.unwrap();

    let direct = service.find_by_token(&token).await.unwrap();
    let miss = service.find_by_token_cached(&token).await.unwrap();
    let hit = service.find_by_token_cached(&token).await.unwrap();
    assert_eq!(miss, direct);
    assert_eq!(hit, direct);

    let unknown = service.find_by_token_cached("does-not-exist").await.unwrap();
    assert_eq!(unknown, service.find_by_token("does-not-exist").await.unwrap());
    assert_eq!(unknown, None);
}

#[tokio::test]
async fn disabled_cache_is_transparent() {
    let world = World::new().await;
    let service = world.invitations(InvitationConfig {
        token_cache_ttl_secs: 0,
        ..Default::default()
    });
    let user = service
        .create(invite("nocache@example.com", world.acme.id))
        .await
        .unwrap();
    let token = user.invitation_token.unwrap();

    assert_eq!(
        service.find_by_token_cached(&token).await.unwrap(),
        service.find_by_token(&token).await.unwrap()
    );
}

#[tokio::test]
async fn accepting_activates_user_and_membership() {
    let world = World::new().await;
    let inviter = world
        .member("fsa@example.com", &world.acme, RoleName::FinancerSuperAdmin)
        .await;
    let ctx = world.context(&inviter, None).await;
    let service = world.invitations(InvitationConfig::default());

    let invited = service
        .create_with_role(
            &ctx,
            invite("joiner@example.com", world.acme.id),
            RoleName::FinancerAdmin,
        )
        .await
        .unwrap();
    let token = invited.invitation_token.clone().unwrap();

    // Warm the cache so acceptance has something to invalidate.
    service.find_by_token_cached(&token).await.unwrap();

    let accepted = service
        .accept_invitation(&token, "cognito-joiner")
        .await
        .unwrap();

    assert!(accepted.enabled);
    assert_eq!(accepted.cognito_id.as_deref(), Some("cognito-joiner"));
    assert_eq!(accepted.invitation_status, Some(InvitationStatus::Accepted));
    assert!(accepted.invitation_accepted_at.is_some());

    let cached = service.find_by_token_cached(&token).await.unwrap().unwrap();
    assert_eq!(cached.invitation_status, Some(InvitationStatus::Accepted));

    let membership = world
        .memberships()
        .find(accepted.id, world.acme.id)
        .await
        .unwrap()
        .unwrap();
    assert!(membership.active);
    assert_eq!(membership.role, RoleName::FinancerAdmin);

    // The new member now acts with the intended role.
    let joiner_ctx = world.context(&accepted, None).await;
    assert_eq!(joiner_ctx.effective_role, Some(RoleName::FinancerAdmin));

    let again = service.accept_invitation(&token, "cognito-joiner").await;
    assert!(matches!(again, Err(HexekoError::InvitationUnavailable { .. })));
}

#[tokio::test]
async fn concurrent_acceptances_apply_once() {
    let world = World::new().await;
    let service = world.invitations(InvitationConfig::default());
    let invited = service
        .create(invite("race@example.com", world.acme.id))
        .await
        .unwrap();
    let token = invited.invitation_token.clone().unwrap();

    let (first, second) = tokio::join!(
        service.accept_invitation(&token, "cognito-first"),
        service.accept_invitation(&token, "cognito-second"),
    );

    let winners: Vec<_> = [&first, &second]
        .into_iter()
        .filter_map(|result| result.as_ref().ok())
        .collect();
    assert_eq!(winners.len(), 1, "got {first:?} and {second:?}");

    let stored = world.users().get_by_id(invited.id).await.unwrap();
    assert_eq!(stored.cognito_id, winners[0].cognito_id);
    assert_eq!(stored.invitation_status, Some(InvitationStatus::Accepted));
}

#[tokio::test]
async fn lapsed_invitation_cannot_be_accepted() {
    let world = World::new().await;
    let service = world.invitations(InvitationConfig::default());
    let user = service
        .create(invite("late@example.com", world.acme.id))
        .await
        .unwrap();
    lapse(&world, user.id).await;

    let result = service
        .accept_invitation(user.invitation_token.as_deref().unwrap(), "cognito-late")
        .await;

    let err = result.unwrap_err();
    assert_eq!(err.status_code(), 410);
    assert!(err.to_string().contains("expired"), "got {err}");
}

#[tokio::test]
async fn unknown_token_cannot_be_accepted() {
    let world = World::new().await;
    let service = world.invitations(InvitationConfig::default());

    let result = service.accept_invitation("nope", "cognito").await;

    assert!(matches!(result, Err(HexekoError::NotFound { .. })));
}

#[tokio::test]
async fn revocation_requires_authority_over_intended_role() {
    let world = World::new().await;
    let inviter = world
        .member("fsa@example.com", &world.acme, RoleName::FinancerSuperAdmin)
        .await;
    let peer = world
        .member("fa@example.com", &world.acme, RoleName::FinancerAdmin)
        .await;
    let service = world.invitations(InvitationConfig::default());

    let inviter_ctx = world.context(&inviter, None).await;
    let invited = service
        .create_with_role(
            &inviter_ctx,
            invite("maybe@example.com", world.acme.id),
            RoleName::FinancerAdmin,
        )
        .await
        .unwrap();

    let peer_ctx = world.context(&peer, None).await;
    let denied = service.revoke_invitation(&peer_ctx, invited.id).await;
    assert!(matches!(
        denied,
        Err(HexekoError::UnauthorizedRoleAssignment { .. })
    ));

    let revoked = service
        .revoke_invitation(&inviter_ctx, invited.id)
        .await
        .unwrap();
    assert_eq!(revoked.invitation_status, Some(InvitationStatus::Revoked));
    assert_eq!(
        revoked.invitation_state(Utc::now()),
        InvitationState::Revoked
    );

    let token = invited.invitation_token.unwrap();
    let result = service.accept_invitation(&token, "cognito-maybe").await;
    assert!(matches!(result, Err(HexekoError::InvitationUnavailable { .. })));
}

#[tokio::test]
async fn direct_users_cannot_be_revoked() {
    let world = World::new().await;
    let admin = world.user("god@example.com", vec![RoleName::God]).await;
    let ctx = world.context(&admin, None).await;
    let service = world.invitations(InvitationConfig::default());

    let result = service.revoke_invitation(&ctx, admin.id).await;

    assert!(matches!(result, Err(HexekoError::InvitationUnavailable { .. })));
}

#[tokio::test]
async fn list_pending_includes_lapsed_rows() {
    let world = World::new().await;
    let service = world.invitations(InvitationConfig::default());

    let fresh = service
        .create(invite("fresh@example.com", world.acme.id))
        .await
        .unwrap();
    let stale = service
        .create(invite("stale@example.com", world.acme.id))
        .await
        .unwrap();
    lapse(&world, stale.id).await;

    let page = service.list_pending(Pagination::default()).await.unwrap();
    let ids: Vec<_> = page.items.iter().map(|u| u.id).collect();

    assert_eq!(page.total, 2);
    assert!(ids.contains(&fresh.id));
    assert!(ids.contains(&stale.id));
}

#[tokio::test]
async fn expiring_stale_invitations_keeps_metrics_stable() {
    let world = World::new().await;
    let service = world.invitations(InvitationConfig::default());
    let metrics = world.metrics();

    service
        .create(invite("fresh@example.com", world.acme.id))
        .await
        .unwrap();
    let stale = service
        .create(invite("stale@example.com", world.acme.id))
        .await
        .unwrap();
    lapse(&world, stale.id).await;

    let before = metrics.all_metrics().await.unwrap();
    assert_eq!(service.expire_stale_invitations().await.unwrap(), 1);
    let after = metrics.all_metrics().await.unwrap();

    assert_eq!(before, after);
    assert_eq!(after.pending, 1);
    assert_eq!(after.expired, 1);

    let stored = world.users().get_by_id(stale.id).await.unwrap();
    assert_eq!(stored.invitation_status, Some(InvitationStatus::Expired));
    let pending = service.list_pending(Pagination::default()).await.unwrap();
    assert_eq!(pending.total, 1);
}
