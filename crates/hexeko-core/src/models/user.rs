//! User domain model.
//!
//! One record covers both onboarded users and pending invitees. Invitation
//! state lives on the user itself: `invitation_status` plus the token,
//! timestamps and the intended role stored in `invitation_metadata`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::role::RoleName;

/// Stored invitation status.
///
/// `Expired` is only stored by the batch expiry job; a `Pending` row past
/// its `invitation_expires_at` is already treated as expired on read.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Expired,
    Revoked,
}

impl InvitationStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
            InvitationStatus::Expired => "expired",
            InvitationStatus::Revoked => "revoked",
        }
    }
}

impl fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvitationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(InvitationStatus::Pending),
            "accepted" => Ok(InvitationStatus::Accepted),
            "expired" => Ok(InvitationStatus::Expired),
            "revoked" => Ok(InvitationStatus::Revoked),
            other => Err(format!("unknown invitation status: {other}")),
        }
    }
}

/// Invitation state as observed at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvitationState {
    /// Never invited (created directly).
    NotInvited,
    Pending,
    Expired,
    Accepted,
    Revoked,
}

/// Structured bag attached to an invitation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct InvitationMetadata {
    /// Role the inviter intends the user to hold once onboarded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intended_role: Option<RoleName>,
    /// Financer the invitation originates from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub financer_id: Option<Uuid>,
    /// Identifier in an external system (HR import, SIRH...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    /// Anything else the caller wants to keep with the invitation.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub extra: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub enabled: bool,
    /// Identity-provider subject, set once the invitee signs up.
    pub cognito_id: Option<String>,
    pub locale: String,
    pub currency: String,
    pub timezone: String,
    /// Tenant-less roles (platform staff).
    pub global_roles: Vec<RoleName>,
    pub invitation_status: Option<InvitationStatus>,
    pub invitation_token: Option<String>,
    pub invited_at: Option<DateTime<Utc>>,
    pub invitation_expires_at: Option<DateTime<Utc>>,
    pub invitation_accepted_at: Option<DateTime<Utc>>,
    pub invited_by: Option<Uuid>,
    pub invitation_metadata: InvitationMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// A pending invitation whose expiry lies strictly before `now`.
    ///
    /// Invitations without an expiry never expire.
    pub fn is_invitation_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.invitation_status == Some(InvitationStatus::Pending)
            && self.invitation_expires_at.is_some_and(|at| at < now)
    }

    pub fn invitation_state(&self, now: DateTime<Utc>) -> InvitationState {
        match self.invitation_status {
            None => InvitationState::NotInvited,
            Some(InvitationStatus::Pending) if self.is_invitation_expired_at(now) => {
                InvitationState::Expired
            }
            Some(InvitationStatus::Pending) => InvitationState::Pending,
            Some(InvitationStatus::Expired) => InvitationState::Expired,
            Some(InvitationStatus::Accepted) => InvitationState::Accepted,
            Some(InvitationStatus::Revoked) => InvitationState::Revoked,
        }
    }
}

/// Fields required to create a user record.
///
/// Invitation fields are optional so the same input serves directly
/// onboarded users and invitees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub enabled: bool,
    pub cognito_id: Option<String>,
    pub locale: String,
    pub currency: String,
    pub timezone: String,
    pub global_roles: Vec<RoleName>,
    pub invitation_status: Option<InvitationStatus>,
    pub invitation_token: Option<String>,
    pub invited_at: Option<DateTime<Utc>>,
    pub invitation_expires_at: Option<DateTime<Utc>>,
    pub invited_by: Option<Uuid>,
    pub invitation_metadata: InvitationMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateUser {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub enabled: Option<bool>,
    /// `Some(Some(v))` = set, `Some(None)` = clear, `None` = no change.
    pub cognito_id: Option<Option<String>>,
    pub global_roles: Option<Vec<RoleName>>,
    pub invitation_status: Option<InvitationStatus>,
    /// Same convention as `cognito_id`.
    pub invitation_accepted_at: Option<Option<DateTime<Utc>>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn invitee(status: Option<InvitationStatus>, expires_at: Option<DateTime<Utc>>) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "invitee@example.com".into(),
            first_name: "Ines".into(),
            last_name: "Vitee".into(),
            enabled: false,
            cognito_id: None,
            locale: "fr-FR".into(),
            currency: "EUR".into(),
            timezone: "Europe/Paris".into(),
            global_roles: Vec::new(),
            invitation_status: status,
            invitation_token: Some("token".into()),
            invited_at: Some(now),
            invitation_expires_at: expires_at,
            invitation_accepted_at: None,
            invited_by: None,
            invitation_metadata: InvitationMetadata::default(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn expiry_boundary() {
        let now = Utc::now();
        let pending = Some(InvitationStatus::Pending);

        let past = invitee(pending, Some(now - Duration::seconds(1)));
        let future = invitee(pending, Some(now + Duration::seconds(1)));
        let never = invitee(pending, None);
        let exact = invitee(pending, Some(now));

        assert!(past.is_invitation_expired_at(now));
        assert!(!future.is_invitation_expired_at(now));
        assert!(!never.is_invitation_expired_at(now));
        assert!(!exact.is_invitation_expired_at(now), "expiry is strict");
    }

    #[test]
    fn only_pending_rows_expire() {
        let now = Utc::now();
        let past = Some(now - Duration::days(1));
        for status in [InvitationStatus::Accepted, InvitationStatus::Revoked] {
            assert!(!invitee(Some(status), past).is_invitation_expired_at(now));
        }
    }

    #[test]
    fn derived_state() {
        let now = Utc::now();
        let past = Some(now - Duration::days(1));
        let future = Some(now + Duration::days(1));

        assert_eq!(invitee(None, None).invitation_state(now), InvitationState::NotInvited);
        assert_eq!(
            invitee(Some(InvitationStatus::Pending), future).invitation_state(now),
            InvitationState::Pending
        );
        assert_eq!(
            invitee(Some(InvitationStatus::Pending), past).invitation_state(now),
            InvitationState::Expired
        );
        assert_eq!(
            invitee(Some(InvitationStatus::Expired), future).invitation_state(now),
            InvitationState::Expired
        );
        assert_eq!(
            invitee(Some(InvitationStatus::Revoked), future).invitation_state(now),
            InvitationState::Revoked
        );
    }

    #[test]
    fn metadata_serializes_intended_role() {
        let metadata = InvitationMetadata {
            intended_role: Some(RoleName::FinancerAdmin),
            ..Default::default()
        };
        let value = serde_json::to_value(&metadata).unwrap();
        assert_eq!(value, serde_json::json!({ "intended_role": "financer_admin" }));
    }

    #[test]
    fn status_parse_rejects_unknown() {
        assert_eq!("revoked".parse(), Ok(InvitationStatus::Revoked));
        assert!("cancelled".parse::<InvitationStatus>().is_err());
    }
}
