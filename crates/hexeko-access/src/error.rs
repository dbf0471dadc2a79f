//! Invitation lifecycle error types.

use hexeko_core::HexekoError;
use hexeko_core::models::user::InvitationState;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("no invitation matches the given token")]
    UnknownToken,

    #[error("user {0} was never invited")]
    NotInvited(Uuid),

    #[error("invitation has expired")]
    Expired,

    #[error("invitation is no longer pending ({0:?})")]
    NotPending(InvitationState),

    #[error("invitation is not attached to a financer")]
    MissingFinancer,
}

impl From<AccessError> for HexekoError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::UnknownToken => HexekoError::NotFound {
                entity: "invitation".into(),
                id: "token".into(),
            },
            AccessError::NotInvited(_) | AccessError::Expired | AccessError::NotPending(_) => {
                HexekoError::InvitationUnavailable {
                    reason: err.to_string(),
                }
            }
            AccessError::MissingFinancer => HexekoError::Validation {
                message: err.to_string(),
            },
        }
    }
}
