//! Hexeko Access — role hierarchy authorization, invitation lifecycle
//! and invitation metrics.

pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod invitation;
pub mod metrics;
pub mod roles;
pub mod token;

pub use cache::InvitationTokenCache;
pub use config::InvitationConfig;
pub use context::{Actor, AuthorizationContext, AuthorizationMode, MembershipGrant};
pub use error::AccessError;
pub use invitation::{InviteUser, InvitedUserService};
pub use metrics::{InvitationMetrics, InvitationMetricsService, InvitationSummary};
pub use roles::RoleManagementService;
