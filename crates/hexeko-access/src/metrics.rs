//! Invitation metrics: read-only aggregation over invited users.
//!
//! Every invited user falls in exactly one bucket. A row stored as
//! `pending` whose expiry has passed is counted as expired, never as
//! pending, so `total` is always the sum of the four buckets.

use chrono::{DateTime, Duration, Utc};
use hexeko_core::error::HexekoResult;
use hexeko_core::models::user::{InvitationStatus, User};
use hexeko_core::repository::UserRepository;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InvitationMetrics {
    pub pending: u64,
    pub accepted: u64,
    pub expired: u64,
    pub revoked: u64,
    pub total: u64,
}

impl InvitationMetrics {
    pub fn new(pending: u64, accepted: u64, expired: u64, revoked: u64) -> Self {
        Self {
            pending,
            accepted,
            expired,
            revoked,
            total: pending + accepted + expired + revoked,
        }
    }

    /// Accepted share of all invitations, in percent with two decimals.
    /// `0.0` when there are no invitations.
    pub fn acceptance_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let rate = self.accepted as f64 / self.total as f64 * 100.0;
        (rate * 100.0).round() / 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvitationSummary {
    pub metrics: InvitationMetrics,
    pub acceptance_rate: f64,
    pub timestamp: DateTime<Utc>,
}

/// Invitation metrics service.
pub struct InvitationMetricsService<U: UserRepository> {
    user_repo: U,
}

impl<U: UserRepository> InvitationMetricsService<U> {
    pub fn new(user_repo: U) -> Self {
        Self { user_repo }
    }

    pub async fn pending_invitations_count(&self) -> HexekoResult<u64> {
        self.count(InvitationStatus::Pending, Utc::now()).await
    }

    pub async fn accepted_invitations_count(&self) -> HexekoResult<u64> {
        self.count(InvitationStatus::Accepted, Utc::now()).await
    }

    pub async fn expired_invitations_count(&self) -> HexekoResult<u64> {
        self.count(InvitationStatus::Expired, Utc::now()).await
    }

    pub async fn revoked_invitations_count(&self) -> HexekoResult<u64> {
        self.count(InvitationStatus::Revoked, Utc::now()).await
    }

    /// All four buckets, evaluated against the same instant.
    pub async fn all_metrics(&self) -> HexekoResult<InvitationMetrics> {
        self.metrics_at(Utc::now()).await
    }

    pub async fn invitation_count_by_inviter(&self, inviter_id: Uuid) -> HexekoResult<u64> {
        self.user_repo.count_invited_by(inviter_id).await
    }

    pub async fn acceptance_rate(&self) -> HexekoResult<f64> {
        Ok(self.all_metrics().await?.acceptance_rate())
    }

    /// Pending invitations expiring within the next `days` days, soonest
    /// first. Already-lapsed rows are excluded.
    pub async fn invitations_expiring_soon(&self, days: u32) -> HexekoResult<Vec<User>> {
        let now = Utc::now();
        self.user_repo
            .list_expiring_between(now, now + Duration::days(i64::from(days)))
            .await
    }

    pub async fn summary(&self) -> HexekoResult<InvitationSummary> {
        let timestamp = Utc::now();
        let metrics = self.metrics_at(timestamp).await?;

        Ok(InvitationSummary {
            metrics,
            acceptance_rate: metrics.acceptance_rate(),
            timestamp,
        })
    }

    async fn metrics_at(&self, now: DateTime<Utc>) -> HexekoResult<InvitationMetrics> {
        Ok(InvitationMetrics::new(
            self.count(InvitationStatus::Pending, now).await?,
            self.count(InvitationStatus::Accepted, now).await?,
            self.count(InvitationStatus::Expired, now).await?,
            self.count(InvitationStatus::Revoked, now).await?,
        ))
    }

    async fn count(&self, status: InvitationStatus, now: DateTime<Utc>) -> HexekoResult<u64> {
        self.user_repo.count_by_invitation_status(status, now).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn total_is_sum_of_buckets() {
        let metrics = InvitationMetrics::new(3, 5, 2, 1);
        assert_eq!(metrics.total, 11);
    }

    #[test]
    fn empty_dataset_rate_is_zero() {
        assert_eq!(InvitationMetrics::default().acceptance_rate(), 0.0);
    }

    #[rstest]
    #[case(InvitationMetrics::new(0, 1, 0, 0), 100.0)]
    #[case(InvitationMetrics::new(1, 1, 1, 1), 25.0)]
    #[case(InvitationMetrics::new(2, 1, 0, 0), 33.33)]
    #[case(InvitationMetrics::new(1, 2, 0, 0), 66.67)]
    #[case(InvitationMetrics::new(4, 0, 0, 0), 0.0)]
    fn acceptance_rate_is_rounded(#[case] metrics: InvitationMetrics, #[case] expected: f64) {
        assert_eq!(metrics.acceptance_rate(), expected);
    }
}
