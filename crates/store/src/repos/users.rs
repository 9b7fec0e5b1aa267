//! User repository.

use crate::error::StoreResult;
use crate::models::{DomainRow, FileRow, UserRow};
use async_trait::async_trait;
use doclink_core::{Tier, UserId};

/// Profile fields arriving from the authentication layer.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub user_id: UserId,
    pub user_name: String,
    pub user_surname: Option<String>,
    pub user_email: String,
    pub picture_url: Option<String>,
}

/// One domain with its files, as presented in the account overview.
#[derive(Debug, Clone)]
pub struct DomainOverview {
    pub domain: DomainRow,
    pub files: Vec<FileRow>,
}

/// Account overview: profile, domains with files, and the rolling
/// question count used for quota display.
#[derive(Debug, Clone)]
pub struct UserOverview {
    pub user: UserRow,
    pub domains: Vec<DomainOverview>,
    pub rolling_question_count: u64,
}

/// Repository for user operations.
#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Create the user on first authentication, or refresh profile
    /// fields on subsequent ones. Never changes the tier.
    async fn upsert_user(&self, profile: &UserProfile) -> StoreResult<UserRow>;

    /// Get a user by id.
    async fn get_user(&self, user_id: UserId) -> StoreResult<Option<UserRow>>;

    /// Change a user's subscription tier.
    async fn set_tier(&self, user_id: UserId, tier: Tier) -> StoreResult<()>;

    /// Assemble the account overview.
    async fn user_overview(&self, user_id: UserId) -> StoreResult<Option<UserOverview>>;
}
