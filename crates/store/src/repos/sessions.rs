//! Session repository: visit tracking and the question-quota ledger.

use crate::error::StoreResult;
use crate::models::SessionRow;
use async_trait::async_trait;
use doclink_core::{QuotaDenied, SessionId, UserId};

/// Outcome of a question admission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionAdmission {
    /// Admitted; carries the session's updated question count.
    Granted { question_count: u64 },
    /// The rolling-24h ceiling was hit. No counter was incremented.
    Denied(QuotaDenied),
}

impl QuestionAdmission {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted { .. })
    }
}

/// Repository for session operations.
#[async_trait]
pub trait SessionRepo: Send + Sync {
    /// Create the session row on first sight, or bump its visit count.
    async fn record_visit(&self, user_id: UserId, session_id: SessionId) -> StoreResult<()>;

    /// Check-and-increment the question counter as one atomic step.
    ///
    /// The rolling-24h ceiling comparison and the increment execute as a
    /// single conditional update inside one transaction holding the
    /// user's row lock — concurrent requests from the same user cannot
    /// interleave between check and write. A denial increments nothing.
    async fn admit_question(
        &self,
        user_id: UserId,
        session_id: SessionId,
    ) -> StoreResult<QuestionAdmission>;

    /// Sum of question counts over the user's sessions created in the
    /// trailing 24 hours.
    async fn rolling_question_count(&self, user_id: UserId) -> StoreResult<u64>;

    /// Get one session row.
    async fn get_session(
        &self,
        user_id: UserId,
        session_id: SessionId,
    ) -> StoreResult<Option<SessionRow>>;
}
