//! Per-user conversation state
//!
//! Remembers which step of a multi-step flow each user is in. Lives in process memory only and is
//! lost on restart.
use crate::database::types::UserId;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// What the conversation with a user is currently waiting for.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Stage {
    #[default]
    Idle,
    /// The next text message is a search query.
    AwaitingSearchText,
    /// A menu of library books was offered; waiting for the user to pick one.
    AwaitingRatingTarget,
    /// A book was picked; waiting for a rating between 1 and 10.
    AwaitingRatingValue { book_id: String },
}

/// Pending work that moves a user out of [`Stage::Idle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    SearchText,
    RatingTarget,
    RatingValue { book_id: String },
}

impl From<PendingAction> for Stage {
    #[inline]
    fn from(action: PendingAction) -> Self {
        match action {
            PendingAction::SearchText => Self::AwaitingSearchText,
            PendingAction::RatingTarget => Self::AwaitingRatingTarget,
            PendingAction::RatingValue { book_id } => Self::AwaitingRatingValue { book_id },
        }
    }
}

#[derive(Debug, Default)]
pub struct SessionStore {
    stages: RwLock<HashMap<UserId, Stage>>,
}

impl SessionStore {
    #[must_use]
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(clippy::missing_inline_in_public_items, reason = "Called on every event")]
    pub async fn set_pending(&self, user_id: UserId, action: PendingAction) {
        self.stages.write().await.insert(user_id, action.into());
    }

    #[allow(clippy::missing_inline_in_public_items, reason = "Called on every event")]
    pub async fn get_pending(&self, user_id: UserId) -> Option<PendingAction> {
        match self.stage(user_id).await {
            Stage::Idle => None,
            Stage::AwaitingSearchText => Some(PendingAction::SearchText),
            Stage::AwaitingRatingTarget => Some(PendingAction::RatingTarget),
            Stage::AwaitingRatingValue { book_id } => Some(PendingAction::RatingValue { book_id }),
        }
    }

    /// Returns the user to [`Stage::Idle`].
    #[allow(clippy::missing_inline_in_public_items, reason = "Called on every event")]
    pub async fn clear_pending(&self, user_id: UserId) {
        self.stages.write().await.remove(&user_id);
    }

    /// Current stage, [`Stage::Idle`] for users never seen before.
    #[allow(clippy::missing_inline_in_public_items, reason = "Called on every event")]
    pub async fn stage(&self, user_id: UserId) -> Stage {
        self.stages
            .read()
            .await
            .get(&user_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn unknown_user_is_idle() {
        let sessions = SessionStore::new();
        assert_eq!(sessions.stage(7).await, Stage::Idle);
        assert_eq!(sessions.get_pending(7).await, None);
    }

    #[tokio::test]
    async fn pending_action_is_per_user_and_clearable() {
        let sessions = SessionStore::new();
        sessions
            .set_pending(
                1,
                PendingAction::RatingValue {
                    book_id: "abc".to_owned(),
                },
            )
            .await;
        sessions.set_pending(2, PendingAction::SearchText).await;

        assert_eq!(
            sessions.stage(1).await,
            Stage::AwaitingRatingValue {
                book_id: "abc".to_owned()
            }
        );
        assert_eq!(sessions.get_pending(2).await, Some(PendingAction::SearchText));

        sessions.clear_pending(1).await;
        assert_eq!(sessions.stage(1).await, Stage::Idle);
        assert_eq!(sessions.stage(2).await, Stage::AwaitingSearchText);
    }
}
