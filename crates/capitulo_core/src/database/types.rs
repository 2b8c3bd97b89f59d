use chrono::{DateTime, Utc};
use core::fmt;
use serde::{Deserialize, Serialize};

/// Telegram user identifier as stored in the database.
pub type UserId = i64;

#[non_exhaustive]
#[derive(Serialize, Debug, Deserialize, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct UserRecord {
    pub user_id: UserId,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

/// A book saved to a user's personal library.
#[non_exhaustive]
#[derive(Serialize, Debug, Deserialize, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct LibraryEntry {
    pub user_id: UserId,
    pub external_id: String,
    pub title: String,
    #[sqlx(json)]
    pub authors: Vec<String>,
    #[sqlx(json)]
    pub categories: Vec<String>,
    pub added_at: DateTime<Utc>,
    pub rating: Option<i64>,
    pub read_at: Option<DateTime<Utc>>,
}

impl LibraryEntry {
    /// A fresh, unrated and unread entry added right now.
    #[must_use]
    #[inline]
    pub fn new(
        user_id: UserId,
        external_id: String,
        title: String,
        authors: Vec<String>,
        categories: Vec<String>,
    ) -> Self {
        Self {
            user_id,
            external_id,
            title,
            authors,
            categories,
            added_at: Utc::now(),
            rating: None,
            read_at: None,
        }
    }
}

/// A book waiting in a user's reading queue.
#[non_exhaustive]
#[derive(Serialize, Debug, Deserialize, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct QueueEntry {
    pub user_id: UserId,
    pub external_id: String,
    pub title: String,
    #[sqlx(json)]
    pub authors: Vec<String>,
    #[sqlx(json)]
    pub categories: Vec<String>,
    pub added_at: DateTime<Utc>,
    pub status: String,
}

impl QueueEntry {
    pub const PENDING: &'static str = "pending";

    #[must_use]
    #[inline]
    pub fn new(
        user_id: UserId,
        external_id: String,
        title: String,
        authors: Vec<String>,
        categories: Vec<String>,
    ) -> Self {
        Self {
            user_id,
            external_id,
            title,
            authors,
            categories,
            added_at: Utc::now(),
            status: Self::PENDING.to_owned(),
        }
    }
}

/// A rating between 1 and 10, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;

    /// Returns `None` when `value` is outside `1..=10`.
    #[must_use]
    #[inline]
    pub const fn new(value: u8) -> Option<Self> {
        if value >= Self::MIN && value <= Self::MAX {
            Some(Self(value))
        } else {
            None
        }
    }

    #[must_use]
    #[inline]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Every valid rating, lowest first.
    #[allow(clippy::missing_inline_in_public_items, reason = "Called rarely")]
    pub fn all() -> impl Iterator<Item = Self> {
        (Self::MIN..=Self::MAX).map(Self)
    }
}

impl fmt::Display for Rating {
    #[allow(clippy::missing_inline_in_public_items, reason = "Called rarely")]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingStatistics {
    pub total_books: usize,
    pub pending_count: usize,
    pub average_rating: f64,
    /// At most three `(category, count)` pairs, most frequent first.
    pub top_categories: Vec<(String, usize)>,
}

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("book already stored (user_id={user_id}, external_id={external_id})")]
    AlreadyExists {
        user_id: UserId,
        external_id: String,
    },

    #[error("no entry found (user_id={user_id}, external_id={external_id})")]
    NotFound {
        user_id: UserId,
        external_id: String,
    },

    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}
