use crate::database::statistics::summarize;
use crate::database::types::{
    LibraryEntry, QueueEntry, Rating, ReadingStatistics, StoreError, UserId, UserRecord,
};
use chrono::Utc;
use core::str::FromStr as _;
use sqlx::types::Json;
use sqlx::{
    Sqlite, SqlitePool, Transaction,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

const LIBRARY_COLUMNS: &str =
    "user_id, external_id, title, authors, categories, added_at, rating, read_at";
const QUEUE_COLUMNS: &str = "user_id, external_id, title, authors, categories, added_at, status";

/// Record store for users, library entries and reading-queue entries.
#[derive(Clone)]
pub struct Db {
    pool: SqlitePool,
}

impl Db {
    /// Opens the database at `url`, creating the file if needed, and applies migrations.
    /// # Errors
    /// Fails if the URL is malformed, the database cannot be opened or a migration fails.
    #[allow(
        clippy::missing_inline_in_public_items,
        reason = "Called once at start of program"
    )]
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePool::connect_with(options).await?;
        sqlx::migrate!()
            .run(&pool)
            .await
            .map_err(sqlx::Error::from)?;
        log::info!("Opened record store at {url}");

        Ok(Self { pool })
    }

    /// A private in-memory database. The pool is pinned to one connection that never expires,
    /// because every SQLite memory connection is its own database.
    /// # Errors
    /// Fails if the migration fails.
    #[allow(clippy::missing_inline_in_public_items, reason = "Test helper")]
    pub async fn connect_in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        sqlx::migrate!()
            .run(&pool)
            .await
            .map_err(sqlx::Error::from)?;

        Ok(Self { pool })
    }

    #[allow(
        clippy::missing_inline_in_public_items,
        reason = "Called once at end of program"
    )]
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Inserts the user unless a record with the same id already exists.
    /// # Errors
    /// Fails on database errors.
    #[allow(clippy::missing_inline_in_public_items, reason = "Called on every event")]
    pub async fn ensure_user(&self, user_id: UserId, display_name: &str) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO users (user_id, display_name, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id) DO NOTHING;",
        )
        .bind(user_id)
        .bind(display_name)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// # Errors
    /// Fails on database errors.
    #[allow(clippy::missing_inline_in_public_items, reason = "Called rarely")]
    pub async fn fetch_user(&self, user_id: UserId) -> Result<Option<UserRecord>, StoreError> {
        let user = sqlx::query_as(
            "SELECT user_id, display_name, created_at FROM users WHERE user_id = ?;",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// # Errors
    /// Fails on database errors.
    #[allow(clippy::missing_inline_in_public_items, reason = "Called rarely")]
    pub async fn count_users(&self) -> Result<usize, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users;")
            .fetch_one(&self.pool)
            .await?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// # Errors
    /// Fails on database errors.
    #[allow(clippy::missing_inline_in_public_items, reason = "Called rarely")]
    pub async fn library_contains(
        &self,
        user_id: UserId,
        external_id: &str,
    ) -> Result<bool, StoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM library_entries WHERE user_id = ? AND external_id = ?;",
        )
        .bind(user_id)
        .bind(external_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    /// # Errors
    /// Returns [`StoreError::AlreadyExists`] if the user already has this book in the library.
    #[allow(clippy::missing_inline_in_public_items, reason = "Called rarely")]
    pub async fn library_add(&self, entry: &LibraryEntry) -> Result<(), StoreError> {
        let result = sqlx::query(
            "INSERT INTO library_entries (
                user_id,
                external_id,
                title,
                authors,
                categories,
                added_at,
                rating,
                read_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?);",
        )
        .bind(entry.user_id)
        .bind(&entry.external_id)
        .bind(&entry.title)
        .bind(Json(&entry.authors))
        .bind(Json(&entry.categories))
        .bind(entry.added_at)
        .bind(entry.rating)
        .bind(entry.read_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(error) if is_sqlite_unique_violation(&error) => Err(StoreError::AlreadyExists {
                user_id: entry.user_id,
                external_id: entry.external_id.clone(),
            }),
            Err(error) => Err(StoreError::Db(error)),
        }
    }

    /// Library entries in the order they were added.
    /// # Errors
    /// Fails on database errors.
    #[allow(clippy::missing_inline_in_public_items, reason = "Called rarely")]
    pub async fn library_list(&self, user_id: UserId) -> Result<Vec<LibraryEntry>, StoreError> {
        let entries = sqlx::query_as(&format!(
            "SELECT {LIBRARY_COLUMNS} FROM library_entries WHERE user_id = ? ORDER BY id ASC;"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    /// Sets the rating of a library entry. Returns `false` when the user has no such entry, in
    /// which case nothing is written.
    /// # Errors
    /// Fails on database errors.
    #[allow(clippy::missing_inline_in_public_items, reason = "Called rarely")]
    pub async fn library_set_rating(
        &self,
        user_id: UserId,
        external_id: &str,
        rating: Rating,
    ) -> Result<bool, StoreError> {
        let updated = sqlx::query(
            "UPDATE library_entries SET rating = ? WHERE user_id = ? AND external_id = ?;",
        )
        .bind(i64::from(rating.get()))
        .bind(user_id)
        .bind(external_id)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(updated > 0)
    }

    /// Removing an absent entry is not an error.
    /// # Errors
    /// Fails on database errors.
    #[allow(clippy::missing_inline_in_public_items, reason = "Called rarely")]
    pub async fn library_remove(&self, user_id: UserId, external_id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM library_entries WHERE user_id = ? AND external_id = ?;")
            .bind(user_id)
            .bind(external_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// # Errors
    /// Fails on database errors.
    #[allow(clippy::missing_inline_in_public_items, reason = "Called rarely")]
    pub async fn queue_contains(
        &self,
        user_id: UserId,
        external_id: &str,
    ) -> Result<bool, StoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM queue_entries WHERE user_id = ? AND external_id = ?;",
        )
        .bind(user_id)
        .bind(external_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    /// # Errors
    /// Returns [`StoreError::AlreadyExists`] if the book is already queued for this user.
    #[allow(clippy::missing_inline_in_public_items, reason = "Called rarely")]
    pub async fn queue_add(&self, entry: &QueueEntry) -> Result<(), StoreError> {
        let result = sqlx::query(
            "INSERT INTO queue_entries (
                user_id,
                external_id,
                title,
                authors,
                categories,
                added_at,
                status
            )
            VALUES (?, ?, ?, ?, ?, ?, ?);",
        )
        .bind(entry.user_id)
        .bind(&entry.external_id)
        .bind(&entry.title)
        .bind(Json(&entry.authors))
        .bind(Json(&entry.categories))
        .bind(entry.added_at)
        .bind(&entry.status)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(error) if is_sqlite_unique_violation(&error) => Err(StoreError::AlreadyExists {
                user_id: entry.user_id,
                external_id: entry.external_id.clone(),
            }),
            Err(error) => Err(StoreError::Db(error)),
        }
    }

    /// Queue entries in the order they were added.
    /// # Errors
    /// Fails on database errors.
    #[allow(clippy::missing_inline_in_public_items, reason = "Called rarely")]
    pub async fn queue_list(&self, user_id: UserId) -> Result<Vec<QueueEntry>, StoreError> {
        let entries = sqlx::query_as(&format!(
            "SELECT {QUEUE_COLUMNS} FROM queue_entries WHERE user_id = ? ORDER BY id ASC;"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    /// # Errors
    /// Fails on database errors.
    #[allow(clippy::missing_inline_in_public_items, reason = "Called rarely")]
    pub async fn queue_count(&self, user_id: UserId) -> Result<usize, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM queue_entries WHERE user_id = ?;")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Removing an absent entry is not an error.
    /// # Errors
    /// Fails on database errors.
    #[allow(clippy::missing_inline_in_public_items, reason = "Called rarely")]
    pub async fn queue_remove(&self, user_id: UserId, external_id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM queue_entries WHERE user_id = ? AND external_id = ?;")
            .bind(user_id)
            .bind(external_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Moves a queued book into the library and stamps it as read.
    ///
    /// If the book is already in the library, the existing entry gets the read timestamp instead
    /// of a second entry being inserted.
    /// # Errors
    /// Returns [`StoreError::NotFound`] without touching either table when the book is not queued.
    #[allow(clippy::missing_inline_in_public_items, reason = "Called rarely")]
    pub async fn queue_promote_to_library(
        &self,
        user_id: UserId,
        external_id: &str,
    ) -> Result<LibraryEntry, StoreError> {
        // Query outline:
        // 1. Fetch the queue entry, bail out if missing
        // 2. Stamp read_at on an existing library entry, or insert a new one
        // 3. Delete the queue entry
        let mut tx: Transaction<'_, Sqlite> = self.pool.begin().await?;

        let queued: Option<QueueEntry> = sqlx::query_as(&format!(
            "SELECT {QUEUE_COLUMNS} FROM queue_entries WHERE user_id = ? AND external_id = ?;"
        ))
        .bind(user_id)
        .bind(external_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(queued) = queued else {
            tx.rollback().await.ok();
            return Err(StoreError::NotFound {
                user_id,
                external_id: external_id.to_owned(),
            });
        };

        let read_at = Utc::now();
        let stamped = sqlx::query(
            "UPDATE library_entries SET read_at = ? WHERE user_id = ? AND external_id = ?;",
        )
        .bind(read_at)
        .bind(user_id)
        .bind(external_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if stamped == 0 {
            sqlx::query(
                "INSERT INTO library_entries (
                    user_id,
                    external_id,
                    title,
                    authors,
                    categories,
                    added_at,
                    rating,
                    read_at
                )
                VALUES (?, ?, ?, ?, ?, ?, NULL, ?);",
            )
            .bind(user_id)
            .bind(external_id)
            .bind(&queued.title)
            .bind(Json(&queued.authors))
            .bind(Json(&queued.categories))
            .bind(queued.added_at)
            .bind(read_at)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("DELETE FROM queue_entries WHERE user_id = ? AND external_id = ?;")
            .bind(user_id)
            .bind(external_id)
            .execute(&mut *tx)
            .await?;

        let promoted: LibraryEntry = sqlx::query_as(&format!(
            "SELECT {LIBRARY_COLUMNS} FROM library_entries WHERE user_id = ? AND external_id = ?;"
        ))
        .bind(user_id)
        .bind(external_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(promoted)
    }

    /// # Errors
    /// Fails on database errors.
    #[allow(clippy::missing_inline_in_public_items, reason = "Called rarely")]
    pub async fn compute_statistics(&self, user_id: UserId) -> Result<ReadingStatistics, StoreError> {
        let entries = self.library_list(user_id).await?;
        let pending_count = self.queue_count(user_id).await?;
        Ok(summarize(&entries, pending_count))
    }
}

#[allow(
    clippy::pattern_type_mismatch,
    reason = "False positive, this is the idiomatic pattern"
)]
fn is_sqlite_unique_violation(error: &sqlx::Error) -> bool {
    // Check for unique violation by searching for matching text in error message
    if let sqlx::Error::Database(db_err) = error {
        db_err.message().contains("UNIQUE constraint failed")
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const USER: UserId = 42;

    async fn db_with_user() -> Db {
        let db = Db::connect_in_memory().await.unwrap();
        db.ensure_user(USER, "lector").await.unwrap();
        db
    }

    fn library_entry(external_id: &str) -> LibraryEntry {
        LibraryEntry::new(
            USER,
            external_id.to_owned(),
            format!("Title {external_id}"),
            vec!["Gabriel García Márquez".to_owned()],
            vec!["Fiction".to_owned()],
        )
    }

    fn queue_entry(external_id: &str) -> QueueEntry {
        QueueEntry::new(
            USER,
            external_id.to_owned(),
            format!("Queued {external_id}"),
            vec!["Isabel Allende".to_owned(), "Someone Else".to_owned()],
            vec!["Drama".to_owned()],
        )
    }

    #[tokio::test]
    async fn ensure_user_is_idempotent() {
        let db = db_with_user().await;
        db.ensure_user(USER, "renamed").await.unwrap();

        assert_eq!(db.count_users().await.unwrap(), 1);
        let user = db.fetch_user(USER).await.unwrap().unwrap();
        assert_eq!(user.display_name, "lector");
    }

    #[tokio::test]
    async fn library_add_then_remove() {
        let db = db_with_user().await;
        db.library_add(&library_entry("abc_123")).await.unwrap();
        assert!(db.library_contains(USER, "abc_123").await.unwrap());
        assert!(!db.library_contains(USER + 1, "abc_123").await.unwrap());

        db.library_remove(USER, "abc_123").await.unwrap();
        assert!(!db.library_contains(USER, "abc_123").await.unwrap());
        // removing twice is fine
        db.library_remove(USER, "abc_123").await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_library_add_keeps_one_entry() {
        let db = db_with_user().await;
        db.library_add(&library_entry("dup")).await.unwrap();
        let second = db.library_add(&library_entry("dup")).await;

        assert!(matches!(second, Err(StoreError::AlreadyExists { .. })));
        assert_eq!(db.library_list(USER).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn library_list_keeps_insertion_order_and_json_columns() {
        let db = db_with_user().await;
        for id in ["zeta", "alpha", "mid"] {
            db.library_add(&library_entry(id)).await.unwrap();
        }
        let entries = db.library_list(USER).await.unwrap();
        let ids: Vec<&str> = entries.iter().map(|e| e.external_id.as_str()).collect();
        assert_eq!(ids, vec!["zeta", "alpha", "mid"]);
        assert_eq!(entries[0].authors, vec!["Gabriel García Márquez".to_owned()]);
        assert_eq!(entries[0].categories, vec!["Fiction".to_owned()]);
    }

    #[tokio::test]
    async fn set_rating_updates_existing_entry() {
        let db = db_with_user().await;
        db.library_add(&library_entry("rated")).await.unwrap();
        let seven = Rating::new(7).unwrap();

        assert!(db.library_set_rating(USER, "rated", seven).await.unwrap());
        let entries = db.library_list(USER).await.unwrap();
        assert_eq!(entries[0].rating, Some(7));
    }

    #[tokio::test]
    async fn set_rating_on_missing_entry_writes_nothing() {
        let db = db_with_user().await;
        let updated = db
            .library_set_rating(USER, "ghost", Rating::new(3).unwrap())
            .await
            .unwrap();

        assert!(!updated);
        assert!(db.library_list(USER).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn queue_add_rejects_duplicates() {
        let db = db_with_user().await;
        db.queue_add(&queue_entry("q1")).await.unwrap();
        let second = db.queue_add(&queue_entry("q1")).await;

        assert!(matches!(second, Err(StoreError::AlreadyExists { .. })));
        assert_eq!(db.queue_count(USER).await.unwrap(), 1);
        assert_eq!(db.queue_list(USER).await.unwrap()[0].status, QueueEntry::PENDING);
    }

    #[tokio::test]
    async fn promote_missing_entry_leaves_library_untouched() {
        let db = db_with_user().await;
        db.library_add(&library_entry("kept")).await.unwrap();
        let before = db.library_list(USER).await.unwrap().len();

        let result = db.queue_promote_to_library(USER, "missing").await;

        assert!(matches!(result, Err(StoreError::NotFound { .. })));
        assert_eq!(db.library_list(USER).await.unwrap().len(), before);
    }

    #[tokio::test]
    async fn promote_moves_entry_and_stamps_read_at() {
        let db = db_with_user().await;
        let queued = queue_entry("to-read");
        db.queue_add(&queued).await.unwrap();

        let promoted = db.queue_promote_to_library(USER, "to-read").await.unwrap();

        assert!(!db.queue_contains(USER, "to-read").await.unwrap());
        assert!(db.library_contains(USER, "to-read").await.unwrap());
        assert!(promoted.read_at.is_some());
        assert_eq!(promoted.title, queued.title);
        assert_eq!(promoted.authors, queued.authors);
        assert_eq!(promoted.categories, queued.categories);
        assert_eq!(promoted.rating, None);
    }

    #[tokio::test]
    async fn promote_book_already_in_library_keeps_single_entry() {
        let db = db_with_user().await;
        let mut existing = library_entry("both");
        existing.rating = Some(9);
        db.library_add(&existing).await.unwrap();
        db.queue_add(&queue_entry("both")).await.unwrap();

        let promoted = db.queue_promote_to_library(USER, "both").await.unwrap();

        assert_eq!(db.library_list(USER).await.unwrap().len(), 1);
        assert_eq!(promoted.rating, Some(9));
        assert!(promoted.read_at.is_some());
        assert!(!db.queue_contains(USER, "both").await.unwrap());
    }

    #[tokio::test]
    async fn statistics_for_empty_user() {
        let db = db_with_user().await;
        let stats = db.compute_statistics(USER).await.unwrap();

        assert_eq!(stats.total_books, 0);
        assert_eq!(stats.pending_count, 0);
        assert_eq!(stats.average_rating, 0.0);
        assert!(stats.top_categories.is_empty());
    }

    #[tokio::test]
    async fn statistics_average_over_all_entries() {
        let db = db_with_user().await;
        let mut first = library_entry("one");
        first.categories = vec!["Fiction".to_owned(), "Drama".to_owned()];
        db.library_add(&first).await.unwrap();
        db.library_add(&library_entry("two")).await.unwrap();
        db.library_set_rating(USER, "one", Rating::new(8).unwrap())
            .await
            .unwrap();
        db.queue_add(&queue_entry("later")).await.unwrap();

        let stats = db.compute_statistics(USER).await.unwrap();

        assert_eq!(stats.total_books, 2);
        assert_eq!(stats.pending_count, 1);
        assert_eq!(stats.average_rating, 4.0);
        assert_eq!(
            stats.top_categories,
            vec![("Fiction".to_owned(), 2), ("Drama".to_owned(), 1)]
        );
    }
}
