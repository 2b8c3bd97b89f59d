//! Conversation flows
//!
//! Turns inbound chat events into replies. Single-shot actions (adding, removing, listing,
//! statistics) touch the record store and answer once. Searching and rating span several events
//! and keep their progress in the [`SessionStore`](crate::session::SessionStore).
pub mod action;
pub mod reply;
pub mod views;


use crate::catalog::Catalog;
use crate::database::queries::Db;
use crate::database::types::{LibraryEntry, QueueEntry, Rating, StoreError, UserId};
use crate::session::{PendingAction, SessionStore, Stage};
use action::Action;
use log::{info, warn};
use reply::{Delivery, Reply};

/// The person behind an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub id: UserId,
    pub username: Option<String>,
    pub first_name: String,
}

impl Sender {
    /// Name stored with the user record: the username when there is one.
    #[must_use]
    #[inline]
    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.first_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `/start`
    Start,
    /// `/biblioteca`
    Library,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Command(Command),
    Callback(Action),
    /// Free text that is not a command.
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub sender: Sender,
    pub kind: EventKind,
}

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("record store failure: {0}")]
    Store(#[from] StoreError),
}

pub struct FlowController<C> {
    db: Db,
    catalog: C,
    sessions: SessionStore,
}

impl<C: Catalog> FlowController<C> {
    #[must_use]
    #[inline]
    pub fn new(db: Db, catalog: C) -> Self {
        Self {
            db,
            catalog,
            sessions: SessionStore::new(),
        }
    }

    #[must_use]
    #[inline]
    pub const fn db(&self) -> &Db {
        &self.db
    }

    #[must_use]
    #[inline]
    pub const fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Handles one inbound event and returns the replies to deliver, in order.
    /// # Errors
    /// Fails when the record store fails unexpectedly. Expected outcomes such as duplicates or
    /// missing books are answered with a message instead.
    #[allow(clippy::missing_inline_in_public_items, reason = "Large function")]
    pub async fn handle(&self, event: &Event) -> Result<Vec<Reply>, FlowError> {
        let sender = &event.sender;
        self.db.ensure_user(sender.id, sender.display_name()).await?;

        match &event.kind {
            EventKind::Command(Command::Start) => Ok(self.start(sender, Delivery::Send).await),
            EventKind::Command(Command::Library) => self.show_library(sender.id).await,
            EventKind::Callback(action) => self.dispatch(sender, action).await,
            EventKind::Text(text) => self.on_text(sender.id, text).await,
        }
    }

    async fn dispatch(&self, sender: &Sender, action: &Action) -> Result<Vec<Reply>, FlowError> {
        let user_id = sender.id;
        match action {
            Action::Start => Ok(self.start(sender, Delivery::Edit).await),
            Action::ShowLibrary => self.show_library(user_id).await,
            Action::ShowQueue => self.show_queue(user_id).await,
            Action::ShowStatistics => {
                let stats = self.db.compute_statistics(user_id).await?;
                Ok(vec![views::statistics(&stats)])
            }
            Action::BeginSearch => {
                self.sessions
                    .set_pending(user_id, PendingAction::SearchText)
                    .await;
                Ok(vec![views::search_prompt()])
            }
            Action::BeginRating => self.begin_rating(user_id).await,
            Action::AddToLibrary(book_id) => self.add_to_library(user_id, book_id).await,
            Action::AddToQueue(book_id) => self.add_to_queue(user_id, book_id).await,
            Action::RemoveFromLibrary(book_id) => {
                self.db.library_remove(user_id, book_id).await?;
                info!("User {user_id} removed {book_id} from the library");
                Ok(vec![views::removed_from_library()])
            }
            Action::RemoveFromQueue(book_id) => {
                self.db.queue_remove(user_id, book_id).await?;
                info!("User {user_id} removed {book_id} from the reading queue");
                Ok(vec![views::removed_from_queue()])
            }
            Action::ShowDetails(book_id) => Ok(self.catalog.get_detail(book_id).await.map_or_else(
                || vec![views::details_unavailable()],
                |book| views::book_details(&book),
            )),
            Action::MarkRead(book_id) => self.mark_read(user_id, book_id).await,
            Action::RateLibraryBook(book_id) | Action::PickRatingTarget(book_id) => {
                self.sessions
                    .set_pending(
                        user_id,
                        PendingAction::RatingValue {
                            book_id: book_id.clone(),
                        },
                    )
                    .await;
                Ok(vec![views::rating_prompt()])
            }
            Action::Rate(rating) => match self.sessions.stage(user_id).await {
                Stage::AwaitingRatingValue { book_id } => {
                    self.save_rating(user_id, &book_id, *rating).await
                }
                Stage::Idle | Stage::AwaitingSearchText | Stage::AwaitingRatingTarget => {
                    warn!("User {user_id} sent a rating without choosing a book");
                    Ok(vec![views::rating_target_unknown()])
                }
            },
        }
    }

    /// Main menu. Always abandons whatever flow the user was in.
    async fn start(&self, sender: &Sender, delivery: Delivery) -> Vec<Reply> {
        self.sessions.clear_pending(sender.id).await;
        vec![views::main_menu(&sender.first_name, delivery)]
    }

    async fn on_text(&self, user_id: UserId, text: &str) -> Result<Vec<Reply>, FlowError> {
        match self.sessions.stage(user_id).await {
            Stage::AwaitingSearchText => {
                // single shot: any text ends the search flow, whatever the outcome
                self.sessions.clear_pending(user_id).await;
                Ok(self.search(text.trim()).await)
            }
            Stage::AwaitingRatingValue { book_id } => {
                match text.trim().parse::<u8>().ok().and_then(Rating::new) {
                    Some(rating) => self.save_rating(user_id, &book_id, rating).await,
                    None => Ok(vec![views::rating_hint()]),
                }
            }
            Stage::Idle | Stage::AwaitingRatingTarget => Ok(vec![views::idle_hint()]),
        }
    }

    async fn search(&self, query: &str) -> Vec<Reply> {
        if query.is_empty() {
            return vec![views::no_results()];
        }
        let books = self.catalog.search(query).await;
        if books.is_empty() {
            return vec![views::no_results()];
        }
        books.iter().map(views::search_result).collect()
    }

    async fn add_to_library(&self, user_id: UserId, book_id: &str) -> Result<Vec<Reply>, FlowError> {
        if self.db.library_contains(user_id, book_id).await? {
            return Ok(vec![views::already_in_library()]);
        }
        let Some(book) = self.catalog.get_detail(book_id).await else {
            return Ok(vec![views::book_info_unavailable()]);
        };

        let title = book.title.unwrap_or_else(|| views::NO_TITLE.to_owned());
        let entry = LibraryEntry::new(
            user_id,
            book.external_id,
            title.clone(),
            book.authors,
            book.categories,
        );
        match self.db.library_add(&entry).await {
            Ok(()) => {
                info!("User {user_id} added {book_id} to the library");
                Ok(vec![views::added_to_library(&title, book_id)])
            }
            Err(StoreError::AlreadyExists { .. }) => Ok(vec![views::already_in_library()]),
            Err(err) => Err(err.into()),
        }
    }

    async fn add_to_queue(&self, user_id: UserId, book_id: &str) -> Result<Vec<Reply>, FlowError> {
        if self.db.queue_contains(user_id, book_id).await? {
            return Ok(vec![views::already_in_queue()]);
        }
        let Some(book) = self.catalog.get_detail(book_id).await else {
            return Ok(vec![views::book_info_unavailable()]);
        };

        let title = book.title.unwrap_or_else(|| views::NO_TITLE.to_owned());
        let entry = QueueEntry::new(
            user_id,
            book.external_id,
            title.clone(),
            book.authors,
            book.categories,
        );
        match self.db.queue_add(&entry).await {
            Ok(()) => {
                info!("User {user_id} queued {book_id}");
                Ok(vec![views::added_to_queue(&title)])
            }
            Err(StoreError::AlreadyExists { .. }) => Ok(vec![views::already_in_queue()]),
            Err(err) => Err(err.into()),
        }
    }

    async fn show_library(&self, user_id: UserId) -> Result<Vec<Reply>, FlowError> {
        let entries = self.db.library_list(user_id).await?;
        if entries.is_empty() {
            return Ok(vec![views::empty_library()]);
        }
        Ok(entries.iter().map(views::library_card).collect())
    }

    async fn show_queue(&self, user_id: UserId) -> Result<Vec<Reply>, FlowError> {
        let entries = self.db.queue_list(user_id).await?;
        if entries.is_empty() {
            return Ok(vec![views::empty_queue()]);
        }
        Ok(entries.iter().map(views::queue_card).collect())
    }

    async fn mark_read(&self, user_id: UserId, book_id: &str) -> Result<Vec<Reply>, FlowError> {
        match self.db.queue_promote_to_library(user_id, book_id).await {
            Ok(entry) => {
                info!("User {user_id} finished {book_id}");
                Ok(vec![views::marked_as_read(&entry.title)])
            }
            Err(StoreError::NotFound { .. }) => Ok(vec![views::not_in_queue()]),
            Err(err) => Err(err.into()),
        }
    }

    async fn begin_rating(&self, user_id: UserId) -> Result<Vec<Reply>, FlowError> {
        let entries = self.db.library_list(user_id).await?;
        if entries.is_empty() {
            self.sessions.clear_pending(user_id).await;
            return Ok(vec![views::nothing_to_rate()]);
        }
        self.sessions
            .set_pending(user_id, PendingAction::RatingTarget)
            .await;
        Ok(vec![views::rating_menu(&entries)])
    }

    async fn save_rating(
        &self,
        user_id: UserId,
        book_id: &str,
        rating: Rating,
    ) -> Result<Vec<Reply>, FlowError> {
        let updated = self.db.library_set_rating(user_id, book_id, rating).await?;
        self.sessions.clear_pending(user_id).await;
        if updated {
            info!("User {user_id} rated {book_id} with {rating}");
            Ok(vec![views::rating_saved(rating)])
        } else {
            warn!("User {user_id} rated {book_id}, which is not in their library");
            Ok(vec![views::rating_target_missing()])
        }
    }
}
