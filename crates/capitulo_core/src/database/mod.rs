//! Record store
//!
//! Exposes the `Db` struct and its methods to read and write users, personal library entries and
//! reading-queue entries through pre-defined queries.
pub mod queries;
pub mod statistics;
pub mod types;
