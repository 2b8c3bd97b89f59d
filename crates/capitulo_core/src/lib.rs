//! `capitulo_core`
//!
//! Transport independent logic of the Capítulo Cero reading assistant: catalog lookups, the
//! per-user record store, conversation state and the flows that turn chat events into replies. The
//! Telegram front end only translates updates into [`flow::Event`]s and renders the resulting
//! [`flow::reply::Reply`]s.

pub mod catalog;

pub mod database;

pub mod flow;

pub mod session;
