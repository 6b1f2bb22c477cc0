//! EventRelay Server - Session-scoped event relay.
//!
//! This crate provides the server half of the relay, responsible for:
//! - Authenticating clients as a stored session (basic auth)
//! - Serving the events queued for that session
//! - Recording idempotent "seen" acknowledgements
//!
//! # Architecture
//!
//! Sessions and events live in an injected key/value [`store::Store`]. The
//! server never creates sessions or events; external flows do. Request
//! handling is stateless apart from the store.

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod store;
