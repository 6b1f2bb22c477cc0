//! Session authentication.
//!
//! Every event route authenticates the caller as a stored [`Session`] before
//! touching any event. Credentials travel as HTTP basic auth:
//!
//! ```text
//! Authorization: Basic base64(session_id ":" session_key)
//! ```
//!
//! # Overview
//!
//! 1. [`BasicCredentials::from_headers`] decodes the header into an
//!    `(id, key)` pair
//! 2. [`authenticate`] loads the session by id and compares the key in
//!    constant time
//! 3. On success the session id is handed to the route handler
//!
//! A missing session, a wrong key and an unreadable header all produce
//! [`ServerError::InvalidSessionCredentials`], so a client cannot tell which
//! part of its credentials was wrong.
//!
//! # Example
//!
//! ```rust
//! use eventrelay_server::auth::{authenticate, BasicCredentials};
//! use eventrelay_server::models::Session;
//! use eventrelay_server::store::MemoryStore;
//!
//! let store = MemoryStore::new();
//! Session::new("123", "456").save(&store).unwrap();
//!
//! let credentials = BasicCredentials::new("123", "456");
//! assert_eq!(authenticate(&store, &credentials).unwrap(), "123");
//! ```

use std::fmt;

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use base64::prelude::*;
use subtle::ConstantTimeEq;
use tracing::{debug, trace};

use crate::error::{self, ServerError};
use crate::models::Session;
use crate::store::Store;

/// Authorization scheme prefix, matched case-insensitively.
const BASIC_SCHEME: &str = "basic";

/// A decoded `(session id, session key)` pair.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub session_id: String,
    pub session_key: String,
}

impl fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("session_id", &self.session_id)
            .field("session_key", &"<redacted>")
            .finish()
    }
}

impl BasicCredentials {
    pub fn new(session_id: impl Into<String>, session_key: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            session_key: session_key.into(),
        }
    }

    /// Extracts credentials from an `Authorization: Basic ...` header.
    ///
    /// Returns `None` if the header is missing, uses another scheme, is not
    /// valid base64 or UTF-8, or has no `:` separator. The text is split at
    /// the first `:`, so the key itself may contain colons.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
        let (scheme, encoded) = value.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case(BASIC_SCHEME) {
            trace!("Authorization header uses a non-basic scheme");
            return None;
        }

        let decoded = BASE64_STANDARD.decode(encoded.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (session_id, session_key) = decoded.split_once(':')?;

        Some(Self::new(session_id, session_key))
    }

    /// Encodes the credentials as an `Authorization` header value.
    pub fn to_header_value(&self) -> String {
        let raw = format!("{}:{}", self.session_id, self.session_key);
        format!("Basic {}", BASE64_STANDARD.encode(raw))
    }
}

/// Validates credentials against the stored session.
///
/// Returns the authenticated session id.
///
/// # Errors
///
/// - [`ServerError::InvalidSessionCredentials`] if no session has this id or
///   the key does not match
/// - [`ServerError::Store`] if the session could not be loaded
///
/// # Timing
///
/// Keys of equal length are compared in constant time. A length mismatch is
/// rejected before any byte is compared, so response timing can reveal the
/// stored key's length but not its contents.
pub fn authenticate(
    store: &dyn Store,
    credentials: &BasicCredentials,
) -> error::Result<String> {
    let Some(session) = Session::load(store, &credentials.session_id)? else {
        debug!(session_id = %credentials.session_id, "Unknown session");
        return Err(ServerError::InvalidSessionCredentials);
    };

    let matches: bool = session
        .key
        .as_bytes()
        .ct_eq(credentials.session_key.as_bytes())
        .into();
    if !matches {
        debug!(session_id = %credentials.session_id, "Session key mismatch");
        return Err(ServerError::InvalidSessionCredentials);
    }

    trace!(session_id = %session.id, "Session authenticated");
    Ok(session.id)
}

/// Decodes the `Authorization` header and authenticates it in one step.
///
/// A missing or malformed header is reported exactly like a wrong key.
pub fn authenticate_headers(store: &dyn Store, headers: &HeaderMap) -> error::Result<String> {
    let Some(credentials) = BasicCredentials::from_headers(headers) else {
        debug!("Missing or malformed Authorization header");
        return Err(ServerError::InvalidSessionCredentials);
    };
    authenticate(store, &credentials)
}
