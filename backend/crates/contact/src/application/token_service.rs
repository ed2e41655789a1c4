//! Token Service
//!
//! Issues and verifies the per-session CSRF token.

use crate::domain::token::{Session, SessionCodec};
use crate::error::{ContactError, ContactResult};

pub struct TokenService {
    codec: SessionCodec,
}

impl TokenService {
    pub fn new(codec: SessionCodec) -> Self {
        Self { codec }
    }

    /// Session from the cookie value; forged or malformed cookies count as absent
    pub fn load(&self, cookie_value: Option<&str>) -> Option<Session> {
        let raw = cookie_value?;
        let session = self.codec.decode(raw);
        if session.is_none() {
            tracing::debug!("Ignoring session cookie with invalid signature");
        }
        session
    }

    /// The session's token; a session is started if there is none
    pub fn issue(&self, session: Option<Session>) -> Session {
        session.unwrap_or_else(Session::start)
    }

    /// Candidate must equal the session token
    pub fn verify(&self, session: Option<&Session>, candidate: Option<&str>) -> ContactResult<()> {
        match (session, candidate) {
            (Some(session), Some(candidate)) if session.verify(candidate) => Ok(()),
            _ => Err(ContactError::CsrfMismatch),
        }
    }

    pub fn cookie_value(&self, session: &Session) -> String {
        self.codec.encode(session)
    }
}
