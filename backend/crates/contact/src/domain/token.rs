//! CSRF Token and Session
//!
//! One token per browser session, carried in an HMAC-signed cookie.

use platform::cookie::{sign_value, verify_signed_value};
use platform::crypto::{constant_time_eq, random_hex};

/// Random bytes per token (256 bits)
pub const TOKEN_BYTES: usize = 32;

/// Anti-forgery token (64 lowercase hex chars)
#[derive(Clone, PartialEq, Eq)]
pub struct CsrfToken(String);

impl CsrfToken {
    /// Generate a fresh token from the OS CSPRNG
    pub fn generate() -> Self {
        Self(random_hex(TOKEN_BYTES))
    }

    /// Accept a previously issued token; rejects anything not shaped like one
    pub fn parse(value: &str) -> Option<Self> {
        let well_formed = value.len() == TOKEN_BYTES * 2
            && value.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        well_formed.then(|| Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Constant-time comparison with a submitted candidate
    pub fn matches(&self, candidate: &str) -> bool {
        constant_time_eq(self.0.as_bytes(), candidate.as_bytes())
    }
}

impl std::fmt::Debug for CsrfToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CsrfToken(***)")
    }
}

/// Browser session owning exactly one CSRF token
#[derive(Debug, Clone)]
pub struct Session {
    token: CsrfToken,
    is_new: bool,
}

impl Session {
    /// Start a session with a fresh token
    pub fn start() -> Self {
        Self {
            token: CsrfToken::generate(),
            is_new: true,
        }
    }

    /// Session restored from a verified cookie
    pub fn restore(token: CsrfToken) -> Self {
        Self {
            token,
            is_new: false,
        }
    }

    pub fn token(&self) -> &CsrfToken {
        &self.token
    }

    /// Created during this request; the cookie still has to be sent
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Verify a submitted token against this session
    pub fn verify(&self, candidate: &str) -> bool {
        self.token.matches(candidate)
    }
}

/// Encodes sessions to signed cookie values and back
#[derive(Clone)]
pub struct SessionCodec {
    secret: [u8; 32],
}

impl SessionCodec {
    pub fn new(secret: [u8; 32]) -> Self {
        Self { secret }
    }

    pub fn encode(&self, session: &Session) -> String {
        sign_value(&self.secret, session.token.as_str())
    }

    /// `None` for a missing, malformed or forged cookie
    pub fn decode(&self, cookie_value: &str) -> Option<Session> {
        let token = verify_signed_value(&self.secret, cookie_value)?;
        CsrfToken::parse(token).map(Session::restore)
    }
}

impl std::fmt::Debug for SessionCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCodec").finish_non_exhaustive()
    }
}
