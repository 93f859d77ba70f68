//! Authentication headers for requests to the feed backend.

use std::fmt;

/// Header carrying the signed init-data blob from the host runtime.
pub const INIT_DATA_HEADER: &str = "X-Telegram-Init-Data";
/// Development fallback header carrying a plain user id.
pub const DEV_USER_HEADER: &str = "X-Dev-User";
/// Header deduplicating create requests that are retried.
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    Unauthenticated,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Unauthenticated => {
                write!(f, "no init data and no development user available")
            }
        }
    }
}

impl std::error::Error for SessionError {}

/// Credentials attached to every backend request.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    init_data: Option<String>,
    dev_user: Option<String>,
}

// init data is a bearer credential, keep it out of logs
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("init_data", &self.init_data.as_ref().map(|_| "<redacted>"))
            .field("dev_user", &self.dev_user)
            .finish()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_init_data(mut self, init_data: impl Into<String>) -> Self {
        let init_data = init_data.into();
        self.init_data = (!init_data.is_empty()).then_some(init_data);
        self
    }

    pub fn with_dev_user(mut self, user_id: impl Into<String>) -> Self {
        let user_id = user_id.into();
        self.dev_user = (!user_id.is_empty()).then_some(user_id);
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.init_data.is_some() || self.dev_user.is_some()
    }

    /// Authentication header for a request. Init data takes precedence over
    /// the development fallback.
    pub fn auth_header(&self) -> Result<(&'static str, String), SessionError> {
        if let Some(init_data) = &self.init_data {
            return Ok((INIT_DATA_HEADER, init_data.clone()));
        }
        if let Some(user) = &self.dev_user {
            return Ok((DEV_USER_HEADER, user.clone()));
        }
        Err(SessionError::Unauthenticated)
    }

    /// Headers for a create request: authentication plus the idempotency key.
    pub fn create_headers(
        &self,
        idempotency_key: &str,
    ) -> Result<Vec<(&'static str, String)>, SessionError> {
        Ok(vec![
            self.auth_header()?,
            (IDEMPOTENCY_HEADER, idempotency_key.to_string()),
        ])
    }
}
