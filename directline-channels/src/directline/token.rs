//! Bearer token state and the clock it is checked against

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

/// Source of the current time for token expiry checks
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// A token and the instant it stops being usable
#[derive(Debug, Clone)]
pub struct IssuedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl IssuedToken {
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

/// Current bearer token, if any.
///
/// A token is usable iff `now < expires_at`.
#[derive(Debug, Clone)]
pub struct TokenState {
    current: Option<IssuedToken>,
    lifetime: Duration,
}

impl TokenState {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            current: None,
            lifetime,
        }
    }

    /// Usable token at `now`, or `None` when missing or expired
    pub fn valid_at(&self, now: DateTime<Utc>) -> Option<&str> {
        self.current
            .as_ref()
            .filter(|token| now < token.expires_at)
            .map(IssuedToken::value)
    }

    /// Store a freshly issued token, expiring one lifetime after `issued_at`.
    ///
    /// An expiry past the representable range saturates at `DateTime::<Utc>::MAX_UTC`.
    pub fn store(&mut self, value: String, issued_at: DateTime<Utc>) -> &IssuedToken {
        let expires_at = issued_at
            .checked_add_signed(self.lifetime)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.current.insert(IssuedToken { value, expires_at })
    }

    pub fn current(&self) -> Option<&IssuedToken> {
        self.current.as_ref()
    }
}
