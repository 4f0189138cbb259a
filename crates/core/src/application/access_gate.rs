// Access Gate - shared-secret check for helper actions
//
// Equality comparison only. No hashing, lockout or rate limiting: this keeps
// honest students away from the helper buttons and is not a security control.

use std::fmt;
use tracing::{info, warn};

/// The configured helper secret. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct HelperSecret(String);

impl HelperSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    fn matches(&self, submitted: &str) -> bool {
        self.0 == submitted
    }
}

impl fmt::Debug for HelperSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HelperSecret(***)")
    }
}

/// Session-local gate in front of destructive queue operations.
///
/// The `authenticated` flag lives only here; it is never written to the
/// shared store.
#[derive(Debug, Clone, Default)]
pub struct AccessGate {
    secret: Option<HelperSecret>,
    authenticated: bool,
}

impl AccessGate {
    pub fn new(secret: Option<HelperSecret>) -> Self {
        Self {
            secret,
            authenticated: false,
        }
    }

    /// Compare `submitted` against the secret.
    ///
    /// A match opens the gate, a mismatch closes it. With no secret
    /// configured the gate stays closed.
    pub fn authenticate(&mut self, submitted: &str) -> bool {
        self.authenticated = match &self.secret {
            Some(secret) => secret.matches(submitted),
            None => {
                warn!("Helper secret not configured, helper controls stay locked");
                false
            }
        };

        if self.authenticated {
            info!("Helper controls unlocked");
        } else {
            warn!("Helper secret rejected");
        }
        self.authenticated
    }

    pub fn sign_out(&mut self) {
        self.authenticated = false;
    }

    pub fn is_open(&self) -> bool {
        self.authenticated
    }
}
