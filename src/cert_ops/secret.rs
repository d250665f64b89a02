//! Export password handling
//!
//! `SecretHandle` owns the password used to encrypt and open PKCS#12 archives.
//! The plaintext is only reachable through [`SecretHandle::with_exposed`], and
//! the backing buffer is zeroed on [`SecretHandle::release`] or on drop,
//! whichever comes first.

use crate::utils::SecretError;
use std::fmt;
use zeroize::Zeroizing;

/// Password for a PKCS#12 archive, zeroed after last use
pub struct SecretHandle {
    inner: Option<Zeroizing<String>>,
}

impl SecretHandle {
    /// Take ownership of a password. Empty passwords are rejected.
    pub fn new(password: String) -> Result<Self, SecretError> {
        let password = Zeroizing::new(password);
        if password.is_empty() {
            return Err(SecretError::Empty);
        }
        Ok(Self {
            inner: Some(password),
        })
    }

    /// Read a password from an environment variable.
    ///
    /// A missing or empty variable is reported as an empty secret.
    pub fn from_env(var: &str) -> Result<Self, SecretError> {
        let value = std::env::var(var).map_err(|_| SecretError::Empty)?;
        Self::new(value)
    }

    /// Run `f` with a borrowed plaintext view of the password.
    ///
    /// The view cannot outlive the closure.
    pub fn with_exposed<R>(&self, f: impl FnOnce(&str) -> R) -> Result<R, SecretError> {
        match &self.inner {
            Some(secret) => Ok(f(secret.as_str())),
            None => Err(SecretError::Released),
        }
    }

    /// Zero the password now. Safe to call more than once.
    pub fn release(&mut self) {
        if self.inner.take().is_some() {
            tracing::debug!("Export password released");
        }
    }

    /// Whether the password has been released
    pub fn is_released(&self) -> bool {
        self.inner.is_none()
    }
}

impl fmt::Debug for SecretHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_released() {
            "released"
        } else {
            "redacted"
        };
        f.debug_struct("SecretHandle").field("value", &state).finish()
    }
}
