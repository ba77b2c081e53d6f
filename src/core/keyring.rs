//! API key lookup: environment first, then the platform keyring.

use std::error::Error;
use std::fmt;

use tracing::warn;

pub const KEYRING_SERVICE: &str = "parley";
pub const KEYRING_USER: &str = "default";
pub const API_KEY_ENV_VARS: &[&str] = &["PARLEY_API_KEY", "OPENROUTER_API_KEY"];

/// Describes failures when attempting to access the system keyring.
///
/// Recoverable errors mean the credential backend was temporarily unavailable
/// (a locked keychain, no secret service running). Permanent errors surface
/// the underlying cause directly.
#[derive(Debug)]
pub enum KeyringAccessError {
    Recoverable(keyring::Error),
    Permanent(keyring::Error),
}

impl KeyringAccessError {
    fn inner(&self) -> &keyring::Error {
        match self {
            KeyringAccessError::Recoverable(err) | KeyringAccessError::Permanent(err) => err,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self, KeyringAccessError::Recoverable(_))
    }
}

impl From<keyring::Error> for KeyringAccessError {
    fn from(err: keyring::Error) -> Self {
        match err {
            keyring::Error::PlatformFailure(_) | keyring::Error::NoStorageAccess(_) => {
                KeyringAccessError::Recoverable(err)
            }
            other => KeyringAccessError::Permanent(other),
        }
    }
}

impl fmt::Display for KeyringAccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner())
    }
}

impl Error for KeyringAccessError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.inner())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Env(&'static str),
    Keyring,
}

impl fmt::Display for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySource::Env(name) => write!(f, "environment variable {name}"),
            KeySource::Keyring => write!(f, "system keyring"),
        }
    }
}

/// First non-blank key among the supported environment variables.
pub fn api_key_from_env(lookup: impl Fn(&str) -> Option<String>) -> Option<(String, KeySource)> {
    API_KEY_ENV_VARS.iter().copied().find_map(|name| {
        lookup(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(|value| (value, KeySource::Env(name)))
    })
}

fn entry() -> Result<keyring::Entry, KeyringAccessError> {
    Ok(keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER)?)
}

pub fn load_api_key() -> Result<Option<String>, KeyringAccessError> {
    match entry()?.get_password() {
        Ok(key) => Ok(Some(key)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

pub fn store_api_key(key: &str) -> Result<(), KeyringAccessError> {
    Ok(entry()?.set_password(key)?)
}

pub fn delete_api_key() -> Result<bool, KeyringAccessError> {
    match entry()?.delete_credential() {
        Ok(()) => Ok(true),
        Err(keyring::Error::NoEntry) => Ok(false),
        Err(err) => Err(err.into()),
    }
}

/// Resolve the API key from the environment, falling back to the keyring.
pub fn resolve_api_key() -> Result<Option<(String, KeySource)>, KeyringAccessError> {
    resolve_with(|name| std::env::var(name).ok(), load_api_key)
}

/// A keyring that is temporarily unavailable counts as holding no key, so
/// callers can still point the user at `parley auth`.
fn resolve_with(
    env_lookup: impl Fn(&str) -> Option<String>,
    keyring_lookup: impl FnOnce() -> Result<Option<String>, KeyringAccessError>,
) -> Result<Option<(String, KeySource)>, KeyringAccessError> {
    if let Some(found) = api_key_from_env(env_lookup) {
        return Ok(Some(found));
    }
    match keyring_lookup() {
        Ok(key) => Ok(key.map(|key| (key, KeySource::Keyring))),
        Err(err) if err.is_recoverable() => {
            warn!("Keyring unavailable, continuing without a stored key: {err}");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}
