use std::fmt;
use thiserror::Error;
use zeroize::Zeroizing;

/// Failure reported by a [`MountProvider`]. `code` is the platform error code.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Error #{code}: {message}")]
pub struct MountError {
    pub code: u32,
    pub message: String,
}

impl MountError {
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// The password handed to the provider. Never shown by `Debug`, wiped from
/// memory on drop.
#[derive(Default)]
pub struct Password(Zeroizing<String>);

impl Password {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(Zeroizing::new(secret.into()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

impl From<&str> for Password {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Password {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Establishes and removes a single drive mapping.
///
/// Every failure is recoverable: callers keep going with the next pair.
pub trait MountProvider {
    /// Maps `remote` (already resolved, no tokens left) to `local`, e.g. `"Z:"`.
    fn connect(
        &mut self,
        local: &str,
        remote: &str,
        user_name: &str,
        password: &Password,
    ) -> Result<(), MountError>;

    /// Removes the mapping of `local`. With `force`, open files do not block it.
    fn disconnect(&mut self, local: &str, force: bool) -> Result<(), MountError>;
}

impl<P: MountProvider + ?Sized> MountProvider for Box<P> {
    fn connect(
        &mut self,
        local: &str,
        remote: &str,
        user_name: &str,
        password: &Password,
    ) -> Result<(), MountError> {
        (**self).connect(local, remote, user_name, password)
    }

    fn disconnect(&mut self, local: &str, force: bool) -> Result<(), MountError> {
        (**self).disconnect(local, force)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_debug_is_redacted() {
        let p = Password::new("hunter2");
        assert_eq!(format!("{p:?}"), "Password(***)");
        assert_eq!(p.expose(), "hunter2");
    }

    #[test]
    fn password_keeps_secret_from_owned_string() {
        let p = Password::from(String::from("hunter2"));
        assert_eq!(p.expose(), "hunter2");
        assert!(!p.is_empty());
        assert!(Password::default().is_empty());
    }

    #[test]
    fn mount_error_display_includes_code() {
        let e = MountError::new(53, "The network path was not found.");
        assert_eq!(e.to_string(), "Error #53: The network path was not found.");
    }
}
