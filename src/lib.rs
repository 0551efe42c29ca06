//! Map network shares to drive letters for a limited time.
//!
//! A [`SessionManager`] maps a user's [`ConnectionSet`] through a
//! [`MountProvider`] and unmaps it again on request or once the set's
//! timeout has passed. Paths may contain `<NAME>` tokens, resolved by the
//! [`TokenSubstitutor`] right before mapping.

use thiserror::Error;

mod connection;
pub mod driver;
mod messages;
mod mount;
pub mod platform;
pub mod session;
pub mod settings;
mod substitution;

pub use connection::{
    ConnectionSet, DEFAULT_TIMEOUT_MINUTES, DRIVE_LETTERS, DrivePathPair, EditablePair,
    is_drive_letter,
};
pub use driver::run_until_idle;
pub use messages::{MessageLog, Report};
pub use mount::{MountError, MountProvider, Password};
pub use platform::SystemMountProvider;
pub use session::{ActivationPolicy, ConnectRequest, SessionManager, TickOutcome, WorkingSet};
pub use settings::{
    FileSettingsStore, MemorySettingsStore, PersistenceError, SettingsDocument, SettingsStore,
};
pub use substitution::{
    EnvVars, SubstitutionError, SubstitutionResult, TokenSubstitutor, VariableSource,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Please enter a user name")]
    MissingUserName,
    #[error("No password entered; confirm to proceed with an empty password")]
    EmptyPassword,
    #[error("Please disconnect '{user_name}' before connecting anew")]
    AlreadyActive { user_name: String },
}

impl SessionError {
    /// Missing or unconfirmed input.
    pub fn is_validation(&self) -> bool {
        matches!(self, SessionError::MissingUserName | SessionError::EmptyPassword)
    }
    /// The operation does not fit the current session state.
    pub fn is_state(&self) -> bool {
        matches!(self, SessionError::AlreadyActive { .. })
    }
}
