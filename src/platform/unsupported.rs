use crate::{MountError, MountProvider, Password};

/// `ERROR_NOT_SUPPORTED`, reported for every call on this platform.
pub const ERROR_NOT_SUPPORTED: u32 = 50;

/// Drive letters only exist on Windows. This provider rejects every request
/// so the rest of the session logic still runs and reports the failure.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedProvider;

impl MountProvider for UnsupportedProvider {
    fn connect(
        &mut self,
        local: &str,
        _remote: &str,
        _user_name: &str,
        _password: &Password,
    ) -> Result<(), MountError> {
        Err(MountError::new(
            ERROR_NOT_SUPPORTED,
            format!("mapping {local} is only supported on Windows"),
        ))
    }

    fn disconnect(&mut self, local: &str, _force: bool) -> Result<(), MountError> {
        Err(MountError::new(
            ERROR_NOT_SUPPORTED,
            format!("unmapping {local} is only supported on Windows"),
        ))
    }
}
