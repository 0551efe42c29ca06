use windows::{
    Win32::Foundation::NO_ERROR,
    Win32::NetworkManagement::WNet::{
        NET_CONNECT_FLAGS, NETRESOURCEW, RESOURCE_CONNECTED, RESOURCETYPE_DISK,
        WNetAddConnection2W, WNetCancelConnection2W,
    },
    core::{PCWSTR, PWSTR},
};
use crate::{MountError, MountProvider, Password};

fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(Some(0)).collect()
}

fn to_mount_error(code: u32) -> MountError {
    let message = std::io::Error::from_raw_os_error(code as i32).to_string();
    MountError::new(code, message)
}

/// Maps network shares to drive letters through the Windows networking API.
///
/// The mappings are temporary: they are created with no connect flags, so
/// Windows does not restore them at the next logon.
#[derive(Debug, Default, Clone, Copy)]
pub struct WNetProvider;

impl MountProvider for WNetProvider {
    /// Connects `remote` to the local drive `local` using the given
    /// credential.
    ///
    /// This wraps `WNetAddConnection2W` for disk resources.
    ///
    /// # Errors
    ///
    /// Returns the raw Win32 error code, for example `85` when the drive
    /// letter is already in use or `1326` for a bad user name or password.
    fn connect(
        &mut self,
        local: &str,
        remote: &str,
        user_name: &str,
        password: &Password,
    ) -> Result<(), MountError> {
        let mut local_w = wide(local);
        let mut remote_w = wide(remote);
        let user_w = wide(user_name);
        let password_w = wide(password.expose());

        let resource = NETRESOURCEW {
            dwScope: RESOURCE_CONNECTED,
            dwType: RESOURCETYPE_DISK,
            lpLocalName: PWSTR(local_w.as_mut_ptr()),
            lpRemoteName: PWSTR(remote_w.as_mut_ptr()),
            ..Default::default()
        };

        let result = unsafe {
            WNetAddConnection2W(
                &resource,
                PCWSTR(password_w.as_ptr()),
                PCWSTR(user_w.as_ptr()),
                NET_CONNECT_FLAGS(0),
            )
        };

        if result != NO_ERROR {
            return Err(to_mount_error(result.0));
        }
        Ok(())
    }

    /// Cancels the mapping of `local` with `WNetCancelConnection2W`.
    fn disconnect(&mut self, local: &str, force: bool) -> Result<(), MountError> {
        let local_w = wide(local);
        let result = unsafe {
            WNetCancelConnection2W(PCWSTR(local_w.as_ptr()), NET_CONNECT_FLAGS(0), force)
        };

        if result != NO_ERROR {
            return Err(to_mount_error(result.0));
        }
        Ok(())
    }
}
