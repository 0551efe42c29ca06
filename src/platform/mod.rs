cfg_if::cfg_if! {
    if #[cfg(target_os = "windows")] {
        mod windows;
        pub use windows::WNetProvider;
        /// The provider backed by the operating system.
        pub type SystemMountProvider = WNetProvider;
    } else {
        mod unsupported;
        pub use unsupported::{ERROR_NOT_SUPPORTED, UnsupportedProvider};
        /// The provider backed by the operating system.
        pub type SystemMountProvider = UnsupportedProvider;
    }
}
