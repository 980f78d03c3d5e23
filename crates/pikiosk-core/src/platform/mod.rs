//! Platform abstraction layer.
//!
//! All OS-specific behavior (XDG directories, permission bits, external
//! processes) lives here rather than being scattered through the engine.
//!
//! - `paths` - XDG menu, autostart and data directories; PATH lookup
//! - `permissions` - file mode handling (readable vs executable entries)
//! - `process` - timeout-bounded external commands

pub mod paths;
pub mod permissions;
pub mod process;

pub use paths::find_program;
pub use permissions::{is_executable, set_executable, set_mode};
pub use process::{run_attached, run_with_timeout, CommandOutput};

/// Returns true when the current process runs as root.
pub fn is_root() -> bool {
    #[cfg(unix)]
    {
        nix::unistd::geteuid().is_root()
    }

    #[cfg(not(unix))]
    {
        false
    }
}
