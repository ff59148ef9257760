//! System layer: directory file codec, in-memory model, advisory locking and
//! the per-platform account command backends.

pub mod backend;
pub mod dirfile;
pub mod entry;
pub mod lock;
pub mod model;
pub mod platform;

pub use backend::{
    BsdBackend, CommandRunner, CommandStatus, LinuxBackend, PlatformBackend, SystemRunner,
    select_backend,
};
pub use dirfile::{CommentPolicy, DirectoryFile};
pub use entry::{AccountEntry, GroupEntry, Record, SYSTEM_ID_THRESHOLD};
pub use model::{DirectoryModel, DirectoryPaths};
pub use platform::Platform;

/// Login name of the invoking user, for display.
pub fn current_username() -> Option<String> {
    users::get_current_username().map(|n| n.to_string_lossy().into_owned())
}

/// Whether the process runs as root; account commands need it.
pub fn is_root() -> bool {
    users::get_current_uid() == 0
}
