pub mod list_dir;
pub mod perms;

pub use list_dir::{list_directory, read_entries, DirectoryEntry, EntryKind};
pub use perms::check_directory_permissions;
