use std::{fs, path::Path};

/// Reports whether every bit of `required` is set in the permission bits of
/// `path`. Follows symlinks. Any stat failure yields `false`.
pub fn check_directory_permissions(path: impl AsRef<Path>, required: u32) -> bool {
    match fs::metadata(path) {
        Ok(meta) => permission_bits(&meta) & required == required,
        Err(_) => false,
    }
}

#[cfg(unix)]
fn permission_bits(meta: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o777
}

// No mode bits off Unix; approximate from the read-only flag.
#[cfg(not(unix))]
fn permission_bits(meta: &fs::Metadata) -> u32 {
    if meta.permissions().readonly() {
        0o555
    } else {
        0o777
    }
}
