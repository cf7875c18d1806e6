use crate::{errors::GateResult, policy::PolicyStore};
use serde::Serialize;
use std::{fs, path::Path};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
    Other,
}

/// One entry of a listed directory.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    pub kind: EntryKind,
    /// Size in bytes, files only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// Resolves `raw` against the active policy and lists the resulting
/// directory. Filesystem failures come back as `GateError::Io` untouched.
pub fn list_directory(store: &PolicyStore, raw: &str) -> GateResult<Vec<DirectoryEntry>> {
    let resolved = store.resolve(raw)?;
    read_entries(&resolved)
}

/// Lists `dir` sorted by file name. No validation happens here.
pub fn read_entries(dir: &Path) -> GateResult<Vec<DirectoryEntry>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let kind = if file_type.is_symlink() {
            EntryKind::Symlink
        } else if file_type.is_dir() {
            EntryKind::Dir
        } else if file_type.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        };
        let size = match kind {
            EntryKind::File => Some(entry.metadata()?.len()),
            _ => None,
        };
        entries.push(DirectoryEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            kind,
            size,
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}
