//! Sanitize-and-resolve: turns an untrusted relative path into an absolute
//! path confined to the policy's base directory.
//!
//! Two layers guard the boundary. Syntactic filters (absolute markers, the
//! relative-mode traversal walk, the optional whitelist) run on the raw
//! string. The containment check then runs on the joined, lexically
//! cleaned path and is the one that decides.

use crate::errors::{GateError, GateResult};
use crate::policy::{Mode, Policy};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::ops::Deref;
use std::path::{Component, Path, PathBuf};

/// An absolute path proven to sit inside the base directory of the policy
/// that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ResolvedPath(PathBuf);

impl ResolvedPath {
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }
}

impl Deref for ResolvedPath {
    type Target = Path;

    fn deref(&self) -> &Path {
        &self.0
    }
}

impl AsRef<Path> for ResolvedPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for ResolvedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

pub fn resolve(policy: &Policy, raw: &str) -> GateResult<ResolvedPath> {
    if raw.is_empty() {
        return Err(GateError::EmptyPath);
    }
    if has_absolute_marker(raw) {
        return Err(GateError::AbsolutePathRejected);
    }
    if policy.mode() == Mode::AllowRelative && climbs_above_start(raw) {
        return Err(GateError::TraversalDetected);
    }
    if policy.enforces_whitelist() && !policy.is_whitelisted(raw) {
        return Err(GateError::PatternMismatch);
    }

    let base = policy.base_dir();
    let cleaned = clean(&base.join(raw));
    if !is_contained(base, &cleaned) {
        return Err(GateError::PathEscape);
    }
    if policy.checks_symlinks() {
        check_symlinks(base, &cleaned)?;
    }
    Ok(ResolvedPath(cleaned))
}

/// Leading `/` or `\`, a drive prefix like `C:`, or anything the platform
/// considers rooted.
pub fn has_absolute_marker(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    if raw.starts_with('/') || raw.starts_with('\\') {
        return true;
    }
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        return true;
    }
    let path = Path::new(raw);
    path.is_absolute() || path.has_root()
}

/// Walks the raw segments and reports whether a `..` ever steps above the
/// point where the path started. `./a/../b` stays level, `a/../../b` does not.
pub fn climbs_above_start(raw: &str) -> bool {
    let mut depth: usize = 0;
    for segment in raw.split(|c| c == '/' || c == '\\') {
        match segment {
            "" | "." => {}
            ".." => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return true,
            },
            _ => depth += 1,
        }
    }
    false
}

/// Lexical normalization. Resolves `.` and `..`, collapses separators and
/// keeps `..` at the root pinned to the root. Never touches the filesystem.
pub fn clean(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last().copied() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                Some(Component::ParentDir) | Some(Component::CurDir) | None => out.push(component),
            },
            other => out.push(other),
        }
    }
    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.into_iter().collect()
}

/// Relative path from `base` to `target`, both absolute. `None` when they
/// live under different roots (e.g. different drives).
pub fn relative_to(base: &Path, target: &Path) -> Option<PathBuf> {
    let base: Vec<Component<'_>> = base.components().collect();
    let target: Vec<Component<'_>> = target.components().collect();

    let common = base
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count();
    if common == 0 && !(base.is_empty() && target.is_empty()) {
        return None;
    }

    let mut rel = PathBuf::new();
    for _ in common..base.len() {
        rel.push(Component::ParentDir);
    }
    for component in &target[common..] {
        rel.push(component);
    }
    if rel.as_os_str().is_empty() {
        rel.push(Component::CurDir);
    }
    Some(rel)
}

/// Containment check: the relative form of `target` against `base` must not
/// contain a parent reference.
pub fn is_contained(base: &Path, target: &Path) -> bool {
    match relative_to(base, target) {
        Some(rel) => !rel.components().any(|c| c == Component::ParentDir),
        None => false,
    }
}

fn check_symlinks(base: &Path, resolved: &Path) -> GateResult<()> {
    let canonical_base = dunce::canonicalize(base)?;

    let mut probe = resolved;
    loop {
        match fs::symlink_metadata(probe) {
            Ok(meta) => {
                if meta.file_type().is_symlink() && !probe.exists() {
                    return Err(GateError::SymlinkEscape(resolved.to_path_buf()));
                }
                break;
            }
            Err(_) => match probe.parent() {
                Some(parent) => probe = parent,
                None => return Ok(()),
            },
        }
    }

    let canonical = dunce::canonicalize(probe)?;
    if canonical.starts_with(&canonical_base) {
        Ok(())
    } else {
        Err(GateError::SymlinkEscape(resolved.to_path_buf()))
    }
}
