//! Path policy: the base directory, validation mode and whitelist pattern
//! that every resolution is checked against.

use crate::errors::{GateError, GateResult};
use crate::resolver::{self, ResolvedPath};
use parking_lot::RwLock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Selects which whitelist pattern governs acceptable raw-path syntax.
/// Word characters in the patterns are ASCII only.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Word/hyphen directory segments, optionally ending in a dotted file name.
    Strict,
    /// Leading `./` segments allowed; climbing above the start is rejected.
    AllowRelative,
    /// Word characters, hyphens and slashes.
    #[default]
    Default,
}

impl Mode {
    pub fn default_pattern(self) -> &'static str {
        match self {
            Mode::Strict => r"^([A-Za-z0-9_-]+/)*([A-Za-z0-9_.]+)?$",
            Mode::AllowRelative => r"^(?:\.+/)*[A-Za-z0-9_/-]+$",
            Mode::Default => r"^[A-Za-z0-9_/-]+$",
        }
    }

    /// Name as written in configuration files.
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Strict => "strict",
            Mode::AllowRelative => "allow_relative",
            Mode::Default => "default",
        }
    }
}

/// Compiles a whitelist pattern, rejecting empty input.
pub fn compile_pattern(pattern: &str) -> GateResult<Regex> {
    if pattern.is_empty() {
        return Err(GateError::InvalidPattern {
            reason: "pattern must not be empty".into(),
        });
    }
    Regex::new(pattern).map_err(|e| GateError::InvalidPattern {
        reason: e.to_string(),
    })
}

/// An immutable resolution policy. Build one, then share it through a
/// [`PolicyStore`] or pass it straight to [`resolver::resolve`].
#[derive(Debug, Clone)]
pub struct Policy {
    base_dir: PathBuf,
    mode: Mode,
    whitelist: Regex,
    enforce_whitelist: bool,
    check_symlinks: bool,
}

impl Policy {
    /// Policy rooted at `base_dir` in [`Mode::Default`].
    ///
    /// Relative bases are taken against the current working directory. The
    /// stored base is always absolute and lexically clean.
    pub fn new(base_dir: impl AsRef<Path>) -> GateResult<Self> {
        let base_dir = absolutize(base_dir.as_ref())?;
        let mode = Mode::Default;
        Ok(Self {
            base_dir,
            mode,
            whitelist: compile_pattern(mode.default_pattern())?,
            enforce_whitelist: false,
            check_symlinks: false,
        })
    }

    /// Policy rooted at the root of the current filesystem.
    pub fn filesystem_root() -> GateResult<Self> {
        Self::new(std::path::MAIN_SEPARATOR_STR)
    }

    /// Switches mode and installs that mode's default pattern.
    pub fn with_mode(mut self, mode: Mode) -> GateResult<Self> {
        self.whitelist = compile_pattern(mode.default_pattern())?;
        self.mode = mode;
        Ok(self)
    }

    /// Overrides the whitelist pattern without touching the mode.
    pub fn with_whitelist_pattern(mut self, pattern: &str) -> GateResult<Self> {
        self.whitelist = compile_pattern(pattern)?;
        Ok(self)
    }

    pub fn enforce_whitelist(mut self, enforce: bool) -> Self {
        self.enforce_whitelist = enforce;
        self
    }

    pub fn check_symlinks(mut self, check: bool) -> Self {
        self.check_symlinks = check;
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn whitelist(&self) -> &Regex {
        &self.whitelist
    }

    pub fn enforces_whitelist(&self) -> bool {
        self.enforce_whitelist
    }

    pub fn checks_symlinks(&self) -> bool {
        self.check_symlinks
    }

    pub fn is_whitelisted(&self, raw: &str) -> bool {
        self.whitelist.is_match(raw)
    }

    pub fn resolve(&self, raw: &str) -> GateResult<ResolvedPath> {
        resolver::resolve(self, raw)
    }
}

fn absolutize(base: &Path) -> GateResult<PathBuf> {
    if base.is_absolute() {
        return Ok(resolver::clean(base));
    }
    let cwd = std::env::current_dir().map_err(|source| GateError::Initialization {
        path: base.to_path_buf(),
        source,
    })?;
    Ok(resolver::clean(&cwd.join(base)))
}

/// Shared holder for the active [`Policy`].
///
/// Readers take an `Arc` snapshot and resolve outside the lock. Writers
/// build the replacement first and swap it in, so a failed update leaves
/// the previous policy in place.
#[derive(Debug)]
pub struct PolicyStore {
    current: RwLock<Arc<Policy>>,
}

impl PolicyStore {
    pub fn new(policy: Policy) -> Self {
        info!(
            base_dir = %policy.base_dir.display(),
            mode = policy.mode.as_str(),
            pattern = policy.whitelist.as_str(),
            "policy installed"
        );
        Self {
            current: RwLock::new(Arc::new(policy)),
        }
    }

    pub fn snapshot(&self) -> Arc<Policy> {
        self.current.read().clone()
    }

    /// Replaces the whole policy with a fresh [`Policy::new`] for `base_dir`.
    pub fn initialize(&self, base_dir: impl AsRef<Path>) -> GateResult<()> {
        self.replace(Policy::new(base_dir)?);
        Ok(())
    }

    pub fn replace(&self, policy: Policy) {
        info!(
            base_dir = %policy.base_dir.display(),
            mode = policy.mode.as_str(),
            pattern = policy.whitelist.as_str(),
            "policy replaced"
        );
        *self.current.write() = Arc::new(policy);
    }

    pub fn set_mode(&self, mode: Mode) -> GateResult<()> {
        let whitelist = compile_pattern(mode.default_pattern())?;
        let mut guard = self.current.write();
        let mut next = Policy::clone(&guard);
        next.mode = mode;
        next.whitelist = whitelist;
        *guard = Arc::new(next);
        info!(mode = mode.as_str(), "policy mode changed");
        Ok(())
    }

    /// Replaces the active whitelist pattern. On error the previous pattern
    /// stays active.
    pub fn set_whitelist_pattern(&self, pattern: &str) -> GateResult<()> {
        let whitelist = compile_pattern(pattern)?;
        let mut guard = self.current.write();
        let mut next = Policy::clone(&guard);
        next.whitelist = whitelist;
        *guard = Arc::new(next);
        info!(pattern, "whitelist pattern replaced");
        Ok(())
    }

    pub fn resolve(&self, raw: &str) -> GateResult<ResolvedPath> {
        resolver::resolve(&self.snapshot(), raw)
    }
}
