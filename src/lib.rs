//! Path-confinement gate: validates untrusted relative paths against a base
//! directory and hands back the one absolute path callers may use.

pub mod access;
pub mod config;
pub mod errors;
pub mod logging;
pub mod policy;
pub mod resolver;
pub mod security;
pub mod server;

pub use errors::{GateError, GateResult};
pub use policy::{Mode, Policy, PolicyStore};
pub use resolver::{resolve, ResolvedPath};
