//! Offline resolution patcher for a fixed-viewport game installation.
//!
//! The engine computes a target viewport from a requested resolution, then
//! rewrites resolution constants in the native engine binaries, recenters UI
//! element coordinates in SJSON resource files, and installs a Lua mod that
//! repeats the same math at the scripting layer. Every touched file is
//! hashed and backed up first, so the whole operation is idempotent and
//! reversible via `restore`.

pub mod binary;
pub mod error;
pub mod luamod;
pub mod patch;
pub mod resource;
pub mod restore;
pub mod sjson;
pub mod store;
pub mod util;
pub mod viewport;

pub use error::{Error, Result};
