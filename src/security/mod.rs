//! Security checks that guard every write the wrapper engine makes.
//!
//! See [`fplaunch`] for the module overview, threat model, and public API.

mod authenticity;
mod fplaunch;
mod path_guard;

// The fplaunch.rs facade controls the entire public API surface.
pub use self::fplaunch::*;
