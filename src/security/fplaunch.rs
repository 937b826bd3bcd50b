//! # fplaunchwrapper Security Module
//!
//! Front door for auditing the checks that sit beneath every wrapper.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                 fplaunch.rs (you are here)                    │
//! │                 Public API facade & documentation             │
//! ├──────────────────────────────┬────────────────────────────────┤
//! │  path_guard.rs               │  authenticity.rs               │
//! │  Canonicalize, keep config   │  Header contract for files in  │
//! │  and bin dirs inside $HOME   │  the bin dir (never clobber)   │
//! └──────────────────────────────┴────────────────────────────────┘
//! ```
//!
//! Hardened system binary discovery lives in [`crate::resolver`] and uses
//! both halves of this module.
//!
//! ## Security Model
//!
//! 1. **Fail closed**: a path that cannot be resolved is treated as outside
//!    the home directory; a file whose header cannot be read is not a wrapper.
//!
//! 2. **Never clobber**: the generator, `remove`, and `cleanup` only touch
//!    files that pass [`is_wrapper`]. Symlinks never pass, even when they
//!    point at a genuine wrapper.
//!
//! 3. **No execution to inspect**: the header is parsed from at most
//!    [`HEADER_MAX_LINES`] lines / [`HEADER_MAX_BYTES`] bytes of text.
//!
//! ## Threat Model
//!
//! | Threat | Defense Layer |
//! |--------|--------------|
//! | `~/bin` symlinked to `/usr/local/bin` | [`ensure_contained`] before writes |
//! | `..` in configured directories | Lexical normalization + containment |
//! | Unrelated script named like an app | Marker + field check in [`is_wrapper`] |
//! | Symlink planted in the bin dir | Symlinks rejected outright |
//! | Shell metacharacters in an `ID=` | Strict `[A-Za-z0-9._-]+` charset |

// ── Path Containment ────────────────────────────────────────────────

pub use super::path_guard::{
    canonicalize, ensure_contained, normalize_lexically, validate_contained,
};

// ── Wrapper Authenticity ────────────────────────────────────────────

pub use super::authenticity::{
    FLATPAK_ID_COMMENT, HEADER_MAX_BYTES, HEADER_MAX_LINES, WRAPPER_MARKER, WrapperHeader,
    get_id, is_valid_app_id, is_wrapper, read_header,
};
