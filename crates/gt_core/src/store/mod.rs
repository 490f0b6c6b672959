//! Persistence layer.
//!
//! - [`json_log`]: the nine relational collection files, each a JSON
//!   array, rewritten atomically on every append batch.
//! - [`layout`]: the flat output tree (label files, reference lists,
//!   CAN bus logs) and frame numbering across resumed runs.
//!
//! Nothing above this layer touches the filesystem.

pub mod json_log;
pub mod layout;

pub use json_log::{Collection, JsonLog};
pub use layout::OutputLayout;
