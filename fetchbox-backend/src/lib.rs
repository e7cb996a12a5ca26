// #![warn(missing_docs)]
//! Traits and structs for fetchbox store interaction.
//!
//! If you want to plug in your own key-value server, you are in the right
//! place: implement [`Backend`] and the typed [`CacheBackend`] operations
//! come for free.
mod backend;
pub mod error;
pub mod format;
mod memory;

pub use backend::{Backend, BackendResult, CacheBackend};
pub use error::BackendError;
pub use format::{Format, FormatError, FormatExt, JsonFormat};
pub use memory::MemoryBackend;

/// Status of deleting result.
#[derive(Debug, PartialEq, Eq)]
pub enum DeleteStatus {
    /// Record successfully deleted.
    Deleted(u32),
    /// Record already missing.
    Missing,
}
