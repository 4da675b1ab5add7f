//! Arr Settings Core Library
//!
//! Settings editor engine for the *arr dashboard, including:
//! - Form rendering from field tables (Form Renderer)
//! - Dirty-state tracking with suspension during saves (Dirty-State Tracker)
//! - Debounced connection probing (Connection Prober)
//! - Save and server reconciliation (Settings Persister)
//! - Instance editor navigation (Editor Navigator)
//!
//! This library is front-end independent: the backend, notification sink and
//! discard confirmation are injected through traits.

pub mod error;
pub mod schema;
pub mod services;
pub mod traits;
pub mod types;
pub mod utils;

#[cfg(test)]
mod test_utils;

// Re-export common types
pub use error::{CoreError, CoreResult};
pub use schema::FieldTable;
pub use services::ServiceContext;
pub use traits::{DiscardConfirmer, Notifier};
