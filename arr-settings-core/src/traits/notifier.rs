//! Transient notification abstract Trait

use crate::types::Notification;

/// Notification sink Trait
///
/// Front-end implementation:
/// - CLI: prints to the terminal
/// - Tests: records every message
pub trait Notifier: Send + Sync {
    /// Show a transient message.
    fn notify(&self, notification: Notification);
}
