//! Discard confirmation gate abstract Trait

use async_trait::async_trait;

use crate::types::EditorSession;

/// Asks the user whether unsaved edits may be thrown away.
///
/// Only consulted when the editor is dirty.
#[async_trait]
pub trait DiscardConfirmer: Send + Sync {
    /// Returns `true` to discard the edits of `session`.
    async fn confirm_discard(&self, session: &EditorSession) -> bool;
}
