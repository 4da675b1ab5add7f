//! Collaborator abstraction trait definition

mod discard_confirmer;
mod notifier;

pub use discard_confirmer::DiscardConfirmer;
pub use notifier::Notifier;
