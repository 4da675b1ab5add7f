//! Editor engine service layer

mod collection_service;
mod connection_prober;
mod dirty_tracker;
mod editor_navigator;
mod form_renderer;
mod instance_service;
mod instance_switcher;
mod settings_cache;
mod settings_page;
mod settings_persister;

pub use collection_service::CollectionService;
pub use connection_prober::{ConnectionProber, ProbeTarget};
pub use dirty_tracker::{DirtyTracker, SuspendGuard};
pub use editor_navigator::EditorNavigator;
pub use form_renderer::{FormContainer, FormRenderer};
pub use instance_service::InstanceService;
pub use instance_switcher::{InstanceSwitcher, SwitchOutcome};
pub use settings_cache::SettingsCache;
pub use settings_page::SettingsPage;
pub use settings_persister::SettingsPersister;

use std::sync::Arc;

use arr_settings_api::SettingsBackend;

use crate::error::CoreError;
use crate::traits::Notifier;
use crate::types::{EditorConfig, Notification};

/// Service context - holds all dependencies
///
/// The front end creates this context and injects the backend and the
/// notification sink.
pub struct ServiceContext {
    /// Settings REST backend
    pub backend: Arc<dyn SettingsBackend>,
    /// Transient notification sink
    pub notifier: Arc<dyn Notifier>,
    /// Last known settings
    pub cache: SettingsCache,
    /// Timing and plausibility settings
    pub config: EditorConfig,
}

impl ServiceContext {
    /// Create a service context
    #[must_use]
    pub fn new(
        backend: Arc<dyn SettingsBackend>,
        notifier: Arc<dyn Notifier>,
        config: EditorConfig,
    ) -> Self {
        Self {
            backend,
            notifier,
            cache: SettingsCache::new(),
            config,
        }
    }

    /// Log a failure at the right level and show it to the user.
    pub fn report_error(&self, context: &str, err: &CoreError) {
        if err.is_expected() {
            log::warn!("{context}: {err}");
        } else {
            log::error!("{context}: {err}");
        }
        self.notifier.notify(Notification::error(err.user_message()));
    }
}
