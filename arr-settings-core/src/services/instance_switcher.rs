//! Active instance selection
//!
//! Switching the active instance fetches its status. When the user switches
//! again before that answer arrives, the older answer is dropped.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arr_settings_api::AppType;

use crate::error::{CoreError, CoreResult};
use crate::services::{ConnectionProber, ProbeTarget, ServiceContext};
use crate::types::{ConnectionStatus, EntityKey};
use crate::utils::request_token::RequestSequence;

/// Result of one switch request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// This was still the latest switch; its status applies.
    Applied(ConnectionStatus),
    /// A newer switch started while this one was in flight.
    Stale,
}

/// Tracks which instance of an app is active.
pub struct InstanceSwitcher {
    ctx: Arc<ServiceContext>,
    prober: ConnectionProber,
    sequence: RequestSequence,
    active: Mutex<Option<(AppType, usize)>>,
}

impl InstanceSwitcher {
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>, prober: ConnectionProber) -> Self {
        Self {
            ctx,
            prober,
            sequence: RequestSequence::new(),
            active: Mutex::new(None),
        }
    }

    fn active_slot(&self) -> MutexGuard<'_, Option<(AppType, usize)>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Currently active instance.
    #[must_use]
    pub fn active(&self) -> Option<(AppType, usize)> {
        *self.active_slot()
    }

    /// Make instance `index` of `app` active and fetch its status.
    pub async fn switch_to(&self, app: AppType, index: usize) -> CoreResult<SwitchOutcome> {
        self.ctx
            .cache
            .ensure_loaded(self.ctx.backend.as_ref())
            .await?;
        let settings = self.ctx.cache.app_settings(app).await?;
        let instance = settings
            .instance(index)
            .ok_or(CoreError::InstanceNotFound { app, index })?;
        // A failed lookup leaves the current selection in charge
        let token = self.sequence.begin();
        *self.active_slot() = Some((app, index));

        let key = EntityKey::instance(app, Some(index));
        let status = self
            .prober
            .probe_now(key, &ProbeTarget::from_instance(app, instance, Some(index)))
            .await;

        if self.sequence.is_current(token) {
            Ok(SwitchOutcome::Applied(status))
        } else {
            log::debug!("Discarding status of {key}: superseded by a newer switch");
            Ok(SwitchOutcome::Stale)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{GOOD_KEY, create_test_context, sonarr_fixture};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn slow_answer_for_old_selection_is_discarded() {
        let (ctx, backend, _) = create_test_context();
        backend.replace_settings(sonarr_fixture()).await;
        backend.set_probe_delay(GOOD_KEY, Duration::from_secs(3)).await;
        let prober = ConnectionProber::new(ctx.backend.clone(), &ctx.config);
        let switcher = InstanceSwitcher::new(ctx, prober);

        let slow = switcher.switch_to(AppType::Sonarr, 0);
        let fast = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            switcher.switch_to(AppType::Sonarr, 2).await
        };
        let (slow, fast) = tokio::join!(slow, fast);

        assert_eq!(slow.unwrap(), SwitchOutcome::Stale);
        assert!(matches!(
            fast.unwrap(),
            SwitchOutcome::Applied(ConnectionStatus::Error { .. })
        ));
        assert_eq!(switcher.active(), Some((AppType::Sonarr, 2)));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_switch_does_not_supersede_pending_one() {
        let (ctx, backend, _) = create_test_context();
        backend.replace_settings(sonarr_fixture()).await;
        backend.set_probe_delay(GOOD_KEY, Duration::from_secs(3)).await;
        let prober = ConnectionProber::new(ctx.backend.clone(), &ctx.config);
        let switcher = InstanceSwitcher::new(ctx, prober);

        let slow = switcher.switch_to(AppType::Sonarr, 0);
        let missing = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            switcher.switch_to(AppType::Sonarr, 9).await
        };
        let (slow, missing) = tokio::join!(slow, missing);

        assert!(matches!(
            missing,
            Err(CoreError::InstanceNotFound { index: 9, .. })
        ));
        assert!(matches!(slow.unwrap(), SwitchOutcome::Applied(s) if s.is_connected()));
        assert_eq!(switcher.active(), Some((AppType::Sonarr, 0)));
    }

    #[tokio::test]
    async fn single_switch_applies() {
        let (ctx, backend, _) = create_test_context();
        backend.replace_settings(sonarr_fixture()).await;
        let prober = ConnectionProber::new(ctx.backend.clone(), &ctx.config);
        let switcher = InstanceSwitcher::new(ctx, prober);

        let outcome = switcher.switch_to(AppType::Sonarr, 1).await.unwrap();
        assert!(matches!(outcome, SwitchOutcome::Applied(s) if s.is_connected()));
        assert!(switcher.switch_to(AppType::Sonarr, 9).await.is_err());
        assert_eq!(switcher.active(), Some((AppType::Sonarr, 1)));
    }
}
