//! Bounded power-state polling.
//!
//! The engine pushes no notifications, so state transitions are
//! observed by re-reading the VM until it reaches the target state.
//! Every wait carries a caller-supplied timeout; there is no unbounded
//! loop. The poll source sits behind a trait so tests can script state
//! sequences without an engine.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::engine::EngineClient;
use crate::error::{OvirtError, OvirtResult};
use crate::types::PowerState;
use crate::vm::VmManager;

/// Interval between state reads when the caller has no preference.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Anything that can report a VM's current power state.
#[async_trait]
pub trait PowerStateSource: Send + Sync {
    async fn power_state(&self, vm_id: &str) -> OvirtResult<PowerState>;
}

#[async_trait]
impl PowerStateSource for EngineClient {
    async fn power_state(&self, vm_id: &str) -> OvirtResult<PowerState> {
        VmManager::new(self).power_state(vm_id).await
    }
}

/// Poll `source` once per `poll_interval` until the VM reaches
/// `target`, or fail with a `Timeout` error once `timeout` has passed.
///
/// The first read happens one interval after the call, mirroring the
/// engine's own settling delay after a power action. A read error ends
/// the wait immediately — retry policy belongs to the caller.
pub async fn wait_for_state<S: PowerStateSource + ?Sized>(
    source: &S,
    vm_id: &str,
    target: PowerState,
    poll_interval: Duration,
    timeout: Duration,
) -> OvirtResult<()> {
    let deadline = Instant::now() + timeout;
    loop {
        tokio::time::sleep(poll_interval).await;
        let state = source.power_state(vm_id).await?;
        if state == target {
            log::debug!("VM {vm_id} reached {target:?}");
            return Ok(());
        }
        log::debug!("VM {vm_id} is {state:?}, waiting for {target:?}");
        if Instant::now() >= deadline {
            return Err(OvirtError::timeout(format!(
                "VM {vm_id} did not reach {target:?} within {}s; the power \
                 action may still complete on the engine — re-query the state",
                timeout.as_secs()
            )));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OvirtErrorKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio_test::{assert_err, assert_ok};

    /// Scripted state source: returns the scripted states in order,
    /// then repeats the last one forever.
    struct FakeSource {
        script: Mutex<Vec<PowerState>>,
        polls: AtomicUsize,
    }

    impl FakeSource {
        fn new(script: Vec<PowerState>) -> Self {
            Self { script: Mutex::new(script), polls: AtomicUsize::new(0) }
        }

        fn poll_count(&self) -> usize {
            self.polls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PowerStateSource for FakeSource {
        async fn power_state(&self, _vm_id: &str) -> OvirtResult<PowerState> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                Ok(script.remove(0))
            } else {
                Ok(script[0])
            }
        }
    }

    struct FailingSource;

    #[async_trait]
    impl PowerStateSource for FailingSource {
        async fn power_state(&self, _vm_id: &str) -> OvirtResult<PowerState> {
            Err(OvirtError::connection("engine went away"))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn returns_as_soon_as_target_is_reached() {
        let source = FakeSource::new(vec![
            PowerState::Down,
            PowerState::Other,
            PowerState::Up,
        ]);
        assert_ok!(
            wait_for_state(
                &source,
                "vm-1",
                PowerState::Up,
                Duration::from_secs(5),
                Duration::from_secs(60),
            )
            .await
        );
        assert_eq!(source.poll_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_with_bounded_poll_count() {
        let source = FakeSource::new(vec![PowerState::Down]);
        let err = assert_err!(
            wait_for_state(
                &source,
                "vm-1",
                PowerState::Up,
                Duration::from_secs(5),
                Duration::from_secs(30),
            )
            .await
        );
        assert_eq!(err.kind, OvirtErrorKind::Timeout);
        // 30 s / 5 s: polls at t = 5..30, never more than 6.
        assert_eq!(source.poll_count(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn read_error_ends_the_wait() {
        let err = assert_err!(
            wait_for_state(
                &FailingSource,
                "vm-1",
                PowerState::Up,
                Duration::from_secs(5),
                Duration::from_secs(30),
            )
            .await
        );
        assert_eq!(err.kind, OvirtErrorKind::Connection);
    }

    #[tokio::test(start_paused = true)]
    async fn already_settled_vm_confirms_on_first_poll() {
        let source = FakeSource::new(vec![PowerState::Down]);
        assert_ok!(
            wait_for_state(
                &source,
                "vm-1",
                PowerState::Down,
                Duration::from_secs(5),
                Duration::from_secs(30),
            )
            .await
        );
        assert_eq!(source.poll_count(), 1);
    }
}
