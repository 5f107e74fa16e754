//! Bounded execution of a session.
//!
//! The [`Supervisor`] runs a [`Session`] on a background task and waits for
//! its outcome under a deadline. When the deadline passes the session is
//! cancelled, given a short grace period to disconnect, and then aborted.
//! The caller always gets exactly one [`SessionOutcome`] back.
//!
//! [`Supervisor::locate_and_run`] puts locating the device under the same
//! deadline, so the whole command is bounded, not only the session.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::{Instant, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::dispatcher::Action;
use crate::error::{Error, Result};
use crate::session::{Session, SessionOutcome, SessionState};
use crate::traits::BulbTransport;

/// Default bound on a whole session.
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(10);

/// Default time a cancelled session gets to clean up before it is aborted.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

/// Configuration for a [`Supervisor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorConfig {
    /// Bound on the whole session, from connect to completion. When the
    /// device is located through [`Supervisor::locate_and_run`] the bound
    /// covers locating it too.
    pub timeout: Duration,
    /// Time a cancelled session gets before its task is aborted.
    pub shutdown_grace: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_SESSION_TIMEOUT,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

impl SupervisorConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the session bound.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the shutdown grace period.
    #[must_use]
    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Check that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(Error::InvalidConfig(
                "session timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Runs sessions under a watchdog.
#[derive(Debug, Clone, Default)]
pub struct Supervisor {
    config: SupervisorConfig,
}

impl Supervisor {
    pub fn new(config: SupervisorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Run `action` against `transport` and wait for the outcome.
    ///
    /// Returns [`SessionOutcome::TimedOut`] if the session does not finish
    /// within the configured bound, carrying the state it was stuck in. A
    /// session task that ends without reporting (for example by panicking)
    /// yields [`SessionOutcome::Failed`].
    #[tracing::instrument(skip(self, transport), fields(address = %transport.address()))]
    pub async fn run<T>(&self, transport: Arc<T>, action: Action) -> SessionOutcome
    where
        T: BulbTransport + ?Sized + 'static,
    {
        self.supervise(transport, action, self.config.timeout).await
    }

    /// Locate the device with `locate`, then run `action` against it.
    ///
    /// Both steps share the configured bound: the session gets whatever time
    /// locating left over. If locating does not finish in time the outcome is
    /// [`SessionOutcome::TimedOut`] in [`SessionState::Created`].
    #[tracing::instrument(skip_all, fields(action = %action))]
    pub async fn locate_and_run<T, F>(&self, locate: F, action: Action) -> SessionOutcome
    where
        T: BulbTransport + ?Sized + 'static,
        F: Future<Output = Result<Arc<T>>>,
    {
        let bound = self.config.timeout;
        let started = Instant::now();

        let transport = match timeout(bound, locate).await {
            Ok(Ok(transport)) => transport,
            Ok(Err(e)) => {
                warn!("Could not locate device: {}", e);
                return SessionOutcome::Failed(e);
            }
            Err(_) => {
                warn!("Device not located within {:?}", bound);
                return SessionOutcome::TimedOut {
                    after: bound,
                    last_state: SessionState::Created,
                };
            }
        };

        let remaining = bound.saturating_sub(started.elapsed());
        debug!("Device located, {:?} left for the session", remaining);
        match self.supervise(transport, action, remaining).await {
            SessionOutcome::TimedOut { last_state, .. } => SessionOutcome::TimedOut {
                after: bound,
                last_state,
            },
            outcome => outcome,
        }
    }

    async fn supervise<T>(&self, transport: Arc<T>, action: Action, bound: Duration) -> SessionOutcome
    where
        T: BulbTransport + ?Sized + 'static,
    {
        let session = Session::new(transport, action);
        let state = session.subscribe();
        let cancel = CancellationToken::new();
        let (gate, outcome) = oneshot::channel();

        let mut handle = tokio::spawn(session.run_gated(gate, cancel.clone()));

        match timeout(bound, outcome).await {
            Ok(Ok(outcome)) => {
                // The session disconnects after reporting
                match timeout(self.config.shutdown_grace, &mut handle).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => debug!("Session task ended abnormally after reporting: {}", e),
                    Err(_) => {
                        warn!("Disconnect did not finish within grace period, aborting");
                        handle.abort();
                    }
                }
                outcome
            }
            Ok(Err(_)) => {
                let reason = match handle.await {
                    Err(e) if e.is_panic() => "session task panicked".to_string(),
                    Err(e) => e.to_string(),
                    Ok(()) => "session was cancelled".to_string(),
                };
                error!("Session ended without an outcome: {}", reason);
                SessionOutcome::Failed(Error::SessionAborted { reason })
            }
            Err(_) => {
                let last_state = *state.borrow();
                warn!("Session timed out after {:?} while {}", bound, last_state);

                cancel.cancel();
                if timeout(self.config.shutdown_grace, &mut handle).await.is_err() {
                    warn!("Session did not stop within grace period, aborting");
                    handle.abort();
                }

                SessionOutcome::TimedOut {
                    after: bound,
                    last_state,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBulb;
    use hue_types::uuids;

    #[test]
    fn test_config_defaults() {
        let config = SupervisorConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert!(config.validate().is_ok());
        assert!(config.timeout(Duration::ZERO).validate().is_err());
    }

    #[tokio::test]
    async fn test_completed_outcome_is_returned() {
        let bulb = Arc::new(MockBulb::standard_hue().with_switch(true).build());
        let outcome = Supervisor::default().run(bulb, Action::Toggle).await;
        assert!(outcome.is_completed());
        assert_eq!(outcome.exit_code(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_discovery_times_out() {
        let bulb = Arc::new(MockBulb::standard_hue().hang_discovery().build());
        let supervisor = Supervisor::new(SupervisorConfig::new().timeout(Duration::from_secs(3)));

        let started = tokio::time::Instant::now();
        let outcome = supervisor.run(bulb.clone(), Action::Toggle).await;

        match outcome {
            SessionOutcome::TimedOut { after, last_state } => {
                assert_eq!(after, Duration::from_secs(3));
                assert_eq!(last_state, SessionState::ServicesResolving);
            }
            other => panic!("expected timeout, got {:?}", other),
        }
        assert!(started.elapsed() < Duration::from_secs(4));
        assert_eq!(bulb.io_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_session_times_out_mid_action() {
        let bulb = Arc::new(
            MockBulb::standard_hue()
                .latency(Duration::from_secs(1))
                .build(),
        );
        // connect, discovery and the model read finish at 3s, the switch read at 4s
        let supervisor =
            Supervisor::new(SupervisorConfig::new().timeout(Duration::from_millis(4500)));

        let outcome = supervisor.run(bulb, Action::Toggle).await;
        match outcome {
            SessionOutcome::TimedOut { last_state, .. } => {
                assert_eq!(last_state, SessionState::ActionExecuting);
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_disconnect_does_not_hide_completion() {
        let bulb = Arc::new(
            MockBulb::standard_hue()
                .with_switch(false)
                .hang_disconnect()
                .build(),
        );
        let supervisor = Supervisor::new(SupervisorConfig::new().timeout(Duration::from_secs(3)));

        let started = tokio::time::Instant::now();
        let outcome = supervisor.run(bulb.clone(), Action::Toggle).await;

        assert!(outcome.is_completed(), "{:?}", outcome);
        assert_eq!(bulb.writes().await, vec![(uuids::LIGHT_SWITCH, vec![0x01])]);
        assert_eq!(bulb.disconnect_count(), 1);
        // Released after the grace period, well inside the bound
        assert!(started.elapsed() <= DEFAULT_SHUTDOWN_GRACE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_locate_shares_the_bound() {
        let bulb = Arc::new(MockBulb::standard_hue().hang_discovery().build());
        let supervisor = Supervisor::new(SupervisorConfig::new().timeout(Duration::from_secs(5)));

        let started = tokio::time::Instant::now();
        let locate = async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Ok(bulb.clone())
        };
        let outcome = supervisor.locate_and_run(locate, Action::Toggle).await;

        match outcome {
            SessionOutcome::TimedOut { after, last_state } => {
                assert_eq!(after, Duration::from_secs(5));
                assert_eq!(last_state, SessionState::ServicesResolving);
            }
            other => panic!("expected timeout, got {:?}", other),
        }
        assert!(started.elapsed() >= Duration::from_secs(5));
        assert!(started.elapsed() < Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_locate_times_out() {
        let supervisor = Supervisor::new(SupervisorConfig::new().timeout(Duration::from_secs(5)));
        let locate = std::future::pending::<Result<Arc<MockBulb>>>();

        let started = tokio::time::Instant::now();
        let outcome = supervisor.locate_and_run(locate, Action::Toggle).await;

        assert!(matches!(
            outcome,
            SessionOutcome::TimedOut {
                last_state: SessionState::Created,
                ..
            }
        ));
        assert_eq!(outcome.exit_code(), 1);
        assert!(started.elapsed() >= Duration::from_secs(5));
        assert!(started.elapsed() < Duration::from_secs(6));
    }

    #[tokio::test]
    async fn test_locate_failure_is_reported() {
        let supervisor = Supervisor::default();
        let locate = async {
            Err::<Arc<MockBulb>, _>(Error::DeviceNotFound {
                address: "AA:BB:CC:DD:EE:FF".to_string(),
                duration: Duration::from_secs(5),
            })
        };
        let outcome = supervisor.locate_and_run(locate, Action::Toggle).await;
        assert!(matches!(
            outcome,
            SessionOutcome::Failed(Error::DeviceNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_locate_and_run_completes() {
        let bulb = Arc::new(MockBulb::standard_hue().with_switch(true).build());
        let locate = async { Ok(bulb.clone()) };
        let outcome = Supervisor::default().locate_and_run(locate, Action::Toggle).await;
        assert!(outcome.is_completed());
        assert_eq!(bulb.writes().await, vec![(uuids::LIGHT_SWITCH, vec![0x00])]);
    }
}
