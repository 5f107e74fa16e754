//! Connection session state machine.
//!
//! A [`Session`] drives one action against one device through the lifecycle
//!
//! ```text
//! Created -> Connecting -> ServicesResolving -> Ready -> ActionExecuting -> Completed
//! ```
//!
//! The [`Registry`] and [`GamutContext`] are built on the way to `Ready`, so
//! the model number is read once per session whatever the action.
//!
//! Any non-terminal state may also move to `Failed` or `TimedOut`. Terminal
//! states are final and nothing is retried. The current state is published on
//! a [`watch`] channel, and the outcome is delivered exactly once through a
//! [`oneshot`] gate when the session runs under a supervisor.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dispatcher::{Action, ActionReport, Dispatcher};
use crate::error::{Error, Result};
use crate::registry::{GamutContext, Registry};
use crate::traits::BulbTransport;

/// Lifecycle state of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Created,
    Connecting,
    ServicesResolving,
    Ready,
    ActionExecuting,
    Completed,
    Failed,
    TimedOut,
}

impl SessionState {
    /// Whether this state ends the session.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Failed | SessionState::TimedOut
        )
    }

    /// Whether the state machine allows moving from `self` to `next`.
    ///
    /// # Examples
    ///
    /// ```
    /// use hue_core::SessionState;
    ///
    /// assert!(SessionState::Created.can_transition_to(SessionState::Connecting));
    /// assert!(SessionState::Ready.can_transition_to(SessionState::TimedOut));
    /// assert!(!SessionState::Completed.can_transition_to(SessionState::Failed));
    /// ```
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        use SessionState::*;

        if self.is_terminal() {
            return false;
        }
        matches!(
            (*self, next),
            (Created, Connecting)
                | (Connecting, ServicesResolving)
                | (ServicesResolving, Ready)
                | (Ready, ActionExecuting)
                | (ActionExecuting, Completed)
                | (_, Failed)
                | (_, TimedOut)
        )
    }

    /// Whether the link to the device may be up in this state.
    fn is_linked(&self) -> bool {
        matches!(
            self,
            SessionState::ServicesResolving | SessionState::Ready | SessionState::ActionExecuting
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Created => "waiting to connect",
            SessionState::Connecting => "connecting",
            SessionState::ServicesResolving => "resolving services",
            SessionState::Ready => "ready",
            SessionState::ActionExecuting => "executing action",
            SessionState::Completed => "completed",
            SessionState::Failed => "failed",
            SessionState::TimedOut => "timed out",
        };
        write!(f, "{}", s)
    }
}

/// Terminal result of a session.
#[derive(Debug)]
pub enum SessionOutcome {
    /// The action ran to completion.
    Completed(ActionReport),
    /// The session ended with an error.
    Failed(Error),
    /// The session did not finish within its time bound.
    TimedOut {
        /// The bound that expired.
        after: Duration,
        /// The state the session was in when the bound expired.
        last_state: SessionState,
    },
}

impl SessionOutcome {
    /// Process exit code for this outcome.
    ///
    /// `0` on completion, `2` for usage errors (unknown action or bad
    /// arguments), `1` for everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            SessionOutcome::Completed(_) => 0,
            SessionOutcome::Failed(e) if e.is_usage_error() => 2,
            SessionOutcome::Failed(_) | SessionOutcome::TimedOut { .. } => 1,
        }
    }

    /// Whether the action completed.
    pub fn is_completed(&self) -> bool {
        matches!(self, SessionOutcome::Completed(_))
    }

    /// The terminal [`SessionState`] matching this outcome.
    pub fn state(&self) -> SessionState {
        match self {
            SessionOutcome::Completed(_) => SessionState::Completed,
            SessionOutcome::Failed(_) => SessionState::Failed,
            SessionOutcome::TimedOut { .. } => SessionState::TimedOut,
        }
    }
}

impl fmt::Display for SessionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionOutcome::Completed(report) => write!(f, "{}", report),
            SessionOutcome::Failed(e) => write!(f, "{}", e),
            SessionOutcome::TimedOut { after, last_state } => write!(
                f,
                "Timed out after {:?} while {}",
                after, last_state
            ),
        }
    }
}

/// One connect, discover, execute cycle against a single device.
pub struct Session<T: BulbTransport + ?Sized> {
    transport: Arc<T>,
    action: Action,
    state: watch::Sender<SessionState>,
}

impl<T: BulbTransport + ?Sized> fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("address", &self.transport.address())
            .field("action", &self.action)
            .field("state", &*self.state.borrow())
            .finish()
    }
}

impl<T: BulbTransport + ?Sized> Session<T> {
    /// Create a session in the `Created` state.
    pub fn new(transport: Arc<T>, action: Action) -> Self {
        let (state, _) = watch::channel(SessionState::Created);
        Self {
            transport,
            action,
            state,
        }
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// The current state.
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    fn transition(&self, next: SessionState) -> Result<()> {
        let from = self.state();
        if !from.can_transition_to(next) {
            return Err(Error::InvalidTransition { from, to: next });
        }
        debug!("Session {} -> {}", from, next);
        self.state.send_replace(next);
        Ok(())
    }

    /// Run the session to a terminal state.
    ///
    /// The terminal state is published first, then the session disconnects
    /// from the device, best effort.
    #[tracing::instrument(skip(self), fields(address = %self.transport.address(), action = %self.action))]
    pub async fn run(self) -> SessionOutcome {
        let result = self.drive().await;
        let linked = self.state().is_linked();
        let outcome = self.conclude(result);
        if linked {
            self.disconnect().await;
        }
        outcome
    }

    /// Run the session and deliver its outcome through `gate`.
    ///
    /// The outcome is sent as soon as the action ends, before the best-effort
    /// disconnect, so a stalled disconnect cannot hold the caller. If
    /// `cancel` fires first the session stops where it is, moves to
    /// `TimedOut`, and drops the gate without sending.
    #[tracing::instrument(skip_all, fields(address = %self.transport.address(), action = %self.action))]
    pub async fn run_gated(self, gate: oneshot::Sender<SessionOutcome>, cancel: CancellationToken) {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = self.drive() => Some(result),
        };

        match result {
            Some(result) => {
                let linked = self.state().is_linked();
                let outcome = self.conclude(result);
                if gate.send(outcome).is_err() {
                    debug!("Session outcome receiver dropped");
                }
                if linked {
                    self.disconnect().await;
                }
            }
            None => {
                let last_state = self.state();
                warn!("Session cancelled while {}", last_state);
                if let Err(e) = self.transition(SessionState::TimedOut) {
                    debug!("{}", e);
                }
                if last_state.is_linked() {
                    self.disconnect().await;
                }
            }
        }
    }

    async fn drive(&self) -> Result<ActionReport> {
        let address = self.transport.address().to_string();

        self.transition(SessionState::Connecting)?;
        self.transport
            .connect()
            .await
            .map_err(|e| into_connection_failed(&address, e))?;
        info!("Connected to {}", address);

        self.transition(SessionState::ServicesResolving)?;
        let services = self
            .transport
            .discover_services()
            .await
            .map_err(|e| into_connection_failed(&address, e))?;
        let registry = Registry::from_services(&services);
        let gamut = GamutContext::load(&*self.transport, &registry).await;
        debug!(
            "Resolved {} services, {} roles bound, {}",
            services.len(),
            registry.len(),
            gamut
        );

        self.transition(SessionState::Ready)?;
        self.transition(SessionState::ActionExecuting)?;
        Dispatcher::new(&*self.transport, &registry, &gamut, &services)
            .execute(&self.action)
            .await
    }

    /// Turn the result of the action into an outcome and publish its state.
    fn conclude(&self, result: Result<ActionReport>) -> SessionOutcome {
        let outcome = match result {
            Ok(report) => SessionOutcome::Completed(report),
            Err(e) => {
                warn!("Session failed: {}", e);
                SessionOutcome::Failed(e)
            }
        };

        if let Err(e) = self.transition(outcome.state()) {
            warn!("{}", e);
        }
        outcome
    }

    async fn disconnect(&self) {
        if let Err(e) = self.transport.disconnect().await {
            warn!("Failed to disconnect: {}", e);
        }
    }
}

fn into_connection_failed(address: &str, err: Error) -> Error {
    match err {
        Error::ConnectionFailed { .. } => err,
        other => Error::connection_failed(address, other.to_string()),
    }
}
