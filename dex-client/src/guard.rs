//! Access guard for commands that need a session

use futures::future::{BoxFuture, FutureExt};
use tracing::debug;

use crate::session::SessionTracker;

/// Outcome of a guard check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Granted,
    RedirectToLogin,
}

/// Either known right away or pending a session probe
pub enum GuardDecision<'a> {
    Immediate(Access),
    Deferred(BoxFuture<'a, Access>),
}

impl GuardDecision<'_> {
    pub fn is_immediate(&self) -> bool {
        matches!(self, GuardDecision::Immediate(_))
    }

    /// Wait for the final answer
    pub async fn resolve(self) -> Access {
        match self {
            GuardDecision::Immediate(access) => access,
            GuardDecision::Deferred(pending) => pending.await,
        }
    }
}

/// Grant at once when the tracker already knows the session is valid,
/// otherwise defer to a probe
pub fn can_activate(session: &SessionTracker) -> GuardDecision<'_> {
    if session.is_authenticated() {
        return GuardDecision::Immediate(Access::Granted);
    }

    debug!("Session not confirmed, deferring to probe");
    GuardDecision::Deferred(
        async move {
            if session.probe().await {
                Access::Granted
            } else {
                Access::RedirectToLogin
            }
        }
        .boxed(),
    )
}
