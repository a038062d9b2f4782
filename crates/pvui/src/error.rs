use thiserror::Error;

use crate::identity::{HandlerId, Route};

/// Errors surfaced by the widget engine.
#[derive(Debug, Error)]
pub enum WidgetError {
    /// An event arrived for a route or handler id that is no longer part of
    /// the live tree. The transport should drop the message.
    #[error("stale event: no target for handler {handler} at route {route:?}")]
    InvalidHandler { route: Route, handler: HandlerId },

    /// A task completion was delivered for a route with no matching
    /// instance. Safe to discard; the task's owner was reconciled away.
    #[error("task completion for dangling route {route:?}")]
    MissingTaskTarget { route: Route },

    /// The pending-task sink was installed twice, or used before install.
    #[error("task queue {0}")]
    TaskQueueNotSet(&'static str),

    /// A host closure trapped. The message is the host's own diagnostic.
    #[error("host invocation failed: {0}")]
    HostInvocationFailure(String),

    /// A host value fell outside the documented variant set.
    #[error("malformed host value: {0}")]
    VariantUnreachable(&'static str),
}

pub type Result<T, E = WidgetError> = std::result::Result<T, E>;
