//! Server-side virtual DOM engine for interactive prover widgets.
//!
//! A host scripting layer describes UIs declaratively; this crate turns
//! those descriptions into a live tree of component instances, reconciles
//! fresh descriptions against the prior tree so identity and local state
//! survive re-renders, serializes the result as JSON for a remote view
//! layer, and routes user events back through each component's hook chain.
//!
//! The engine is single-threaded and cooperative: one driver owns the tree,
//! host closures run synchronously, and asynchronous work lives behind the
//! injected [`TaskQueue`].

mod component;
mod error;
mod hooks;
mod host;
mod identity;
mod render;
mod runtime;
mod task;
mod vdom;

#[cfg(test)]
mod fixture;

pub use component::{ComponentHandle, ComponentInstance};
pub use error::{Result, WidgetError};
pub use hooks::CaptureState;
pub use host::{HostFn, HostValue, UNHASHABLE_SENTINEL};
pub use identity::{HandlerId, InstanceId, Route};
pub use runtime::WidgetRuntime;
pub use task::{install_task_queue, uninstall_task_queue, TaskQueue};
pub use vdom::{Vdom, VdomElement};
