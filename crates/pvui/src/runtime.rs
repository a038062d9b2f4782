//! The widget driver: owns the root instance and translates inbound
//! transport operations into tree dispatch.
//!
//! Routes on the wire are absolute and root-first, beginning with the root
//! instance's own id. The driver strips that leading id before instance
//! level dispatch; events addressed to an unknown root are stale and fail,
//! while task and mouse deliveries are best effort and silently dropped.

use serde_json::Value;

use crate::component::{ComponentHandle, ComponentInstance};
use crate::error::{Result, WidgetError};
use crate::host::HostValue;
use crate::identity::{HandlerId, InstanceId, Route};

/// A single live widget: one top-level component and its instance tree.
///
/// The tree is built lazily; the first serialization initializes and
/// renders. One driver mutates the tree at a time, and a re-render
/// triggered by one operation completes before the next is dispatched.
pub struct WidgetRuntime {
    root: ComponentHandle,
}

impl WidgetRuntime {
    pub fn new(component: &HostValue, props: HostValue) -> Result<Self> {
        let root = ComponentInstance::new(component, props, Route::new())?;
        Ok(WidgetRuntime {
            root: ComponentHandle::new(root),
        })
    }

    pub fn root_id(&self) -> InstanceId {
        self.root.id()
    }

    #[cfg(test)]
    pub(crate) fn root(&self) -> &ComponentHandle {
        &self.root
    }

    /// Re-render from the top: reconcile a freshly described root against
    /// the live tree, preserving identity and state wherever the hook
    /// chains allow it. On failure the previous tree stays current.
    pub fn update(&mut self, component: &HostValue, props: HostValue) -> Result<()> {
        let mut fresh = ComponentInstance::new(component, props, Route::new())?;
        fresh.reconcile_from(&self.root.borrow())?;
        self.root = ComponentHandle::new(fresh);
        Ok(())
    }

    /// Serialize the tree for the remote view layer.
    pub fn to_json(&self) -> Result<Value> {
        let route: Route = [self.root.id()].into_iter().collect();
        self.root.borrow_mut().to_json(&route)
    }

    /// Dispatch a user event to the component addressed by `route` and
    /// return the action that bubbled out of the root, if any. Fails with
    /// [`WidgetError::InvalidHandler`] when the route or handler no longer
    /// exists; the transport should drop such messages.
    pub fn handle_event(
        &mut self,
        route: &[InstanceId],
        handler: HandlerId,
        args: &HostValue,
    ) -> Result<Option<HostValue>> {
        let Some(rest) = self.descend(route) else {
            return Err(WidgetError::InvalidHandler {
                route: Route::from_slice(route),
                handler,
            });
        };
        self.root.borrow_mut().handle_event(rest, handler, args)
    }

    /// Deliver a task completion. Best effort: completions that race a
    /// re-render and miss their target are logged and dropped.
    pub fn task_completed(&mut self, route: &[InstanceId]) {
        let Some(rest) = self.descend(route) else {
            log::warn!("task completion for retired root at route {route:?}");
            return;
        };
        match self.root.borrow_mut().handle_task_completed(rest) {
            Ok(()) => {}
            Err(err @ WidgetError::MissingTaskTarget { .. }) => log::warn!("{err}"),
            Err(err) => log::error!("task completion failed: {err}"),
        }
    }

    /// The pointer entered the component addressed by `route`.
    pub fn mouse_capture(&mut self, route: &[InstanceId]) {
        let Some(rest) = self.descend(route) else {
            return;
        };
        if let Err(err) = self.root.borrow_mut().handle_mouse_gain_capture(rest) {
            log::error!("mouse capture failed: {err}");
        }
    }

    /// The pointer left the component addressed by `route`.
    pub fn mouse_release(&mut self, route: &[InstanceId]) {
        let Some(rest) = self.descend(route) else {
            return;
        };
        if let Err(err) = self.root.borrow_mut().handle_mouse_lose_capture(rest) {
            log::error!("mouse release failed: {err}");
        }
    }

    /// Strip the leading root id from an absolute route.
    fn descend<'r>(&self, route: &'r [InstanceId]) -> Option<&'r [InstanceId]> {
        match route.split_first() {
            Some((&head, rest)) if head == self.root.id() => Some(rest),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests;
