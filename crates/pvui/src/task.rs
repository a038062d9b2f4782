//! Asynchronous task plumbing for `with_task` hooks.
//!
//! The engine never executes tasks. Hooks build a task value from their
//! props and hand it to the installed [`TaskQueue`] together with the
//! absolute route of the owning component instance; the queue runs the task
//! and is responsible for delivering `task_completed(route)` back through
//! the driver once `peek` would return a result. Until then the owning hook
//! polls `None` and the component renders its pending view.
//!
//! The queue is installed once per driver thread. Installing twice is a
//! fatal setup error, and so is spawning a task before any queue exists.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{Result, WidgetError};
use crate::host::HostValue;
use crate::identity::Route;

/// External executor for widget tasks.
pub trait TaskQueue {
    /// Accept a freshly built task. `route` addresses the component
    /// instance that owns it; deliver `task_completed(route)` to the driver
    /// when the task finishes. Delivery is best effort: the instance may
    /// have been reconciled away by then.
    fn submit(&self, task: &HostValue, route: &Route);

    /// Result of a completed task, or `None` while it is still running.
    fn peek(&self, task: &HostValue) -> Option<HostValue>;

    /// Cancel and release a task. Called when the owning hook is dropped;
    /// must tolerate tasks that already completed or were already disposed.
    fn fail_and_dispose(&self, task: &HostValue);
}

thread_local! {
    static TASK_QUEUE: RefCell<Option<Rc<dyn TaskQueue>>> = const { RefCell::new(None) };
}

/// Install the task queue for this driver thread.
pub fn install_task_queue(queue: Rc<dyn TaskQueue>) -> Result<()> {
    TASK_QUEUE.with(|slot| {
        let mut slot = slot.borrow_mut();
        if slot.is_some() {
            return Err(WidgetError::TaskQueueNotSet("already installed"));
        }
        *slot = Some(queue);
        Ok(())
    })
}

/// Remove the installed queue, for driver teardown. Tasks dropped after
/// this point are released without a cancellation callback.
pub fn uninstall_task_queue() {
    TASK_QUEUE.with(|slot| slot.borrow_mut().take());
}

pub(crate) fn task_queue() -> Result<Rc<dyn TaskQueue>> {
    TASK_QUEUE.with(|slot| {
        slot.borrow()
            .clone()
            .ok_or(WidgetError::TaskQueueNotSet("not installed"))
    })
}

/// A submitted task owned by a `with_task` hook. Dropping the last handle
/// cancels the task.
pub(crate) struct SpawnedTask {
    task: HostValue,
}

impl SpawnedTask {
    /// Build a task from `builder` applied to `props` and submit it.
    pub(crate) fn spawn(builder: &HostValue, props: &HostValue, route: &Route) -> Result<Self> {
        let task = builder.invoke(&[props.clone()])?;
        task_queue()?.submit(&task, route);
        Ok(SpawnedTask { task })
    }

    pub(crate) fn poll(&self) -> Result<Option<HostValue>> {
        Ok(task_queue()?.peek(&self.task))
    }
}

impl Drop for SpawnedTask {
    fn drop(&mut self) {
        // No queue during teardown means nothing left to cancel against.
        if let Ok(queue) = task_queue() {
            queue.fail_and_dispose(&self.task);
        }
    }
}
