//! Identity types for components and event handlers.
//!
//! Routes and ids are the addressing scheme shared with the remote view
//! layer, so they are deliberately separate from the tree implementation.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use smallvec::SmallVec;

/// Process-unique id of an installed event handler.
///
/// Ids are drawn from a monotonic counter and never reused within a process
/// lifetime, so a stale id can always be distinguished from a live one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(pub u32);

/// Process-unique id of a live component instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(pub u32);

/// A path of component-instance ids, root-first.
///
/// Routes embedded in serialized output are absolute (they start with the
/// root instance's own id); routes passed between instances during dispatch
/// are relative to the receiving instance, and an empty route addresses the
/// receiver itself.
pub type Route = SmallVec<[InstanceId; 8]>;

static NEXT_HANDLER_ID: AtomicU32 = AtomicU32::new(0);
static NEXT_INSTANCE_ID: AtomicU32 = AtomicU32::new(0);

impl HandlerId {
    /// Allocate a fresh handler id.
    pub fn next() -> Self {
        HandlerId(NEXT_HANDLER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl InstanceId {
    /// Allocate a fresh instance id.
    pub fn next() -> Self {
        InstanceId(NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
