//! Virtual DOM nodes and the sibling diff.

use rustc_hash::FxHashMap;
use serde_json::{json, Map, Value};

use crate::component::ComponentHandle;
use crate::error::Result;
use crate::identity::{HandlerId, InstanceId, Route};

/// One node of the rendered tree.
#[derive(Clone)]
pub enum Vdom {
    Element(VdomElement),
    Text(String),
    /// A child component, shared with the owning instance's child list.
    Component(ComponentHandle),
}

/// An element node. `attrs` values are JSON so that the `style` attribute
/// can carry a merged object; everything else is a string.
#[derive(Clone)]
pub struct VdomElement {
    pub tag: String,
    pub attrs: Map<String, Value>,
    pub events: FxHashMap<String, HandlerId>,
    pub children: Vec<Vdom>,
    pub tooltip: Option<Box<Vdom>>,
}

impl VdomElement {
    /// The `key` pseudo-attribute, a stable identity hint for the sibling
    /// diff.
    pub fn key(&self) -> Option<&str> {
        self.attrs.get("key").and_then(Value::as_str)
    }

    fn to_json(&self, route: &[InstanceId]) -> Result<Value> {
        let mut entry = Map::new();
        entry.insert("t".into(), Value::String(self.tag.clone()));
        entry.insert("a".into(), Value::Object(self.attrs.clone()));
        if !self.events.is_empty() {
            let mut events = Map::new();
            for (name, handler) in &self.events {
                events.insert(
                    name.clone(),
                    json!({ "r": route_to_json(route), "h": handler.0 }),
                );
            }
            entry.insert("e".into(), Value::Object(events));
        }
        let mut children = Vec::with_capacity(self.children.len());
        for child in &self.children {
            children.push(child.to_json(route)?);
        }
        entry.insert("c".into(), Value::Array(children));
        if let Some(tooltip) = &self.tooltip {
            entry.insert("tt".into(), tooltip.to_json(route)?);
        }
        Ok(Value::Object(entry))
    }
}

impl Vdom {
    pub fn key(&self) -> Option<&str> {
        match self {
            Vdom::Element(el) => el.key(),
            _ => None,
        }
    }

    /// Reconcile this freshly built node against its predecessor. Matching
    /// element nodes recurse into children and tooltip; matching component
    /// nodes run the component reconcile. A variant or tag mismatch leaves
    /// the new node fresh and discards the old one.
    pub(crate) fn reconcile(&mut self, old: &Vdom) -> Result<()> {
        match (&mut *self, old) {
            (Vdom::Text(_), Vdom::Text(_)) => Ok(()),
            (Vdom::Element(new), Vdom::Element(old)) if new.tag == old.tag => {
                reconcile_children(&mut new.children, old.children.clone())?;
                if let (Some(new_tt), Some(old_tt)) = (new.tooltip.as_mut(), &old.tooltip) {
                    new_tt.reconcile(old_tt)?;
                }
                Ok(())
            }
            (Vdom::Component(new), Vdom::Component(old)) => {
                let old = old.borrow();
                new.borrow_mut().reconcile_from(&old)
            }
            _ => Ok(()),
        }
    }

    /// Serialize with the absolute route of the component that rendered
    /// this node; component children extend the route with their own id.
    pub(crate) fn to_json(&self, route: &[InstanceId]) -> Result<Value> {
        match self {
            Vdom::Text(s) => Ok(Value::String(s.clone())),
            Vdom::Element(el) => el.to_json(route),
            Vdom::Component(handle) => {
                let mut child_route = Route::from_slice(route);
                child_route.push(handle.id());
                handle.borrow_mut().to_json(&child_route)
            }
        }
    }
}

/// Diff a freshly rendered sibling list against the previous one.
///
/// Keyed nodes match the first remaining old node with the same key;
/// unkeyed nodes match positionally against the head of what is left.
/// Unmatched new nodes stay fresh and initialize on first serialization;
/// unmatched old nodes are simply dropped. Duplicate keys and
/// partially keyed lists degrade to whatever the scan finds first, which is
/// safe but unspecified, and an old node is never matched twice.
pub(crate) fn reconcile_children(new: &mut [Vdom], old: Vec<Vdom>) -> Result<()> {
    let mut old = old;
    for node in new.iter_mut() {
        if let Some(key) = node.key().map(str::to_owned) {
            if let Some(pos) = old.iter().position(|o| o.key() == Some(key.as_str())) {
                let prior = old.remove(pos);
                log::trace!("sibling diff: matched key {key:?}");
                node.reconcile(&prior)?;
            }
        } else if !old.is_empty() {
            let prior = old.remove(0);
            node.reconcile(&prior)?;
        }
    }
    Ok(())
}

pub(crate) fn route_to_json(route: &[InstanceId]) -> Value {
    Value::Array(route.iter().map(|id| json!(id.0)).collect())
}
