//! Component instances: stateful identity across pure re-renders.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use rustc_hash::FxHashMap;
use serde_json::{json, Map, Value};

use crate::error::{Result, WidgetError};
use crate::hooks::{CaptureState, Hook};
use crate::host::HostValue;
use crate::identity::{HandlerId, InstanceId, Route};
use crate::render::{render_html_list, RenderCx};
use crate::vdom::{reconcile_children, route_to_json, Vdom};

// Component description constructors, outermost layer first.
pub(crate) const COMPONENT_PURE: u32 = 0;
pub(crate) const COMPONENT_FILTER_MAP_ACTION: u32 = 1;
pub(crate) const COMPONENT_MAP_PROPS: u32 = 2;
pub(crate) const COMPONENT_WITH_SHOULD_UPDATE: u32 = 3;
pub(crate) const COMPONENT_WITH_STATE: u32 = 4;
pub(crate) const COMPONENT_WITH_TASK: u32 = 5;
pub(crate) const COMPONENT_WITH_MOUSE_CAPTURE: u32 = 6;

/// Shared handle to a live component instance.
///
/// The same instance is reachable both from its position in the parent's
/// rendered tree and from the parent's child list, so it lives behind a
/// reference-counted cell. Trees are strictly top down; instances never
/// hold references to ancestors.
#[derive(Clone)]
pub struct ComponentHandle(Rc<RefCell<ComponentInstance>>);

impl ComponentHandle {
    pub(crate) fn new(instance: ComponentInstance) -> Self {
        ComponentHandle(Rc::new(RefCell::new(instance)))
    }

    pub fn id(&self) -> InstanceId {
        self.0.borrow().id
    }

    pub(crate) fn borrow(&self) -> Ref<'_, ComponentInstance> {
        self.0.borrow()
    }

    pub(crate) fn borrow_mut(&self) -> RefMut<'_, ComponentInstance> {
        self.0.borrow_mut()
    }
}

/// A live instantiation of a component description.
pub struct ComponentInstance {
    id: InstanceId,
    /// Absolute route of the parent instance; empty for the root.
    route: Route,
    /// Hash of the originating description, the reconciliation identity.
    component_hash: u64,
    /// Outer props as supplied by the parent.
    props: HostValue,
    /// Props after flowing through the hook chain; set on initialize.
    inner_props: Option<HostValue>,
    /// Hook chain, outermost first.
    hooks: Vec<Hook>,
    /// The pure view closure at the center of the description.
    view: HostValue,
    /// Rendered children, valid iff `has_rendered`.
    render: Vec<Vdom>,
    /// Child component instances collected during the last render.
    children: Vec<ComponentHandle>,
    /// Event handlers registered during the last render.
    handlers: FxHashMap<HandlerId, HostValue>,
    has_rendered: bool,
    reconcile_count: u32,
}

impl ComponentInstance {
    /// Peel a component description into its hook chain and view. Hooks are
    /// not run here; initialization is deferred until serialization or
    /// reconciliation needs it.
    pub fn new(component: &HostValue, props: HostValue, route: Route) -> Result<Self> {
        let component_hash = component.hash();
        let mut hooks = Vec::new();
        let mut cursor = component.clone();
        loop {
            match cursor.variant_tag()? {
                COMPONENT_PURE => break,
                COMPONENT_FILTER_MAP_ACTION => {
                    hooks.push(Hook::FilterMapAction {
                        map: cursor.field(0)?,
                        props: None,
                    });
                    cursor = cursor.field(1)?;
                }
                COMPONENT_MAP_PROPS => {
                    hooks.push(Hook::MapProps {
                        map: cursor.field(0)?,
                    });
                    cursor = cursor.field(1)?;
                }
                COMPONENT_WITH_SHOULD_UPDATE => {
                    hooks.push(Hook::ShouldUpdate {
                        predicate: cursor.field(0)?,
                        props: None,
                    });
                    cursor = cursor.field(1)?;
                }
                COMPONENT_WITH_STATE => {
                    hooks.push(Hook::State {
                        init: cursor.field(0)?,
                        update: cursor.field(1)?,
                        props: None,
                        state: None,
                    });
                    cursor = cursor.field(2)?;
                }
                COMPONENT_WITH_TASK => {
                    hooks.push(Hook::Task {
                        builder: cursor.field(0)?,
                        task: None,
                    });
                    cursor = cursor.field(1)?;
                }
                COMPONENT_WITH_MOUSE_CAPTURE => {
                    hooks.push(Hook::MouseCapture {
                        state: CaptureState::Outside,
                    });
                    cursor = cursor.field(0)?;
                }
                _ => return Err(WidgetError::VariantUnreachable("component description")),
            }
        }
        let view = cursor.field(0)?;
        Ok(ComponentInstance {
            id: InstanceId::next(),
            route,
            component_hash,
            props,
            inner_props: None,
            hooks,
            view,
            render: Vec::new(),
            children: Vec::new(),
            handlers: FxHashMap::default(),
            has_rendered: false,
            reconcile_count: 0,
        })
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn reconcile_count(&self) -> u32 {
        self.reconcile_count
    }

    #[cfg(test)]
    pub(crate) fn children(&self) -> &[ComponentHandle] {
        &self.children
    }

    #[cfg(test)]
    pub(crate) fn handlers(&self) -> &FxHashMap<HandlerId, HostValue> {
        &self.handlers
    }

    /// Absolute route addressing this instance.
    pub(crate) fn self_route(&self) -> Route {
        let mut route = self.route.clone();
        route.push(self.id);
        route
    }

    /// Run every hook's initialization and flow the outer props through the
    /// chain. Returns the resulting inner props.
    pub(crate) fn initialize(&mut self) -> Result<HostValue> {
        let route = self.self_route();
        let mut props = self.props.clone();
        for hook in &mut self.hooks {
            hook.initialize(&props, &route)?;
            props = hook.get_props(props)?;
        }
        self.inner_props = Some(props.clone());
        Ok(props)
    }

    /// Invoke the view and rebuild the rendered children, reconciling them
    /// against this instance's previous rendering. Nothing is committed
    /// until every fallible step has succeeded, so a trapped render leaves
    /// the previous view addressable.
    pub(crate) fn render(&mut self) -> Result<()> {
        let prior = self.render.clone();
        self.render_against(prior)
    }

    fn render_against(&mut self, prior: Vec<Vdom>) -> Result<()> {
        let inner_props = match self.inner_props.clone() {
            Some(props) => props,
            None => self.initialize()?,
        };
        let view_output = self.view.invoke(&[inner_props])?;
        let mut cx = RenderCx::default();
        let route = self.self_route();
        let mut elements = render_html_list(&view_output, &mut cx, &route)?;
        reconcile_children(&mut elements, prior)?;
        self.handlers = cx.handlers;
        self.children = cx.components;
        self.render = elements;
        self.has_rendered = true;
        Ok(())
    }

    /// Reconcile this freshly built instance against its predecessor.
    ///
    /// With equal description hashes the hook chain decides: once any stage
    /// reports no update needed, the remaining hooks and the whole prior
    /// rendering are adopted wholesale and the old identity (id, children,
    /// handlers) carries over. Otherwise the inner props are recomputed and
    /// the instance re-renders against the prior child tree so nested
    /// components keep their identity. A hash mismatch starts from scratch.
    pub(crate) fn reconcile_from(&mut self, old: &ComponentInstance) -> Result<()> {
        debug_assert!(!self.has_rendered);
        if old.component_hash != self.component_hash {
            log::trace!(
                "reconcile: description changed for instance {}, rendering fresh",
                self.id
            );
            self.initialize()?;
            return self.render();
        }
        debug_assert_eq!(self.hooks.len(), old.hooks.len());
        let mut should_update = !self.props.host_eq(&old.props);
        let mut props = self.props.clone();
        let route = self.self_route();
        for (hook, prior) in self.hooks.iter_mut().zip(old.hooks.iter()) {
            if should_update {
                should_update &= hook.reconcile(&props, prior, &route)?;
            }
            if !should_update {
                *hook = prior.clone();
            } else {
                props = hook.get_props(props)?;
            }
        }
        if should_update {
            log::trace!("reconcile: instance {} re-rendering", old.id);
            self.inner_props = Some(props);
            self.render_against(old.render.clone())
        } else {
            log::trace!("reconcile: instance {} reusing prior rendering", old.id);
            // The new instance keeps its own route: it describes the current
            // position, which matters when an ancestor re-rendered under a
            // fresh id.
            self.inner_props = old.inner_props.clone();
            self.children = old.children.clone();
            self.render = old.render.clone();
            self.handlers = old.handlers.clone();
            self.id = old.id;
            self.has_rendered = old.has_rendered;
            self.reconcile_count = old.reconcile_count + 1;
            Ok(())
        }
    }

    /// Fold an action through the hook chain, innermost hook first. The
    /// first hook that drops the action halts propagation; otherwise the
    /// final value bubbles to the parent.
    pub(crate) fn handle_action(&mut self, action: HostValue) -> Result<Option<HostValue>> {
        let mut result = Some(action);
        for hook in self.hooks.iter_mut().rev() {
            let Some(action) = result.take() else { break };
            result = hook.action(action)?;
        }
        Ok(result)
    }

    /// Dispatch an event down `route`, invoke the handler at the target,
    /// and bubble the resulting action back up through every hook chain on
    /// the path. Each instance whose chain ran re-renders so views observe
    /// the new state before the next event arrives.
    pub(crate) fn handle_event(
        &mut self,
        route: &[InstanceId],
        handler: HandlerId,
        args: &HostValue,
    ) -> Result<Option<HostValue>> {
        match route.split_first() {
            None => {
                let Some(callback) = self.handlers.get(&handler).cloned() else {
                    return Err(WidgetError::InvalidHandler {
                        route: self.self_route(),
                        handler,
                    });
                };
                let action = callback.invoke(&[args.clone()])?;
                let bubbled = self.handle_action(action)?;
                self.initialize()?;
                self.render()?;
                Ok(bubbled)
            }
            Some((&head, rest)) => {
                let Some(child) = self.child_by_id(head) else {
                    return Err(WidgetError::InvalidHandler {
                        route: Route::from_slice(route),
                        handler,
                    });
                };
                let bubbled = child.borrow_mut().handle_event(rest, handler, args)?;
                match bubbled {
                    Some(action) => {
                        let bubbled = self.handle_action(action)?;
                        self.initialize()?;
                        self.render()?;
                        Ok(bubbled)
                    }
                    None => Ok(None),
                }
            }
        }
    }

    /// Deliver a task completion. The receiver re-initializes so its task
    /// hooks poll the fresh result, then re-renders.
    pub(crate) fn handle_task_completed(&mut self, route: &[InstanceId]) -> Result<()> {
        match route.split_first() {
            None => {
                self.initialize()?;
                self.render()
            }
            Some((&head, rest)) => match self.child_by_id(head) {
                Some(child) => child.borrow_mut().handle_task_completed(rest),
                None => Err(WidgetError::MissingTaskTarget {
                    route: Route::from_slice(route),
                }),
            },
        }
    }

    pub(crate) fn handle_mouse_gain_capture(&mut self, route: &[InstanceId]) -> Result<()> {
        match route.split_first() {
            None => self.update_capture_state(CaptureState::InsideImmediate),
            Some((&head, rest)) => {
                self.update_capture_state(CaptureState::InsideChild)?;
                if let Some(child) = self.child_by_id(head) {
                    child.borrow_mut().handle_mouse_gain_capture(rest)?;
                }
                Ok(())
            }
        }
    }

    pub(crate) fn handle_mouse_lose_capture(&mut self, route: &[InstanceId]) -> Result<()> {
        self.update_capture_state(CaptureState::Outside)?;
        if let Some((&head, rest)) = route.split_first() {
            if let Some(child) = self.child_by_id(head) {
                child.borrow_mut().handle_mouse_lose_capture(rest)?;
            }
        }
        Ok(())
    }

    /// Capture state flows into views through the hook chain, so an actual
    /// transition re-initializes and re-renders.
    fn update_capture_state(&mut self, next: CaptureState) -> Result<()> {
        let mut changed = false;
        for hook in &mut self.hooks {
            changed |= hook.set_capture_state(next);
        }
        if changed {
            self.initialize()?;
            self.render()?;
        }
        Ok(())
    }

    fn child_by_id(&self, id: InstanceId) -> Option<ComponentHandle> {
        self.children.iter().find(|c| c.id() == id).cloned()
    }

    /// Serialize the instance, rendering it first if it never has. `route`
    /// is this instance's absolute route; it is embedded in every event
    /// registration below so the view layer can address events back here.
    pub(crate) fn to_json(&mut self, route: &[InstanceId]) -> Result<Value> {
        if !self.has_rendered {
            self.initialize()?;
            self.render()?;
        }
        let mut children = Vec::with_capacity(self.render.len());
        for node in &self.render {
            children.push(node.to_json(route)?);
        }
        let mut entry = Map::new();
        entry.insert("id".into(), json!(self.id.0));
        entry.insert("c".into(), Value::Array(children));
        if self.hooks.iter().any(Hook::is_mouse_capture) {
            entry.insert("mouse_capture".into(), json!({ "r": route_to_json(route) }));
        }
        Ok(Value::Object(entry))
    }
}
