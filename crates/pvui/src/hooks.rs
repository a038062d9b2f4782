//! The per-component hook chain.
//!
//! A component description wraps a pure view in zero or more hook layers,
//! outermost first. Each hook contributes some mix of four capabilities:
//! initialization against the outer props, reconciliation against its prior
//! incarnation, a props transform feeding the next layer, and an action
//! transform applied while actions bubble back out. Hooks that skip a
//! capability fall back to the identity behavior: store props, report
//! changed, pass props through, pass the action through.

use std::rc::Rc;

use crate::error::Result;
use crate::host::HostValue;
use crate::identity::Route;
use crate::task::SpawnedTask;

/// Where the pointer sits relative to a mouse-capturing component.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureState {
    Outside,
    InsideImmediate,
    InsideChild,
}

impl CaptureState {
    fn to_host(self) -> HostValue {
        HostValue::data(self as u32, Vec::new())
    }
}

#[derive(Clone)]
pub(crate) enum Hook {
    /// Maps or drops actions bubbling through this layer.
    FilterMapAction {
        map: HostValue,
        props: Option<HostValue>,
    },
    /// Transforms the props seen by inner layers.
    MapProps { map: HostValue },
    /// Lets the component veto re-rendering when props are equivalent.
    ShouldUpdate {
        predicate: HostValue,
        props: Option<HostValue>,
    },
    /// Local state threaded through an init and an update closure. The
    /// inner layers see `(state, props)`.
    State {
        init: HostValue,
        update: HostValue,
        props: Option<HostValue>,
        state: Option<HostValue>,
    },
    /// An asynchronous task built from the props. The inner layers see
    /// `(poll_result, props)`. The task handle is shared so that adoption
    /// during reconciliation keeps it alive; the last owner cancels it.
    Task {
        builder: HostValue,
        task: Option<Rc<SpawnedTask>>,
    },
    /// Mouse-capture tracking. The inner layers see `(capture, props)`.
    /// The state changes only through capture lifecycle events.
    MouseCapture { state: CaptureState },
}

impl Hook {
    /// Run the initialization capability. `route` is the absolute route of
    /// the owning instance, used to address task completions back to it.
    pub(crate) fn initialize(&mut self, props: &HostValue, route: &Route) -> Result<()> {
        match self {
            Hook::FilterMapAction { props: stored, .. } => {
                *stored = Some(props.clone());
                Ok(())
            }
            Hook::MapProps { .. } => Ok(()),
            Hook::ShouldUpdate { props: stored, .. } => {
                *stored = Some(props.clone());
                Ok(())
            }
            Hook::State {
                init,
                props: stored,
                state,
                ..
            } => {
                let prior = HostValue::option(state.clone());
                *state = Some(init.invoke(&[props.clone(), prior])?);
                *stored = Some(props.clone());
                Ok(())
            }
            Hook::Task { builder, task } => {
                if task.is_none() {
                    *task = Some(Rc::new(SpawnedTask::spawn(builder, props, route)?));
                }
                Ok(())
            }
            Hook::MouseCapture { .. } => Ok(()),
        }
    }

    /// Reconcile against the prior incarnation of this hook. Returns
    /// whether the component still needs to re-render; `false` short
    /// circuits the chain and the whole subtree reuses its prior rendering.
    ///
    /// Kinds are matched pairwise; if the prior hook is of a different kind
    /// the component description changed shape and the hook behaves as if
    /// there were no prior.
    pub(crate) fn reconcile(
        &mut self,
        new_props: &HostValue,
        prior: &Hook,
        route: &Route,
    ) -> Result<bool> {
        let reinitialize = match (&mut *self, prior) {
            (
                Hook::ShouldUpdate { predicate, props },
                Hook::ShouldUpdate {
                    props: Some(prior_props),
                    ..
                },
            ) => {
                let prior_props = prior_props.clone();
                *props = Some(new_props.clone());
                let verdict = predicate.invoke(&[prior_props, new_props.clone()])?;
                return verdict.as_bool();
            }
            (Hook::ShouldUpdate { .. }, _) => false,
            // Adopt the prior state, then run the init closure exactly once
            // with `some(prior)` so it can migrate the state to new props.
            (
                Hook::State { state, .. },
                Hook::State {
                    state: Some(prior_state),
                    ..
                },
            ) => {
                *state = Some(prior_state.clone());
                true
            }
            (Hook::State { .. }, _) => true,
            (Hook::FilterMapAction { .. }, _) => true,
            // The props changed, so the task they describe changed too:
            // build and submit a fresh one. The prior task is cancelled
            // when its owner is dropped.
            (Hook::Task { .. }, _) => true,
            (
                Hook::MouseCapture { state },
                Hook::MouseCapture { state: prior_state },
            ) => {
                *state = *prior_state;
                false
            }
            _ => false,
        };
        if reinitialize {
            self.initialize(new_props, route)?;
        }
        Ok(true)
    }

    /// Transform the props flowing toward the view.
    pub(crate) fn get_props(&mut self, props: HostValue) -> Result<HostValue> {
        match self {
            Hook::FilterMapAction { .. } | Hook::ShouldUpdate { .. } => Ok(props),
            Hook::MapProps { map } => map.invoke(&[props]),
            Hook::State { init, state, .. } => {
                let current = match state {
                    Some(s) => s.clone(),
                    None => {
                        let fresh = init.invoke(&[props.clone(), HostValue::none()])?;
                        *state = Some(fresh.clone());
                        fresh
                    }
                };
                Ok(HostValue::pair(current, props))
            }
            Hook::Task { task, .. } => {
                let result = match task {
                    Some(task) => task.poll()?,
                    None => None,
                };
                Ok(HostValue::pair(HostValue::option(result), props))
            }
            Hook::MouseCapture { state } => Ok(HostValue::pair(state.to_host(), props)),
        }
    }

    /// Transform an action bubbling outward. `None` halts propagation.
    pub(crate) fn action(&mut self, action: HostValue) -> Result<Option<HostValue>> {
        match self {
            Hook::FilterMapAction { map, props } => {
                debug_assert!(props.is_some(), "action before initialize");
                let Some(props) = props.clone() else {
                    return Ok(Some(action));
                };
                map.invoke(&[props, action])?.as_option()
            }
            Hook::State {
                update,
                props,
                state,
                ..
            } => {
                debug_assert!(
                    props.is_some() && state.is_some(),
                    "action before initialize"
                );
                let (Some(props), Some(current)) = (props.clone(), state.clone()) else {
                    return Ok(Some(action));
                };
                let result = update.invoke(&[props, current, action])?;
                let (next_state, out) = result.pair_fields()?;
                *state = Some(next_state);
                out.as_option()
            }
            _ => Ok(Some(action)),
        }
    }

    /// Force the capture state; reports whether it actually changed.
    pub(crate) fn set_capture_state(&mut self, next: CaptureState) -> bool {
        match self {
            Hook::MouseCapture { state } if *state != next => {
                *state = next;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn is_mouse_capture(&self) -> bool {
        matches!(self, Hook::MouseCapture { .. })
    }
}
