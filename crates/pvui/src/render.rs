//! Interpreter for declarative `html` host values.
//!
//! Decomposes the host's html description into VDOM nodes, allocating child
//! component instances and registering event handlers as it goes. Created
//! instances are not initialized here; serialization or reconciliation
//! decides when that happens.

use rustc_hash::FxHashMap;
use serde_json::{Map, Value};

use crate::component::{ComponentHandle, ComponentInstance};
use crate::error::{Result, WidgetError};
use crate::host::HostValue;
use crate::identity::{HandlerId, Route};
use crate::vdom::{Vdom, VdomElement};

// html constructors.
const HTML_ELEMENT: u32 = 0;
const HTML_OF_STRING: u32 = 1;
const HTML_OF_COMPONENT: u32 = 2;

// attr constructors.
const ATTR_VAL: u32 = 0;
const ATTR_MOUSE_EVENT: u32 = 1;
const ATTR_STYLE: u32 = 2;
const ATTR_TOOLTIP: u32 = 3;
const ATTR_TEXT_CHANGE_EVENT: u32 = 4;

// mouse event kinds.
const MOUSE_CLICK: u32 = 0;
const MOUSE_ENTER: u32 = 1;
const MOUSE_LEAVE: u32 = 2;

/// Collections filled in while a view's output is decomposed.
#[derive(Default)]
pub(crate) struct RenderCx {
    pub components: Vec<ComponentHandle>,
    pub handlers: FxHashMap<HandlerId, HostValue>,
}

impl RenderCx {
    /// Allocate a fresh handler id and bind `name` to it. Binding the same
    /// name twice on one element rebinds it; the earlier handler stays
    /// registered under its id.
    fn register_event(
        &mut self,
        name: &str,
        handler: HostValue,
        events: &mut FxHashMap<String, HandlerId>,
    ) {
        let id = HandlerId::next();
        events.insert(name.to_owned(), id);
        self.handlers.insert(id, handler);
    }
}

pub(crate) fn render_html(html: &HostValue, cx: &mut RenderCx, route: &Route) -> Result<Vdom> {
    match html.variant_tag()? {
        HTML_ELEMENT => render_element(html, cx, route),
        HTML_OF_STRING => Ok(Vdom::Text(html.field(0)?.as_str()?.to_owned())),
        HTML_OF_COMPONENT => {
            let props = html.field(0)?;
            let component = html.field(1)?;
            let instance = ComponentInstance::new(&component, props, route.clone())?;
            let handle = ComponentHandle::new(instance);
            cx.components.push(handle.clone());
            Ok(Vdom::Component(handle))
        }
        _ => Err(WidgetError::VariantUnreachable("html node")),
    }
}

pub(crate) fn render_html_list(
    htmls: &HostValue,
    cx: &mut RenderCx,
    route: &Route,
) -> Result<Vec<Vdom>> {
    htmls
        .as_list()?
        .iter()
        .map(|html| render_html(html, cx, route))
        .collect()
}

fn render_element(element: &HostValue, cx: &mut RenderCx, route: &Route) -> Result<Vdom> {
    let tag = element.field(0)?.as_str()?.to_owned();
    let mut attrs = Map::new();
    let mut events = FxHashMap::default();
    let mut tooltip = None;
    for attr in element.field(1)?.as_list()? {
        match attr.variant_tag()? {
            ATTR_VAL => {
                let key = attr.field(0)?.as_str()?.to_owned();
                let value = attr.field(1)?.as_str()?.to_owned();
                set_attr(&mut attrs, key, value);
            }
            ATTR_MOUSE_EVENT => {
                let name = match attr.field(0)?.variant_tag()? {
                    MOUSE_CLICK => "onClick",
                    MOUSE_ENTER => "onMouseEnter",
                    MOUSE_LEAVE => "onMouseLeave",
                    _ => return Err(WidgetError::VariantUnreachable("mouse event kind")),
                };
                cx.register_event(name, attr.field(1)?, &mut events);
            }
            ATTR_STYLE => {
                for pair in attr.field(0)?.as_list()? {
                    let key = pair.field(0)?.as_str()?.to_owned();
                    let value = pair.field(1)?.as_str()?.to_owned();
                    let style = attrs
                        .entry("style")
                        .or_insert_with(|| Value::Object(Map::new()));
                    if let Value::Object(style) = style {
                        style.insert(key, Value::String(value));
                    }
                }
            }
            ATTR_TOOLTIP => {
                let child = render_html(&attr.field(0)?, cx, route)?;
                tooltip = Some(Box::new(child));
            }
            ATTR_TEXT_CHANGE_EVENT => {
                cx.register_event("onChange", attr.field(0)?, &mut events);
            }
            _ => return Err(WidgetError::VariantUnreachable("attr")),
        }
    }
    let children = render_html_list(&element.field(2)?, cx, route)?;
    Ok(Vdom::Element(VdomElement {
        tag,
        attrs,
        events,
        children,
        tooltip,
    }))
}

/// Set a plain attribute. `className` accumulates by space concatenation in
/// declaration order instead of overwriting.
fn set_attr(attrs: &mut Map<String, Value>, key: String, value: String) {
    if key == "className" {
        if let Some(existing) = attrs.get(&key).and_then(Value::as_str) {
            let merged = format!("{existing} {value}");
            attrs.insert(key, Value::String(merged));
            return;
        }
    }
    attrs.insert(key, Value::String(value));
}
