use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};

use tracing::debug;

use super::catalog::{ElementKind, TypedElement};
use super::collection::Collection;
use crate::channel::Channel;
use crate::document::DocumentInner;
use crate::error::{BridgeError, Result};
use crate::events::{EventArgs, EventFamily};
use crate::registry::object_reference;

/// Host callback attached to an element for one event kind.
pub type EventHandler = Rc<dyn Fn(&Element, &EventArgs) -> anyhow::Result<()>>;

/// Identifies a handler so it can be detached with [`Element::off`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

struct ElementInner {
    meta_id: String,
    tag: String,
    kind: ElementKind,
    channel: Rc<Channel>,
    document: Weak<DocumentInner>,
    handlers: RefCell<HashMap<String, Vec<(HandlerId, EventHandler)>>>,
    next_handler: Cell<u64>,
}

/// Host-side proxy for one engine-side element.
///
/// Cloning is cheap and every clone refers to the same proxy. Two proxies
/// compare equal exactly when they carry the same meta-id.
#[derive(Clone)]
pub struct Element(Rc<ElementInner>);

impl Element {
    pub(crate) fn new(
        meta_id: String,
        tag: &str,
        kind: ElementKind,
        channel: Rc<Channel>,
        document: Weak<DocumentInner>,
    ) -> Self {
        Self(Rc::new(ElementInner {
            meta_id,
            tag: tag.to_ascii_lowercase(),
            kind,
            channel,
            document,
            handlers: RefCell::new(HashMap::new()),
            next_handler: Cell::new(1),
        }))
    }

    pub fn meta_id(&self) -> &str {
        &self.0.meta_id
    }

    /// Lower-case tag the proxy was created for.
    pub fn tag_name(&self) -> &str {
        &self.0.tag
    }

    pub fn kind(&self) -> &ElementKind {
        &self.0.kind
    }

    /// Engine expression evaluating to this element.
    pub fn reference(&self) -> String {
        object_reference(&self.0.meta_id)
    }

    pub fn same_proxy(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// View this proxy as a typed subtype when the tag matches.
    pub fn downcast<T: TypedElement>(&self) -> Option<T> {
        self.0
            .tag
            .eq_ignore_ascii_case(T::TAG)
            .then(|| T::from_element(self.clone()))
    }

    pub fn inner_html(&self) -> Result<String> {
        self.get_field("innerHTML")
    }

    pub fn set_inner_html(&self, value: &str) -> Result<()> {
        self.set_field("innerHTML", value)
    }

    pub fn id(&self) -> Result<String> {
        self.get_field("id")
    }

    pub fn set_id(&self, value: &str) -> Result<()> {
        self.set_field("id", value)
    }

    pub fn text_content(&self) -> Result<String> {
        self.get_field("textContent")
    }

    pub fn set_text_content(&self, value: &str) -> Result<()> {
        self.set_field("textContent", value)
    }

    pub fn class_name(&self) -> Result<String> {
        self.get_field("className")
    }

    pub fn set_class_name(&self, value: &str) -> Result<()> {
        self.set_field("className", value)
    }

    pub fn get_attribute(&self, name: &str) -> Result<Option<String>> {
        self.0
            .channel
            .submit_for_value(&format!("{}.getAttribute('{name}')", self.reference()))
    }

    pub fn set_attribute(&self, name: &str, value: &str) -> Result<()> {
        self.call(&format!("setAttribute('{name}', '{value}')"))
    }

    pub fn append_child(&self, child: Option<&Element>) -> Result<()> {
        let child = child.ok_or(BridgeError::ArgumentNull { name: "child" })?;
        self.call(&format!("appendChild({})", child.reference()))
    }

    /// Detach `child` from this element. The child keeps its meta-id.
    pub fn remove_child(&self, child: Option<&Element>) -> Result<()> {
        let child = child.ok_or(BridgeError::ArgumentNull { name: "child" })?;
        self.call(&format!("removeChild({})", child.reference()))
    }

    /// Attach an engine-side listener given as source text.
    pub fn add_event_listener(&self, event_type: &str, js_handler: &str) -> Result<()> {
        self.call(&format!("addEventListener('{event_type}', {js_handler})"))
    }

    /// The channel this proxy submits through.
    pub fn javascript(&self) -> &Channel {
        &self.0.channel
    }

    /// Collection over the element's child elements.
    pub fn children(&self) -> Result<Collection> {
        let document = self.0.document.upgrade().ok_or(BridgeError::DocumentDropped)?;
        Ok(Collection::new(
            format!("{}.children", self.reference()),
            document,
        ))
    }

    /// Register a host handler for `kind`. Handlers run in registration order.
    ///
    /// Handlers live as long as the document. A handler that captures a
    /// [`Document`](crate::Document) clone keeps it alive for good; reach the
    /// engine through the sender's [`Element::javascript`] instead.
    pub fn on<F>(&self, kind: &str, handler: F) -> Result<HandlerId>
    where
        F: Fn(&Element, &EventArgs) -> anyhow::Result<()> + 'static,
    {
        if EventFamily::for_kind(kind).is_none() {
            return Err(BridgeError::UnknownEvent {
                kind: kind.to_string(),
            });
        }
        let id = HandlerId(self.0.next_handler.get());
        self.0.next_handler.set(id.0 + 1);
        let handler: EventHandler = Rc::new(handler);
        self.0
            .handlers
            .borrow_mut()
            .entry(kind.to_string())
            .or_default()
            .push((id, handler));
        Ok(id)
    }

    pub fn on_click<F>(&self, handler: F) -> Result<HandlerId>
    where
        F: Fn(&Element, &EventArgs) -> anyhow::Result<()> + 'static,
    {
        self.on("click", handler)
    }

    /// Detach a handler. Returns `false` if it was not registered for `kind`.
    pub fn off(&self, kind: &str, id: HandlerId) -> bool {
        let mut handlers = self.0.handlers.borrow_mut();
        let Some(list) = handlers.get_mut(kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|(existing, _)| *existing != id);
        before != list.len()
    }

    pub fn handler_count(&self, kind: &str) -> usize {
        self.0
            .handlers
            .borrow()
            .get(kind)
            .map(Vec::len)
            .unwrap_or(0)
    }

    pub(crate) fn dispatch(&self, kind: &str, args: &EventArgs) -> Result<()> {
        // Snapshot so handlers may attach or detach handlers while running.
        let handlers: Vec<EventHandler> = self
            .0
            .handlers
            .borrow()
            .get(kind)
            .map(|list| list.iter().map(|(_, handler)| Rc::clone(handler)).collect())
            .unwrap_or_default();

        debug!(
            target: "tether::document",
            meta_id = %self.0.meta_id,
            kind,
            handlers = handlers.len(),
            "dispatching event"
        );
        for handler in handlers {
            handler(self, args).map_err(BridgeError::Handler)?;
        }
        Ok(())
    }

    fn get_field(&self, field: &str) -> Result<String> {
        self.0
            .channel
            .submit_for_value(&format!("{}.{field}", self.reference()))
    }

    // Values are single-quoted as-is; callers must not pass quote characters.
    fn set_field(&self, field: &str, value: &str) -> Result<()> {
        self.0
            .channel
            .submit(&format!("{}.{field} = '{value}';", self.reference()))
    }

    fn call(&self, call: &str) -> Result<()> {
        self.0
            .channel
            .submit(&format!("{}.{call};", self.reference()))
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.0.meta_id == other.0.meta_id
    }
}

impl Eq for Element {}

impl Hash for Element {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.meta_id.hash(state);
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("meta_id", &self.0.meta_id)
            .field("tag", &self.0.tag)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::channel::tests::{connect, ScriptedTransport};
    use crate::dom::catalog::Button;

    fn detached(tag: &str, transport: Rc<ScriptedTransport>) -> Element {
        Element::new(
            "m-1".into(),
            tag,
            ElementKind::Unknown(tag.into()),
            connect(transport),
            Weak::new(),
        )
    }

    #[test]
    fn append_child_rejects_null() {
        let transport = Rc::new(ScriptedTransport::new(Vec::new(), false));
        let element = detached("div", transport.clone());
        let err = element.append_child(None).unwrap_err();
        assert!(matches!(err, BridgeError::ArgumentNull { name: "child" }));
        assert!(transport.programs.borrow().is_empty());
    }

    #[test]
    fn setters_quote_values_and_reference_the_meta_id() {
        let transport = Rc::new(ScriptedTransport::new(Vec::new(), false));
        let element = detached("div", transport.clone());
        element.set_inner_html("Hello!").unwrap();
        assert_eq!(
            transport.programs.borrow().last().map(String::as_str),
            Some("__tether.objects['m-1'].innerHTML = 'Hello!';")
        );
    }

    #[test]
    fn getters_decode_the_engine_value() {
        let transport = Rc::new(ScriptedTransport::new(
            vec![("['m-1'].id", json!("karel"))],
            false,
        ));
        let element = detached("div", transport);
        assert_eq!(element.id().unwrap(), "karel");
    }

    #[test]
    fn handlers_can_be_detached() {
        let transport = Rc::new(ScriptedTransport::new(Vec::new(), false));
        let element = detached("div", transport);
        let first = element.on_click(|_, _| Ok(())).unwrap();
        element.on_click(|_, _| Ok(())).unwrap();
        assert_eq!(element.handler_count("click"), 2);
        assert!(element.off("click", first));
        assert!(!element.off("click", first));
        assert_eq!(element.handler_count("click"), 1);
    }

    #[test]
    fn unknown_event_kind_is_rejected() {
        let transport = Rc::new(ScriptedTransport::new(Vec::new(), false));
        let element = detached("div", transport);
        let err = element.on("teleport", |_, _| Ok(())).unwrap_err();
        assert!(matches!(err, BridgeError::UnknownEvent { .. }));
    }

    #[test]
    fn downcast_checks_the_tag() {
        let transport = Rc::new(ScriptedTransport::new(Vec::new(), false));
        let element = detached("BUTTON", transport);
        assert!(element.downcast::<Button>().is_some());
        assert!(element.downcast::<crate::dom::catalog::Body>().is_none());
    }

    #[test]
    fn children_need_a_live_document() {
        let transport = Rc::new(ScriptedTransport::new(Vec::new(), false));
        let element = detached("div", transport);
        assert!(matches!(
            element.children(),
            Err(BridgeError::DocumentDropped)
        ));
    }
}
