use std::rc::Rc;

use serde_json::{Map as JsonMap, Value as JsonValue};
use tracing::{debug, info, warn};

use crate::channel::Channel;
use crate::config::BridgeConfig;
use crate::dom::{Collection, Element, HtmlTagCatalog, TagCatalog, TypedElement};
use crate::envelope::Envelope;
use crate::error::{BridgeError, Result};
use crate::events::{EventArgs, EventFamily};
use crate::registry::{
    adopt_program, bootstrap_program, new_meta_id, object_reference, resolve_expression, Registry,
    Resolution,
};
use crate::transport::Transport;

pub(crate) struct DocumentInner {
    channel: Rc<Channel>,
    registry: Registry,
    catalog: Box<dyn TagCatalog>,
}

/// The live document behind one transport.
///
/// Owns the identity registry, the correlation channel and the body proxy.
/// Cloning shares the same document.
#[derive(Clone)]
pub struct Document {
    inner: Rc<DocumentInner>,
    body: Element,
}

impl Document {
    pub fn open(transport: Rc<dyn Transport>, config: BridgeConfig) -> Result<Self> {
        Self::with_catalog(transport, config, Box::new(HtmlTagCatalog))
    }

    /// Register the inbound callback, install the engine-side tables and
    /// resolve the body before any user code runs.
    pub fn with_catalog(
        transport: Rc<dyn Transport>,
        config: BridgeConfig,
        catalog: Box<dyn TagCatalog>,
    ) -> Result<Self> {
        let bootstrap = bootstrap_program(&config.invoke_function);
        let channel = Rc::new(Channel::new(Rc::clone(&transport), config));
        let inner = Rc::new(DocumentInner {
            channel,
            registry: Registry::new(),
            catalog,
        });

        let weak = Rc::downgrade(&inner);
        transport.register_callback(Rc::new(move |payload: &str| match weak.upgrade() {
            Some(inner) => inner.receive(payload),
            None => {
                debug!(target: "tether::document", "payload after document drop ignored");
                Ok(())
            }
        }))?;

        inner.channel.submit(&bootstrap)?;
        let body = inner.resolve("document.body")?;
        info!(
            target: "tether::document",
            body = %body.meta_id(),
            "document ready"
        );

        Ok(Self { inner, body })
    }

    pub fn body(&self) -> &Element {
        &self.body
    }

    /// Direct access to the correlation channel for raw programs.
    pub fn javascript(&self) -> &Channel {
        &self.inner.channel
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Proxy for the element `expression` evaluates to, reusing the registered
    /// proxy when the engine object has been seen before.
    ///
    /// The expression is evaluated exactly once.
    pub fn resolve(&self, expression: &str) -> Result<Element> {
        self.inner.resolve(expression)
    }

    /// Create a typed element. The engine tag comes from the document's
    /// catalog for `T`'s kind.
    pub fn create_element<T: TypedElement>(&self) -> Result<T> {
        let catalog = &self.inner.catalog;
        let tag = catalog.tag_for_kind(&catalog.kind_for_tag(T::TAG));
        self.inner.create_element(&tag).map(T::from_element)
    }

    pub fn create_element_by_tag(&self, tag: &str) -> Result<Element> {
        self.inner.create_element(tag)
    }

    pub fn get_element_by_id(&self, id: &str) -> Result<Element> {
        self.inner.get_element_by_id(id)
    }

    pub fn get_elements_by_tag_name(&self, tag: &str) -> Collection {
        Collection::new(
            format!("document.getElementsByTagName('{tag}')"),
            Rc::clone(&self.inner),
        )
    }

    /// Route one inbound payload. Transports call this through the registered
    /// callback; it is public for hosts that receive payloads another way.
    pub fn receive(&self, payload: &str) -> Result<()> {
        self.inner.receive(payload)
    }
}

impl DocumentInner {
    pub(crate) fn channel(&self) -> &Channel {
        &self.channel
    }

    pub(crate) fn resolve(self: &Rc<Self>, expression: &str) -> Result<Element> {
        let candidate = new_meta_id();
        let resolution: Resolution = self
            .channel
            .submit_for_value(&resolve_expression(expression, &candidate))?;
        if !resolution.element {
            return Err(BridgeError::NotAnObject {
                expression: expression.to_string(),
            });
        }

        if !resolution.adopted {
            let known = resolution.meta_id.unwrap_or_default();
            if let Some(existing) = self.registry.get(&known) {
                return Ok(existing);
            }
            warn!(
                target: "tether::document",
                meta_id = %known,
                "engine object carries a meta-id the host does not know; adopting it again"
            );
            // Re-adopt through the engine table so the expression is not evaluated again.
            self.channel
                .submit(&adopt_program(&object_reference(&known), &candidate))?;
        }

        let tag = resolution.tag.unwrap_or_default();
        let element = self.new_proxy(candidate, &tag);
        self.registry.insert(element.clone());
        debug!(
            target: "tether::document",
            meta_id = %element.meta_id(),
            tag = %tag,
            "resolved new element"
        );
        Ok(element)
    }

    fn create_element(self: &Rc<Self>, tag: &str) -> Result<Element> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(BridgeError::ArgumentNull { name: "tag" });
        }

        // The meta-id exists before the engine object does.
        let element = self.new_proxy(new_meta_id(), tag);
        let create = format!("document.createElement('{tag}')");
        self.channel
            .submit(&adopt_program(&create, element.meta_id()))?;
        self.registry.insert(element.clone());
        debug!(
            target: "tether::document",
            meta_id = %element.meta_id(),
            tag,
            "created element"
        );
        Ok(element)
    }

    fn get_element_by_id(self: &Rc<Self>, id: &str) -> Result<Element> {
        let lookup = format!("document.getElementById('{id}')");
        let exists: bool = self
            .channel
            .submit_for_value(&format!("{lookup} !== null"))?;
        if !exists {
            return Err(BridgeError::NotFound { id: id.to_string() });
        }
        self.resolve(&lookup)
    }

    fn new_proxy(self: &Rc<Self>, meta_id: String, tag: &str) -> Element {
        let kind = self.catalog.kind_for_tag(tag);
        Element::new(
            meta_id,
            tag,
            kind,
            Rc::clone(&self.channel),
            Rc::downgrade(self),
        )
    }

    fn receive(&self, payload: &str) -> Result<()> {
        let envelope = match Envelope::parse(payload) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(
                    target: "tether::document",
                    error = %err,
                    payload,
                    "dropping payload that is not an envelope"
                );
                return Ok(());
            }
        };

        match envelope {
            Envelope::Result { token, value } => {
                self.channel.deliver(&token, value);
                Ok(())
            }
            Envelope::Event {
                id,
                event_kind,
                fields,
            } => self.dispatch_event(&id, &event_kind, &fields),
        }
    }

    fn dispatch_event(
        &self,
        meta_id: &str,
        kind: &str,
        fields: &JsonMap<String, JsonValue>,
    ) -> Result<()> {
        let Some(element) = self.registry.get(meta_id) else {
            warn!(
                target: "tether::document",
                meta_id,
                kind,
                "event for unknown meta-id dropped"
            );
            return Ok(());
        };
        if EventFamily::for_kind(kind).is_none() {
            warn!(target: "tether::document", kind, "event of unknown kind dropped");
            return Ok(());
        }

        let args = EventArgs::from_fields(kind, fields)?;
        element.dispatch(kind, &args)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use serde_json::json;

    use super::*;
    use crate::channel::tests::ScriptedTransport;

    fn open_scripted() -> (Document, Rc<ScriptedTransport>) {
        let transport = Rc::new(ScriptedTransport::new(
            vec![(
                "__tether.resolve(document.body,",
                json!({"element": true, "adopted": true, "tag": "body"}),
            )],
            false,
        ));
        let document = Document::open(transport.clone(), BridgeConfig::default()).unwrap();
        (document, transport)
    }

    fn click_envelope(meta_id: &str) -> String {
        json!({
            "kind": "event",
            "id": meta_id,
            "eventKind": "click",
            "fields": {"type": "click", "altKey": true},
        })
        .to_string()
    }

    #[test]
    fn opening_installs_tables_then_registers_body() {
        let (document, transport) = open_scripted();
        let programs = transport.programs.borrow();
        assert!(programs[0].contains("const ids = new Map();"));
        assert!(programs
            .iter()
            .any(|program| program.contains(&format!("'{}'", document.body().meta_id()))));
        assert_eq!(document.registry().len(), 1);
        assert_eq!(document.body().tag_name(), "body");
    }

    #[test]
    fn routes_events_to_the_matching_proxy_only() {
        let (document, _transport) = open_scripted();
        let clicks = Rc::new(Cell::new(0));
        let counter = Rc::clone(&clicks);
        document
            .body()
            .on_click(move |_, args| {
                assert!(args.as_mouse().map(|mouse| mouse.alt_key).unwrap_or(false));
                counter.set(counter.get() + 1);
                Ok(())
            })
            .unwrap();

        document
            .receive(&click_envelope(document.body().meta_id()))
            .unwrap();
        document.receive(&click_envelope("someone-else")).unwrap();
        assert_eq!(clicks.get(), 1);
    }

    #[test]
    fn malformed_payloads_are_dropped() {
        let (document, _transport) = open_scripted();
        document.receive("not json").unwrap();
        document.receive(r#"{"kind":"ping"}"#).unwrap();
        document
            .receive(
                &json!({"kind": "event", "id": document.body().meta_id(), "eventKind": "scroll"})
                    .to_string(),
            )
            .unwrap();
    }

    #[test]
    fn handler_errors_propagate_to_the_receiver() {
        let (document, _transport) = open_scripted();
        document
            .body()
            .on_click(|_, _| Err(anyhow::anyhow!("boom")))
            .unwrap();
        let err = document
            .receive(&click_envelope(document.body().meta_id()))
            .unwrap_err();
        assert!(matches!(err, BridgeError::Handler(_)));
    }

    #[test]
    fn non_elements_fail_to_resolve() {
        let (document, _transport) = open_scripted();
        let err = document.resolve("42").unwrap_err();
        assert!(matches!(err, BridgeError::NotAnObject { expression } if expression == "42"));
    }

    /// Renders paragraphs as `section` elements.
    struct SectionCatalog;

    impl TagCatalog for SectionCatalog {
        fn kind_for_tag(&self, tag: &str) -> crate::dom::ElementKind {
            match tag {
                "section" => crate::dom::ElementKind::Paragraph,
                other => HtmlTagCatalog.kind_for_tag(other),
            }
        }

        fn tag_for_kind(&self, kind: &crate::dom::ElementKind) -> String {
            match kind {
                crate::dom::ElementKind::Paragraph => "section".into(),
                other => HtmlTagCatalog.tag_for_kind(other),
            }
        }
    }

    #[test]
    fn typed_creation_asks_the_catalog_for_the_tag() {
        let transport = Rc::new(ScriptedTransport::new(
            vec![(
                "document.body",
                json!({"element": true, "adopted": true, "tag": "body"}),
            )],
            false,
        ));
        let document = Document::with_catalog(
            transport.clone(),
            BridgeConfig::default(),
            Box::new(SectionCatalog),
        )
        .unwrap();

        let paragraph: crate::dom::Paragraph = document.create_element().unwrap();
        assert_eq!(paragraph.tag_name(), "section");
        assert_eq!(paragraph.kind(), &crate::dom::ElementKind::Paragraph);
        assert!(transport
            .programs
            .borrow()
            .iter()
            .any(|program| program.contains("document.createElement('section')")));
    }

    #[test]
    fn empty_tag_is_rejected() {
        let (document, _transport) = open_scripted();
        let err = document.create_element_by_tag("  ").unwrap_err();
        assert!(matches!(err, BridgeError::ArgumentNull { name: "tag" }));
    }
}
