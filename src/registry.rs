use std::cell::RefCell;
use std::collections::HashMap;

use serde::Deserialize;
use uuid::Uuid;

use crate::dom::Element;
use crate::events::forwarding_table;

/// Global engine-side object holding the meta-id tables and helpers.
pub(crate) const ENGINE_NAMESPACE: &str = "__tether";

/// Host half of the identity bijection: meta-id -> proxy.
///
/// Entries live as long as the document; detaching an element from the tree
/// does not retract its meta-id.
#[derive(Default)]
pub struct Registry {
    entries: RefCell<HashMap<String, Element>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `element` under its meta-id. Returns `false` if the meta-id was
    /// already taken, in which case the existing entry is kept.
    pub fn insert(&self, element: Element) -> bool {
        let mut entries = self.entries.borrow_mut();
        if entries.contains_key(element.meta_id()) {
            return false;
        }
        entries.insert(element.meta_id().to_string(), element);
        true
    }

    pub fn get(&self, meta_id: &str) -> Option<Element> {
        self.entries.borrow().get(meta_id).cloned()
    }

    pub fn contains(&self, meta_id: &str) -> bool {
        self.entries.borrow().contains_key(meta_id)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

pub fn new_meta_id() -> String {
    Uuid::new_v4().to_string()
}

/// Engine expression for the object registered under `meta_id`.
pub(crate) fn object_reference(meta_id: &str) -> String {
    format!("{ENGINE_NAMESPACE}.objects['{meta_id}']")
}

/// Answer from the engine about the value of a resolution expression.
///
/// `adopted` means the value was new and is now recorded under the candidate
/// meta-id; otherwise `meta_id` is the one it already had.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct Resolution {
    pub element: bool,
    pub adopted: bool,
    pub meta_id: Option<String>,
    pub tag: Option<String>,
}

/// Evaluates `expression` once, adopting its value under `candidate` unless it
/// already has a meta-id.
pub(crate) fn resolve_expression(expression: &str, candidate: &str) -> String {
    format!("{ENGINE_NAMESPACE}.resolve({expression}, '{candidate}')")
}

/// Records `expression`'s value under `meta_id` in both engine tables and
/// attaches the forwarding listeners.
pub(crate) fn adopt_program(expression: &str, meta_id: &str) -> String {
    format!("{ENGINE_NAMESPACE}.adopt({expression}, '{meta_id}');")
}

/// Engine-side tables and helpers, installed once per document.
pub(crate) fn bootstrap_program(invoke_function: &str) -> String {
    ENGINE_BOOTSTRAP
        .replace("__NAMESPACE__", ENGINE_NAMESPACE)
        .replace("__INVOKE__", invoke_function)
        .replace("__EVENT_FIELDS__", &forwarding_table().to_string())
}

const ENGINE_BOOTSTRAP: &str = r#"
(() => {
    const global = globalThis;
    if (typeof global.__NAMESPACE__ === 'object' && global.__NAMESPACE__ !== null) {
        return;
    }

    const objects = {};
    const ids = new Map();
    const eventFields = __EVENT_FIELDS__;

    const send = (envelope) => {
        __INVOKE__(JSON.stringify(envelope));
    };

    const pick = (event, fields) => {
        const picked = {};
        for (const field of fields) {
            const value = event[field];
            picked[field] = value === undefined ? null : value;
        }
        return picked;
    };

    // One listener per known kind, whether or not the host handles it.
    const listen = (metaId) => {
        const target = objects[metaId];
        for (const kind of Object.keys(eventFields)) {
            const fields = eventFields[kind];
            target.addEventListener(kind, (event) => {
                send({ kind: 'event', id: metaId, eventKind: kind, fields: pick(event, fields) });
            });
        }
    };

    global.__NAMESPACE__ = {
        objects,
        ids,
        eventFields,
        send,
        listen,
        adopt(value, metaId) {
            objects[metaId] = value;
            ids.set(value, metaId);
            listen(metaId);
        },
        resolve(value, candidate) {
            const isElement = typeof HTMLElement === 'function' && value instanceof HTMLElement;
            if (!isElement) {
                return { element: false, adopted: false, metaId: null, tag: null };
            }
            const tag = String(value.tagName).toLowerCase();
            if (ids.has(value)) {
                return { element: true, adopted: false, metaId: ids.get(value), tag };
            }
            global.__NAMESPACE__.adopt(value, candidate);
            return { element: true, adopted: true, metaId: candidate, tag };
        },
    };
})();
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_ids_do_not_collide() {
        let ids: std::collections::HashSet<String> = (0..1_000).map(|_| new_meta_id()).collect();
        assert_eq!(ids.len(), 1_000);
    }

    #[test]
    fn bootstrap_substitutes_placeholders() {
        let program = bootstrap_program("external.invoke");
        assert!(!program.contains("__NAMESPACE__"));
        assert!(!program.contains("__INVOKE__"));
        assert!(!program.contains("__EVENT_FIELDS__"));
        assert!(program.contains("external.invoke(JSON.stringify(envelope))"));
        assert!(program.contains("\"click\":["));
    }

    #[test]
    fn programs_reference_the_namespace() {
        assert_eq!(object_reference("abc"), "__tether.objects['abc']");
        assert_eq!(
            adopt_program("document.body", "abc"),
            "__tether.adopt(document.body, 'abc');"
        );
        assert_eq!(
            resolve_expression("document.body", "abc"),
            "__tether.resolve(document.body, 'abc')"
        );
    }
}
