/// Minimal in-engine DOM for the headless transport.
///
/// Covers what the bridge and typical host code touch: element creation,
/// attributes, `innerHTML`/`textContent` as plain text, child lists, id and
/// tag lookups, and event listeners with bubbling. Markup assigned through
/// `innerHTML` is stored as text, not parsed.
pub(crate) const DOM_SHIM: &str = r#"
(() => {
    const global = globalThis;
    if (typeof global.self === 'undefined') {
        global.self = global;
    }
    global.window = global;

    class Event {
        constructor(type, init) {
            const options = init || {};
            this.type = String(type);
            this.bubbles = Boolean(options.bubbles);
            this.cancelable = Boolean(options.cancelable);
            this.isTrusted = false;
            this.defaultPrevented = false;
            this.target = null;
            this.currentTarget = null;
            this.propagationStopped = false;
        }

        preventDefault() {
            if (this.cancelable) {
                this.defaultPrevented = true;
            }
        }

        stopPropagation() {
            this.propagationStopped = true;
        }
    }

    const withDefaults = (event, defaults, options) => {
        for (const key of Object.keys(defaults)) {
            event[key] = key in options ? options[key] : defaults[key];
        }
    };

    const MOUSE_DEFAULTS = {
        altKey: false, button: 0, buttons: 0, clientX: 0, clientY: 0, ctrlKey: false,
        metaKey: false, movementX: 0, movementY: 0, offsetX: 0, offsetY: 0, pageX: 0,
        pageY: 0, screenX: 0, screenY: 0, shiftKey: false, which: 1,
    };

    const KEYBOARD_DEFAULTS = {
        altKey: false, ctrlKey: false, metaKey: false, shiftKey: false, key: '', code: '',
        location: 0, repeat: false, isComposing: false,
    };

    class MouseEvent extends Event {
        constructor(type, init) {
            super(type, init);
            withDefaults(this, MOUSE_DEFAULTS, init || {});
        }
    }

    class KeyboardEvent extends Event {
        constructor(type, init) {
            super(type, init);
            withDefaults(this, KEYBOARD_DEFAULTS, init || {});
        }
    }

    class FocusEvent extends Event {}

    class EventTarget {
        constructor() {
            this._listeners = {};
        }

        addEventListener(type, listener) {
            if (typeof listener !== 'function') {
                return;
            }
            const list = this._listeners[type] || (this._listeners[type] = []);
            if (!list.includes(listener)) {
                list.push(listener);
            }
        }

        removeEventListener(type, listener) {
            const list = this._listeners[type];
            if (!list) {
                return;
            }
            const index = list.indexOf(listener);
            if (index >= 0) {
                list.splice(index, 1);
            }
        }

        dispatchEvent(event) {
            event.target = this;
            let node = this;
            while (node) {
                event.currentTarget = node;
                const list = (node._listeners[event.type] || []).slice();
                for (const listener of list) {
                    listener.call(node, event);
                }
                if (!event.bubbles || event.propagationStopped) {
                    break;
                }
                node = node.parentNode;
            }
            event.currentTarget = null;
            return !event.defaultPrevented;
        }
    }

    class Node extends EventTarget {
        constructor() {
            super();
            this.parentNode = null;
            this.childNodes = [];
        }
    }

    class HTMLCollection {
        constructor(items) {
            this._items = items;
        }

        get length() {
            return this._items.length;
        }

        item(index) {
            return index >= 0 && index < this._items.length ? this._items[index] : null;
        }
    }

    class HTMLElement extends Node {
        constructor(tagName) {
            super();
            this._tag = String(tagName).toLowerCase();
            this._attributes = {};
            this._text = '';
        }

        get tagName() {
            return this._tag.toUpperCase();
        }

        get localName() {
            return this._tag;
        }

        get id() {
            return this.getAttribute('id') || '';
        }

        set id(value) {
            this.setAttribute('id', value);
        }

        get className() {
            return this.getAttribute('class') || '';
        }

        set className(value) {
            this.setAttribute('class', value);
        }

        getAttribute(name) {
            const key = String(name).toLowerCase();
            return Object.prototype.hasOwnProperty.call(this._attributes, key)
                ? this._attributes[key]
                : null;
        }

        setAttribute(name, value) {
            this._attributes[String(name).toLowerCase()] = String(value);
        }

        removeAttribute(name) {
            delete this._attributes[String(name).toLowerCase()];
        }

        hasAttribute(name) {
            return this.getAttribute(name) !== null;
        }

        get parentElement() {
            return this.parentNode instanceof HTMLElement ? this.parentNode : null;
        }

        get children() {
            return new HTMLCollection(this.childNodes.slice());
        }

        appendChild(child) {
            if (!(child instanceof HTMLElement)) {
                throw new TypeError('appendChild expects an element');
            }
            if (child.parentNode) {
                child.parentNode.removeChild(child);
            }
            child.parentNode = this;
            this.childNodes.push(child);
            return child;
        }

        removeChild(child) {
            const index = this.childNodes.indexOf(child);
            if (index < 0) {
                throw new Error('node is not a child of this element');
            }
            this.childNodes.splice(index, 1);
            child.parentNode = null;
            return child;
        }

        contains(other) {
            for (let node = other; node; node = node.parentNode) {
                if (node === this) {
                    return true;
                }
            }
            return false;
        }

        get textContent() {
            return this._text + this.childNodes.map((child) => child.textContent).join('');
        }

        set textContent(value) {
            this._replaceContent(value);
        }

        get innerHTML() {
            return this._text + this.childNodes.map((child) => child.outerHTML).join('');
        }

        set innerHTML(value) {
            this._replaceContent(value);
        }

        get outerHTML() {
            const attributes = Object.keys(this._attributes)
                .map((name) => ` ${name}="${this._attributes[name]}"`)
                .join('');
            return `<${this._tag}${attributes}>${this.innerHTML}</${this._tag}>`;
        }

        _replaceContent(value) {
            for (const child of this.childNodes) {
                child.parentNode = null;
            }
            this.childNodes = [];
            this._text = value === null || value === undefined ? '' : String(value);
        }

        _collect(name, found) {
            for (const child of this.childNodes) {
                if (name === '*' || child._tag === name) {
                    found.push(child);
                }
                child._collect(name, found);
            }
            return found;
        }

        getElementsByTagName(name) {
            return new HTMLCollection(this._collect(String(name).toLowerCase(), []));
        }

        click() {
            this.dispatchEvent(new MouseEvent('click', { bubbles: true, cancelable: true }));
        }

        focus() {
            this.dispatchEvent(new FocusEvent('focus'));
        }

        blur() {
            this.dispatchEvent(new FocusEvent('blur'));
        }
    }

    class Document extends Node {
        constructor() {
            super();
            this.title = '';
            this.documentElement = new HTMLElement('html');
            this.head = new HTMLElement('head');
            this.body = new HTMLElement('body');
            this.documentElement.appendChild(this.head);
            this.documentElement.appendChild(this.body);
            this.documentElement.parentNode = this;
        }

        createElement(tagName) {
            return new HTMLElement(tagName);
        }

        getElementById(id) {
            const wanted = String(id);
            const walk = (node) => {
                if (node.getAttribute('id') === wanted) {
                    return node;
                }
                for (const child of node.childNodes) {
                    const found = walk(child);
                    if (found) {
                        return found;
                    }
                }
                return null;
            };
            return walk(this.documentElement);
        }

        getElementsByTagName(name) {
            const wanted = String(name).toLowerCase();
            const found = wanted === '*' || wanted === 'html' ? [this.documentElement] : [];
            return new HTMLCollection(this.documentElement._collect(wanted, found));
        }
    }

    global.Event = Event;
    global.MouseEvent = MouseEvent;
    global.KeyboardEvent = KeyboardEvent;
    global.FocusEvent = FocusEvent;
    global.EventTarget = EventTarget;
    global.Node = Node;
    global.HTMLElement = HTMLElement;
    global.HTMLCollection = HTMLCollection;
    global.Document = Document;
    global.document = new Document();

    // Populate the body from the tree produced on the host by parsing the page.
    global.__seed_document = (tree) => {
        const doc = global.document;
        doc.title = tree.title || '';
        const apply = (element, node) => {
            for (const name of Object.keys(node.attributes)) {
                element.setAttribute(name, node.attributes[name]);
            }
            element._text = node.text;
            for (const child of node.children) {
                const created = doc.createElement(child.tag);
                apply(created, child);
                element.appendChild(created);
            }
        };
        apply(doc.body, tree.body);
    };
})();
"#;
