//! Typed DOM proxies over a text-only bridge to an embedded script engine.
//!
//! The host submits JavaScript source through a [`Transport`] and receives
//! JSON payloads back through a single callback. On top of that, [`Document`]
//! keeps a stable identity for every engine object it hands out, correlates
//! value-returning submissions with their results and routes engine events to
//! Rust handlers registered on [`Element`] proxies.

pub mod channel;
pub mod config;
pub mod document;
pub mod dom;
pub mod envelope;
pub mod error;
pub mod events;
pub mod js;
pub mod logging;
pub mod registry;
pub mod transport;
pub mod window;

pub use channel::Channel;
pub use config::{BridgeConfig, ConfigError, WindowConfig};
pub use document::Document;
pub use dom::{
    Body, Button, Collection, Div, Element, ElementKind, HandlerId, HtmlTagCatalog, Paragraph,
    Span, TagCatalog, TypedElement,
};
pub use envelope::Envelope;
pub use error::{BridgeError, Result};
pub use events::{EventArgs, EventFamily, FocusEventArgs, KeyboardEventArgs, MouseEventArgs};
pub use js::HeadlessTransport;
pub use registry::Registry;
pub use transport::{InboundCallback, PumpStatus, Transport};
pub use window::{Window, WindowBuilder};
