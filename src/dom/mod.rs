pub mod catalog;
pub mod collection;
pub mod element;

pub use catalog::{
    Body, Button, Div, ElementKind, HtmlTagCatalog, Paragraph, Span, TagCatalog, TypedElement,
};
pub use collection::Collection;
pub use element::{Element, EventHandler, HandlerId};
