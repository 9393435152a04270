use std::ops::Deref;

use super::element::Element;

/// Concrete proxy subtype chosen for an engine-side tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Body,
    Button,
    Div,
    Span,
    Paragraph,
    Unknown(String),
}

/// Maps engine tag names to proxy subtypes and back.
pub trait TagCatalog {
    fn kind_for_tag(&self, tag: &str) -> ElementKind;
    fn tag_for_kind(&self, kind: &ElementKind) -> String;
}

/// Catalog for the HTML elements the crate has typed proxies for.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlTagCatalog;

impl TagCatalog for HtmlTagCatalog {
    fn kind_for_tag(&self, tag: &str) -> ElementKind {
        let normalized = tag.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "body" => ElementKind::Body,
            "button" => ElementKind::Button,
            "div" => ElementKind::Div,
            "span" => ElementKind::Span,
            "p" => ElementKind::Paragraph,
            _ => ElementKind::Unknown(normalized),
        }
    }

    fn tag_for_kind(&self, kind: &ElementKind) -> String {
        match kind {
            ElementKind::Body => "body".into(),
            ElementKind::Button => "button".into(),
            ElementKind::Div => "div".into(),
            ElementKind::Span => "span".into(),
            ElementKind::Paragraph => "p".into(),
            ElementKind::Unknown(tag) => tag.clone(),
        }
    }
}

/// A proxy subtype with a fixed tag, usable with `Document::create_element`.
pub trait TypedElement: Deref<Target = Element> + Sized {
    const TAG: &'static str;

    fn from_element(element: Element) -> Self;

    fn into_element(self) -> Element;
}

macro_rules! typed_element {
    ($(#[$meta:meta])* $name:ident, $tag:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name(Element);

        impl TypedElement for $name {
            const TAG: &'static str = $tag;

            fn from_element(element: Element) -> Self {
                Self(element)
            }

            fn into_element(self) -> Element {
                self.0
            }
        }

        impl Deref for $name {
            type Target = Element;

            fn deref(&self) -> &Element {
                &self.0
            }
        }

        impl From<$name> for Element {
            fn from(value: $name) -> Element {
                value.0
            }
        }
    };
}

typed_element!(
    /// The document body; every document has exactly one.
    Body,
    "body"
);
typed_element!(Button, "button");
typed_element!(Div, "div");
typed_element!(Span, "span");
typed_element!(Paragraph, "p");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_tags_case_insensitively() {
        let catalog = HtmlTagCatalog;
        assert_eq!(catalog.kind_for_tag("BUTTON"), ElementKind::Button);
        assert_eq!(catalog.kind_for_tag(" body "), ElementKind::Body);
        assert_eq!(
            catalog.kind_for_tag("H1"),
            ElementKind::Unknown("h1".into())
        );
    }

    #[test]
    fn tag_for_kind_inverts_kind_for_tag() {
        let catalog = HtmlTagCatalog;
        for tag in ["body", "button", "div", "span", "p", "section"] {
            let kind = catalog.kind_for_tag(tag);
            assert_eq!(catalog.tag_for_kind(&kind), tag);
        }
    }

    #[test]
    fn typed_tags_match_catalog() {
        let catalog = HtmlTagCatalog;
        assert_eq!(catalog.kind_for_tag(Button::TAG), ElementKind::Button);
        assert_eq!(catalog.kind_for_tag(Paragraph::TAG), ElementKind::Paragraph);
    }
}
