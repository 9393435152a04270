use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use kuchiki::traits::*;
use kuchiki::{parse_html, NodeRef};
use serde::Serialize;

/// Element tree handed to the engine-side `__seed_document` helper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeedNode {
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    /// Direct text children, concatenated.
    pub text: String,
    pub children: Vec<SeedNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeedDocument {
    pub title: String,
    pub body: SeedNode,
}

/// Parse `html` and keep the body subtree the headless DOM can represent.
pub fn document_tree(html: &str) -> Result<SeedDocument> {
    let parsed = parse_html().one(html);
    let body = parsed
        .select_first("body")
        .map_err(|_| anyhow!("document has no body"))?;
    let title = parsed
        .select_first("title")
        .map(|title| title.as_node().text_contents())
        .unwrap_or_default();

    let body = convert(body.as_node()).ok_or_else(|| anyhow!("body is not an element"))?;
    Ok(SeedDocument { title, body })
}

fn convert(node: &NodeRef) -> Option<SeedNode> {
    let element = node.as_element()?;
    let attributes = element
        .attributes
        .borrow()
        .map
        .iter()
        .map(|(name, attribute)| (name.local.to_string(), attribute.value.clone()))
        .collect();

    let mut text = String::new();
    let mut children = Vec::new();
    for child in node.children() {
        if let Some(content) = child.as_text() {
            text.push_str(&content.borrow());
        } else if let Some(converted) = convert(&child) {
            children.push(converted);
        }
    }

    // Whitespace between child elements is layout, not content.
    if !children.is_empty() && text.trim().is_empty() {
        text.clear();
    }

    Some(SeedNode {
        tag: element.name.local.to_string(),
        attributes,
        text,
        children,
    })
}
