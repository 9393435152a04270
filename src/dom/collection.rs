use std::rc::Rc;

use super::element::Element;
use crate::document::DocumentInner;
use crate::error::Result;

/// Live, index-addressable list of elements described by an engine expression.
///
/// Nothing is cached: `len` and `get` evaluate the expression again, and every
/// item is resolved through the identity registry.
pub struct Collection {
    expression: String,
    document: Rc<DocumentInner>,
}

impl Collection {
    pub(crate) fn new(expression: String, document: Rc<DocumentInner>) -> Self {
        Self {
            expression,
            document,
        }
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn len(&self) -> Result<usize> {
        self.document
            .channel()
            .submit_for_value(&format!("{}.length", self.expression))
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn get(&self, index: usize) -> Result<Element> {
        self.document
            .resolve(&format!("{}.item({index})", self.expression))
    }

    /// Iterate over the items present when iteration starts.
    pub fn iter(&self) -> Result<impl Iterator<Item = Result<Element>> + '_> {
        let len = self.len()?;
        Ok((0..len).map(move |index| self.get(index)))
    }

    pub fn to_vec(&self) -> Result<Vec<Element>> {
        self.iter()?.collect()
    }
}
