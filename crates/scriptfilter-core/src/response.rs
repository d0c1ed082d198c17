//! Response assembly and the Script Filter wire document.

use crate::error::Error;
use crate::item::ResultItem;
use serde::{Deserialize, Serialize};

/// The JSON document written to stdout: `{"items": [...]}`.
///
/// An empty `items` array is a valid "no results" answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseDocument {
    pub items: Vec<ResultItem>,
}

impl ResponseDocument {
    #[must_use]
    pub fn new(items: Vec<ResultItem>) -> Self {
        Self { items }
    }

    /// Document with a single item.
    #[must_use]
    pub fn single(item: ResultItem) -> Self {
        Self { items: vec![item] }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Compact JSON, exactly as the launcher reads it.
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Accumulates result items for the current invocation.
#[derive(Debug, Clone, Default)]
pub struct ResponseBuilder {
    items: Vec<ResultItem>,
}

impl ResponseBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item after everything added so far.
    pub fn add_result(&mut self, item: ResultItem) {
        self.items.push(item);
    }

    /// Insert an item at `index`; indexes past the end append.
    pub fn insert_result(&mut self, index: usize, item: ResultItem) {
        let index = index.min(self.items.len());
        self.items.insert(index, item);
    }

    #[must_use]
    pub fn items(&self) -> &[ResultItem] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Replace the accumulated items with those of `document`.
    pub fn replace(&mut self, document: ResponseDocument) {
        self.items = document.items;
    }

    /// Snapshot of the accumulated items. Does not consume or reset the builder.
    #[must_use]
    pub fn document(&self) -> ResponseDocument {
        ResponseDocument::new(self.items.clone())
    }

    /// Serialize the current snapshot.
    pub fn to_json(&self) -> Result<String, Error> {
        self.document().to_json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str) -> ResultItem {
        ResultItem::new(title).unwrap()
    }

    #[test]
    fn test_empty_document() {
        let builder = ResponseBuilder::new();
        assert_eq!(builder.to_json().unwrap(), r#"{"items":[]}"#);
    }

    #[test]
    fn test_order_and_length_preserved() {
        let titles = ["zeta", "alpha", "mid", "alpha"];
        let mut builder = ResponseBuilder::new();
        for title in titles {
            builder.add_result(item(title));
        }

        let document = builder.document();
        assert_eq!(document.len(), titles.len());
        let got: Vec<&str> = document.items.iter().map(ResultItem::title).collect();
        assert_eq!(got, titles);
    }

    #[test]
    fn test_document_is_repeatable() {
        let mut builder = ResponseBuilder::new();
        builder.add_result(item("one"));
        builder.add_result(item("two"));

        let first = builder.to_json().unwrap();
        let second = builder.to_json().unwrap();
        assert_eq!(first, second);
        assert_eq!(builder.len(), 2);
    }

    #[test]
    fn test_insert_result() {
        let mut builder = ResponseBuilder::new();
        builder.add_result(item("b"));
        builder.insert_result(0, item("a"));
        builder.insert_result(99, item("c"));

        let got: Vec<&str> = builder.items().iter().map(ResultItem::title).collect();
        assert_eq!(got, ["a", "b", "c"]);
    }

    #[test]
    fn test_replace_and_clear() {
        let mut builder = ResponseBuilder::new();
        builder.add_result(item("stale"));
        builder.replace(ResponseDocument::single(item("cached")));
        assert_eq!(builder.items()[0].title(), "cached");

        builder.clear();
        assert!(builder.is_empty());
    }

    #[test]
    fn test_document_from_json() {
        let document =
            ResponseDocument::from_json(r#"{"items":[{"title":"Encoded","arg":"Hello+World"}]}"#)
                .unwrap();
        assert_eq!(document.len(), 1);
        assert_eq!(document.items[0].arg(), "Hello+World");
    }
}
