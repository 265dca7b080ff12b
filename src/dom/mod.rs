//! Read-only view over a rendered document tree.
//!
//! The engine only ever talks to [`DomNode`], so the same classification and
//! extraction code runs over a parsed HTML page ([`HtmlPage`]) or over the
//! in-memory [`fixture`] tree used by the tests.

pub mod fixture;
pub mod html;

pub use html::{HtmlNode, HtmlPage};

/// Capability set the engine needs from an element handle.
///
/// Handles are cheap to clone and compare by identity within one document.
/// `children` and `parent` only ever yield elements, never text nodes.
pub trait DomNode: Clone + PartialEq {
    /// Lower-case tag name.
    fn tag(&self) -> &str;

    fn id(&self) -> Option<&str>;

    /// Class tokens in source order.
    fn classes(&self) -> Vec<&str>;

    fn children(&self) -> Vec<Self>;

    fn parent(&self) -> Option<Self>;

    fn attr(&self, name: &str) -> Option<&str>;

    /// Concatenated text of the node and all its descendants.
    fn text(&self) -> String;

    /// Descendants of this node matching `selector`, in document order.
    ///
    /// A selector that cannot be parsed matches nothing.
    fn query(&self, selector: &str) -> Vec<Self>;

    /// Parent chain, nearest first, excluding `self`.
    fn ancestors(&self) -> Ancestors<Self> {
        Ancestors {
            next: self.parent(),
        }
    }

    /// 1-based position among the parent's element children.
    fn index_in_parent(&self) -> Option<usize> {
        let parent = self.parent()?;
        parent
            .children()
            .iter()
            .position(|sibling| sibling == self)
            .map(|index| index + 1)
    }

    fn sibling_count(&self) -> usize {
        self.parent()
            .map(|parent| parent.children().len())
            .unwrap_or(1)
    }

    fn has_class(&self, class: &str) -> bool {
        self.classes().iter().any(|c| *c == class)
    }

    /// True when the node contains at least one anchor element.
    fn has_link(&self) -> bool {
        !self.query("a").is_empty()
    }

    fn is_body(&self) -> bool {
        self.tag() == "body"
    }

    fn first(&self, selector: &str) -> Option<Self> {
        self.query(selector).into_iter().next()
    }
}

/// Iterator returned by [`DomNode::ancestors`].
pub struct Ancestors<N> {
    next: Option<N>,
}

impl<N: DomNode> Iterator for Ancestors<N> {
    type Item = N;

    fn next(&mut self) -> Option<N> {
        let current = self.next.take()?;
        self.next = current.parent();
        Some(current)
    }
}

/// Push `node` unless an identical handle is already present.
pub(crate) fn push_unique<N: DomNode>(nodes: &mut Vec<N>, node: N) {
    if !nodes.contains(&node) {
        nodes.push(node);
    }
}

#[cfg(test)]
mod tests {
    use super::fixture::{el, FixtureDocument};
    use super::*;

    #[test]
    fn test_ancestors_walk_to_root() {
        let doc = FixtureDocument::page(vec![el("div")
            .id("outer")
            .child(el("ul").child(el("li").child(el("a").text("x"))))]);
        let link = doc.find("a").unwrap();

        let tags: Vec<String> = link.ancestors().map(|n| n.tag().to_string()).collect();
        assert_eq!(tags, vec!["li", "ul", "div", "body", "html"]);
    }

    #[test]
    fn test_index_in_parent() {
        let doc = FixtureDocument::page(vec![el("ul").children(vec![
            el("li").text("one"),
            el("li").text("two"),
            el("li").text("three"),
        ])]);
        let items = doc.root().query("li");

        assert_eq!(items[0].index_in_parent(), Some(1));
        assert_eq!(items[2].index_in_parent(), Some(3));
        assert_eq!(items[1].sibling_count(), 3);
        assert_eq!(doc.root().index_in_parent(), None);
    }

    #[test]
    fn test_push_unique_dedups_handles() {
        let doc = FixtureDocument::page(vec![el("p").child(el("a").text("a")).child(el("a").text("b"))]);
        let mut parents = Vec::new();
        for link in doc.root().query("a") {
            push_unique(&mut parents, link.parent().unwrap());
        }
        assert_eq!(parents.len(), 1);
    }
}
