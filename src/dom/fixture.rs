//! Builder-made documents for tests and benchmarks.
//!
//! [`Element`] trees are serialized to markup and parsed by the same HTML
//! backend as real pages, so fixture queries use the production selector
//! dialect. The parser applies the usual HTML fixups: `<head>` is always
//! present, and table rows are wrapped in `<tbody>`.
//!
//! ```
//! use rss_scout::dom::fixture::{el, FixtureDocument};
//! use rss_scout::dom::DomNode;
//!
//! let doc = FixtureDocument::page(vec![
//!     el("ul").class("list").child(el("li").child(el("a").attr("href", "/x").text("X"))),
//! ]);
//! assert_eq!(doc.root().query("ul.list > li").len(), 1);
//! assert_eq!(doc.root().query("a[href]").len(), 1);
//! ```

use super::{HtmlNode, HtmlPage};

/// Elements written without a closing tag.
const VOID_TAGS: &[&str] = &["br", "hr", "img", "input", "link", "meta"];

/// Builder for one element and its subtree.
#[derive(Debug, Clone, Default)]
pub struct Element {
    tag: String,
    attrs: Vec<(String, String)>,
    text: String,
    children: Vec<Element>,
}

pub fn el(tag: &str) -> Element {
    Element {
        tag: tag.to_ascii_lowercase(),
        ..Element::default()
    }
}

impl Element {
    pub fn id(self, id: &str) -> Self {
        self.attr("id", id)
    }

    /// Append one or more whitespace-separated class tokens.
    pub fn class(mut self, class: &str) -> Self {
        match self.attrs.iter_mut().find(|(name, _)| name == "class") {
            Some((_, value)) => {
                value.push(' ');
                value.push_str(class);
            }
            None => self.attrs.push(("class".to_string(), class.to_string())),
        }
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.retain(|(existing, _)| existing != name);
        self.attrs.push((name.to_string(), value.to_string()));
        self
    }

    /// Text emitted before the children.
    pub fn text(mut self, text: &str) -> Self {
        self.text.push_str(text);
        self
    }

    pub fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        self.children.extend(children);
        self
    }

    /// Markup for this element and its subtree, without whitespace between tags.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.tag);
        for (name, value) in &self.attrs {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape(value));
            out.push('"');
        }
        out.push('>');
        if VOID_TAGS.contains(&self.tag.as_str()) {
            return;
        }

        out.push_str(&escape(&self.text));
        for child in &self.children {
            child.write_html(out);
        }
        out.push_str("</");
        out.push_str(&self.tag);
        out.push('>');
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// A parsed document built from an [`Element`] tree.
pub struct FixtureDocument {
    page: HtmlPage,
}

impl FixtureDocument {
    /// Parse `root` as a whole document. A root other than `<html>` ends up
    /// inside the `<body>` the parser supplies.
    pub fn new(root: Element) -> Self {
        Self {
            page: HtmlPage::parse(&root.to_html()),
        }
    }

    /// `<html><body>..children..</body></html>`
    pub fn page(body: Vec<Element>) -> Self {
        Self::new(el("html").child(el("body").children(body)))
    }

    /// The `<html>` element.
    pub fn root(&self) -> HtmlNode<'_> {
        self.page.root()
    }

    /// First element matching `selector`, the root included.
    pub fn find(&self, selector: &str) -> Option<HtmlNode<'_>> {
        self.page.select_first(selector)
    }
}
