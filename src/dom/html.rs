use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::DomNode;

/// A parsed HTML document snapshot.
///
/// The snapshot is immutable; every [`HtmlNode`] borrows from it, so one
/// extraction run can never observe a reload.
pub struct HtmlPage {
    html: Html,
}

/// Element handle inside an [`HtmlPage`].
#[derive(Debug, Clone, Copy)]
pub struct HtmlNode<'a>(ElementRef<'a>);

impl HtmlPage {
    pub fn parse(source: &str) -> Self {
        Self {
            html: Html::parse_document(source),
        }
    }

    /// The `<html>` element.
    pub fn root(&self) -> HtmlNode<'_> {
        HtmlNode(self.html.root_element())
    }

    pub fn body(&self) -> Option<HtmlNode<'_>> {
        self.root().first("body")
    }

    /// First element in the document matching `selector`.
    pub fn select_first(&self, selector: &str) -> Option<HtmlNode<'_>> {
        let parsed = parse_selector(selector)?;
        self.html.select(&parsed).next().map(HtmlNode)
    }

    /// Text of the `<title>` element, trimmed.
    pub fn title(&self) -> Option<String> {
        self.select_first("title")
            .map(|node| node.text().trim().to_string())
            .filter(|title| !title.is_empty())
    }

    /// Content of the page's description meta tag.
    pub fn description(&self) -> Option<String> {
        let selectors = [
            r#"head > meta[name="description"]"#,
            r#"head > meta[name*="description"]"#,
            r#"head > meta[name*="Description"]"#,
        ];
        selectors.iter().find_map(|selector| {
            self.select_first(selector)
                .and_then(|meta| meta.attr("content").map(|c| c.trim().to_string()))
                .filter(|content| !content.is_empty())
        })
    }
}

impl<'a> HtmlNode<'a> {
    pub fn element(&self) -> ElementRef<'a> {
        self.0
    }

    /// Serialized markup of this element, including itself.
    pub fn outer_html(&self) -> String {
        self.0.html()
    }
}

impl PartialEq for HtmlNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.0.id() == other.0.id()
    }
}

impl<'a> DomNode for HtmlNode<'a> {
    fn tag(&self) -> &str {
        self.0.value().name()
    }

    fn id(&self) -> Option<&str> {
        self.0.value().id()
    }

    fn classes(&self) -> Vec<&str> {
        self.0.value().classes().collect()
    }

    fn children(&self) -> Vec<Self> {
        self.0.children().filter_map(ElementRef::wrap).map(HtmlNode).collect()
    }

    fn parent(&self) -> Option<Self> {
        self.0.parent().and_then(ElementRef::wrap).map(HtmlNode)
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.0.value().attr(name)
    }

    fn text(&self) -> String {
        self.0.text().collect()
    }

    fn query(&self, selector: &str) -> Vec<Self> {
        let Some(parsed) = parse_selector(selector) else {
            return Vec::new();
        };
        let own_id = self.0.id();
        self.0
            .select(&parsed)
            .filter(|element| element.id() != own_id)
            .map(HtmlNode)
            .collect()
    }
}

fn parse_selector(selector: &str) -> Option<Selector> {
    match Selector::parse(selector) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            debug!("Ignoring unparsable selector {:?}: {}", selector, e);
            None
        }
    }
}
