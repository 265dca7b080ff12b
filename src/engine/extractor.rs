//! Applies a [`SelectorSet`] to a document with escalating fallbacks.
//!
//! Items are resolved by the first tier that yields anything:
//!
//! 1. the item selector (document-wide when it contains a combinator,
//!    otherwise the outermost matches inside the container);
//! 2. container children whose tag equals the item selector's tag;
//! 3. rows, list items or plain children depending on the container's tag;
//! 4. the parent of every hyperlink in the container.
//!
//! Fields fall back from their selector to the first hyperlink (title and
//! link) or the first date-shaped descendant, then the item's own text (date).

use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use super::assembler::RecordAssembler;
use super::synthesizer::{fallback_item_tag, innermost_dated};
use super::{date_shape, FieldKind, RawField, Record, SelectorSet};
use crate::dom::{push_unique, DomNode};

/// Which item resolution tier produced the candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemTier {
    ItemSelector,
    DirectChildren,
    TagFamily,
    LinkAncestors,
    /// Every tier came back empty.
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionDiagnostics {
    pub tier: ItemTier,
    /// False when the container selector matched nothing and `<body>` was used.
    pub container_found: bool,
    pub candidates: usize,
    pub retained: usize,
    pub rejected: usize,
}

impl ExtractionDiagnostics {
    pub fn is_empty_extraction(&self) -> bool {
        self.tier == ItemTier::None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub records: Vec<Record>,
    pub diagnostics: ExtractionDiagnostics,
}

/// Extract records from `document` (any node containing the list, usually
/// the root element). Never fails; see [`ExtractionDiagnostics`] for what was
/// dropped.
pub fn extract<N: DomNode>(
    document: &N,
    selectors: &SelectorSet,
    base_url: &str,
    assembler: &RecordAssembler,
) -> Extraction {
    let (container, container_found) = match document.first(&selectors.container) {
        Some(container) => (container, true),
        None => {
            warn!(
                "Container selector {:?} matched nothing, searching the whole body",
                selectors.container
            );
            let body = document.first("body").unwrap_or_else(|| document.clone());
            (body, false)
        }
    };

    let (items, tier) = resolve_items(document, &container, &selectors.item);
    debug!("Resolved {} items via {:?}", items.len(), tier);

    let base = Url::parse(base_url).ok();
    if base.is_none() {
        debug!("Base URL {:?} is not absolute, relative links stay unresolved", base_url);
    }

    let mut records = Vec::with_capacity(items.len());
    let mut rejected = 0;
    for item in &items {
        let fields = read_fields(item, selectors, base.as_ref());
        match assembler.assemble_fields(&fields) {
            Ok(record) => records.push(record),
            Err(reason) => {
                debug!("Skipping <{}> item: {}", item.tag(), reason);
                rejected += 1;
            }
        }
    }

    if tier == ItemTier::None {
        warn!("No items found for container {:?}", selectors.container);
    } else if rejected > 0 {
        debug!("{} of {} candidates rejected", rejected, items.len());
    }

    Extraction {
        diagnostics: ExtractionDiagnostics {
            tier,
            container_found,
            candidates: items.len(),
            retained: records.len(),
            rejected,
        },
        records,
    }
}

fn resolve_items<N: DomNode>(document: &N, container: &N, item_selector: &str) -> (Vec<N>, ItemTier) {
    let item_selector = item_selector.trim();

    let mut items = if has_combinator(item_selector) {
        document.query(item_selector)
    } else {
        Vec::new()
    };
    if items.is_empty() && !item_selector.is_empty() {
        items = outermost(container, container.query(item_selector));
    }
    if !items.is_empty() {
        return (items, ItemTier::ItemSelector);
    }

    if let Some(tag) = subject_tag(item_selector) {
        let children: Vec<N> = container
            .children()
            .into_iter()
            .filter(|child| child.tag() == tag)
            .collect();
        if !children.is_empty() {
            return (children, ItemTier::DirectChildren);
        }
    }

    let family = match fallback_item_tag(container) {
        "div" => container.children(),
        tag => container.query(tag),
    };
    if !family.is_empty() {
        return (family, ItemTier::TagFamily);
    }

    let mut holders = Vec::new();
    for link in container.query("a") {
        let holder = match link.parent() {
            Some(parent) if parent != *container => parent,
            _ => link,
        };
        push_unique(&mut holders, holder);
    }
    if !holders.is_empty() {
        return (holders, ItemTier::LinkAncestors);
    }

    (Vec::new(), ItemTier::None)
}

/// Drop matches nested inside another match below `container`, so a bare
/// `div` item selector does not also pick up the wrappers inside each item.
fn outermost<N: DomNode>(container: &N, matches: Vec<N>) -> Vec<N> {
    let nested: Vec<bool> = matches
        .iter()
        .map(|node| {
            node.ancestors()
                .take_while(|ancestor| ancestor != container)
                .any(|ancestor| matches.contains(&ancestor))
        })
        .collect();
    matches
        .into_iter()
        .zip(nested)
        .filter_map(|(node, nested)| (!nested).then_some(node))
        .collect()
}

/// True when the selector relates two compounds (`a b`, `a > b`, `a + b`).
fn has_combinator(selector: &str) -> bool {
    let mut depth = 0usize;
    for ch in selector.chars() {
        match ch {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            '>' | '+' | '~' if depth == 0 => return true,
            c if c.is_whitespace() && depth == 0 => return true,
            _ => {}
        }
    }
    false
}

/// Tag name of the selector's subject (rightmost) compound, if it names one.
///
/// Reads the rightmost compound, not the leading tag token: for `ul > li`
/// the items are the `li` elements.
fn subject_tag(selector: &str) -> Option<String> {
    let first = selector.split(',').next()?;
    let subject = first
        .split(|c: char| c.is_whitespace() || c == '>' || c == '+' || c == '~')
        .filter(|part| !part.is_empty())
        .last()?;
    let tag: String = subject
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    if tag.is_empty() {
        None
    } else {
        Some(tag.to_ascii_lowercase())
    }
}

fn read_fields<N: DomNode>(item: &N, selectors: &SelectorSet, base: Option<&Url>) -> Vec<RawField> {
    let first_link = || {
        if item.tag() == "a" {
            Some(item.clone())
        } else {
            item.first("a")
        }
    };

    let title = item
        .first(&selectors.title)
        .filter(|node| !node.text().trim().is_empty())
        .or_else(first_link)
        .map(|node| node.text())
        .unwrap_or_default();

    let link_node = item.first(&selectors.link).or_else(first_link);
    let href = link_node.as_ref().and_then(|node| {
        node.attr("href")
            .map(str::to_string)
            .or_else(|| node.first("a").and_then(|a| a.attr("href").map(str::to_string)))
    });
    let link_text = link_node.map(|node| node.text()).unwrap_or_default();

    vec![
        RawField {
            kind: FieldKind::Title,
            text: title,
            attribute_value: None,
        },
        RawField {
            kind: FieldKind::Link,
            text: link_text,
            attribute_value: href.and_then(|href| resolve_link(base, &href)),
        },
        RawField {
            kind: FieldKind::Date,
            text: read_date(item, &selectors.date),
            attribute_value: None,
        },
    ]
}

fn read_date<N: DomNode>(item: &N, selector: &str) -> String {
    if let Some(text) = item
        .first(selector)
        .map(|node| node.text())
        .filter(|text| !text.trim().is_empty())
    {
        return text;
    }

    if let Some(node) = item
        .query("*")
        .into_iter()
        .find(|node| date_shape::matches(&node.text()))
    {
        return innermost_dated(node).text();
    }

    date_shape::find_first_match(&item.text())
        .map(str::to_string)
        .unwrap_or_default()
}

/// Resolve `href` against `base` into an absolute URL.
///
/// Script and empty links resolve to nothing. Without a base only hrefs that
/// are already absolute survive.
pub fn resolve_link(base: Option<&Url>, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.to_ascii_lowercase().starts_with("javascript:") {
        return None;
    }
    let resolved = match base {
        Some(base) => base.join(href),
        None => Url::parse(href),
    };
    resolved.ok().map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::fixture::{el, Element, FixtureDocument};

    fn dated_item(title: &str, href: &str, date: &str) -> Element {
        el("li")
            .child(el("a").attr("href", href).text(title))
            .child(el("span").class("time").text(date))
    }

    fn selectors(container: &str, item: &str, date: &str) -> SelectorSet {
        SelectorSet {
            container: container.to_string(),
            item: item.to_string(),
            title: "a".to_string(),
            link: "a".to_string(),
            date: date.to_string(),
        }
    }

    #[test]
    fn test_item_selector_tier() {
        let doc = FixtureDocument::page(vec![el("ul").class("list").children(vec![
            dated_item("A", "a.html", "2024-01-01"),
            dated_item("B", "b.html", "2024-01-02"),
        ])]);
        let result = extract(
            &doc.root(),
            &selectors("ul.list", "li", "span.time"),
            "https://example.org/news/",
            &RecordAssembler::default(),
        );

        assert_eq!(result.diagnostics.tier, ItemTier::ItemSelector);
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.records[0].title, "A");
        assert_eq!(result.records[0].link.as_deref(), Some("https://example.org/news/a.html"));
        assert_eq!(result.records[1].raw_date_text, "2024-01-02");
    }

    #[test]
    fn test_nested_same_tag_wrappers_are_not_items() {
        let card = |title: &str, href: &str, date: &str| {
            el("div")
                .class("card")
                .child(el("div").class("head").child(el("a").attr("href", href).text(title)))
                .child(el("span").text(date))
        };
        let doc = FixtureDocument::page(vec![el("div").id("content").children(vec![
            card("One", "/1", "2024-01-01"),
            card("Two", "/2", "2024-01-02"),
            card("Three", "/3", "2024-01-03"),
        ])]);
        let result = extract(
            &doc.root(),
            &selectors("#content", "div", "span"),
            "https://example.org/",
            &RecordAssembler::default(),
        );

        assert_eq!(result.diagnostics.tier, ItemTier::ItemSelector);
        assert_eq!(result.diagnostics.candidates, 3);
        let titles: Vec<&str> = result.records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["One", "Two", "Three"]);
        assert!(result.records.iter().all(|r| r.date.is_some()));
    }

    #[test]
    fn test_direct_children_tier() {
        let doc = FixtureDocument::page(vec![el("ul").class("list").children(vec![
            dated_item("A", "/a", "2024-01-01"),
            dated_item("B", "/b", "2024-01-02"),
        ])]);
        let result = extract(
            &doc.root(),
            &selectors("ul.list", "li.entry", "span.time"),
            "https://example.org/",
            &RecordAssembler::default(),
        );

        assert_eq!(result.diagnostics.tier, ItemTier::DirectChildren);
        assert_eq!(result.records.len(), 2);
    }

    #[test]
    fn test_tag_family_tier_for_tables() {
        let rows: Vec<Element> = (1..=5)
            .map(|i| {
                el("tr")
                    .child(el("td").child(el("a").attr("href", &format!("/n/{}", i)).text(&format!("Row {}", i))))
                    .child(el("td").text(&format!("2024-02-0{}", i)))
            })
            .collect();
        let doc = FixtureDocument::page(vec![el("table").class("data").children(rows)]);
        let result = extract(
            &doc.root(),
            &selectors("table.data", "div.row", "td:nth-child(2)"),
            "https://example.org/",
            &RecordAssembler::default(),
        );

        assert_eq!(result.diagnostics.tier, ItemTier::TagFamily);
        assert_eq!(result.records.len(), 5);
        assert_eq!(result.records[4].raw_date_text, "2024-02-05");
    }

    #[test]
    fn test_link_ancestor_tier() {
        let doc = FixtureDocument::page(vec![el("section").id("feed").child(el("div").child(el("p").children(vec![
            el("a").attr("href", "/a").text("A"),
            el("a").attr("href", "/b").text("B"),
        ])))]);
        let container_only = FixtureDocument::page(vec![el("section").id("feed")]);

        let sel = selectors("#feed > div", "article", "time");
        let result = extract(&doc.root(), &sel, "https://example.org/", &RecordAssembler::default());
        // the <p> is the only child of the container, so the tag family tier catches it
        assert_eq!(result.diagnostics.tier, ItemTier::TagFamily);
        assert_eq!(result.records.len(), 1);

        let empty = extract(&container_only.root(), &selectors("#feed", "article", "time"), "", &RecordAssembler::default());
        assert!(empty.diagnostics.is_empty_extraction());
        assert!(empty.records.is_empty());
    }

    #[test]
    fn test_links_directly_under_container() {
        let doc = FixtureDocument::page(vec![el("nav").class("links").children(vec![
            el("a").attr("href", "/a").text("A 2024-01-01"),
            el("a").attr("href", "/b").text("B 2024-01-02"),
        ])]);
        let result = extract(
            &doc.root(),
            &selectors("nav.links", "li", "span.time"),
            "https://example.org/",
            &RecordAssembler::default(),
        );

        assert_eq!(result.diagnostics.tier, ItemTier::TagFamily);
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.records[1].link.as_deref(), Some("https://example.org/b"));
        assert_eq!(result.records[1].raw_date_text, "2024-01-02");
    }

    #[test]
    fn test_missing_container_falls_back_to_body() {
        let doc = FixtureDocument::page(vec![el("ul").children(vec![
            dated_item("A", "/a", "2024-01-01"),
            dated_item("B", "/b", "2024-01-02"),
        ])]);
        let result = extract(
            &doc.root(),
            &selectors("div.gone", "ul > li", "span.time"),
            "https://example.org/",
            &RecordAssembler::default(),
        );

        assert!(!result.diagnostics.container_found);
        assert_eq!(result.diagnostics.tier, ItemTier::ItemSelector);
        assert_eq!(result.records.len(), 2);
    }

    #[test]
    fn test_items_without_title_are_dropped() {
        let doc = FixtureDocument::page(vec![el("ul").class("list").children(vec![
            dated_item("A", "/a", "2024-01-01"),
            el("li").child(el("span").class("time").text("2024-01-02")),
            dated_item("C", "/c", "2024-01-03"),
        ])]);
        let result = extract(
            &doc.root(),
            &selectors("ul.list", "li", "span.time"),
            "https://example.org/",
            &RecordAssembler::default(),
        );

        assert_eq!(result.diagnostics.candidates, 3);
        assert_eq!(result.diagnostics.retained, 2);
        assert_eq!(result.diagnostics.rejected, 1);
        let titles: Vec<&str> = result.records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "C"]);
    }

    #[test]
    fn test_date_field_fallbacks() {
        let doc = FixtureDocument::page(vec![el("ul").class("list").children(vec![
            el("li").child(el("a").attr("href", "/a").text("A")).child(el("em").child(el("b").text("2024-01-01"))),
            el("li").text("2024-01-02 ").child(el("a").attr("href", "/b").text("B")),
        ])]);
        let result = extract(
            &doc.root(),
            &selectors("ul.list", "li", "span.time"),
            "https://example.org/",
            &RecordAssembler::default(),
        );

        assert_eq!(result.records[0].raw_date_text, "2024-01-01");
        assert_eq!(result.records[1].raw_date_text, "2024-01-02");
    }

    #[test]
    fn test_title_falls_back_to_link() {
        let doc = FixtureDocument::page(vec![el("ul").class("list").child(
            el("li").child(el("a").attr("href", "/a").text("Linked")).child(el("span").class("time").text("2024-01-01")),
        )]);
        let mut sel = selectors("ul.list", "li", "span.time");
        sel.title = "h3.title".to_string();

        let result = extract(&doc.root(), &sel, "https://example.org/", &RecordAssembler::default());
        assert_eq!(result.records[0].title, "Linked");
    }

    #[test]
    fn test_resolve_link() {
        let base = Url::parse("https://example.org/a/b/").unwrap();

        assert_eq!(resolve_link(Some(&base), "../x.html").as_deref(), Some("https://example.org/a/x.html"));
        assert_eq!(resolve_link(Some(&base), "https://other.org/y").as_deref(), Some("https://other.org/y"));
        assert_eq!(resolve_link(Some(&base), "javascript:void(0)"), None);
        assert_eq!(resolve_link(Some(&base), "  "), None);
        assert_eq!(resolve_link(None, "/relative"), None);
        assert_eq!(resolve_link(None, "https://other.org/z").as_deref(), Some("https://other.org/z"));
    }

    #[test]
    fn test_selector_helpers() {
        assert!(has_combinator("ul > li"));
        assert!(has_combinator("div.news ul li"));
        assert!(!has_combinator("li.item"));
        assert!(!has_combinator("li:not(.header)"));

        assert_eq!(subject_tag("li.item").as_deref(), Some("li"));
        assert_eq!(subject_tag("ul > li:nth-child(2)").as_deref(), Some("li"));
        assert_eq!(subject_tag(".item"), None);
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let doc = FixtureDocument::page(vec![el("ul").class("list").children(vec![
            dated_item("A", "/a", "2024-01-01"),
            dated_item("B", "/b", "N/A"),
        ])]);
        let sel = selectors("ul.list", "li", "span.time");
        let assembler = RecordAssembler::default();

        let first = extract(&doc.root(), &sel, "https://example.org/", &assembler);
        let second = extract(&doc.root(), &sel, "https://example.org/", &assembler);
        assert_eq!(first, second);
    }
}
