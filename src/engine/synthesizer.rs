//! Derives reusable selectors from a classified container.
//!
//! Item selectors follow a specificity ladder: a uniform tag on its own, then
//! the tag plus the classes every item shares, then `container > item`.

use tracing::debug;

use super::{date_shape, EngineOptions, SelectorSet};
use crate::dom::{push_unique, DomNode};

/// Tags whose rows are the items rather than their direct children.
const TABULAR_WRAPPERS: &[&str] = &["tbody", "table"];
/// Tags tried when no direct child looks like an item.
const SECONDARY_ITEM_TAGS: &[&str] = &["li", "tr", "div"];
const POSITIONAL_DATE_FALLBACK: &str = "td:nth-child(2)";

pub fn synthesize<N: DomNode>(container: &N, options: &EngineOptions) -> Option<SelectorSet> {
    let items = item_candidates(container);
    let Some(sample) = items.first() else {
        debug!("No item candidates under <{}>", container.tag());
        return None;
    };

    let selectors = SelectorSet {
        container: container_selector(container, options),
        item: item_selector(container, &items, options),
        title: title_selector(sample, options),
        link: "a".to_string(),
        date: date_selector(sample, options),
    };
    debug!("Synthesized selectors: {:?}", selectors);
    Some(selectors)
}

/// Path from the nearest stable ancestor down to `container`, joined with `>`.
///
/// Segments use the child combinator rather than descendant matching, so the
/// path is stricter than `div.main ul.list` and breaks if a wrapper is
/// inserted between two segments. The walk stops at `<body>`, at the first
/// usable id, or after `max_path_segments` segments, whichever comes first.
pub fn container_selector<N: DomNode>(container: &N, options: &EngineOptions) -> String {
    let mut segments = Vec::new();
    let mut current = Some(container.clone());

    while let Some(node) = current {
        if node.is_body() || node.parent().is_none() || segments.len() >= options.max_path_segments {
            break;
        }
        if let Some(id) = node.id().filter(|id| is_stable_id(id)) {
            segments.push(format!("#{}", id));
            break;
        }

        let mut segment = tag_with_classes(&node, options);
        if node.sibling_count() > 1 {
            if let Some(position) = node.index_in_parent() {
                segment.push_str(&format!(":nth-child({})", position));
            }
        }
        segments.push(segment);
        current = node.parent();
    }

    if segments.is_empty() {
        return container.tag().to_string();
    }
    segments.reverse();
    segments.join(" > ")
}

/// Item-like descendants of `container`, in document order.
pub fn item_candidates<N: DomNode>(container: &N) -> Vec<N> {
    let rows = if TABULAR_WRAPPERS.contains(&container.tag()) {
        container.query("tr")
    } else {
        container.children()
    };
    let direct: Vec<N> = rows.into_iter().filter(is_dated_link_holder).collect();
    if !direct.is_empty() {
        return direct;
    }

    let secondary: Vec<N> = container
        .query("*")
        .into_iter()
        .filter(|node| SECONDARY_ITEM_TAGS.contains(&node.tag()) && is_dated_link_holder(node))
        .collect();
    if !secondary.is_empty() {
        debug!("Secondary detection found {} items", secondary.len());
        return secondary;
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
        debug!("Falling back to {} link holders", holders.len());
    }
    holders
}

fn is_dated_link_holder<N: DomNode>(node: &N) -> bool {
    node.has_link() && date_shape::matches(&node.text())
}

pub fn item_selector<N: DomNode>(container: &N, items: &[N], options: &EngineOptions) -> String {
    let Some(first) = items.first() else {
        return fallback_item_tag(container).to_string();
    };

    if items.iter().all(|item| item.tag() == first.tag()) {
        return first.tag().to_string();
    }

    let common: Vec<&str> = usable_classes(first, options)
        .into_iter()
        .filter(|class| items.iter().all(|item| item.has_class(class)))
        .collect();
    if !common.is_empty() {
        return format!("{}.{}", first.tag(), common.join("."));
    }

    format!("{} > {}", container.tag(), first.tag())
}

/// Item tag implied by the container's own tag.
pub fn fallback_item_tag<N: DomNode>(container: &N) -> &'static str {
    match container.tag() {
        "table" | "tbody" | "thead" => "tr",
        "ul" | "ol" => "li",
        _ => "div",
    }
}

fn title_selector<N: DomNode>(item: &N, options: &EngineOptions) -> String {
    let anchor_has_text = item
        .first("a")
        .map(|anchor| !anchor.text().trim().is_empty())
        .unwrap_or(false);
    if anchor_has_text {
        return "a".to_string();
    }

    item.query("*")
        .into_iter()
        .find(|node| {
            let is_heading = matches!(node.tag(), "h1" | "h2" | "h3" | "h4" | "h5" | "h6");
            let is_titled = node.classes().iter().any(|class| class.contains("title"));
            (is_heading || is_titled) && !node.text().trim().is_empty()
        })
        .map(|node| field_selector(item, &node, options))
        .unwrap_or_else(|| "a".to_string())
}

fn date_selector<N: DomNode>(item: &N, options: &EngineOptions) -> String {
    if item.tag() == "tr" {
        let second_cell_is_dated = item
            .children()
            .get(1)
            .map(|cell| date_shape::matches(&cell.text()))
            .unwrap_or(false);
        if second_cell_is_dated {
            return POSITIONAL_DATE_FALLBACK.to_string();
        }
    }

    let descendants = item.query("*");

    if descendants.iter().any(|node| node.tag() == "time") {
        return "time".to_string();
    }
    for node in descendants.iter().filter(|node| node.tag() == "span") {
        if let Some(class) = node.classes().into_iter().find(|c| c.contains("time") && is_selector_ident(c)) {
            return format!("span.{}", class);
        }
    }

    let dated = item
        .children()
        .into_iter()
        .find(|child| date_shape::matches(&child.text()))
        .or_else(|| {
            descendants
                .iter()
                .find(|node| date_shape::matches(&node.text()))
                .cloned()
        });
    if let Some(node) = dated {
        return field_selector(item, &innermost_dated(node), options);
    }

    if let Some(node) = descendants.iter().find(|node| date_shape::has_digit(&node.text())) {
        return field_selector(item, node, options);
    }

    POSITIONAL_DATE_FALLBACK.to_string()
}

/// Descend while exactly one path keeps the date-shaped text.
pub(crate) fn innermost_dated<N: DomNode>(mut node: N) -> N {
    while let Some(child) = node
        .children()
        .into_iter()
        .find(|child| date_shape::matches(&child.text()))
    {
        node = child;
    }
    node
}

/// Selector that finds `node` first when queried from `item`.
///
/// Starts from the node's own tag and classes. When that hits an earlier
/// element, positions are added and parent segments prepended until the
/// selector lands on `node`.
fn field_selector<N: DomNode>(item: &N, node: &N, options: &EngineOptions) -> String {
    let plain = relative_path(node, options);
    if item.first(&plain).as_ref() == Some(node) {
        return plain;
    }

    let mut segments: Vec<String> = Vec::new();
    let mut current = node.clone();
    while current != *item {
        let mut segment = relative_path(&current, options);
        if !segment.contains(":nth-child(") {
            if let Some(position) = current.index_in_parent() {
                segment.push_str(&format!(":nth-child({})", position));
            }
        }
        segments.insert(0, segment);

        let candidate = segments.join(" > ");
        if item.first(&candidate).as_ref() == Some(node) {
            return candidate;
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => break,
        }
    }

    debug!("No selector singles out <{}> inside its item, using {:?}", node.tag(), plain);
    plain
}

/// Selector for a field node, relative to its item.
fn relative_path<N: DomNode>(node: &N, options: &EngineOptions) -> String {
    match node.tag() {
        "a" => return "a".to_string(),
        "td" | "th" => {
            if let Some(position) = node.index_in_parent() {
                return format!("{}:nth-child({})", node.tag(), position);
            }
        }
        _ => {}
    }
    if let Some(id) = node.id().filter(|id| is_stable_id(id)) {
        return format!("#{}", id);
    }
    tag_with_classes(node, options)
}

fn tag_with_classes<N: DomNode>(node: &N, options: &EngineOptions) -> String {
    let mut selector = node.tag().to_string();
    for class in usable_classes(node, options) {
        selector.push('.');
        selector.push_str(class);
    }
    selector
}

fn usable_classes<'n, N: DomNode>(node: &'n N, options: &EngineOptions) -> Vec<&'n str> {
    node.classes()
        .into_iter()
        .filter(|class| !options.is_volatile_class(class) && is_selector_ident(class))
        .collect()
}

/// Ids containing digits tend to be generated per render.
fn is_stable_id(id: &str) -> bool {
    is_selector_ident(id) && !id.chars().any(|c| c.is_ascii_digit())
}

/// Tokens that can be written into a selector without escaping.
fn is_selector_ident(token: &str) -> bool {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' || first == '-' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '-' || c == '_')
}
