//! Finds the list container enclosing a start node.
//!
//! The walk goes from the start node up its parent chain and stops at the
//! first (innermost) qualifying element. `<body>` and everything above it are
//! never containers.

use tracing::debug;

use super::{date_shape, synthesizer, EngineOptions, ListShapeHypothesis};
use crate::dom::{push_unique, DomNode};

const ID_KEYWORDS: &[&str] = &["list", "container", "wrap"];

/// The three signals the container test looks at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Evidence {
    pub id_matched: bool,
    pub class_matched: bool,
    pub structural_valid_count: usize,
    pub structural_matched: bool,
}

impl Evidence {
    pub fn qualifies(&self) -> bool {
        self.id_matched || self.class_matched || self.structural_matched
    }
}

/// Score one node against the container heuristic.
pub fn evaluate<N: DomNode>(node: &N, options: &EngineOptions) -> Evidence {
    let id_matched = node
        .id()
        .map(|id| {
            let id = id.to_lowercase();
            ID_KEYWORDS.iter().any(|keyword| id.contains(keyword))
        })
        .unwrap_or(false);

    let class_matched = node
        .classes()
        .iter()
        .any(|class| options.container_classes.iter().any(|known| known == class));

    let children = node.children();
    let structural_valid_count = if children.len() >= options.min_children {
        children
            .iter()
            .take(options.sample_size)
            .filter(|child| child.has_link() && date_shape::matches(&child.text()))
            .count()
    } else {
        0
    };

    Evidence {
        id_matched,
        class_matched,
        structural_valid_count,
        structural_matched: children.len() >= options.min_children
            && structural_valid_count >= options.min_valid,
    }
}

pub fn is_list_container<N: DomNode>(node: &N, options: &EngineOptions) -> bool {
    evaluate(node, options).qualifies()
}

/// Nodes the walk may test: `start` and its ancestors, up to but excluding body.
fn candidate_chain<N: DomNode>(start: &N) -> impl Iterator<Item = N> {
    std::iter::once(start.clone())
        .chain(start.ancestors())
        .take_while(|node| !node.is_body() && node.parent().is_some())
}

/// Innermost qualifying ancestor-or-self of `start`.
pub fn classify<N: DomNode>(start: &N, options: &EngineOptions) -> Option<N> {
    classify_hypothesis(start, options).map(|hypothesis| hypothesis.container)
}

pub fn classify_hypothesis<N: DomNode>(
    start: &N,
    options: &EngineOptions,
) -> Option<ListShapeHypothesis<N>> {
    candidate_chain(start).find_map(|node| {
        let evidence = evaluate(&node, options);
        if !evidence.qualifies() {
            return None;
        }
        debug!(
            "Container <{}> qualifies (id: {}, class: {}, structural: {}/{})",
            node.tag(),
            evidence.id_matched,
            evidence.class_matched,
            evidence.structural_valid_count,
            options.sample_size
        );
        Some(hypothesis(node, evidence))
    })
}

fn hypothesis<N: DomNode>(container: N, evidence: Evidence) -> ListShapeHypothesis<N> {
    let items = synthesizer::item_candidates(&container);
    ListShapeHypothesis {
        container,
        items,
        id_matched: evidence.id_matched,
        class_matched: evidence.class_matched,
        structural_valid_count: evidence.structural_valid_count,
    }
}

/// Classify from every hyperlink on the page and keep the container with
/// the most item candidates. Ties go to the container found first.
pub fn discover<N: DomNode>(root: &N, options: &EngineOptions) -> Option<ListShapeHypothesis<N>> {
    let mut containers: Vec<N> = Vec::new();
    for link in root.query("a") {
        if let Some(container) = link.parent().and_then(|parent| classify(&parent, options)) {
            push_unique(&mut containers, container);
        }
    }

    let mut best: Option<ListShapeHypothesis<N>> = None;
    for container in containers {
        let candidate = hypothesis(container.clone(), evaluate(&container, options));
        if candidate.items.is_empty() {
            continue;
        }
        let better = best
            .as_ref()
            .map_or(true, |current| candidate.items.len() > current.items.len());
        if better {
            best = Some(candidate);
        }
    }

    if let Some(found) = &best {
        debug!(
            "Discovered <{}> container with {} items",
            found.container.tag(),
            found.items.len()
        );
    }
    best
}

/// Tracks the container under a moving pointer.
///
/// Interactive pickers hover over many nodes; this keeps the last container
/// they resolved to as explicit caller-owned state.
#[derive(Debug)]
pub struct Classifier<N> {
    options: EngineOptions,
    last: Option<N>,
}

impl<N: DomNode> Classifier<N> {
    pub fn new(options: EngineOptions) -> Self {
        Self {
            options,
            last: None,
        }
    }

    /// Classify from `hovered`; returns the container when it differs from
    /// the previously tracked one.
    pub fn track(&mut self, hovered: &N) -> Option<&N> {
        let container = classify(hovered, &self.options)?;
        if self.last.as_ref() == Some(&container) {
            return None;
        }
        self.last = Some(container);
        self.last.as_ref()
    }

    pub fn current(&self) -> Option<&N> {
        self.last.as_ref()
    }

    pub fn clear(&mut self) {
        self.last = None;
    }
}
