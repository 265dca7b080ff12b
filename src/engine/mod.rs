//! List-container classification, selector synthesis and resilient extraction.
//!
//! Control flow for a fresh page:
//! start node → [`classifier`] → container → [`synthesizer`] → [`SelectorSet`].
//! A stored or hand-edited `SelectorSet` goes straight to [`extractor`], which
//! hands raw fields to the [`assembler`] and returns validated [`Record`]s in
//! document order.
//!
//! Nothing in here fails on a scraping condition. Missing containers, empty
//! schemas, rejected items and unparsable dates are all reported through
//! return values.

pub mod assembler;
pub mod classifier;
pub mod date_shape;
pub mod dates;
pub mod extractor;
pub mod synthesizer;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dom::DomNode;

pub use assembler::{Rejection, RecordAssembler};
pub use classifier::Classifier;
pub use dates::{DateParser, FormatDateParser};
pub use extractor::{Extraction, ExtractionDiagnostics, ItemTier};

/// Selectors describing where one site keeps its list and fields.
///
/// `item` is evaluated inside the container unless it contains a combinator,
/// `title`, `link` and `date` are evaluated inside each item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorSet {
    pub container: String,
    pub item: String,
    pub title: String,
    pub link: String,
    pub date: String,
}

/// Evidence gathered while classifying a container.
#[derive(Debug, Clone)]
pub struct ListShapeHypothesis<N> {
    pub container: N,
    pub items: Vec<N>,
    pub id_matched: bool,
    pub class_matched: bool,
    pub structural_valid_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Title,
    Link,
    Date,
}

/// One field as read from the page, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawField {
    pub kind: FieldKind,
    pub text: String,
    /// Resolved `href` for link fields.
    pub attribute_value: Option<String>,
}

/// A validated list entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub title: String,
    /// Absolute URL. Relative hrefs that could not be resolved are dropped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<FixedOffset>>,
    pub raw_date_text: String,
}

impl Record {
    /// The item carried date text that could not be parsed.
    pub fn has_unparsed_date(&self) -> bool {
        self.date.is_none() && !self.raw_date_text.is_empty()
    }
}

/// Heuristic knobs shared by the classifier and the synthesizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// How many leading children the structural test samples.
    pub sample_size: usize,
    /// Sampled children that must carry a link and a date.
    pub min_valid: usize,
    pub min_children: usize,
    pub max_path_segments: usize,
    pub container_classes: Vec<String>,
    /// Class tokens containing any of these are treated as transient state.
    pub volatile_class_markers: Vec<String>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            sample_size: 3,
            min_valid: 2,
            min_children: 3,
            max_path_segments: 6,
            container_classes: vec![
                "list".to_string(),
                "news-list".to_string(),
                "items".to_string(),
            ],
            volatile_class_markers: vec![
                "active".to_string(),
                "hover".to_string(),
                "current".to_string(),
                "auto-highlight".to_string(),
            ],
        }
    }
}

impl EngineOptions {
    /// Add site-specific container class aliases.
    pub fn with_container_classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for class in classes {
            let class = class.into();
            if !self.container_classes.contains(&class) {
                self.container_classes.push(class);
            }
        }
        self
    }

    pub fn is_volatile_class(&self, class: &str) -> bool {
        class.starts_with("js-")
            || self
                .volatile_class_markers
                .iter()
                .any(|marker| class.contains(marker.as_str()))
    }
}

/// Why no selectors could be inferred from a start node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InferenceFailure {
    #[error("no list container between the start node and the document body")]
    NoContainerFound,

    #[error("container {container} has no item candidates")]
    NoSchemaInferred { container: String },
}

/// Result of a successful inference.
#[derive(Debug, Clone)]
pub struct Inference<N> {
    pub hypothesis: ListShapeHypothesis<N>,
    pub selectors: SelectorSet,
}

/// Stateless facade bundling options and record assembly.
pub struct Engine {
    options: EngineOptions,
    assembler: RecordAssembler,
}

impl Engine {
    pub fn new(options: EngineOptions, offset: FixedOffset) -> Self {
        Self {
            options,
            assembler: RecordAssembler::new(offset),
        }
    }

    pub fn with_assembler(options: EngineOptions, assembler: RecordAssembler) -> Self {
        Self { options, assembler }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn assembler(&self) -> &RecordAssembler {
        &self.assembler
    }

    /// Classify from `start` and synthesize selectors for the container found.
    pub fn infer<N: DomNode>(&self, start: &N) -> Result<Inference<N>, InferenceFailure> {
        let hypothesis = classifier::classify_hypothesis(start, &self.options)
            .ok_or(InferenceFailure::NoContainerFound)?;
        self.complete(hypothesis)
    }

    /// Pick the best container on the whole page and synthesize its selectors.
    pub fn discover<N: DomNode>(&self, root: &N) -> Result<Inference<N>, InferenceFailure> {
        let hypothesis = classifier::discover(root, &self.options)
            .ok_or(InferenceFailure::NoContainerFound)?;
        self.complete(hypothesis)
    }

    fn complete<N: DomNode>(
        &self,
        hypothesis: ListShapeHypothesis<N>,
    ) -> Result<Inference<N>, InferenceFailure> {
        match synthesizer::synthesize(&hypothesis.container, &self.options) {
            Some(selectors) => Ok(Inference {
                hypothesis,
                selectors,
            }),
            None => Err(InferenceFailure::NoSchemaInferred {
                container: synthesizer::container_selector(&hypothesis.container, &self.options),
            }),
        }
    }

    pub fn extract<N: DomNode>(
        &self,
        document: &N,
        selectors: &SelectorSet,
        base_url: &str,
    ) -> Extraction {
        extractor::extract(document, selectors, base_url, &self.assembler)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineOptions::default(), assembler::default_offset())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::fixture::{el, FixtureDocument};

    #[test]
    fn test_volatile_classes() {
        let options = EngineOptions::default();

        assert!(options.is_volatile_class("active"));
        assert!(options.is_volatile_class("nav-current"));
        assert!(options.is_volatile_class("js-toggle"));
        assert!(options.is_volatile_class("auto-highlight"));
        assert!(!options.is_volatile_class("news"));
    }

    #[test]
    fn test_container_class_aliases() {
        let options = EngineOptions::default().with_container_classes(["kjj_list", "list"]);

        assert_eq!(options.container_classes, vec!["list", "news-list", "items", "kjj_list"]);
    }

    #[test]
    fn test_infer_reports_missing_container() {
        let doc = FixtureDocument::page(vec![el("div").child(el("p").text("nothing here"))]);
        let engine = Engine::default();

        let start = doc.find("p").unwrap();
        assert_eq!(engine.infer(&start).unwrap_err(), InferenceFailure::NoContainerFound);
    }

    #[test]
    fn test_infer_reports_empty_schema() {
        let doc = FixtureDocument::page(vec![el("div").class("list").child(el("p").text("no links"))]);
        let engine = Engine::default();

        let start = doc.find("p").unwrap();
        match engine.infer(&start) {
            Err(InferenceFailure::NoSchemaInferred { container }) => {
                assert_eq!(container, "div.list");
            }
            other => panic!("unexpected inference result: {:?}", other.map(|i| i.selectors)),
        }
    }

    #[test]
    fn test_record_unparsed_date() {
        let record = Record {
            title: "A".to_string(),
            link: None,
            date: None,
            raw_date_text: "N/A".to_string(),
        };
        assert!(record.has_unparsed_date());
    }
}
