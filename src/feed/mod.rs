pub mod builder;
pub mod fetcher;
pub mod pipeline;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::engine::{ExtractionDiagnostics, SelectorSet};

pub use builder::FeedBuilder;
pub use fetcher::{PageFetcher, PageSource};

fn default_language() -> String {
    "zh-CN".to_string()
}

/// One scraped list page and where its feed goes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub name: String,
    pub url: String,
    /// Path of the RSS file, relative paths resolve against the working directory.
    pub output: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
    pub selectors: SelectorSet,
}

impl Site {
    pub fn new(name: &str, url: &str, output: impl Into<PathBuf>, selectors: SelectorSet) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            output: output.into(),
            title: None,
            description: None,
            language: default_language(),
            selectors,
        }
    }
}

/// Outcome of processing one site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteReport {
    pub name: String,
    pub output: PathBuf,
    pub records: usize,
    pub diagnostics: ExtractionDiagnostics,
}

impl SiteReport {
    pub fn dropped(&self) -> usize {
        self.diagnostics.rejected
    }
}

#[derive(Debug)]
pub struct RunSummary {
    pub succeeded: Vec<SiteReport>,
    pub failed: Vec<(String, crate::error::Error)>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}
