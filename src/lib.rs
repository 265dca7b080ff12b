pub mod cli;
pub mod config;
pub mod dom;
pub mod engine;
pub mod error;
pub mod feed;

pub use config::Config;
pub use engine::{Engine, EngineOptions, Extraction, Record, SelectorSet};
pub use error::{Error, Result};
