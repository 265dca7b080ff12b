//! Fetch → extract → feed, for one site or all of them.

use std::time::Duration;

use futures::future::join_all;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::{FeedBuilder, PageSource, RunSummary, Site, SiteReport};
use crate::dom::HtmlPage;
use crate::engine::{Engine, Extraction, SelectorSet};
use crate::error::{Error, Result};

/// Infer selectors from page HTML.
///
/// `start` is a selector for the node the operator points at; without one
/// the whole page is searched for the largest list.
pub fn infer_from_page(engine: &Engine, html: &str, start: Option<&str>) -> Result<SelectorSet> {
    let page = HtmlPage::parse(html);
    let inference = match start {
        Some(start) => {
            let node = page
                .select_first(start)
                .ok_or_else(|| Error::NotFound(format!("no element matches {:?}", start)))?;
            engine.infer(&node)?
        }
        None => engine.discover(&page.root())?,
    };

    debug!(
        "Inferred {:?} from {} item candidates",
        inference.selectors,
        inference.hypothesis.items.len()
    );
    Ok(inference.selectors)
}

pub fn extract_from_page(
    engine: &Engine,
    html: &str,
    selectors: &SelectorSet,
    base_url: &str,
) -> Extraction {
    let page = HtmlPage::parse(html);
    engine.extract(&page.root(), selectors, base_url)
}

/// Fetch one site, extract its records and write its feed.
pub async fn process_site(
    source: &dyn PageSource,
    engine: &Engine,
    site: &Site,
) -> Result<SiteReport> {
    info!("Updating {} from {}", site.name, site.url);
    let html = source.fetch_page(&site.url).await?;

    let page = HtmlPage::parse(&html);
    let extraction = engine.extract(&page.root(), &site.selectors, &site.url);
    let diagnostics = extraction.diagnostics.clone();

    if extraction.records.is_empty() {
        warn!("{}: no records extracted, writing an empty feed", site.name);
    }

    let records = extraction.records.len();
    FeedBuilder::new(site, page.title().as_deref(), page.description().as_deref())
        .records(extraction.records)
        .write_to(&site.output)?;

    info!(
        "{}: {} records written to {} ({} dropped)",
        site.name,
        records,
        site.output.display(),
        diagnostics.rejected
    );

    Ok(SiteReport {
        name: site.name.clone(),
        output: site.output.clone(),
        records,
        diagnostics,
    })
}

/// Process every site concurrently. A failing site never stops the others.
pub async fn update_all(source: &dyn PageSource, engine: &Engine, sites: &[Site]) -> RunSummary {
    let results = join_all(sites.iter().map(|site| async move {
        (site.name.clone(), process_site(source, engine, site).await)
    }))
    .await;

    let mut summary = RunSummary {
        succeeded: Vec::new(),
        failed: Vec::new(),
    };
    for (name, result) in results {
        match result {
            Ok(report) => summary.succeeded.push(report),
            Err(e) => {
                error!("{}: update failed: {}", name, e);
                summary.failed.push((name, e));
            }
        }
    }

    info!(
        "Updated {} of {} sites",
        summary.succeeded.len(),
        sites.len()
    );
    summary
}

/// Run [`update_all`] now and then every `period` until Ctrl-C.
pub async fn run_schedule(
    source: &dyn PageSource,
    engine: &Engine,
    sites: &[Site],
    period: Duration,
) -> Result<()> {
    if period.is_zero() {
        return Err(Error::Config("schedule interval must be positive".to_string()));
    }

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!("Watching {} sites every {:?}", sites.len(), period);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                update_all(source, engine, sites).await;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl-C, stopping");
                return Ok(());
            }
        }
    }
}
