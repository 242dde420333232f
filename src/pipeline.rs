use log::{info, warn};
use serde::Serialize;

use crate::config::{HarvestConfig, ItemRange};
use crate::delay_manager::PolitenessDelay;
use crate::discovery::LinkDiscoverer;
use crate::enricher::{CompletionService, Enricher};
use crate::error::Result;
use crate::extractor::PageExtractor;
use crate::fetcher::Fetcher;
use crate::persister::CsvPersister;
use crate::resume_manager::ProgressState;

/// Terminal state of one link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Persisted,
    SkippedFetch,
    SkippedEnrich,
    SkippedResumed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub discovered: usize,
    pub selected: usize,
    pub persisted: usize,
    pub skipped_fetch: usize,
    pub skipped_enrich: usize,
    pub skipped_resumed: usize,
}

impl RunStats {
    fn record(&mut self, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Persisted => self.persisted += 1,
            ItemOutcome::SkippedFetch => self.skipped_fetch += 1,
            ItemOutcome::SkippedEnrich => self.skipped_enrich += 1,
            ItemOutcome::SkippedResumed => self.skipped_resumed += 1,
        }
    }
}

/// Drives links through extract -> enrich -> persist, one at a time.
///
/// Fetch and enrichment failures skip the item. Persistence and ledger
/// failures abort the run.
pub struct Orchestrator<'a> {
    extractor: PageExtractor<'a>,
    enricher: Enricher<'a>,
    persister: CsvPersister,
    delay: PolitenessDelay,
    progress: Option<ProgressState>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(extractor: PageExtractor<'a>, enricher: Enricher<'a>, persister: CsvPersister) -> Self {
        Orchestrator {
            extractor,
            enricher,
            persister,
            delay: PolitenessDelay::default(),
            progress: None,
        }
    }

    pub fn with_delay(mut self, delay: PolitenessDelay) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_progress(mut self, progress: ProgressState) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn run(&mut self, links: &[String], range: ItemRange) -> Result<RunStats> {
        let selected = range.select(links);
        let total = selected.len();
        let mut stats = RunStats { discovered: links.len(), selected: total, ..RunStats::default() };
        info!(
            "Processing {} of {} discovered projects into {}",
            total,
            links.len(),
            self.persister.path().display()
        );

        let mut fetched_any = false;
        for (i, url) in selected.iter().enumerate() {
            if self.progress.as_ref().is_some_and(|p| p.contains(url)) {
                info!("Skipping {} / {} : {} (already processed)", i + 1, total, url);
                stats.record(ItemOutcome::SkippedResumed);
                continue;
            }

            if fetched_any {
                self.delay.wait();
            }
            fetched_any = true;

            info!("Processing {} / {} : {}", i + 1, total, url);
            let outcome = self.process(url)?;
            stats.record(outcome);
        }

        info!(
            "Run complete: {} persisted, {} fetch failures, {} enrichment failures, {} already done.",
            stats.persisted, stats.skipped_fetch, stats.skipped_enrich, stats.skipped_resumed
        );
        Ok(stats)
    }

    /// Pending -> Fetched -> Extracted -> Enriched -> Persisted, or an early skip.
    fn process(&mut self, url: &str) -> Result<ItemOutcome> {
        let Some(record) = self.extractor.extract(url) else {
            return Ok(ItemOutcome::SkippedFetch);
        };

        let enriched = match self.enricher.enrich(record) {
            Ok(enriched) => enriched,
            Err(e) => {
                warn!("Skipping {}: {}", url, e);
                return Ok(ItemOutcome::SkippedEnrich);
            }
        };

        self.persister.append(&enriched)?;
        if let Some(progress) = self.progress.as_mut() {
            progress.mark_complete(url)?;
        }
        Ok(ItemOutcome::Persisted)
    }
}

/// Discover links, then process the configured range of them.
pub fn harvest(
    config: &HarvestConfig,
    fetcher: &dyn Fetcher,
    service: &dyn CompletionService,
) -> Result<RunStats> {
    config.validate()?;

    let discoverer = LinkDiscoverer::new(fetcher, &config.listing_url)?;
    let links = discoverer.discover(config.max_pages);
    info!("Total Unique Projects Found: {}", links.len());

    let mut orchestrator = Orchestrator::new(
        PageExtractor::new(fetcher),
        Enricher::new(service),
        CsvPersister::new(&config.output),
    )
    .with_delay(PolitenessDelay::new(config.min_delay_ms, config.max_delay_ms));

    if let Some(path) = &config.progress_file {
        orchestrator = orchestrator.with_progress(ProgressState::load(path));
    }

    orchestrator.run(&links, config.range)
}
