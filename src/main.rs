use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use devpost_harvester::config::{
    self, DEFAULT_API_URL, DEFAULT_LISTING_URL, DEFAULT_MAX_PAGES, DEFAULT_MODEL,
    DEFAULT_OUTPUT_FILE, DEFAULT_TIMEOUT_SECS,
};
use devpost_harvester::{harvest, logger, ChatCompletionClient, HarvestConfig, HttpFetcher, ItemRange};

#[derive(Parser)]
#[command(name = "devpost_harvester", about = "Scrape Devpost projects, categorize them with an LLM, append to CSV")]
struct Cli {
    /// Paginated project listing to walk
    #[arg(long, default_value = DEFAULT_LISTING_URL)]
    listing_url: String,
    /// Upper bound on listing pages fetched
    #[arg(long, default_value_t = DEFAULT_MAX_PAGES)]
    max_pages: usize,
    /// First discovered project to process (0-based)
    #[arg(long, default_value_t = 0)]
    start: usize,
    /// Stop before this project index (default: process to the end)
    #[arg(long)]
    end: Option<usize>,
    /// CSV file rows are appended to
    #[arg(short, long, default_value = DEFAULT_OUTPUT_FILE)]
    output: PathBuf,
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,
    #[arg(long, default_value = DEFAULT_API_URL)]
    api_url: String,
    /// Per-request HTTP timeout
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,
    #[arg(long, default_value_t = 0)]
    min_delay_ms: u64,
    #[arg(long, default_value_t = 0)]
    max_delay_ms: u64,
    /// JSON ledger of processed URLs; enables resuming
    #[arg(long)]
    progress_file: Option<PathBuf>,
}

impl From<Cli> for HarvestConfig {
    fn from(cli: Cli) -> Self {
        HarvestConfig {
            listing_url: cli.listing_url,
            max_pages: cli.max_pages,
            range: ItemRange::new(cli.start, cli.end),
            output: cli.output,
            model: cli.model,
            api_url: cli.api_url,
            timeout_secs: cli.timeout_secs,
            min_delay_ms: cli.min_delay_ms,
            max_delay_ms: cli.max_delay_ms,
            progress_file: cli.progress_file,
        }
    }
}

fn run(config: HarvestConfig) -> devpost_harvester::Result<()> {
    // `harvest` validates too; this check must also run before the credential lookup.
    config.validate()?;
    let api_key = config::resolve_api_key()?;

    let fetcher = HttpFetcher::new(config.timeout())?;
    let service = ChatCompletionClient::new(&config.api_url, api_key, &config.model, config.timeout())?;

    let stats = harvest(&config, &fetcher, &service)?;
    info!(
        "Saved {} of {} selected projects to {}",
        stats.persisted,
        stats.selected,
        config.output.display()
    );
    Ok(())
}

fn main() -> ExitCode {
    logger::init();
    info!("Starting Devpost harvester...");

    let config = HarvestConfig::from(Cli::parse());
    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Harvest aborted: {}", e);
            ExitCode::FAILURE
        }
    }
}
