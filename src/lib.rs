pub mod config;
pub mod delay_manager;
pub mod discovery;
pub mod enricher;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod logger;
pub mod persister;
pub mod pipeline;
pub mod resume_manager;

// Exporting types for convenience
pub use config::{HarvestConfig, ItemRange};
pub use discovery::LinkDiscoverer;
pub use enricher::{ChatCompletionClient, CompletionService, EnrichedRecord, Enricher};
pub use error::{EnrichError, HarvestError, ReplyFormatError, Result};
pub use extractor::{PageExtractor, ProjectRecord};
pub use fetcher::{FetchedPage, Fetcher, HttpFetcher};
pub use persister::CsvPersister;
pub use pipeline::{harvest, Orchestrator, RunStats};
pub use resume_manager::ProgressState;
