use thiserror::Error;

/// Errors that stop a harvest run or a single stage of it.
#[derive(Error, Debug)]
pub enum HarvestError {
    /// An HTTP request could not be completed.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// A required environment variable is unset or blank.
    #[error("missing credential: {0} is not set")]
    MissingCredential(&'static str),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("enrichment failed: {0}")]
    Enrich(#[from] EnrichError),
}

/// Failures of the enrichment round trip. All of them are per-item.
#[derive(Error, Debug)]
pub enum EnrichError {
    #[error("completion request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("completion service returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("completion service returned no message content")]
    EmptyReply,
    #[error("malformed reply: {0}")]
    Format(#[from] ReplyFormatError),
}

/// Why a reply did not match `Primary Category: X @ Secondary Category: Y @ Summary: Z`.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReplyFormatError {
    #[error("no '{0}' label found")]
    MissingLabel(&'static str),
    #[error("expected 3 '@'-separated segments, found {0}")]
    SegmentCount(usize),
    #[error("segment {index} has no ':' separator")]
    MissingColon { index: usize },
    #[error("segment {index} is labelled '{found}', expected '{expected}'")]
    UnexpectedLabel {
        index: usize,
        expected: &'static str,
        found: String,
    },
    #[error("'{0}' value is empty")]
    EmptyValue(&'static str),
}

pub type Result<T> = std::result::Result<T, HarvestError>;
