use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{HarvestError, Result};

pub const DEFAULT_LISTING_URL: &str = "https://devpost.com/software/search";
pub const DEFAULT_OUTPUT_FILE: &str = "project_data.csv";
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_MAX_PAGES: usize = 5;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const API_KEY_VAR: &str = "GROQ_API_KEY";

/// The closed category vocabulary offered to the completion service.
pub const CATEGORIES: &[&str] = &[
    "Mobile Apps",
    "Web Apps",
    "Desktop Apps",
    "Game Development",
    "Virtual Reality (VR)",
    "Augmented Reality (AR)",
    "AI/Artificial Intelligence",
    "Machine Learning (ML)",
    "Natural Language Processing (NLP)",
    "Robotics",
    "IoT (Internet of Things)",
    "Wearables",
    "Bio-Tech/Health-Tech",
    "FinTech (Financial Technology)",
    "EduTech (Educational Technology)",
    "Blockchain/Web3",
    "Cybersecurity",
    "Data Science/Analytics",
    "Cloud Computing",
    "Big Data",
    "Environmental Tech",
    "Digital Art",
    "Social Impact",
    "Hardware Development (Arduino/Raspberry Pi)",
    "Embedded Systems",
    "Quantum Computing",
    "3D Printing",
    "Chatbots",
    "Geospatial Data/GIS",
    "Supply Chain/Logistics",
    "LegalTech",
    "GovTech",
    "Marketing Tech",
    "Human-Computer Interaction",
    "Content Creation",
    "AgriTech",
    "Energy Tech",
    "Transportation Tech",
];

pub fn is_known_category(name: &str) -> bool {
    CATEGORIES.iter().any(|c| c.eq_ignore_ascii_case(name.trim()))
}

/// Which slice of the discovered link set the orchestrator processes.
/// `end` is exclusive; `None` means "to the end".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ItemRange {
    pub start: usize,
    pub end: Option<usize>,
}

impl ItemRange {
    pub fn new(start: usize, end: Option<usize>) -> Self {
        ItemRange { start, end }
    }

    /// Clamp the range to `items`; never panics on out-of-bounds values.
    pub fn select<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let end = self.end.unwrap_or(items.len()).min(items.len());
        let start = self.start.min(end);
        &items[start..end]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestConfig {
    pub listing_url: String,
    pub max_pages: usize,
    pub range: ItemRange,
    pub output: PathBuf,
    pub model: String,
    pub api_url: String,
    pub timeout_secs: u64,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub progress_file: Option<PathBuf>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        HarvestConfig {
            listing_url: DEFAULT_LISTING_URL.to_string(),
            max_pages: DEFAULT_MAX_PAGES,
            range: ItemRange::default(),
            output: PathBuf::from(DEFAULT_OUTPUT_FILE),
            model: DEFAULT_MODEL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            min_delay_ms: 0,
            max_delay_ms: 0,
            progress_file: None,
        }
    }
}

impl HarvestConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_pages == 0 {
            return Err(HarvestError::Config("max_pages must be at least 1".into()));
        }
        if let Some(end) = self.range.end {
            if end <= self.range.start {
                return Err(HarvestError::Config(format!(
                    "item range {}..{} is empty",
                    self.range.start, end
                )));
            }
        }
        if self.min_delay_ms > self.max_delay_ms {
            return Err(HarvestError::Config(format!(
                "min delay {}ms exceeds max delay {}ms",
                self.min_delay_ms, self.max_delay_ms
            )));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Load `.env` if present, then read the completion service key from the environment.
pub fn resolve_api_key() -> Result<String> {
    dotenvy::dotenv().ok();
    api_key_from(env::var(API_KEY_VAR).ok())
}

fn api_key_from(value: Option<String>) -> Result<String> {
    match value {
        Some(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
        _ => Err(HarvestError::MissingCredential(API_KEY_VAR)),
    }
}
