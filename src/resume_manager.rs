use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use log::{info, error};

use crate::error::Result;

/// Ledger of project URLs already persisted, so a rerun does not append them twice.
#[derive(Serialize, Deserialize, Default, Debug)]
pub struct ProgressState {
    pub processed_urls: HashSet<String>,
    #[serde(skip)]
    path: PathBuf,
}

impl ProgressState {
    /// Load the ledger at `path`. A missing or corrupt file starts fresh.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let mut state = if path.exists() {
            match fs::read_to_string(&path).map(|content| serde_json::from_str::<ProgressState>(&content)) {
                Ok(Ok(state)) => {
                    info!("Resumed previous session: {} projects processed.", state.processed_urls.len());
                    state
                }
                Ok(Err(e)) => {
                    error!("Failed to parse progress file: {}. Starting fresh.", e);
                    ProgressState::default()
                }
                Err(e) => {
                    error!("Failed to read progress file: {}. Starting fresh.", e);
                    ProgressState::default()
                }
            }
        } else {
            info!("No progress file found. Starting fresh.");
            ProgressState::default()
        };
        state.path = path;
        state
    }

    pub fn mark_complete(&mut self, url: &str) -> Result<()> {
        self.processed_urls.insert(url.to_string());
        self.save()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.processed_urls.contains(url)
    }

    fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}
