//! Command-line and environment configuration.

use std::path::PathBuf;

use clap::Args;
use fleet_core::CascadePolicy;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";

const APP_DIR: &str = "fleet";
const STORAGE_FILE: &str = "storage.json";

#[derive(Debug, Clone, Args)]
pub struct Config {
    /// Base URL of the fleet API.
    #[arg(long, global = true, env = "FLEET_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// File holding the session token between runs.
    #[arg(long, global = true, env = "FLEET_TOKEN_FILE")]
    pub token_file: Option<PathBuf>,

    /// Re-read vehicles from the server after a segment or brand delete
    /// instead of removing them locally.
    #[arg(long, global = true, env = "FLEET_REFETCH_CASCADE")]
    pub refetch_cascade: bool,
}

impl Config {
    pub fn token_path(&self) -> PathBuf {
        self.token_file.clone().unwrap_or_else(default_token_path)
    }

    pub fn cascade_policy(&self) -> CascadePolicy {
        if self.refetch_cascade {
            CascadePolicy::Refetch
        } else {
            CascadePolicy::Mirror
        }
    }
}

/// `<data_local_dir>/fleet/storage.json`, or `./storage.json` when the
/// platform has no data directory.
pub fn default_token_path() -> PathBuf {
    match dirs::data_local_dir() {
        Some(dir) => dir.join(APP_DIR).join(STORAGE_FILE),
        None => PathBuf::from(STORAGE_FILE),
    }
}
