//! Clients for the AI music generation services.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Local;
use std::path::{Path, PathBuf};
use tokio::fs;

pub mod musicgpt;
pub mod stability;
#[cfg(test)]
mod test_server;

pub use musicgpt::MusicGptClient;
pub use stability::StabilityClient;

/// What to generate and how to name the downloaded files.
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub prompt: String,
    pub music_style: Option<String>,
    /// File names for the generated tracks, in order.
    pub song_names: Vec<String>,
    /// Requested length in seconds, where the service supports it.
    pub duration_secs: Option<u32>,
    pub instrumental: bool,
}

#[async_trait]
pub trait MusicGenerator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Runs one generation job and returns the downloaded files.
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<PathBuf>>;

    /// How many tracks a single job produces.
    fn tracks_per_job(&self) -> usize {
        1
    }
}

/// Keeps alphanumerics, space, `-` and `_`; spaces become underscores.
pub fn clean_track_name(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    kept.trim_end().replace(' ', "_")
}

pub(crate) fn download_timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

pub(crate) async fn save_audio(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create dir {}", dir.display()))?;
    let path = dir.join(file_name);
    fs::write(&path, bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}
