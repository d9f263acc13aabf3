use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

/// Only this many song names are used per playlist.
pub const MAX_SONGS: usize = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistData {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub song_names: Vec<String>,
}

impl PlaylistData {
    pub fn songs(&self) -> &[String] {
        &self.song_names[..self.song_names.len().min(MAX_SONGS)]
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaylistList {
    pub items: Vec<PlaylistData>,
}

impl PlaylistList {
    pub fn from_json(text: &str) -> Result<Self> {
        let items: Vec<PlaylistData> =
            serde_json::from_str(text).with_context(|| "Failed to parse playlist JSON")?;
        Ok(Self { items })
    }

    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read playlist data: {}", path.as_ref().display()))?;
        Self::from_json(&content)
    }

    pub fn get(&self, index: usize) -> Result<&PlaylistData> {
        self.items.get(index).with_context(|| {
            format!(
                "Playlist index {} out of range ({} playlists)",
                index,
                self.items.len()
            )
        })
    }
}
