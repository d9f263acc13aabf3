use crate::logi;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

pub const CONFIG_FILE: &str = "config.json";

pub const DEFAULT_HASHTAGS: &str = "#backgroundmusicwithoutlimitations #coffeetime #coffeebreak #coffeeshopmusic #cafemusic #lofimusic #chillmusic #chillhop #lofihiphop #relaxingmusic #naturemusic #lofimusicforsleep #musicforsleep #studymusic #retromusic #lofichill #retrolofi #funk #funkopop #relaxation #relaxmusic #lofiremix #backgroundmusicforsleep #lofiforstudy";

/// Process-wide settings, read once at start-up and passed by reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub musicgpt_api_key: String,
    pub stability_api_key: String,
    pub hashtags: String,
    pub credits: Vec<String>,
    pub songs_dir: PathBuf,
    pub playlists_dir: PathBuf,
    pub thumbnails_dir: PathBuf,
    pub videos_dir: PathBuf,
    pub producer_tag: Option<PathBuf>,
    pub playlist_data: PathBuf,
    pub fade_duration: f64,
    pub silence_duration: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            musicgpt_api_key: String::new(),
            stability_api_key: String::new(),
            hashtags: DEFAULT_HASHTAGS.to_string(),
            credits: vec![
                "All music featured on this channel is produced by Naturalist.mp3.".to_string(),
                "Images are sourced from Unsplash and edited by Naturalist.mp3 before use."
                    .to_string(),
            ],
            songs_dir: PathBuf::from("songs"),
            playlists_dir: PathBuf::from("playlists"),
            thumbnails_dir: PathBuf::from("thumbnails"),
            videos_dir: PathBuf::from("videos"),
            producer_tag: Some(PathBuf::from("producer_tags/intro_prod_tag_v2.mp3")),
            playlist_data: PathBuf::from("lofi_playlist_data.json"),
            fade_duration: 5.0,
            silence_duration: 6.0,
        }
    }
}

impl Config {
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Failed to parse config: {}", path.as_ref().display()))
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    pub async fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if fs::metadata(&path).await.is_err() {
            logi(format!(
                "No {} found; using built-in defaults",
                path.as_ref().display()
            ));
            return Ok(Self::default());
        }
        Self::load(path).await
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(text)?;
        if !config.fade_duration.is_finite() || config.fade_duration < 0.0 {
            anyhow::bail!("config.json: fade_duration must be >= 0");
        }
        if !config.silence_duration.is_finite() || config.silence_duration < 0.0 {
            anyhow::bail!("config.json: silence_duration must be >= 0");
        }
        Ok(config)
    }

    pub fn musicgpt_key(&self) -> Result<&str> {
        if self.musicgpt_api_key.is_empty() {
            anyhow::bail!("config.json: musicgpt_api_key missing");
        }
        Ok(&self.musicgpt_api_key)
    }

    pub fn stability_key(&self) -> Result<&str> {
        if self.stability_api_key.is_empty() {
            anyhow::bail!("config.json: stability_api_key missing");
        }
        Ok(&self.stability_api_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = Config::from_json(r#"{"musicgpt_api_key": "abc", "silence_duration": 0}"#).unwrap();
        assert_eq!(cfg.musicgpt_key().unwrap(), "abc");
        assert_eq!(cfg.silence_duration, 0.0);
        assert_eq!(cfg.fade_duration, 5.0);
        assert_eq!(cfg.songs_dir, PathBuf::from("songs"));
        assert!(cfg.hashtags.starts_with("#backgroundmusicwithoutlimitations"));
    }

    #[test]
    fn missing_keys_are_reported_on_use() {
        let cfg = Config::default();
        assert!(cfg.musicgpt_key().is_err());
        assert!(cfg.stability_key().is_err());
    }

    #[test]
    fn negative_fade_rejected() {
        assert!(Config::from_json(r#"{"fade_duration": -2}"#).is_err());
    }

    #[tokio::test]
    async fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_or_default(dir.path().join("config.json")).await.unwrap();
        assert_eq!(cfg.playlists_dir, PathBuf::from("playlists"));
    }

    #[tokio::test]
    async fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        tokio::fs::write(&path, r##"{"producer_tag": null, "hashtags": "#lofi"}"##)
            .await
            .unwrap();
        let cfg = Config::load(&path).await.unwrap();
        assert_eq!(cfg.producer_tag, None);
        assert_eq!(cfg.hashtags, "#lofi");
    }
}
