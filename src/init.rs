use crate::config::Config;
use crate::ffmpeg::{self, FFMPEG, FFPROBE};
use crate::{logi, logw};
use anyhow::Result;
use std::path::PathBuf;
use tokio::fs;

fn required_dirs(cfg: &Config) -> Vec<PathBuf> {
    let mut dirs = vec![
        cfg.songs_dir.clone(),
        cfg.playlists_dir.clone(),
        cfg.thumbnails_dir.clone(),
        cfg.videos_dir.clone(),
    ];
    if let Some(parent) = cfg.producer_tag.as_deref().and_then(|p| p.parent()) {
        if !parent.as_os_str().is_empty() {
            dirs.push(parent.to_path_buf());
        }
    }
    dirs
}

pub async fn ensure_directories(cfg: &Config) -> Result<()> {
    for dir in required_dirs(cfg) {
        if fs::metadata(&dir).await.is_err() {
            fs::create_dir_all(&dir).await?;
            logi(format!("Created directory: {}", dir.display()));
        }
    }
    Ok(())
}

/// Reports which media tools are missing; returns true when both are present.
pub async fn check_media_tools() -> bool {
    let mut ok = true;
    for tool in [FFMPEG, FFPROBE] {
        if !ffmpeg::tool_available(tool).await {
            logw(format!("{} not found in PATH. Please install FFmpeg.", tool));
            ok = false;
        }
    }
    ok
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_configured_directories() {
        let root = tempfile::tempdir().unwrap();
        let cfg = Config {
            songs_dir: root.path().join("songs"),
            playlists_dir: root.path().join("playlists"),
            thumbnails_dir: root.path().join("thumbnails"),
            videos_dir: root.path().join("videos"),
            producer_tag: Some(root.path().join("producer_tags/tag.mp3")),
            ..Config::default()
        };

        ensure_directories(&cfg).await.unwrap();

        for dir in ["songs", "playlists", "thumbnails", "videos", "producer_tags"] {
            assert!(root.path().join(dir).is_dir(), "{dir} missing");
        }
        // Second run is a no-op.
        ensure_directories(&cfg).await.unwrap();
    }
}
