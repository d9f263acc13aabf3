use crate::config::Config;
use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use regex::Regex;
use std::path::{Path, PathBuf};
use tokio::fs;

const CREDIT_SPACER_LINES: usize = 10;

fn date_suffix_regex() -> Result<&'static Regex> {
    static DATE_RE: OnceCell<Regex> = OnceCell::new();
    DATE_RE.get_or_try_init(|| {
        Regex::new(r"\s\d{8}.*").context("failed to compile date suffix regex")
    })
}

/// Tracklist lines as `"<timestamp> <title>"`, dropping any trailing
/// `YYYYMMDD...` residue left over from generated file names.
pub fn clean_tracklist(text: &str) -> Result<String> {
    let re = date_suffix_regex()?;
    let mut out = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if !line.contains(':') || !line.contains('-') {
            continue;
        }
        let Some((timestamp, title)) = line.split_once(" - ") else {
            continue;
        };
        let joined = format!("{} {}", timestamp.trim(), title.trim());
        out.push(re.replace(&joined, "").into_owned());
    }
    Ok(out.join("\n"))
}

pub fn generate_description(description: &str, tracklist: &str, cfg: &Config) -> Result<String> {
    let timestamps = clean_tracklist(tracklist)?;
    let credits = cfg.credits.join("\n");
    let spacer = "\n".repeat(CREDIT_SPACER_LINES);
    Ok(format!(
        "{description}\n\n\n{timestamps}\n\n\n\n{credits}\n{spacer}\n{hashtags}\n",
        hashtags = cfg.hashtags
    ))
}

pub async fn generate_description_from_file(
    description: &str,
    tracklist_file: &Path,
    cfg: &Config,
) -> Result<String> {
    let tracklist = fs::read_to_string(tracklist_file)
        .await
        .with_context(|| format!("Tracklist file not found: {}", tracklist_file.display()))?;
    generate_description(description, &tracklist, cfg)
}

/// `<dir>/<stem>_description.txt` next to the video.
pub fn description_path_for(video: &Path) -> PathBuf {
    let stem = video
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("video");
    video.with_file_name(format!("{stem}_description.txt"))
}

pub async fn write_description(video: &Path, text: &str) -> Result<PathBuf> {
    let path = description_path_for(video);
    fs::write(&path, text)
        .await
        .with_context(|| format!("Failed to write description: {}", path.display()))?;
    Ok(path)
}
