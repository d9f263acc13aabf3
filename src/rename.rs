use crate::{logi, logok, logw};
use anyhow::{Context, Result};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tokio::fs;
use walkdir::WalkDir;

fn list_mp3_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.with_context(|| format!("Failed to list {}", dir.display()))?;
        let is_mp3 = entry
            .path()
            .extension()
            .and_then(OsStr::to_str)
            .map(|e| e.eq_ignore_ascii_case("mp3"))
            .unwrap_or(false);
        if entry.file_type().is_file() && is_mp3 {
            out.push(entry.into_path());
        }
    }
    out.sort();
    Ok(out)
}

/// Gives the sorted mp3 files in `dir` the names from `song_names`, in order.
/// Returns how many files were renamed.
pub async fn rename_songs(dir: &Path, song_names: &[String]) -> Result<usize> {
    if song_names.is_empty() {
        logw("No song names given; nothing to rename.");
        return Ok(0);
    }

    let files = list_mp3_files(dir)?;
    logi(format!(
        "Found {} MP3 files and {} song names",
        files.len(),
        song_names.len()
    ));
    if files.len() != song_names.len() {
        logw(format!(
            "Number of files ({}) doesn't match number of song names ({}); using the smaller",
            files.len(),
            song_names.len()
        ));
    }

    let mut renamed = 0;
    for (old, name) in files.iter().zip(song_names) {
        let new = dir.join(format!("{name}.mp3"));
        if &new == old {
            continue;
        }
        if fs::metadata(&new).await.is_ok() {
            logw(format!(
                "Skipping {} -> {} (target exists)",
                old.display(),
                new.display()
            ));
            continue;
        }
        match fs::rename(old, &new).await {
            Ok(()) => {
                logok(format!("Renamed: {} -> {}", old.display(), new.display()));
                renamed += 1;
            }
            Err(err) => logw(format!("Error renaming {}: {}", old.display(), err)),
        }
    }

    Ok(renamed)
}
